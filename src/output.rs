//! Audio output devices which drive a [`PlaybackEngine`].

#[cfg(feature = "cpal-output")]
pub mod cpal;
pub mod manual;
#[cfg(feature = "wav-output")]
pub mod wav;

use crate::{engine::PlaybackEngine, error::Error};

// -------------------------------------------------------------------------------------------------

/// Default output stream sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
/// Default output stream buffer size in frames.
pub const DEFAULT_BUFFER_SIZE: usize = 512;

// -------------------------------------------------------------------------------------------------

/// Output stream settings. The channel layout is always interleaved stereo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Buffer size in frames.
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl StreamConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Validate the stream settings.
    pub fn validate(&self) -> Result<(), Error> {
        if !(8000..=384000).contains(&self.sample_rate) {
            return Err(Error::ParameterError(
                "Sample rate must be between 8000 and 384000 Hz".to_string(),
            ));
        }
        if !(16..=16384).contains(&self.buffer_size) {
            return Err(Error::ParameterError(
                "Buffer size must be between 16 and 16384 frames".to_string(),
            ));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// A running output stream, which periodically calls [`PlaybackEngine::process`].
pub trait OutputStream: Send {
    /// Actual sample rate of the stream.
    fn sample_rate(&self) -> u32;
    /// Actual buffer size of the stream in frames.
    fn buffer_size(&self) -> usize;
    /// Stop the stream. No more render callbacks happen once this returns.
    fn close(&mut self);
}

/// An audio output device, which can open output streams.
pub trait OutputDevice {
    /// Display name of the device.
    fn name(&self) -> &str;
    /// Open a new stream with the given config, which renders the given engine.
    fn open_stream(
        &self,
        config: &StreamConfig,
        engine: PlaybackEngine,
    ) -> Result<Box<dyn OutputStream>, Error>;
}

// -------------------------------------------------------------------------------------------------
