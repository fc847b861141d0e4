use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    engine::PlaybackEngine,
    error::Error,
    output::{OutputDevice, OutputStream, StreamConfig},
};

// -------------------------------------------------------------------------------------------------

/// Output device without a backend: streams don't run any thread, so the engine must be
/// pulled manually via [`PlaybackEngine::process`]. Useful for tests and custom hosts which
/// own their own audio callback.
#[derive(Debug, Clone)]
pub struct ManualOutput {
    name: String,
    available: bool,
    open: Arc<AtomicBool>,
}

impl Default for ManualOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualOutput {
    pub fn new() -> Self {
        Self {
            name: "Manual".to_string(),
            available: true,
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A device which fails to open streams, like a disconnected audio device.
    pub fn unavailable() -> Self {
        Self {
            name: "Unavailable".to_string(),
            available: false,
            ..Self::new()
        }
    }

    /// true while a stream of this device is open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }
}

impl OutputDevice for ManualOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn open_stream(
        &self,
        config: &StreamConfig,
        _engine: PlaybackEngine,
    ) -> Result<Box<dyn OutputStream>, Error> {
        if !self.available {
            return Err(Error::OutputDeviceNotFound(self.name.clone()));
        }
        config.validate()?;
        self.open.store(true, Ordering::Relaxed);
        Ok(Box::new(ManualStream {
            config: *config,
            open: Arc::clone(&self.open),
        }))
    }
}

// -------------------------------------------------------------------------------------------------

struct ManualStream {
    config: StreamConfig,
    open: Arc<AtomicBool>,
}

impl OutputStream for ManualStream {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::Relaxed);
    }
}
