use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender};

use crate::{
    engine::{PlaybackEngine, CHANNEL_COUNT},
    error::Error,
    output::{OutputDevice, OutputStream, StreamConfig},
    utils::assert_no_alloc,
};

// -------------------------------------------------------------------------------------------------

const SAMPLE_FORMAT: cpal::SampleFormat = cpal::SampleFormat::F32;

// -------------------------------------------------------------------------------------------------

/// Audio output device of the system's default audio host.
pub struct CpalOutput {
    device: cpal::Device,
    name: String,
}

impl CpalOutput {
    /// The host's default output device.
    pub fn default_device() -> Result<Self, Error> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(cpal::DefaultStreamConfigError::DeviceNotAvailable)?;
        Self::from_device(device)
    }

    /// Open an output device by its name.
    pub fn open_device(name: &str) -> Result<Self, Error> {
        let host = cpal::default_host();
        let device = host
            .output_devices()?
            .find(|device| device.name().is_ok_and(|device_name| device_name == name))
            .ok_or_else(|| Error::OutputDeviceNotFound(name.to_string()))?;
        Self::from_device(device)
    }

    /// Names of all output devices of the default host.
    pub fn device_names() -> Result<Vec<String>, Error> {
        let host = cpal::default_host();
        Ok(host
            .output_devices()?
            .filter_map(|device| device.name().ok())
            .collect())
    }

    fn from_device(device: cpal::Device) -> Result<Self, Error> {
        let name = device.name()?;
        Ok(Self { device, name })
    }

    fn check_config(&self, config: &StreamConfig) -> Result<(), Error> {
        let sample_rate = cpal::SampleRate(config.sample_rate);
        let supported = self.device.supported_output_configs()?.any(|supported| {
            supported.channels() as usize == CHANNEL_COUNT
                && supported.sample_format() == SAMPLE_FORMAT
                && (supported.min_sample_rate()..=supported.max_sample_rate())
                    .contains(&sample_rate)
        });
        if supported {
            Ok(())
        } else {
            Err(Error::ParameterError(format!(
                "Output device '{}' does not support stereo f32 output at {} Hz",
                self.name, config.sample_rate
            )))
        }
    }
}

impl OutputDevice for CpalOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn open_stream(
        &self,
        config: &StreamConfig,
        engine: PlaybackEngine,
    ) -> Result<Box<dyn OutputStream>, Error> {
        config.validate()?;
        self.check_config(config)?;

        // cpal streams are not Send: run them in their own thread
        let (result_send, result_recv) = bounded::<Result<usize, Error>>(1);
        let (stream_send, stream_recv) = bounded::<StreamMsg>(1);
        let device = self.device.clone();
        let config = *config;
        let thread = thread::Builder::new()
            .name("audio_output".to_string())
            .spawn(move || match Stream::open(&device, &config, engine) {
                Ok(stream) => {
                    let _ = result_send.send(Ok(stream.buffer_size));
                    // run until closed or until the stream handle got dropped
                    let _ = stream_recv.recv();
                    stream.close();
                }
                Err(err) => {
                    let _ = result_send.send(Err(err));
                }
            })?;

        let buffer_size = result_recv
            .recv()
            .map_err(|err| Error::SendError(err.to_string()))??;

        Ok(Box::new(CpalStream {
            sample_rate: config.sample_rate,
            buffer_size,
            stream_send,
            thread: Some(thread),
        }))
    }
}

// -------------------------------------------------------------------------------------------------

enum StreamMsg {
    Close,
}

struct Stream {
    stream: cpal::Stream,
    buffer_size: usize,
}

impl Stream {
    fn open(
        device: &cpal::Device,
        config: &StreamConfig,
        engine: PlaybackEngine,
    ) -> Result<Self, Error> {
        let mut stream_config = cpal::StreamConfig {
            channels: CHANNEL_COUNT as cpal::ChannelCount,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size as cpal::FrameCount),
        };
        let mut buffer_size = config.buffer_size;

        log::info!("opening output stream: {:?}", stream_config);
        let stream = match Self::build(device, &stream_config, engine.clone()) {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!(
                    "failed to open stream with a buffer size of {} frames: {}. using the device's default buffer size",
                    config.buffer_size,
                    err
                );
                stream_config.buffer_size = cpal::BufferSize::Default;
                buffer_size = 0;
                Self::build(device, &stream_config, engine)?
            }
        };
        stream.play()?;

        Ok(Self {
            stream,
            buffer_size,
        })
    }

    fn build(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        engine: PlaybackEngine,
    ) -> Result<cpal::Stream, Error> {
        Ok(device.build_output_stream(
            config,
            move |output: &mut [f32], _: &cpal::OutputCallbackInfo| {
                assert_no_alloc(|| engine.process(output));
            },
            |err| {
                log::error!("audio output error: {}", err);
            },
            None,
        )?)
    }

    fn close(self) {
        log::debug!("closing audio output stream");
        if let Err(err) = self.stream.pause() {
            log::warn!("failed to pause output stream: {}", err);
        }
    }
}

// -------------------------------------------------------------------------------------------------

struct CpalStream {
    sample_rate: u32,
    buffer_size: usize,
    stream_send: Sender<StreamMsg>,
    thread: Option<JoinHandle<()>>,
}

impl OutputStream for CpalStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Fixed buffer size in frames, or 0 when the device uses its default buffer size.
    fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn close(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.stream_send.send(StreamMsg::Close);
            if thread.join().is_err() {
                log::error!("audio output thread panicked");
            }
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.close();
    }
}

// -------------------------------------------------------------------------------------------------

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(err: cpal::DefaultStreamConfigError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::SupportedStreamConfigsError> for Error {
    fn from(err: cpal::SupportedStreamConfigsError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::DevicesError> for Error {
    fn from(err: cpal::DevicesError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::DeviceNameError> for Error {
    fn from(err: cpal::DeviceNameError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(err: cpal::BuildStreamError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::PlayStreamError> for Error {
    fn from(err: cpal::PlayStreamError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}
