use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{
    engine::{PlaybackEngine, CHANNEL_COUNT},
    error::Error,
    output::{OutputDevice, OutputStream, StreamConfig},
};

// -------------------------------------------------------------------------------------------------

const IDLE_SLEEP: Duration = Duration::from_millis(1);

// -------------------------------------------------------------------------------------------------

/// Output device which renders the engine into a wav file instead of playing it back.
///
/// Streams render as fast as possible in a background thread. Recording starts with the
/// first playhead, so the file contains no leading silence, and stops when the optional
/// duration elapsed or when the stream gets closed.
///
/// Wav files contents are always saved as 32bit float stereo files.
pub struct WavOutput {
    path: PathBuf,
    name: String,
    duration: Option<Duration>,
    finished: Arc<AtomicBool>,
}

impl WavOutput {
    /// Create a new wav output device, which writes into the given file path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        Self {
            path,
            name,
            duration: None,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Limit the length of the written content.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// true when the last opened stream finished writing its file.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl OutputDevice for WavOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn open_stream(
        &self,
        config: &StreamConfig,
        engine: PlaybackEngine,
    ) -> Result<Box<dyn OutputStream>, Error> {
        config.validate()?;
        let spec = WavSpec {
            channels: CHANNEL_COUNT as u16,
            sample_rate: config.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(&self.path, spec)?;
        log::info!("writing output into wav file '{}'", self.name);

        self.finished.store(false, Ordering::Release);
        let renderer = WavRenderer {
            engine,
            writer: Some(writer),
            buffer: vec![0.0; config.buffer_size * CHANNEL_COUNT],
            written_frames: 0,
            max_frames: self
                .duration
                .map(|duration| (duration.as_secs_f64() * config.sample_rate as f64) as u64),
            finished: Arc::clone(&self.finished),
        };
        let (stream_send, stream_recv) = bounded(1);
        let thread = thread::Builder::new()
            .name("wav_output".to_string())
            .spawn(move || renderer.run(stream_recv))?;

        Ok(Box::new(WavStream {
            config: *config,
            stream_send,
            thread: Some(thread),
        }))
    }
}

// -------------------------------------------------------------------------------------------------

enum StreamMsg {
    Close,
}

struct WavRenderer {
    engine: PlaybackEngine,
    writer: Option<WavWriter<BufWriter<File>>>,
    buffer: Vec<f32>,
    written_frames: u64,
    max_frames: Option<u64>,
    finished: Arc<AtomicBool>,
}

impl WavRenderer {
    fn run(mut self, stream_recv: Receiver<StreamMsg>) {
        loop {
            match stream_recv.try_recv() {
                Ok(StreamMsg::Close) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }
            if self
                .max_frames
                .is_some_and(|max_frames| self.written_frames >= max_frames)
            {
                break;
            }
            // wait for the first playhead
            if self.written_frames == 0
                && self.engine.active_playhead_count() == 0
                && self.engine.pending_playhead_count() == 0
            {
                thread::sleep(IDLE_SLEEP);
                continue;
            }
            if let Err(err) = self.render_next() {
                log::error!("failed to write wav output: {}", err);
                break;
            }
        }
        self.finalize();
    }

    fn render_next(&mut self) -> Result<(), Error> {
        self.engine.process(&mut self.buffer);
        let mut frame_count = (self.buffer.len() / CHANNEL_COUNT) as u64;
        if let Some(max_frames) = self.max_frames {
            frame_count = frame_count.min(max_frames - self.written_frames);
        }
        if let Some(writer) = self.writer.as_mut() {
            for sample in &self.buffer[..frame_count as usize * CHANNEL_COUNT] {
                writer.write_sample(*sample)?;
            }
        }
        self.written_frames += frame_count;
        Ok(())
    }

    fn finalize(&mut self) {
        if let Some(writer) = self.writer.take() {
            match writer.finalize() {
                Ok(()) => log::info!("wrote {} frames into wav file", self.written_frames),
                Err(err) => log::error!("failed to finalize wav file: {}", err),
            }
        }
        self.finished.store(true, Ordering::Release);
    }
}

// -------------------------------------------------------------------------------------------------

struct WavStream {
    config: StreamConfig,
    stream_send: Sender<StreamMsg>,
    thread: Option<JoinHandle<()>>,
}

impl OutputStream for WavStream {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    fn close(&mut self) {
        if let Some(thread) = self.thread.take() {
            // the renderer may already have finished
            let _ = self.stream_send.try_send(StreamMsg::Close);
            if thread.join().is_err() {
                log::error!("wav output thread panicked");
            }
        }
    }
}

impl Drop for WavStream {
    fn drop(&mut self) {
        self.close();
    }
}

// -------------------------------------------------------------------------------------------------

impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

// -------------------------------------------------------------------------------------------------
