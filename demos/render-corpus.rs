//! Builds a small synthetic corpus of sine tones and lets a few playheads wander through it,
//! either on the default audio device or into a wav file.

use std::{f32::consts::TAU, path::PathBuf, sync::Arc, thread, time::Duration};

use arg::{parse_args, Args};

use grainwalk::{
    outputs::{CpalOutput, WavOutput},
    Axis, Corpus, Error, OutputDevice, PlaybackController, PlaybackSettingsSnapshot,
    StreamConfig,
};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

const SAMPLE_RATE: u32 = 44100;
const HOP_SIZE: usize = 512;

/// Number of synthetic corpus files and their length in seconds.
const FILE_COUNT: usize = 12;
const FILE_LENGTH: f32 = 4.0;

// -------------------------------------------------------------------------------------------------

#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "o", long = "output")]
    /// Write audio output into the given wav file, instead of using the default audio device.
    output_path: Option<PathBuf>,
    #[arg(short = "d", long = "duration")]
    /// Playback duration in seconds. 10 seconds by default.
    duration: Option<u64>,
    #[arg(short = "p", long = "playheads")]
    /// Number of simultaneously running playheads. 3 by default.
    playheads: Option<usize>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    /// By default \"debug\" in dev builds and \"warn\" in release builds.
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    let args = parse_args::<Arguments>();

    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .with_module_level("symphonia_core", log::LevelFilter::Warn)
        .init()
        .expect("Failed to set logger");

    let duration = Duration::from_secs(args.duration.unwrap_or(10));
    let playhead_count = args.playheads.unwrap_or(3);

    let controller = PlaybackController::new();
    controller.set_corpus(Arc::new(synthetic_corpus()?));
    controller.assign_axis(Axis::X, Some(0))?;
    controller.assign_axis(Axis::Y, Some(1))?;
    controller.apply_settings(&PlaybackSettingsSnapshot {
        loop_playheads: true,
        jump_chance: 300,
        crossfade_length: 1024,
        max_jump_distance: 150,
        dynamic_pan: true,
        dynamic_pan_dimension: 0,
        pan_strength: 700,
        ..Default::default()
    })?;

    let config = StreamConfig::default().with_sample_rate(SAMPLE_RATE);
    if let Some(output_path) = &args.output_path {
        let device = WavOutput::new(output_path).with_duration(duration);
        start(&controller, config, &device, playhead_count)?;
        while !device.is_finished() {
            thread::sleep(Duration::from_millis(10));
        }
    } else {
        let device = CpalOutput::default_device()?;
        start(&controller, config, &device, playhead_count)?;
        thread::sleep(duration);
    }

    controller.clear_and_kill_audio();
    Ok(())
}

fn start(
    controller: &PlaybackController,
    config: StreamConfig,
    device: &dyn OutputDevice,
    playhead_count: usize,
) -> Result<(), Error> {
    if !controller.start_or_restart_audio_stream(config, device) {
        return Err(Error::OutputDeviceNotFound(device.name().to_string()));
    }
    let mut created = 0;
    while created < playhead_count {
        let Some(point) = controller.pick_random() else {
            break;
        };
        if controller.request_create_playhead(point.file, point.timepoint) {
            println!("Created playhead at file {} timepoint {}", point.file, point.timepoint);
            created += 1;
        } else {
            // too many pending requests: let the render thread catch up
            thread::sleep(Duration::from_millis(20));
        }
    }
    Ok(())
}

// -------------------------------------------------------------------------------------------------

/// Sine sweeps with a slow tremolo. Features are the pitch and the loudness envelope of each
/// hop, so files with similar pitch ranges end up next to each other.
fn synthetic_corpus() -> Result<Corpus, Error> {
    let mut corpus = Corpus::new(HOP_SIZE, vec!["pitch".into(), "loudness".into()])?;
    let sample_count = (FILE_LENGTH * SAMPLE_RATE as f32) as usize;
    for file in 0..FILE_COUNT {
        let start_pitch = 48.0 + file as f32 * 2.0;
        let end_pitch = start_pitch + if file % 2 == 0 { 12.0 } else { -7.0 };
        let tremolo_rate = 0.5 + file as f32 * 0.25;

        let mut phase = 0.0_f32;
        let mut samples = Vec::with_capacity(sample_count);
        let mut features = Vec::new();
        for index in 0..sample_count {
            let position = index as f32 / sample_count as f32;
            let pitch = start_pitch + (end_pitch - start_pitch) * position;
            let frequency = 440.0 * 2.0_f32.powf((pitch - 69.0) / 12.0);
            let time = index as f32 / SAMPLE_RATE as f32;
            let loudness = 0.5 + 0.5 * (TAU * tremolo_rate * time).sin();
            phase = (phase + frequency / SAMPLE_RATE as f32).fract();
            samples.push((TAU * phase).sin() * loudness * 0.25);
            if index % HOP_SIZE == 0 {
                features.push(vec![pitch as f64, loudness as f64]);
            }
        }
        corpus.add_file(&format!("sweep-{file}"), samples, features)?;
    }
    Ok(corpus)
}
