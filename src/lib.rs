#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod bounds;
mod controller;
mod corpus;
mod engine;
mod error;
mod output;
mod picker;
mod playhead;
mod settings;
mod spatial;

// public, flat re-exports
pub use error::Error;

pub use corpus::{Corpus, CorpusPoint};

pub use bounds::DimensionBounds;

pub use spatial::{Axis, AxisAssignment, Neighbor, SpatialIndex};

pub use picker::{JumpRules, JumpTargetSelector};

pub use playhead::{calculate_trigger_points, Crossfade, Playhead, PlayheadId, VisualPlayhead};

pub use settings::{
    PlaybackSettings, PlaybackSettingsSnapshot, MAX_CROSSFADE_LENGTH, MAX_JUMP_TARGETS, PERMILLE,
};

pub use engine::{PlaybackEngine, CHANNEL_COUNT, MAX_PENDING_PLAYHEADS};

pub use controller::PlaybackController;

pub use output::{
    OutputDevice, OutputStream, StreamConfig, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE,
};

// public mods
pub mod utils;

pub mod outputs {
    //! Audio output device implementations.

    #[cfg(feature = "cpal-output")]
    pub use super::output::cpal::CpalOutput;
    pub use super::output::manual::ManualOutput;
    #[cfg(feature = "wav-output")]
    pub use super::output::wav::WavOutput;
}
