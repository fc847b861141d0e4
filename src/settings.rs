//! Tunable playback parameters, shared between the control and render threads.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::error::Error;

// -------------------------------------------------------------------------------------------------

/// Unit of all permille based parameters.
pub const PERMILLE: u32 = 1000;

/// Maximum supported crossfade length in samples.
pub const MAX_CROSSFADE_LENGTH: usize = 16384;
/// Maximum supported number of jump target candidates.
pub const MAX_JUMP_TARGETS: usize = 64;

// -------------------------------------------------------------------------------------------------

/// A plain copy of all tunable playback parameters.
///
/// Can be used to configure a controller in one go, and to persist or restore the current
/// playback configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSettingsSnapshot {
    /// Loop playheads at the end of their file instead of killing them.
    pub loop_playheads: bool,
    /// Allow jumps within the playhead's current file.
    pub same_file_jumps: bool,
    /// Minimum distance in timepoints for jumps within the same file.
    pub same_file_min_time_diff: usize,
    /// Probability of a jump attempt at each trigger point in permille.
    pub jump_chance: u32,
    /// Crossfade length of jumps in samples.
    pub crossfade_length: usize,
    /// Maximum normalized search space jump distance in permille.
    pub max_jump_distance: u32,
    /// Maximum number of jump candidates.
    pub max_jump_targets: usize,
    /// Master volume in permille.
    pub volume: u32,
    /// Pan playheads by the value of a feature dimension.
    pub dynamic_pan: bool,
    /// Feature dimension which drives the dynamic pan.
    pub dynamic_pan_dimension: usize,
    /// Dynamic pan strength in permille.
    pub pan_strength: u32,
}

impl Default for PlaybackSettingsSnapshot {
    fn default() -> Self {
        Self {
            loop_playheads: false,
            same_file_jumps: false,
            same_file_min_time_diff: 2,
            jump_chance: 50,
            crossfade_length: 256,
            max_jump_distance: 50,
            max_jump_targets: 5,
            volume: 500,
            dynamic_pan: false,
            dynamic_pan_dimension: 0,
            pan_strength: 1000,
        }
    }
}

impl PlaybackSettingsSnapshot {
    /// Validate all parameter ranges.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("Jump chance", self.jump_chance),
            ("Max jump distance", self.max_jump_distance),
            ("Volume", self.volume),
            ("Pan strength", self.pan_strength),
        ] {
            if value > PERMILLE {
                return Err(Error::ParameterError(format!(
                    "{name} must be between 0 and {PERMILLE}"
                )));
            }
        }
        if self.crossfade_length < 1 || self.crossfade_length > MAX_CROSSFADE_LENGTH {
            return Err(Error::ParameterError(format!(
                "Crossfade length must be between 1 and {MAX_CROSSFADE_LENGTH} samples"
            )));
        }
        if self.max_jump_targets < 1 || self.max_jump_targets > MAX_JUMP_TARGETS {
            return Err(Error::ParameterError(format!(
                "Max jump targets must be between 1 and {MAX_JUMP_TARGETS}"
            )));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Lock free playback parameters.
///
/// Each parameter is an independent atomic: written by the control thread, read by the render
/// thread at its next invocation. There are no ordering guarantees across parameters. Setters
/// clamp values into their valid ranges.
#[derive(Debug)]
pub struct PlaybackSettings {
    loop_playheads: AtomicBool,
    same_file_jumps: AtomicBool,
    same_file_min_time_diff: AtomicUsize,
    jump_chance: AtomicU32,
    crossfade_length: AtomicUsize,
    max_jump_distance: AtomicU32,
    max_jump_targets: AtomicUsize,
    volume: AtomicU32,
    dynamic_pan: AtomicBool,
    dynamic_pan_dimension: AtomicUsize,
    pan_strength: AtomicU32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self::from_snapshot(&PlaybackSettingsSnapshot::default())
    }
}

impl PlaybackSettings {
    pub fn from_snapshot(snapshot: &PlaybackSettingsSnapshot) -> Self {
        let settings = Self {
            loop_playheads: AtomicBool::new(false),
            same_file_jumps: AtomicBool::new(false),
            same_file_min_time_diff: AtomicUsize::new(0),
            jump_chance: AtomicU32::new(0),
            crossfade_length: AtomicUsize::new(1),
            max_jump_distance: AtomicU32::new(0),
            max_jump_targets: AtomicUsize::new(1),
            volume: AtomicU32::new(0),
            dynamic_pan: AtomicBool::new(false),
            dynamic_pan_dimension: AtomicUsize::new(0),
            pan_strength: AtomicU32::new(0),
        };
        settings.apply(snapshot);
        settings
    }

    /// Copy of all current parameter values.
    pub fn snapshot(&self) -> PlaybackSettingsSnapshot {
        PlaybackSettingsSnapshot {
            loop_playheads: self.loop_playheads(),
            same_file_jumps: self.same_file_jumps(),
            same_file_min_time_diff: self.same_file_min_time_diff(),
            jump_chance: self.jump_chance_permille(),
            crossfade_length: self.crossfade_length(),
            max_jump_distance: self.max_jump_distance_permille(),
            max_jump_targets: self.max_jump_targets(),
            volume: self.volume_permille(),
            dynamic_pan: self.dynamic_pan(),
            dynamic_pan_dimension: self.dynamic_pan_dimension(),
            pan_strength: self.pan_strength_permille(),
        }
    }

    /// Set all parameters from the given snapshot, clamping out of range values.
    pub fn apply(&self, snapshot: &PlaybackSettingsSnapshot) {
        self.set_loop_playheads(snapshot.loop_playheads);
        self.set_same_file_jumps(snapshot.same_file_jumps);
        self.set_same_file_min_time_diff(snapshot.same_file_min_time_diff);
        self.set_jump_chance(snapshot.jump_chance);
        self.set_crossfade_length(snapshot.crossfade_length);
        self.set_max_jump_distance(snapshot.max_jump_distance);
        self.set_max_jump_targets(snapshot.max_jump_targets);
        self.set_volume(snapshot.volume);
        self.set_dynamic_pan(snapshot.dynamic_pan);
        self.set_dynamic_pan_dimension(snapshot.dynamic_pan_dimension);
        self.set_pan_strength(snapshot.pan_strength);
    }

    /// Reset all parameters to their defaults.
    pub fn reset(&self) {
        self.apply(&PlaybackSettingsSnapshot::default());
    }

    pub fn loop_playheads(&self) -> bool {
        self.loop_playheads.load(Ordering::Relaxed)
    }
    pub fn set_loop_playheads(&self, enabled: bool) {
        self.loop_playheads.store(enabled, Ordering::Relaxed);
    }

    pub fn same_file_jumps(&self) -> bool {
        self.same_file_jumps.load(Ordering::Relaxed)
    }
    pub fn set_same_file_jumps(&self, allowed: bool) {
        self.same_file_jumps.store(allowed, Ordering::Relaxed);
    }

    pub fn same_file_min_time_diff(&self) -> usize {
        self.same_file_min_time_diff.load(Ordering::Relaxed)
    }
    pub fn set_same_file_min_time_diff(&self, timepoints: usize) {
        self.same_file_min_time_diff
            .store(timepoints, Ordering::Relaxed);
    }

    pub fn jump_chance_permille(&self) -> u32 {
        self.jump_chance.load(Ordering::Relaxed)
    }
    /// Jump chance as probability in range `0.0..=1.0`.
    pub fn jump_chance(&self) -> f64 {
        self.jump_chance_permille() as f64 / PERMILLE as f64
    }
    pub fn set_jump_chance(&self, permille: u32) {
        self.jump_chance
            .store(permille.min(PERMILLE), Ordering::Relaxed);
    }

    pub fn crossfade_length(&self) -> usize {
        self.crossfade_length.load(Ordering::Relaxed)
    }
    pub fn set_crossfade_length(&self, samples: usize) {
        self.crossfade_length
            .store(samples.clamp(1, MAX_CROSSFADE_LENGTH), Ordering::Relaxed);
    }

    pub fn max_jump_distance_permille(&self) -> u32 {
        self.max_jump_distance.load(Ordering::Relaxed)
    }
    /// Max jump distance in the normalized search space.
    pub fn max_jump_distance(&self) -> f64 {
        self.max_jump_distance_permille() as f64 / PERMILLE as f64
    }
    pub fn set_max_jump_distance(&self, permille: u32) {
        self.max_jump_distance
            .store(permille.min(PERMILLE), Ordering::Relaxed);
    }

    pub fn max_jump_targets(&self) -> usize {
        self.max_jump_targets.load(Ordering::Relaxed)
    }
    pub fn set_max_jump_targets(&self, targets: usize) {
        self.max_jump_targets
            .store(targets.clamp(1, MAX_JUMP_TARGETS), Ordering::Relaxed);
    }

    pub fn volume_permille(&self) -> u32 {
        self.volume.load(Ordering::Relaxed)
    }
    /// Master volume as linear gain in range `0.0..=1.0`.
    pub fn volume(&self) -> f32 {
        self.volume_permille() as f32 / PERMILLE as f32
    }
    pub fn set_volume(&self, permille: u32) {
        self.volume.store(permille.min(PERMILLE), Ordering::Relaxed);
    }

    pub fn dynamic_pan(&self) -> bool {
        self.dynamic_pan.load(Ordering::Relaxed)
    }
    pub fn set_dynamic_pan(&self, enabled: bool) {
        self.dynamic_pan.store(enabled, Ordering::Relaxed);
    }

    pub fn dynamic_pan_dimension(&self) -> usize {
        self.dynamic_pan_dimension.load(Ordering::Relaxed)
    }
    pub fn set_dynamic_pan_dimension(&self, dimension: usize) {
        self.dynamic_pan_dimension
            .store(dimension, Ordering::Relaxed);
    }

    pub fn pan_strength_permille(&self) -> u32 {
        self.pan_strength.load(Ordering::Relaxed)
    }
    /// Pan strength in range `0.0..=1.0`.
    pub fn pan_strength(&self) -> f32 {
        self.pan_strength_permille() as f32 / PERMILLE as f32
    }
    pub fn set_pan_strength(&self, permille: u32) {
        self.pan_strength
            .store(permille.min(PERMILLE), Ordering::Relaxed);
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = PlaybackSettings::default();
        assert!(!settings.loop_playheads());
        assert!(!settings.same_file_jumps());
        assert_eq!(settings.same_file_min_time_diff(), 2);
        assert_eq!(settings.jump_chance_permille(), 50);
        assert_eq!(settings.crossfade_length(), 256);
        assert_eq!(settings.max_jump_distance_permille(), 50);
        assert_eq!(settings.max_jump_targets(), 5);
        assert_eq!(settings.volume_permille(), 500);
        assert!(!settings.dynamic_pan());
        assert_eq!(settings.dynamic_pan_dimension(), 0);
        assert_eq!(settings.pan_strength_permille(), 1000);
        assert_eq!(settings.snapshot(), PlaybackSettingsSnapshot::default());
    }

    #[test]
    fn clamping() {
        let settings = PlaybackSettings::default();
        settings.set_jump_chance(5000);
        assert_eq!(settings.jump_chance(), 1.0);
        settings.set_crossfade_length(0);
        assert_eq!(settings.crossfade_length(), 1);
        settings.set_crossfade_length(1 << 20);
        assert_eq!(settings.crossfade_length(), MAX_CROSSFADE_LENGTH);
        settings.set_max_jump_targets(0);
        assert_eq!(settings.max_jump_targets(), 1);
        settings.set_volume(500);
        assert_eq!(settings.volume(), 0.5);
    }

    #[test]
    fn reset() {
        let settings = PlaybackSettings::default();
        settings.set_loop_playheads(true);
        settings.set_volume(1000);
        settings.set_dynamic_pan_dimension(3);
        assert_ne!(settings.snapshot(), PlaybackSettingsSnapshot::default());
        settings.reset();
        assert_eq!(settings.snapshot(), PlaybackSettingsSnapshot::default());
    }

    #[test]
    fn validation() {
        assert!(PlaybackSettingsSnapshot::default().validate().is_ok());
        let invalid = [
            PlaybackSettingsSnapshot {
                volume: 1001,
                ..Default::default()
            },
            PlaybackSettingsSnapshot {
                crossfade_length: 0,
                ..Default::default()
            },
            PlaybackSettingsSnapshot {
                max_jump_targets: MAX_JUMP_TARGETS + 1,
                ..Default::default()
            },
        ];
        for snapshot in invalid {
            assert!(snapshot.validate().is_err());
        }
    }
}
