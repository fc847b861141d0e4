//! Control thread API of the playback engine.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
};

use crate::{
    bounds::DimensionBounds,
    corpus::{Corpus, CorpusPoint},
    engine::{PlaybackEngine, MAX_PENDING_PLAYHEADS},
    error::Error,
    output::{OutputDevice, OutputStream, StreamConfig},
    playhead::{PlayheadId, VisualPlayhead},
    settings::{PlaybackSettings, PlaybackSettingsSnapshot},
    spatial::{Axis, AxisAssignment, SpatialIndex},
};

// -------------------------------------------------------------------------------------------------

/// How long to wait for the render thread to confirm a block request.
const BLOCK_CONFIRMATION_TIMEOUT: Duration = Duration::from_millis(100);
const BLOCK_CONFIRMATION_POLL: Duration = Duration::from_millis(2);

// -------------------------------------------------------------------------------------------------

/// Drives a [`PlaybackEngine`] from a non real-time thread: opens and restarts output
/// streams, requests playhead creation and removal, sets playback parameters and swaps in
/// dimension bounds and spatial indices.
///
/// Requests are validated here and handed over to the render thread, which applies them in
/// its next callback. None of the functions here ever wait for the render thread longer than
/// a few milliseconds, so they are safe to call from a UI thread.
pub struct PlaybackController {
    engine: PlaybackEngine,
    stream: Mutex<Option<Box<dyn OutputStream>>>,
    /// Serializes spatial index rebuilds, which read, modify and write back axes and bounds.
    index_rebuild: Mutex<()>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController {
    /// Create a new controller with an idle engine. No stream is running and no corpus is set.
    pub fn new() -> Self {
        Self {
            engine: PlaybackEngine::new(),
            stream: Mutex::new(None),
            index_rebuild: Mutex::new(()),
        }
    }

    /// The controlled engine.
    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    /// The loaded corpus, if any.
    pub fn corpus(&self) -> Option<Arc<Corpus>> {
        self.engine.corpus()
    }

    /// Set a new corpus. Kills all playheads of the previous corpus, resets the dimension
    /// bounds to the corpus' value ranges and rebuilds the spatial index with the current
    /// axis assignment.
    pub fn set_corpus(&self, corpus: Arc<Corpus>) {
        log::info!(
            "Setting corpus with {} files and {} timepoints",
            corpus.file_count(),
            corpus.total_timepoint_count()
        );
        let _rebuild = self.index_rebuild_lock();
        let bounds = DimensionBounds::from_corpus(&corpus);
        let axes = self.engine.spatial_index().axes();
        let index = SpatialIndex::build(&corpus, &bounds, axes).unwrap_or_else(|err| {
            log::warn!("Resetting axis assignment for the new corpus: {}", err);
            SpatialIndex::new()
        });
        self.engine.set_corpus(Some(corpus), bounds, index);
    }

    // ---------------------------------------------------------------------------------------------

    /// Open a new output stream on the given device, closing the running one.
    ///
    /// Returns false when the new stream could not be opened. The output is then marked as
    /// missing, so all playhead creation requests get rejected until a stream successfully
    /// opened again.
    pub fn start_or_restart_audio_stream(
        &self,
        config: StreamConfig,
        device: &dyn OutputDevice,
    ) -> bool {
        self.engine.set_restarting(true);
        if self.engine.is_stream_running() {
            let request = self.engine.request_block_confirmation();
            if !self.wait_for_block_confirmation(request) {
                log::warn!("Render thread did not confirm the restart: closing the stream anyway");
            }
        }

        let mut stream = self.stream();
        if let Some(mut old_stream) = stream.take() {
            log::debug!("Closing running output stream");
            old_stream.close();
        }
        self.engine.set_stream_running(false);

        let result = config
            .validate()
            .and_then(|()| device.open_stream(&config, self.engine.clone()));
        let success = match result {
            Ok(new_stream) => {
                log::info!(
                    "Opened output stream on device '{}' with {} Hz and {} frames",
                    device.name(),
                    new_stream.sample_rate(),
                    new_stream.buffer_size()
                );
                *stream = Some(new_stream);
                self.engine.set_stream_running(true);
                self.engine.set_missing_output(false);
                true
            }
            Err(err) => {
                log::error!(
                    "Failed to open output stream on device '{}': {}",
                    device.name(),
                    err
                );
                self.engine.set_missing_output(true);
                false
            }
        };
        drop(stream);

        self.engine.set_restarting(false);
        success
    }

    /// Sample rate of the running output stream.
    pub fn stream_sample_rate(&self) -> Option<u32> {
        self.stream().as_ref().map(|stream| stream.sample_rate())
    }

    /// true while an output stream is open.
    pub fn is_stream_running(&self) -> bool {
        self.engine.is_stream_running()
    }

    /// Close the output stream, kill all playheads, drop all pending requests, release the
    /// corpus and reset all parameters to their defaults.
    pub fn clear_and_kill_audio(&self) {
        let old_stream = self.stream().take();
        if let Some(mut old_stream) = old_stream {
            log::debug!("Closing output stream");
            old_stream.close();
        }
        self.engine.clear();
        log::info!("Cleared all playback state");
    }

    // ---------------------------------------------------------------------------------------------

    /// Request a new playhead at the given corpus point.
    ///
    /// Returns false when the request got rejected: when the output is missing, playback is
    /// paused, no stream is running, no or an empty corpus is set, the target point is not
    /// playable, or too many requests are still waiting for the render thread.
    pub fn request_create_playhead(&self, file: usize, timepoint: usize) -> bool {
        self.create_playhead(file, timepoint).is_some()
    }

    /// Same as [`request_create_playhead`](Self::request_create_playhead), but returns the
    /// id of the new playhead.
    pub fn create_playhead(&self, file: usize, timepoint: usize) -> Option<PlayheadId> {
        if self.engine.is_missing_output() {
            log::warn!("Can't create playhead: audio output is missing");
            return None;
        }
        if self.engine.is_user_paused() {
            log::warn!("Can't create playhead: playback is paused");
            return None;
        }
        if !self.engine.is_stream_running() {
            log::warn!("Can't create playhead: audio stream is not running");
            return None;
        }
        let Some(corpus) = self.engine.corpus().filter(|corpus| !corpus.is_empty()) else {
            log::warn!("Can't create playhead: no corpus loaded");
            return None;
        };
        if self.engine.pending_playhead_count() >= MAX_PENDING_PLAYHEADS {
            log::warn!("Can't create playhead: too many pending playhead requests");
            return None;
        }
        if file >= corpus.file_count() {
            log::error!("Can't create playhead: file index {} is out of range", file);
            return None;
        }
        if !corpus.is_loaded(file) {
            log::error!(
                "Can't create playhead: file '{}' is not loaded",
                corpus.file_name(file).unwrap_or_default()
            );
            return None;
        }
        let point = CorpusPoint::new(file, timepoint);
        if timepoint >= corpus.timepoint_count(file)
            || point.sample_index(corpus.hop_size()) >= corpus.sample_count(file)
        {
            log::warn!(
                "Can't create playhead: timepoint {} is out of range in file {}",
                timepoint,
                file
            );
            return None;
        }

        let id = self.engine.enqueue_playhead(&corpus, point);
        if id.is_none() {
            log::warn!("Can't create playhead: too many pending playhead requests");
        }
        id
    }

    /// Request removal of the given playhead. Unknown ids are ignored by the render thread.
    pub fn request_kill_playhead(&self, id: PlayheadId) -> bool {
        self.engine.enqueue_kill(id);
        true
    }

    /// Latest playhead positions, as published by the render thread.
    pub fn playhead_snapshot(&self) -> Vec<VisualPlayhead> {
        self.engine.visual_playheads()
    }

    /// Number of live playheads, as of the last render callback.
    pub fn active_playhead_count(&self) -> usize {
        self.engine.active_playhead_count()
    }

    // ---------------------------------------------------------------------------------------------

    /// The engine's atomic playback parameters.
    pub fn settings(&self) -> &PlaybackSettings {
        self.engine.settings()
    }

    /// A plain copy of all current playback parameters.
    pub fn settings_snapshot(&self) -> PlaybackSettingsSnapshot {
        self.engine.settings().snapshot()
    }

    /// Validate and apply all playback parameters at once.
    pub fn apply_settings(&self, settings: &PlaybackSettingsSnapshot) -> Result<(), Error> {
        settings.validate()?;
        self.engine.settings().apply(settings);
        Ok(())
    }

    pub fn set_loop_playheads(&self, enabled: bool) {
        self.engine.settings().set_loop_playheads(enabled);
    }

    pub fn set_same_file_jumps(&self, allowed: bool) {
        self.engine.settings().set_same_file_jumps(allowed);
    }

    /// Minimum distance in timepoints of jumps within the same file.
    pub fn set_same_file_min_time_diff(&self, timepoints: usize) {
        self.engine.settings().set_same_file_min_time_diff(timepoints);
    }

    /// Jump probability at each trigger point in permille.
    pub fn set_jump_chance(&self, permille: u32) {
        self.engine.settings().set_jump_chance(permille);
    }

    /// Crossfade length of jumps in samples.
    pub fn set_crossfade_length(&self, samples: usize) {
        self.engine.settings().set_crossfade_length(samples);
    }

    /// Maximum jump distance in the normalized search space in permille.
    pub fn set_max_jump_distance(&self, permille: u32) {
        self.engine.settings().set_max_jump_distance(permille);
    }

    pub fn set_max_jump_targets(&self, targets: usize) {
        self.engine.settings().set_max_jump_targets(targets);
    }

    /// Master volume in permille.
    pub fn set_volume(&self, permille: u32) {
        self.engine.settings().set_volume(permille);
    }

    pub fn set_dynamic_pan(&self, enabled: bool) {
        self.engine.settings().set_dynamic_pan(enabled);
    }

    pub fn set_dynamic_pan_dimension(&self, dimension: usize) {
        self.engine.settings().set_dynamic_pan_dimension(dimension);
    }

    /// Dynamic pan strength in permille.
    pub fn set_pan_strength(&self, permille: u32) {
        self.engine.settings().set_pan_strength(permille);
    }

    // ---------------------------------------------------------------------------------------------

    /// Current normalization bounds of the feature dimensions.
    pub fn dimension_bounds(&self) -> DimensionBounds {
        self.engine.bounds()
    }

    /// Set new normalization bounds and rebuild the spatial index with them.
    ///
    /// Bounds must only be changed while the stream is stopped: changing them while running
    /// gets logged as error, but is applied nevertheless.
    pub fn set_dimension_bounds(&self, bounds: DimensionBounds) -> Result<(), Error> {
        if self.engine.is_stream_running() {
            log::error!("Dimension bounds should not be changed while the audio stream is running");
        }
        let _rebuild = self.index_rebuild_lock();
        self.engine.set_bounds(bounds);
        let axes = self.engine.spatial_index().axes();
        self.rebuild_spatial_index(axes)
    }

    /// Current axis assignment of the spatial index.
    pub fn axes(&self) -> AxisAssignment {
        self.engine.spatial_index().axes()
    }

    /// Assign a feature dimension to the given axis, or unassign the axis with `None`, and
    /// rebuild the spatial index. The index is trained as soon as two axes are assigned.
    pub fn assign_axis(&self, axis: Axis, dimension: Option<usize>) -> Result<(), Error> {
        let _rebuild = self.index_rebuild_lock();
        let mut axes = self.engine.spatial_index().axes();
        axes.set(axis, dimension);
        self.rebuild_spatial_index(axes)
    }

    /// Swap in an externally built spatial index.
    pub fn set_spatial_index(&self, index: SpatialIndex) {
        let _rebuild = self.index_rebuild_lock();
        drop(self.engine.replace_spatial_index(index));
    }

    /// true when the spatial index is trained and jumps may happen.
    pub fn is_spatial_index_trained(&self) -> bool {
        self.engine.spatial_index().is_trained()
    }

    fn rebuild_spatial_index(&self, axes: AxisAssignment) -> Result<(), Error> {
        let corpus = self
            .engine
            .corpus()
            .ok_or_else(|| Error::CorpusError("No corpus loaded".to_string()))?;
        let bounds = self.engine.bounds();
        // build outside of the lock: the render thread skips jumps while the index is locked
        let index = SpatialIndex::build(&corpus, &bounds, axes)?;
        drop(self.engine.replace_spatial_index(index));
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------

    /// The corpus point nearest to the normalized search space position `query`, within
    /// `max_distance`. None when the index is untrained or no point is close enough.
    pub fn pick_nearest(&self, query: &[f64], max_distance: f64) -> Option<CorpusPoint> {
        self.engine
            .spatial_index()
            .nearest(query, max_distance)
            .map(|(point, _)| point)
    }

    /// A uniformly distributed random corpus point. None when the index is untrained.
    pub fn pick_random(&self) -> Option<CorpusPoint> {
        self.engine.spatial_index().random_point(&mut rand::rng())
    }

    // ---------------------------------------------------------------------------------------------

    /// Mark the output as missing, e.g. when the output device got disconnected. Blocks
    /// rendering and rejects playhead creation requests while set.
    pub fn set_missing_output(&self, missing: bool) {
        if missing {
            log::warn!("Audio output is missing");
        }
        self.engine.set_missing_output(missing);
    }

    pub fn is_missing_output(&self) -> bool {
        self.engine.is_missing_output()
    }

    /// Wait until the render thread observed the missing output flag. Returns immediately
    /// when no stream is running or the output is not missing. Returns false when the render
    /// thread did not confirm in time.
    pub fn wait_for_missing_output_confirm(&self) -> bool {
        if !self.engine.is_stream_running() || !self.engine.is_missing_output() {
            return true;
        }
        let request = self.engine.request_block_confirmation();
        let confirmed = self.wait_for_block_confirmation(request);
        if !confirmed {
            log::warn!("Render thread did not confirm the missing output");
        }
        confirmed
    }

    /// Pause or resume rendering. While paused, the output is silent, creation requests get
    /// rejected and kill requests apply immediately.
    pub fn set_user_paused(&self, paused: bool) {
        log::debug!("{} playback", if paused { "Pausing" } else { "Resuming" });
        self.engine.set_user_paused(paused);
    }

    pub fn is_user_paused(&self) -> bool {
        self.engine.is_user_paused()
    }

    fn wait_for_block_confirmation(&self, request: u64) -> bool {
        let start = Instant::now();
        while !self.engine.is_block_confirmed(request) {
            if start.elapsed() >= BLOCK_CONFIRMATION_TIMEOUT {
                return false;
            }
            thread::sleep(BLOCK_CONFIRMATION_POLL);
        }
        true
    }

    fn stream(&self) -> MutexGuard<'_, Option<Box<dyn OutputStream>>> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn index_rebuild_lock(&self) -> MutexGuard<'_, ()> {
        self.index_rebuild
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream().take() {
            stream.close();
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{engine::CHANNEL_COUNT, output::manual::ManualOutput};

    const HOP_SIZE: usize = 100;

    fn test_corpus() -> Arc<Corpus> {
        let mut corpus = Corpus::new(HOP_SIZE, vec!["x".into(), "y".into(), "z".into()]).unwrap();
        let features = |offset: f64| {
            (0..10)
                .map(|t| vec![t as f64, offset, t as f64 * 0.5])
                .collect::<Vec<_>>()
        };
        corpus.add_file("a", vec![0.5; 1000], features(0.0)).unwrap();
        corpus.add_file("b", vec![0.5; 1000], features(1.0)).unwrap();
        corpus.add_unloaded_file("c", features(2.0)).unwrap();
        Arc::new(corpus)
    }

    fn running_controller() -> (PlaybackController, ManualOutput) {
        let controller = PlaybackController::new();
        controller.set_corpus(test_corpus());
        let device = ManualOutput::new();
        assert!(controller.start_or_restart_audio_stream(StreamConfig::default(), &device));
        (controller, device)
    }

    fn render(controller: &PlaybackController) {
        let mut output = vec![0.0; 64 * CHANNEL_COUNT];
        controller.engine().process(&mut output);
    }

    #[test]
    fn backpressure() {
        let (controller, _device) = running_controller();
        for _ in 0..MAX_PENDING_PLAYHEADS {
            assert!(controller.request_create_playhead(0, 0));
        }
        assert!(!controller.request_create_playhead(0, 0));
        render(&controller);
        assert_eq!(controller.active_playhead_count(), MAX_PENDING_PLAYHEADS);
        assert_eq!(controller.create_playhead(1, 2), Some(MAX_PENDING_PLAYHEADS));
    }

    #[test]
    fn rejects_invalid_points() {
        let (controller, _device) = running_controller();
        // unloaded
        assert!(!controller.request_create_playhead(2, 0));
        // out of range
        assert!(!controller.request_create_playhead(3, 0));
        assert!(!controller.request_create_playhead(0, 10));
        // rejected requests don't consume ids
        assert_eq!(controller.create_playhead(0, 9), Some(0));
    }

    #[test]
    fn rejects_without_stream() {
        let controller = PlaybackController::new();
        controller.set_corpus(test_corpus());
        assert!(!controller.is_stream_running());
        assert!(!controller.request_create_playhead(0, 0));

        let controller = PlaybackController::new();
        let device = ManualOutput::new();
        assert!(controller.start_or_restart_audio_stream(StreamConfig::default(), &device));
        // no corpus
        assert!(!controller.request_create_playhead(0, 0));
    }

    #[test]
    fn missing_output() {
        let controller = PlaybackController::new();
        controller.set_corpus(test_corpus());
        assert!(!controller.start_or_restart_audio_stream(
            StreamConfig::default(),
            &ManualOutput::unavailable()
        ));
        assert!(controller.is_missing_output());
        assert!(!controller.is_stream_running());
        assert!(!controller.request_create_playhead(0, 0));

        // an invalid config fails the same way
        let device = ManualOutput::new();
        assert!(!controller
            .start_or_restart_audio_stream(StreamConfig::default().with_buffer_size(0), &device));
        assert!(!device.is_open());

        // recovers with a working device
        assert!(controller.start_or_restart_audio_stream(StreamConfig::default(), &device));
        assert!(!controller.is_missing_output());
        assert!(controller.request_create_playhead(0, 0));
    }

    #[test]
    fn missing_output_confirmation() {
        let (controller, _device) = running_controller();
        assert!(controller.wait_for_missing_output_confirm());

        controller.set_missing_output(true);
        let engine = controller.engine().clone();
        let render_thread = thread::spawn(move || {
            let mut output = vec![0.0; 64 * CHANNEL_COUNT];
            for _ in 0..500 {
                engine.process(&mut output);
                thread::sleep(Duration::from_millis(1));
            }
        });
        assert!(controller.wait_for_missing_output_confirm());
        render_thread.join().unwrap();
        assert!(!controller.request_create_playhead(0, 0));
    }

    #[test]
    fn paused() {
        let (controller, _device) = running_controller();
        let id = controller.create_playhead(0, 0).unwrap();
        render(&controller);
        controller.set_user_paused(true);
        assert!(!controller.request_create_playhead(0, 0));
        assert!(controller.request_kill_playhead(id));
        render(&controller);
        assert!(controller.playhead_snapshot().is_empty());
        controller.set_user_paused(false);
        assert!(controller.request_create_playhead(0, 0));
    }

    #[test]
    fn restart() {
        let (controller, device) = running_controller();
        assert!(controller.request_create_playhead(0, 0));
        render(&controller);
        assert!(controller.start_or_restart_audio_stream(
            StreamConfig::default().with_sample_rate(48000),
            &device
        ));
        assert!(device.is_open());
        assert_eq!(controller.stream_sample_rate(), Some(48000));
        // playheads survive restarts
        render(&controller);
        assert_eq!(controller.active_playhead_count(), 1);
    }

    #[test]
    fn clear_and_kill() {
        let (controller, device) = running_controller();
        controller.set_volume(1000);
        controller.set_loop_playheads(true);
        assert!(controller.request_create_playhead(0, 0));
        render(&controller);

        controller.clear_and_kill_audio();
        assert!(!device.is_open());
        assert!(!controller.is_stream_running());
        assert!(controller.corpus().is_none());
        assert!(controller.playhead_snapshot().is_empty());
        assert_eq!(
            controller.settings_snapshot(),
            PlaybackSettingsSnapshot::default()
        );
        assert!(!controller.request_create_playhead(0, 0));
    }

    #[test]
    fn settings() {
        let controller = PlaybackController::new();
        controller.set_jump_chance(2000);
        assert_eq!(controller.settings().jump_chance_permille(), 1000);
        controller.set_crossfade_length(0);
        assert_eq!(controller.settings().crossfade_length(), 1);

        let snapshot = PlaybackSettingsSnapshot {
            loop_playheads: true,
            volume: 250,
            ..Default::default()
        };
        assert!(controller.apply_settings(&snapshot).is_ok());
        assert_eq!(controller.settings_snapshot(), snapshot);

        let invalid = PlaybackSettingsSnapshot {
            volume: 2000,
            ..Default::default()
        };
        assert!(controller.apply_settings(&invalid).is_err());
        assert_eq!(controller.settings_snapshot(), snapshot);
    }

    #[test]
    fn axis_assignment() {
        let controller = PlaybackController::new();
        // no corpus
        assert!(controller.assign_axis(Axis::X, Some(0)).is_err());

        controller.set_corpus(test_corpus());
        assert!(controller.assign_axis(Axis::X, Some(0)).is_ok());
        assert!(!controller.is_spatial_index_trained());
        assert!(controller.pick_random().is_none());
        assert!(controller.assign_axis(Axis::Y, Some(1)).is_ok());
        assert!(controller.is_spatial_index_trained());
        assert_eq!(controller.engine().spatial_index().dimensions(), 2);
        assert!(controller.assign_axis(Axis::Z, Some(2)).is_ok());
        assert_eq!(controller.engine().spatial_index().dimensions(), 3);
        assert!(controller.assign_axis(Axis::Z, Some(3)).is_err());
        assert_eq!(controller.axes().get(Axis::Z), Some(2));
        assert!(controller.assign_axis(Axis::Z, None).is_ok());

        // x: 0..=9 over timepoints, y: 0..=2 over files
        assert_eq!(
            controller.pick_nearest(&[1.0, 0.5], 0.1),
            Some(CorpusPoint::new(1, 9))
        );
        assert_eq!(controller.pick_nearest(&[0.5, 2.0], 0.1), None);
        assert!(controller.pick_random().is_some());
    }

    #[test]
    fn concurrent_axis_assignment() {
        let controller = PlaybackController::new();
        controller.set_corpus(test_corpus());
        thread::scope(|scope| {
            for (axis, dimension) in [(Axis::X, 0), (Axis::Y, 1), (Axis::Z, 2)] {
                let controller = &controller;
                scope.spawn(move || {
                    for _ in 0..20 {
                        controller.assign_axis(axis, None).unwrap();
                        controller.assign_axis(axis, Some(dimension)).unwrap();
                    }
                });
            }
        });
        // no assignment got lost
        assert_eq!(controller.axes(), AxisAssignment::new(Some(0), Some(1), Some(2)));
        assert_eq!(controller.engine().spatial_index().dimensions(), 3);
    }

    #[test]
    fn new_corpus_rebuilds_index() {
        let controller = PlaybackController::new();
        controller.set_corpus(test_corpus());
        controller.assign_axis(Axis::X, Some(0)).unwrap();
        controller.assign_axis(Axis::Y, Some(1)).unwrap();
        assert_eq!(controller.engine().spatial_index().point_count(), 30);

        let mut corpus = Corpus::new(HOP_SIZE, vec!["x".into(), "y".into()]).unwrap();
        corpus
            .add_file("d", vec![0.5; 500], vec![vec![0.0, 0.0], vec![4.0, 2.0]])
            .unwrap();
        let corpus = Arc::new(corpus);
        controller.set_corpus(Arc::clone(&corpus));
        assert!(controller
            .corpus()
            .is_some_and(|current| Arc::ptr_eq(&current, &corpus)));
        assert_eq!(controller.dimension_bounds().max(0), Some(4.0));
        // axes are kept and the index covers the new corpus only
        assert!(controller.is_spatial_index_trained());
        assert_eq!(controller.engine().spatial_index().point_count(), 2);
        assert_eq!(
            controller.pick_nearest(&[1.0, 1.0], 0.01),
            Some(CorpusPoint::new(0, 1))
        );

        // axes out of range for the new corpus reset the index
        controller.set_corpus(test_corpus());
        controller.assign_axis(Axis::Z, Some(2)).unwrap();
        controller.set_corpus(corpus);
        assert!(!controller.is_spatial_index_trained());
    }

    #[test]
    fn bounds_rebuild_index() {
        let controller = PlaybackController::new();
        controller.set_corpus(test_corpus());
        assert_eq!(controller.dimension_bounds().max(0), Some(9.0));
        controller.assign_axis(Axis::X, Some(0)).unwrap();
        controller.assign_axis(Axis::Y, Some(1)).unwrap();
        assert_eq!(
            controller.pick_nearest(&[1.0, 0.0], 0.01),
            Some(CorpusPoint::new(0, 9))
        );
        controller
            .set_dimension_bounds(DimensionBounds::new(
                vec![0.0, 0.0, 0.0],
                vec![18.0, 2.0, 9.0],
            ))
            .unwrap();
        assert_eq!(
            controller.pick_nearest(&[0.5, 0.0], 0.01),
            Some(CorpusPoint::new(0, 9))
        );
    }
}
