//! Per playhead segment rendering, crossfades and jump attempts.

use std::sync::Mutex;

use rand::{rngs::SmallRng, Rng};

use crate::{
    bounds::DimensionBounds,
    corpus::Corpus,
    picker::{JumpRules, JumpTargetSelector},
    playhead::Playhead,
    spatial::SpatialIndex,
    utils::{equal_power_gains, panning_gains},
};

use super::CHANNEL_COUNT;

// -------------------------------------------------------------------------------------------------

/// Dynamic pan parameters of a single render pass.
#[derive(Debug, Clone, Copy)]
pub(super) struct DynamicPan<'a> {
    pub dimension: usize,
    pub strength: f32,
    pub bounds: &'a DimensionBounds,
}

impl DynamicPan<'_> {
    /// Normalized pan position of the given file at the given sample position.
    #[inline]
    fn position(&self, corpus: &Corpus, file: usize, sample_index: usize) -> f32 {
        match corpus.feature_at_sample(file, sample_index, self.dimension) {
            Some(value) => self.bounds.normalize(self.dimension, value) as f32,
            None => 0.5,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Everything a playhead needs to render a single output buffer.
pub(super) struct RenderContext<'a> {
    pub corpus: &'a Corpus,
    pub spatial_index: &'a Mutex<SpatialIndex>,
    pub loop_playheads: bool,
    pub jump_chance: f64,
    pub crossfade_length: usize,
    pub max_jump_distance: f64,
    pub max_jump_targets: usize,
    pub same_file_jumps: bool,
    pub same_file_min_time_diff: usize,
    pub dynamic_pan: Option<DynamicPan<'a>>,
}

impl RenderContext<'_> {
    fn jump_rules(&self) -> JumpRules {
        JumpRules {
            max_distance: self.max_jump_distance,
            max_targets: self.max_jump_targets,
            same_file_allowed: self.same_file_jumps,
            min_same_file_time_diff: self.same_file_min_time_diff,
            required_trailing_samples: self.crossfade_length,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Result of rendering a playhead into a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PlayheadState {
    Playing,
    /// Reached the end of its file without looping: must be faded out and removed.
    Finished,
}

/// Render the given playhead into the interleaved stereo `output` buffer, which is expected
/// to be cleared. Jumps to nearby corpus points at trigger points, when the jump rules and
/// chance allow it.
pub(super) fn render_playhead(
    playhead: &mut Playhead,
    output: &mut [f32],
    context: &RenderContext,
    selector: &mut JumpTargetSelector,
    rng: &mut SmallRng,
) -> PlayheadState {
    let corpus = context.corpus;
    let frame_count = output.len() / CHANNEL_COUNT;
    let mut position = 0;

    loop {
        // continue a running crossfade
        if let Some(crossfade) = playhead.crossfade {
            let frames = crossfade.remaining().min(frame_count - position);
            let source_a = corpus.samples(playhead.file_index);
            let source_b = corpus.samples(crossfade.jump_file_index);
            let pan = context.dynamic_pan.map(|pan| {
                (
                    pan.position(corpus, playhead.file_index, playhead.sample_index),
                    pan.position(corpus, crossfade.jump_file_index, crossfade.jump_sample_index),
                    pan.strength,
                )
            });
            let frames_out = output[position * CHANNEL_COUNT..(position + frames) * CHANNEL_COUNT]
                .chunks_exact_mut(CHANNEL_COUNT);
            for (i, frame) in frames_out.enumerate() {
                let progress = crossfade.progress(i);
                let (gain_a, gain_b) = equal_power_gains(progress);
                let sample_a = source_a
                    .get(playhead.sample_index + i)
                    .copied()
                    .unwrap_or_default();
                let sample_b = source_b
                    .get(crossfade.jump_sample_index + i)
                    .copied()
                    .unwrap_or_default();
                let sample = sample_a * gain_a + sample_b * gain_b;
                let (gain_l, gain_r) = match pan {
                    Some((start, end, strength)) => {
                        panning_gains(start + (end - start) * progress, strength)
                    }
                    None => (1.0, 1.0),
                };
                frame[0] = sample * gain_l;
                frame[1] = sample * gain_r;
            }
            position += frames;
            if !playhead.advance_crossfade(corpus, frames) {
                return PlayheadState::Playing;
            }
        }

        playhead.pop_passed_trigger_points();

        // end of file: loop or finish
        let next_trigger = match playhead.next_trigger_point() {
            Some(trigger) => trigger,
            None => {
                if !context.loop_playheads {
                    return PlayheadState::Finished;
                }
                playhead.rewind(corpus);
                match playhead.next_trigger_point() {
                    Some(trigger) if trigger > playhead.sample_index => trigger,
                    _ => return PlayheadState::Finished,
                }
            }
        };

        // no more space in the buffer before the next trigger
        let remaining_frames = frame_count - position;
        let segment_length = next_trigger - playhead.sample_index;
        if remaining_frames < segment_length {
            fill_segment(playhead, output, position, remaining_frames, context);
            return PlayheadState::Playing;
        }

        // fill up to the next trigger
        fill_segment(playhead, output, position, segment_length, context);
        position += segment_length;

        // reached a trigger: try jumping
        try_jump(playhead, context, selector, rng);
    }
}

/// Copy `frame_count` samples from the playhead's position into `output`, starting at
/// frame `position`, and advance the playhead.
fn fill_segment(
    playhead: &mut Playhead,
    output: &mut [f32],
    position: usize,
    frame_count: usize,
    context: &RenderContext,
) {
    let corpus = context.corpus;
    let (gain_l, gain_r) = match context.dynamic_pan {
        Some(pan) => panning_gains(
            pan.position(corpus, playhead.file_index, playhead.sample_index),
            pan.strength,
        ),
        None => (1.0, 1.0),
    };
    let source = corpus.samples(playhead.file_index);
    let source_start = playhead.sample_index.min(source.len());
    let source_end = (playhead.sample_index + frame_count).min(source.len());
    let frames_out = output[position * CHANNEL_COUNT..(position + frame_count) * CHANNEL_COUNT]
        .chunks_exact_mut(CHANNEL_COUNT);
    for (frame, sample) in frames_out.zip(&source[source_start..source_end]) {
        frame[0] = sample * gain_l;
        frame[1] = sample * gain_r;
    }
    playhead.sample_index += frame_count;
}

/// Evaluate a jump at the playhead's current trigger point and start a crossfade to the
/// nearest eligible target, if any.
fn try_jump(
    playhead: &mut Playhead,
    context: &RenderContext,
    selector: &mut JumpTargetSelector,
    rng: &mut SmallRng,
) {
    let corpus = context.corpus;
    if playhead.sample_index + context.crossfade_length >= corpus.sample_count(playhead.file_index)
    {
        return;
    }
    if rng.random::<f64>() >= context.jump_chance {
        return;
    }
    // a rebuild or pick in progress skips the jump
    let Ok(index) = context.spatial_index.try_lock() else {
        return;
    };
    let current = playhead.point(corpus.hop_size());
    let Some(query) = index.position(current) else {
        return;
    };
    let rules = context.jump_rules();
    let Some(target) = selector.select_target(&index, corpus, query, current, &rules) else {
        return;
    };
    if !corpus.is_loaded(target.file) {
        return;
    }
    playhead.start_crossfade(target, corpus.hop_size(), context.crossfade_length);
}
