use std::collections::VecDeque;

use crate::corpus::{Corpus, CorpusPoint};

// -------------------------------------------------------------------------------------------------

/// Unique id of a playhead, assigned by the controller.
pub type PlayheadId = usize;

// -------------------------------------------------------------------------------------------------

/// State of a running crossfade from a playhead's current position to a jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossfade {
    /// File of the jump target.
    pub jump_file_index: usize,
    /// Read position in the jump target's file. Advances with the crossfade.
    pub jump_sample_index: usize,
    /// Number of already rendered crossfade samples.
    pub current_sample: usize,
    /// Total crossfade length in samples.
    pub length: usize,
}

impl Crossfade {
    pub fn new(target: CorpusPoint, hop_size: usize, length: usize) -> Self {
        debug_assert!(length > 0, "Invalid crossfade length");
        Self {
            jump_file_index: target.file,
            jump_sample_index: target.sample_index(hop_size),
            current_sample: 0,
            length,
        }
    }

    /// Crossfade progress of the given sample offset from the current sample, in range
    /// `0.0..=1.0`.
    #[inline]
    pub fn progress(&self, offset: usize) -> f32 {
        (self.current_sample + offset) as f32 / self.length as f32
    }

    /// Number of samples left to render.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.length.saturating_sub(self.current_sample)
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.current_sample >= self.length
    }
}

// -------------------------------------------------------------------------------------------------

/// A read cursor into the corpus' audio, moving forward through a file and jumping to nearby
/// points in feature space at trigger points.
///
/// Playheads are created by the controller and then exclusively owned by the render thread.
#[derive(Debug, Clone)]
pub struct Playhead {
    pub(crate) id: PlayheadId,
    pub(crate) file_index: usize,
    pub(crate) sample_index: usize,
    pub(crate) crossfade: Option<Crossfade>,
    pub(crate) trigger_points: VecDeque<usize>,
}

impl Playhead {
    /// Create a new playhead at the given corpus point and calculate its trigger points.
    ///
    /// The trigger point queue gets preallocated for the longest file in the corpus, so
    /// recalculating trigger points in the render thread never needs to reallocate.
    pub fn new(id: PlayheadId, corpus: &Corpus, point: CorpusPoint) -> Self {
        let mut playhead = Self {
            id,
            file_index: point.file,
            sample_index: point.sample_index(corpus.hop_size()),
            crossfade: None,
            trigger_points: VecDeque::with_capacity(corpus.max_trigger_point_count()),
        };
        playhead.reset_trigger_points(corpus);
        playhead
    }

    #[inline]
    pub fn id(&self) -> PlayheadId {
        self.id
    }

    #[inline]
    pub fn file_index(&self) -> usize {
        self.file_index
    }

    #[inline]
    pub fn sample_index(&self) -> usize {
        self.sample_index
    }

    /// The playhead's current analysis timepoint.
    #[inline]
    pub fn point(&self, hop_size: usize) -> CorpusPoint {
        CorpusPoint::new(self.file_index, self.sample_index / hop_size)
    }

    #[inline]
    pub fn is_crossfading(&self) -> bool {
        self.crossfade.is_some()
    }

    pub fn crossfade(&self) -> Option<&Crossfade> {
        self.crossfade.as_ref()
    }

    /// Pending trigger points, in ascending order.
    pub fn trigger_points(&self) -> &VecDeque<usize> {
        &self.trigger_points
    }

    #[inline]
    pub fn next_trigger_point(&self) -> Option<usize> {
        self.trigger_points.front().copied()
    }

    /// Remove all trigger points which the playhead already reached.
    #[inline]
    pub fn pop_passed_trigger_points(&mut self) {
        while self
            .trigger_points
            .front()
            .is_some_and(|trigger| self.sample_index >= *trigger)
        {
            self.trigger_points.pop_front();
        }
    }

    /// Recalculate trigger points from the playhead's current file and position.
    #[inline]
    pub fn reset_trigger_points(&mut self, corpus: &Corpus) {
        calculate_trigger_points(
            &mut self.trigger_points,
            self.sample_index,
            corpus.sample_count(self.file_index),
            corpus.hop_size(),
        );
    }

    /// Move the playhead to the start of its file, recalculating trigger points.
    pub fn rewind(&mut self, corpus: &Corpus) {
        self.sample_index = 0;
        self.reset_trigger_points(corpus);
    }

    /// Start a crossfade to the given jump target.
    pub fn start_crossfade(&mut self, target: CorpusPoint, hop_size: usize, length: usize) {
        self.crossfade = Some(Crossfade::new(target, hop_size, length));
    }

    /// Advance the playhead and a running crossfade by the given number of samples. When the
    /// crossfade finishes, the playhead lands on the jump target and trigger points are
    /// recalculated. Returns true when the crossfade finished.
    pub fn advance_crossfade(&mut self, corpus: &Corpus, sample_count: usize) -> bool {
        let Some(crossfade) = self.crossfade.as_mut() else {
            return false;
        };
        crossfade.current_sample += sample_count;
        crossfade.jump_sample_index += sample_count;
        self.sample_index += sample_count;
        if crossfade.is_finished() {
            self.file_index = crossfade.jump_file_index;
            self.sample_index = crossfade.jump_sample_index;
            self.crossfade = None;
            self.reset_trigger_points(corpus);
            true
        } else {
            false
        }
    }

    /// Read only snapshot of the playhead for the UI.
    pub fn visual(&self) -> VisualPlayhead {
        VisualPlayhead {
            id: self.id,
            file_index: self.file_index,
            sample_index: self.sample_index,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Snapshot of a playhead's position, published by the render thread for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualPlayhead {
    pub id: PlayheadId,
    pub file_index: usize,
    pub sample_index: usize,
}

// -------------------------------------------------------------------------------------------------

/// Fill `trigger_points` with all multiples of `hop_size` after `sample_index` within a
/// file of `sample_count` samples, followed by the file's last sample index as end marker.
///
/// Does not allocate when `trigger_points` has a capacity of at least
/// `sample_count / hop_size + 1` entries.
pub fn calculate_trigger_points(
    trigger_points: &mut VecDeque<usize>,
    sample_index: usize,
    sample_count: usize,
    hop_size: usize,
) {
    debug_assert!(hop_size > 0, "Invalid hop size");
    trigger_points.clear();
    if sample_count == 0 {
        return;
    }
    let first_trigger = (sample_index / hop_size + 1) * hop_size;
    trigger_points.extend((first_trigger..sample_count).step_by(hop_size));
    trigger_points.push_back(sample_count - 1);
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_corpus() -> Corpus {
        let mut corpus = Corpus::new(500, vec!["x".into()]).unwrap();
        corpus
            .add_file("0", vec![0.0; 10000], vec![vec![0.0]; 20])
            .unwrap();
        corpus
            .add_file("1", vec![0.0; 1234], vec![vec![0.0]; 3])
            .unwrap();
        corpus
    }

    #[test]
    fn trigger_points() {
        let mut trigger_points = VecDeque::new();
        calculate_trigger_points(&mut trigger_points, 0, 10000, 500);
        let expected = (1..20).map(|i| i * 500).chain([9999]).collect::<Vec<_>>();
        assert_eq!(trigger_points.iter().copied().collect::<Vec<_>>(), expected);

        calculate_trigger_points(&mut trigger_points, 1000, 10000, 500);
        assert_eq!(trigger_points.front(), Some(&1500));
        assert_eq!(trigger_points.len(), 18);

        calculate_trigger_points(&mut trigger_points, 1001, 1234, 500);
        assert_eq!(trigger_points.iter().copied().collect::<Vec<_>>(), vec![1233]);

        calculate_trigger_points(&mut trigger_points, 0, 0, 500);
        assert!(trigger_points.is_empty());
    }

    #[test]
    fn trigger_points_are_sorted() {
        let mut trigger_points = VecDeque::new();
        for (sample_index, sample_count, hop_size) in
            [(0, 1000, 100), (37, 1001, 100), (999, 1000, 7), (250, 4096, 512)]
        {
            calculate_trigger_points(&mut trigger_points, sample_index, sample_count, hop_size);
            assert!(trigger_points.iter().zip(trigger_points.iter().skip(1)).all(|(a, b)| a <= b));
            assert!(*trigger_points.front().unwrap() >= sample_index);
            assert_eq!(*trigger_points.back().unwrap(), sample_count - 1);
        }
    }

    #[test]
    fn trigger_points_do_not_reallocate() {
        let corpus = test_corpus();
        let mut playhead = Playhead::new(1, &corpus, CorpusPoint::new(1, 1));
        let capacity = playhead.trigger_points.capacity();
        playhead.file_index = 0;
        playhead.rewind(&corpus);
        assert_eq!(playhead.trigger_points.len(), 20);
        assert_eq!(playhead.trigger_points.capacity(), capacity);
    }

    #[test]
    fn playhead_state() {
        let corpus = test_corpus();
        let mut playhead = Playhead::new(7, &corpus, CorpusPoint::new(0, 2));
        assert_eq!(playhead.id(), 7);
        assert_eq!(playhead.sample_index(), 1000);
        assert_eq!(playhead.next_trigger_point(), Some(1500));
        assert_eq!(playhead.point(corpus.hop_size()), CorpusPoint::new(0, 2));
        assert!(!playhead.is_crossfading());

        playhead.sample_index = 2000;
        playhead.pop_passed_trigger_points();
        assert_eq!(playhead.next_trigger_point(), Some(2500));

        playhead.rewind(&corpus);
        assert_eq!(playhead.sample_index(), 0);
        assert_eq!(playhead.next_trigger_point(), Some(500));
        assert_eq!(
            playhead.visual(),
            VisualPlayhead {
                id: 7,
                file_index: 0,
                sample_index: 0
            }
        );
    }

    #[test]
    fn crossfade_landing() {
        let corpus = test_corpus();
        let mut playhead = Playhead::new(1, &corpus, CorpusPoint::new(0, 4));
        playhead.start_crossfade(CorpusPoint::new(1, 1), corpus.hop_size(), 100);
        assert!(playhead.is_crossfading());
        assert_eq!(playhead.crossfade().unwrap().jump_sample_index, 500);

        assert!(!playhead.advance_crossfade(&corpus, 60));
        assert_eq!(playhead.sample_index(), 2060);
        let crossfade = *playhead.crossfade().unwrap();
        assert_eq!(crossfade.remaining(), 40);
        assert!((crossfade.progress(0) - 0.6).abs() < 1e-6);

        assert!(playhead.advance_crossfade(&corpus, 40));
        assert!(!playhead.is_crossfading());
        assert_eq!(playhead.file_index(), 1);
        assert_eq!(playhead.sample_index(), 600);
        assert_eq!(
            playhead.trigger_points().iter().copied().collect::<Vec<_>>(),
            vec![1000, 1233]
        );
    }
}
