use crate::{
    corpus::{Corpus, CorpusPoint},
    spatial::{Neighbor, SpatialIndex},
};

// -------------------------------------------------------------------------------------------------

/// Rules which decide if a corpus point is a valid jump target for a playhead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpRules {
    /// Maximum normalized search space distance of a target. Values <= 0 disable jumps.
    pub max_distance: f64,
    /// Maximum number of nearest neighbors that get considered.
    pub max_targets: usize,
    /// Allow jumps within the playhead's current file.
    pub same_file_allowed: bool,
    /// Minimum distance in timepoints of a target within the same file.
    pub min_same_file_time_diff: usize,
    /// Number of samples a target's file needs to have left after the target's timepoint.
    pub required_trailing_samples: usize,
}

impl JumpRules {
    /// true when `candidate` is a valid jump target for a playhead at `current`.
    pub fn is_eligible(&self, corpus: &Corpus, current: CorpusPoint, candidate: CorpusPoint) -> bool {
        let same_file = candidate.file == current.file;
        if same_file {
            if !self.same_file_allowed {
                return false;
            }
            if candidate.timepoint.abs_diff(current.timepoint) < self.min_same_file_time_diff {
                return false;
            }
        }
        let remaining_samples = corpus
            .sample_count(candidate.file)
            .saturating_sub(candidate.sample_index(corpus.hop_size()));
        remaining_samples >= self.required_trailing_samples
    }
}

// -------------------------------------------------------------------------------------------------

/// Picks jump targets for playheads from a [`SpatialIndex`].
///
/// Holds a preallocated neighbor buffer, so selecting targets does not allocate on the audio
/// thread as long as the requested target count does not exceed the initial capacity.
#[derive(Debug, Clone)]
pub struct JumpTargetSelector {
    neighbors: Vec<Neighbor>,
}

impl JumpTargetSelector {
    pub fn new(max_targets: usize) -> Self {
        Self {
            neighbors: Vec::with_capacity(max_targets),
        }
    }

    /// Candidates of the last [`select_target`](Self::select_target) call, sorted by distance.
    pub fn candidates(&self) -> &[Neighbor] {
        &self.neighbors
    }

    /// Select the nearest eligible jump target around the normalized `query` position for a
    /// playhead currently at `current`. Returns `None` when no candidate within the rules'
    /// distance and target count passes the rules' eligibility checks.
    pub fn select_target(
        &mut self,
        index: &SpatialIndex,
        corpus: &Corpus,
        query: &[f64],
        current: CorpusPoint,
        rules: &JumpRules,
    ) -> Option<CorpusPoint> {
        if rules.max_distance <= 0.0 || rules.max_targets == 0 || !index.is_trained() {
            self.neighbors.clear();
            return None;
        }
        index.k_nearest(query, rules.max_targets, rules.max_distance, &mut self.neighbors);
        self.neighbors
            .iter()
            .filter_map(|neighbor| index.point(neighbor.id))
            .find(|candidate| rules.is_eligible(corpus, current, *candidate))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        bounds::DimensionBounds,
        spatial::{AxisAssignment, SpatialIndex},
    };

    const HOP_SIZE: usize = 100;
    const CURRENT: CorpusPoint = CorpusPoint {
        file: 0,
        timepoint: 10,
    };

    // Feature space in range 0..=10. All points are far away from the current point, except:
    // file 0 timepoint 10 (the current point), 14 (same file, 4 timepoints away), 16 (same
    // file, 6 timepoints away) and file 1 timepoint 3, which is the farthest of them.
    fn test_setup() -> (Corpus, SpatialIndex) {
        let mut corpus = Corpus::new(HOP_SIZE, vec!["x".into(), "y".into()]).unwrap();
        let mut file0 = vec![vec![10.0, 10.0]; 20];
        file0[0] = vec![0.0, 0.0];
        file0[10] = vec![5.0, 5.0];
        file0[14] = vec![5.0, 5.1];
        file0[16] = vec![5.0, 5.2];
        let mut file1 = vec![vec![10.0, 10.0]; 20];
        file1[3] = vec![5.0, 5.3];
        corpus.add_file("0", vec![0.0; 2000], file0).unwrap();
        corpus.add_file("1", vec![0.0; 2000], file1).unwrap();

        let bounds = DimensionBounds::from_corpus(&corpus);
        let index =
            SpatialIndex::build(&corpus, &bounds, AxisAssignment::new(Some(0), Some(1), None))
                .unwrap();
        (corpus, index)
    }

    fn default_rules() -> JumpRules {
        JumpRules {
            max_distance: 0.05,
            max_targets: 10,
            same_file_allowed: false,
            min_same_file_time_diff: 5,
            required_trailing_samples: 256,
        }
    }

    fn select(rules: JumpRules) -> Option<CorpusPoint> {
        let (corpus, index) = test_setup();
        let query = index.position(CURRENT).unwrap().to_vec();
        let mut selector = JumpTargetSelector::new(rules.max_targets);
        selector.select_target(&index, &corpus, &query, CURRENT, &rules)
    }

    #[test]
    fn same_file_disallowed() {
        assert_eq!(select(default_rules()), Some(CorpusPoint::new(1, 3)));
    }

    #[test]
    fn same_file_min_time_diff() {
        let rules = JumpRules {
            same_file_allowed: true,
            ..default_rules()
        };
        assert_eq!(select(rules), Some(CorpusPoint::new(0, 16)));

        let rules = JumpRules {
            min_same_file_time_diff: 4,
            ..rules
        };
        assert_eq!(select(rules), Some(CorpusPoint::new(0, 14)));
    }

    #[test]
    fn trailing_samples() {
        // file 0 timepoint 16 only has 400 samples left
        let rules = JumpRules {
            same_file_allowed: true,
            required_trailing_samples: 500,
            ..default_rules()
        };
        assert_eq!(select(rules), Some(CorpusPoint::new(1, 3)));
    }

    #[test]
    fn search_limits() {
        // only the current point and its ineligible neighbor get considered
        let rules = JumpRules {
            same_file_allowed: true,
            max_targets: 2,
            ..default_rules()
        };
        assert_eq!(select(rules), None);

        let rules = JumpRules {
            max_distance: 0.015,
            ..default_rules()
        };
        assert_eq!(select(rules), None);

        let rules = JumpRules {
            max_distance: 0.0,
            ..default_rules()
        };
        assert_eq!(select(rules), None);
    }

    #[test]
    fn candidates_by_distance() {
        let (corpus, index) = test_setup();
        let query = index.position(CURRENT).unwrap().to_vec();
        let rules = default_rules();
        let mut selector = JumpTargetSelector::new(rules.max_targets);
        let target = selector.select_target(&index, &corpus, &query, CURRENT, &rules);
        assert_eq!(target, Some(CorpusPoint::new(1, 3)));

        // current point, both same file neighbors, then the target
        let candidates = selector.candidates();
        assert_eq!(candidates.len(), 4);
        assert_eq!(index.point(candidates[0].id), Some(CURRENT));
        assert_eq!(candidates[0].distance, 0.0);
        assert!(candidates
            .iter()
            .zip(candidates.iter().skip(1))
            .all(|(a, b)| a.distance <= b.distance));
        assert_eq!(index.point(candidates[3].id), Some(CorpusPoint::new(1, 3)));

        // disabled searches leave no candidates behind
        let rules = JumpRules {
            max_distance: 0.0,
            ..default_rules()
        };
        assert_eq!(
            selector.select_target(&index, &corpus, &query, CURRENT, &rules),
            None
        );
        assert!(selector.candidates().is_empty());
    }

    #[test]
    fn eligibility() {
        let (corpus, _) = test_setup();
        let rules = JumpRules {
            same_file_allowed: true,
            ..default_rules()
        };
        assert!(!rules.is_eligible(&corpus, CURRENT, CURRENT));
        assert!(!rules.is_eligible(&corpus, CURRENT, CorpusPoint::new(0, 6)));
        assert!(rules.is_eligible(&corpus, CURRENT, CorpusPoint::new(0, 5)));
        assert!(rules.is_eligible(&corpus, CURRENT, CorpusPoint::new(1, 10)));
        // 100 samples left in file 1 at timepoint 19
        assert!(!rules.is_eligible(&corpus, CURRENT, CorpusPoint::new(1, 19)));
        // unknown files have no samples
        assert!(!rules.is_eligible(&corpus, CURRENT, CorpusPoint::new(7, 0)));
    }
}
