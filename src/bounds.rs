use crate::{corpus::Corpus, utils::normalize_clamped};

// -------------------------------------------------------------------------------------------------

/// Per feature dimension value ranges of a corpus, used to map raw feature values into a
/// normalized `0.0..=1.0` range for the spatial index and for dynamic panning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionBounds {
    min: Vec<f64>, // [dimension]
    max: Vec<f64>, // [dimension]
}

impl DimensionBounds {
    /// Create bounds from explicit per dimension min and max values.
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Self {
        assert_eq!(min.len(), max.len(), "min and max must have equal lengths");
        Self { min, max }
    }

    /// Calculate bounds over all timepoints of all files in the corpus.
    pub fn from_corpus(corpus: &Corpus) -> Self {
        let dimension_count = corpus.dimension_count();
        let mut min = vec![f64::MAX; dimension_count];
        let mut max = vec![f64::MIN; dimension_count];
        for file in 0..corpus.file_count() {
            for features in corpus.features(file) {
                for (dimension, value) in features.iter().enumerate() {
                    min[dimension] = min[dimension].min(*value);
                    max[dimension] = max[dimension].max(*value);
                }
            }
        }
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_empty()
    }

    pub fn dimension_count(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self, dimension: usize) -> Option<f64> {
        self.min.get(dimension).copied()
    }

    pub fn max(&self, dimension: usize) -> Option<f64> {
        self.max.get(dimension).copied()
    }

    /// Map the given raw feature value into range `0.0..=1.0`, clamping values outside of the
    /// dimension's bounds. Unknown dimensions map to the center 0.5.
    pub fn normalize(&self, dimension: usize, value: f64) -> f64 {
        match (self.min(dimension), self.max(dimension)) {
            (Some(min), Some(max)) => normalize_clamped(value, min, max),
            _ => 0.5,
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_bounds() {
        let mut corpus = Corpus::new(10, vec!["a".into(), "b".into()]).unwrap();
        corpus
            .add_file("1", vec![0.0; 20], vec![vec![1.0, -2.0], vec![3.0, 5.0]])
            .unwrap();
        corpus
            .add_unloaded_file("2", vec![vec![-1.0, 0.0]])
            .unwrap();

        let bounds = DimensionBounds::from_corpus(&corpus);
        assert_eq!(bounds.dimension_count(), 2);
        assert_eq!(bounds.min(0), Some(-1.0));
        assert_eq!(bounds.max(0), Some(3.0));
        assert_eq!(bounds.min(1), Some(-2.0));
        assert_eq!(bounds.max(1), Some(5.0));

        assert_eq!(bounds.normalize(0, 1.0), 0.5);
        assert_eq!(bounds.normalize(0, 10.0), 1.0);
        assert_eq!(bounds.normalize(1, -2.0), 0.0);
        assert_eq!(bounds.normalize(7, 1.0), 0.5);
    }

    #[test]
    fn empty_bounds() {
        let bounds = DimensionBounds::default();
        assert!(bounds.is_empty());
        assert_eq!(bounds.normalize(0, 1.0), 0.5);
    }
}
