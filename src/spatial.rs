//! Nearest neighbor search over corpus points, projected into 2 or 3 feature dimensions.

use rand::Rng;

use crate::{
    bounds::DimensionBounds,
    corpus::{Corpus, CorpusPoint},
    error::Error,
};

mod kdtree;
use kdtree::KdTree;

pub use kdtree::Neighbor;

// -------------------------------------------------------------------------------------------------

/// Display and search axis to which a feature dimension can be assigned.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
    strum::EnumCount,
)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

// -------------------------------------------------------------------------------------------------

/// Feature dimension assignments of the X, Y and Z axes. Unassigned axes are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisAssignment {
    dimensions: [Option<usize>; 3],
}

impl AxisAssignment {
    pub fn new(x: Option<usize>, y: Option<usize>, z: Option<usize>) -> Self {
        Self {
            dimensions: [x, y, z],
        }
    }

    pub fn get(&self, axis: Axis) -> Option<usize> {
        self.dimensions[axis as usize]
    }

    pub fn set(&mut self, axis: Axis, dimension: Option<usize>) {
        self.dimensions[axis as usize] = dimension;
    }

    /// Number of axes which have a dimension assigned.
    pub fn assigned_count(&self) -> usize {
        self.dimensions.iter().filter(|d| d.is_some()).count()
    }

    /// Assigned feature dimensions in X, Y, Z order, skipping unassigned axes.
    pub fn active_dimensions(&self) -> impl Iterator<Item = usize> + '_ {
        self.dimensions.iter().filter_map(|d| *d)
    }
}

// -------------------------------------------------------------------------------------------------

/// Spatial index over all corpus timepoints.
///
/// Points get projected into the feature dimensions of the assigned axes and normalized into
/// the range `0.0..=1.0` via the corpus' [`DimensionBounds`]. An index with fewer than two
/// assigned axes is untrained: it still resolves point ids, but all queries return nothing.
///
/// Indices are immutable once built. Reassigning axes builds a new index, which then gets
/// swapped in by the controller.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    axes: AxisAssignment,
    tree: Option<KdTree>,
    file_offsets: Vec<usize>, // [file] -> id of the file's first point
    file_lookup: Vec<usize>,  // [point id] -> file
    time_lookup: Vec<usize>,  // [point id] -> timepoint
}

impl SpatialIndex {
    /// Create a new, empty and untrained index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a new index for the given corpus and axis assignment.
    pub fn build(
        corpus: &Corpus,
        bounds: &DimensionBounds,
        axes: AxisAssignment,
    ) -> Result<Self, Error> {
        let dimension_count = corpus.dimension_count();
        if let Some(dimension) = axes.active_dimensions().find(|d| *d >= dimension_count) {
            return Err(Error::IndexError(format!(
                "dimension {} is out of range: corpus has {} dimensions",
                dimension, dimension_count
            )));
        }

        let point_count = corpus.total_timepoint_count();
        let mut file_offsets = Vec::with_capacity(corpus.file_count());
        let mut file_lookup = Vec::with_capacity(point_count);
        let mut time_lookup = Vec::with_capacity(point_count);
        for file in 0..corpus.file_count() {
            file_offsets.push(file_lookup.len());
            for timepoint in 0..corpus.timepoint_count(file) {
                file_lookup.push(file);
                time_lookup.push(timepoint);
            }
        }

        let tree = if axes.assigned_count() >= 2 {
            let dimensions = axes.active_dimensions().collect::<Vec<_>>();
            let mut coordinates = Vec::with_capacity(point_count * dimensions.len());
            for (file, timepoint) in file_lookup.iter().zip(time_lookup.iter()) {
                let point = CorpusPoint::new(*file, *timepoint);
                for dimension in &dimensions {
                    let value = corpus.feature(point, *dimension).unwrap_or_default();
                    coordinates.push(bounds.normalize(*dimension, value));
                }
            }
            log::info!(
                "Building {}D spatial index with {} points...",
                dimensions.len(),
                point_count
            );
            Some(KdTree::new(dimensions.len(), coordinates))
        } else {
            log::debug!("Less than two axes assigned: spatial index stays untrained");
            None
        };

        Ok(Self {
            axes,
            tree,
            file_offsets,
            file_lookup,
            time_lookup,
        })
    }

    /// true when at least two axes are assigned and queries can return results.
    #[inline]
    pub fn is_trained(&self) -> bool {
        self.tree.is_some()
    }

    /// Number of search dimensions: 2, 3, or 0 when untrained.
    pub fn dimensions(&self) -> usize {
        self.tree.as_ref().map_or(0, |tree| tree.dimensions())
    }

    pub fn axes(&self) -> AxisAssignment {
        self.axes
    }

    pub fn point_count(&self) -> usize {
        self.file_lookup.len()
    }

    /// Resolve a point id into a corpus point.
    #[inline]
    pub fn point(&self, id: usize) -> Option<CorpusPoint> {
        Some(CorpusPoint::new(
            *self.file_lookup.get(id)?,
            *self.time_lookup.get(id)?,
        ))
    }

    /// Resolve a corpus point into a point id.
    #[inline]
    pub fn point_id(&self, point: CorpusPoint) -> Option<usize> {
        let id = self.file_offsets.get(point.file)? + point.timepoint;
        if self.file_lookup.get(id) == Some(&point.file) && self.time_lookup[id] == point.timepoint
        {
            Some(id)
        } else {
            None
        }
    }

    /// Normalized search space position of the given corpus point.
    #[inline]
    pub fn position(&self, point: CorpusPoint) -> Option<&[f64]> {
        let tree = self.tree.as_ref()?;
        let id = self.point_id(point)?;
        Some(tree.point(id))
    }

    /// Find up to `k` nearest points within `max_radius` around the normalized `query` position.
    /// Results are written into `results` sorted by ascending distance. `results` is not
    /// reallocated when it has a capacity of at least `k`.
    pub fn k_nearest(&self, query: &[f64], k: usize, max_radius: f64, results: &mut Vec<Neighbor>) {
        match &self.tree {
            Some(tree) if query.len() == tree.dimensions() => {
                tree.k_nearest(query, k, max_radius, results)
            }
            _ => results.clear(),
        }
    }

    /// The single nearest point within `max_radius` around `query` and its distance.
    pub fn nearest(&self, query: &[f64], max_radius: f64) -> Option<(CorpusPoint, f64)> {
        let mut results = Vec::with_capacity(1);
        self.k_nearest(query, 1, max_radius, &mut results);
        let nearest = results.first()?;
        Some((self.point(nearest.id)?, nearest.distance))
    }

    /// A uniformly distributed random corpus point, when the index is trained.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<CorpusPoint> {
        if !self.is_trained() || self.file_lookup.is_empty() {
            return None;
        }
        self.point(rng.random_range(0..self.file_lookup.len()))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{rngs::SmallRng, SeedableRng};

    fn test_corpus() -> Corpus {
        let mut corpus = Corpus::new(10, vec!["a".into(), "b".into(), "c".into()]).unwrap();
        // file 0: a diagonal line, file 1: a single point in the center
        let features = (0..5)
            .map(|t| vec![t as f64, t as f64, 0.0])
            .collect::<Vec<_>>();
        corpus.add_file("0", vec![0.0; 50], features).unwrap();
        corpus
            .add_file("1", vec![0.0; 10], vec![vec![2.0, 2.0, 4.0]])
            .unwrap();
        corpus
    }

    #[test]
    fn axis_assignment() {
        let mut axes = AxisAssignment::default();
        assert_eq!(axes.assigned_count(), 0);
        axes.set(Axis::X, Some(2));
        axes.set(Axis::Z, Some(0));
        assert_eq!(axes.get(Axis::X), Some(2));
        assert_eq!(axes.get(Axis::Y), None);
        assert_eq!(axes.active_dimensions().collect::<Vec<_>>(), vec![2, 0]);
        assert_eq!("Z".parse::<Axis>(), Ok(Axis::Z));
        assert_eq!(Axis::Y.to_string(), "Y");
    }

    #[test]
    fn training() {
        let corpus = test_corpus();
        let bounds = DimensionBounds::from_corpus(&corpus);

        let untrained =
            SpatialIndex::build(&corpus, &bounds, AxisAssignment::new(Some(0), None, None))
                .unwrap();
        assert!(!untrained.is_trained());
        assert_eq!(untrained.point_count(), 6);
        assert_eq!(untrained.nearest(&[0.0, 0.0], 1.0), None);
        assert!(untrained.position(CorpusPoint::new(0, 0)).is_none());

        let index_2d =
            SpatialIndex::build(&corpus, &bounds, AxisAssignment::new(Some(0), Some(1), None))
                .unwrap();
        assert!(index_2d.is_trained());
        assert_eq!(index_2d.dimensions(), 2);

        let index_3d = SpatialIndex::build(
            &corpus,
            &bounds,
            AxisAssignment::new(Some(0), Some(1), Some(2)),
        )
        .unwrap();
        assert_eq!(index_3d.dimensions(), 3);

        assert!(SpatialIndex::build(
            &corpus,
            &bounds,
            AxisAssignment::new(Some(0), Some(7), None)
        )
        .is_err());
    }

    #[test]
    fn point_lookup() {
        let corpus = test_corpus();
        let bounds = DimensionBounds::from_corpus(&corpus);
        let index =
            SpatialIndex::build(&corpus, &bounds, AxisAssignment::new(Some(0), Some(1), None))
                .unwrap();

        assert_eq!(index.point(5), Some(CorpusPoint::new(1, 0)));
        assert_eq!(index.point(6), None);
        assert_eq!(index.point_id(CorpusPoint::new(0, 3)), Some(3));
        assert_eq!(index.point_id(CorpusPoint::new(1, 0)), Some(5));
        assert_eq!(index.point_id(CorpusPoint::new(1, 1)), None);
        assert_eq!(index.point_id(CorpusPoint::new(0, 5)), None);

        assert_eq!(index.position(CorpusPoint::new(0, 0)), Some(&[0.0, 0.0][..]));
        assert_eq!(index.position(CorpusPoint::new(0, 4)), Some(&[1.0, 1.0][..]));
        assert_eq!(index.position(CorpusPoint::new(1, 0)), Some(&[0.5, 0.5][..]));
    }

    #[test]
    fn queries() {
        let corpus = test_corpus();
        let bounds = DimensionBounds::from_corpus(&corpus);
        let index =
            SpatialIndex::build(&corpus, &bounds, AxisAssignment::new(Some(0), Some(1), None))
                .unwrap();

        let mut results = Vec::with_capacity(4);
        index.k_nearest(&[0.5, 0.5], 4, 0.5, &mut results);
        // the center point exists twice: in file 0 at timepoint 2 and in file 1
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].distance, 0.0);
        assert_eq!(results[1].distance, 0.0);
        assert!(results[2].distance > 0.0);

        // wrong query dimensions
        index.k_nearest(&[0.5, 0.5, 0.5], 4, 0.5, &mut results);
        assert!(results.is_empty());

        let (point, distance) = index.nearest(&[0.0, 0.01], 0.1).unwrap();
        assert_eq!(point, CorpusPoint::new(0, 0));
        assert!((distance - 0.01).abs() < 1e-9);
        assert_eq!(index.nearest(&[0.0, 0.5], 0.1), None);

        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..20 {
            let point = index.random_point(&mut rng).unwrap();
            assert!(index.point_id(point).is_some());
        }
        assert_eq!(SpatialIndex::new().random_point(&mut rng), None);
    }
}
