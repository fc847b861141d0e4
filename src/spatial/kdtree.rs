// -------------------------------------------------------------------------------------------------

/// A nearest neighbor search result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the point in the tree's point list.
    pub id: usize,
    /// Euclidean distance to the query point.
    pub distance: f64,
}

// -------------------------------------------------------------------------------------------------

/// A static, balanced k-d tree over a flat list of points with 2 or more dimensions.
///
/// The tree is stored implicitly: `order` holds point ids arranged so that the median of each
/// sub range is the node's point, with the left and right halves being its children. This
/// avoids node allocations and makes queries allocation free, as long as the result buffer
/// has enough capacity.
#[derive(Debug, Clone, Default)]
pub(crate) struct KdTree {
    dimensions: usize,
    coordinates: Vec<f64>, // [point * dimensions + dimension]
    order: Vec<usize>,
}

impl KdTree {
    /// Build a new tree from the given flat coordinate list.
    pub fn new(dimensions: usize, coordinates: Vec<f64>) -> Self {
        assert!(dimensions > 0, "Invalid dimension count");
        assert!(
            coordinates.len() % dimensions == 0,
            "Coordinate count must be a multiple of the dimension count"
        );
        let mut order = (0..coordinates.len() / dimensions).collect::<Vec<_>>();
        Self::build(&mut order, 0, dimensions, &coordinates);
        Self {
            dimensions,
            coordinates,
            order,
        }
    }

    fn build(order: &mut [usize], depth: usize, dimensions: usize, coordinates: &[f64]) {
        if order.len() <= 1 {
            return;
        }
        let axis = depth % dimensions;
        let mid = order.len() / 2;
        order.select_nth_unstable_by(mid, |a, b| {
            coordinates[a * dimensions + axis].total_cmp(&coordinates[b * dimensions + axis])
        });
        let (left, right) = order.split_at_mut(mid);
        Self::build(left, depth + 1, dimensions, coordinates);
        Self::build(&mut right[1..], depth + 1, dimensions, coordinates);
    }

    #[inline]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Coordinates of the point with the given id.
    #[inline]
    pub fn point(&self, id: usize) -> &[f64] {
        &self.coordinates[id * self.dimensions..(id + 1) * self.dimensions]
    }

    /// Find up to `k` nearest points to `query` with a distance <= `max_radius`.
    /// Results are written into `results`, sorted by ascending distance.
    pub fn k_nearest(
        &self,
        query: &[f64],
        k: usize,
        max_radius: f64,
        results: &mut Vec<Neighbor>,
    ) {
        results.clear();
        if k == 0 || self.is_empty() || max_radius < 0.0 {
            return;
        }
        debug_assert_eq!(query.len(), self.dimensions, "Invalid query dimensions");
        // search with squared distances, convert them when done
        let max_distance_squared = max_radius * max_radius;
        self.search(0, self.len(), 0, query, k, max_distance_squared, results);
        for neighbor in results.iter_mut() {
            neighbor.distance = neighbor.distance.sqrt();
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        start: usize,
        end: usize,
        depth: usize,
        query: &[f64],
        k: usize,
        max_distance_squared: f64,
        results: &mut Vec<Neighbor>,
    ) {
        if start >= end {
            return;
        }
        let mid = start + (end - start) / 2;
        let id = self.order[mid];
        let point = self.point(id);

        let distance_squared = point
            .iter()
            .zip(query)
            .map(|(p, q)| (p - q) * (p - q))
            .sum::<f64>();
        if distance_squared <= max_distance_squared {
            Self::insert_sorted(
                results,
                k,
                Neighbor {
                    id,
                    distance: distance_squared,
                },
            );
        }

        let axis = depth % self.dimensions;
        let delta = query[axis] - point[axis];
        let (near, far) = if delta < 0.0 {
            ((start, mid), (mid + 1, end))
        } else {
            ((mid + 1, end), (start, mid))
        };

        self.search(near.0, near.1, depth + 1, query, k, max_distance_squared, results);

        let worst_distance_squared = if results.len() == k {
            results[k - 1].distance.min(max_distance_squared)
        } else {
            max_distance_squared
        };
        if delta * delta <= worst_distance_squared {
            self.search(far.0, far.1, depth + 1, query, k, max_distance_squared, results);
        }
    }

    #[inline]
    fn insert_sorted(results: &mut Vec<Neighbor>, k: usize, neighbor: Neighbor) {
        if results.len() == k {
            if neighbor.distance >= results[k - 1].distance {
                return;
            }
            results.pop();
        }
        let position = results.partition_point(|n| n.distance <= neighbor.distance);
        results.insert(position, neighbor);
    }
}

// -------------------------------------------------------------------------------------------------
