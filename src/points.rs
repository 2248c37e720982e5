//! # Spot coordinates and exact neighbor queries
//!
//! `PointSet` holds the N×2 spot/cell positions; `CoordinateIndex` answers
//! k-nearest-neighbor and fixed-radius queries over them.
//!
//! Results are rows of `(neighbor_index, euclidean_distance)` ordered by
//! (distance asc, index asc) and fully deterministic. A point is never its
//! own neighbor. When several points tie for the last k-NN slot, the tree's
//! own (repeatable) order decides which one is kept.
//!
//! k-NN queries go through a smartcore `CoverTree` built once per call; the
//! tree returns `k + 1` candidates (the query point itself included), which
//! are re-sorted by (distance, index) and cut to `k`. Radius queries prune
//! candidates with a sweep window over the points sorted by x. Both run in
//! parallel over query points.

use std::cmp::Ordering;

use log::{debug, info, trace};
use rayon::prelude::*;
use smartcore::algorithm::neighbour::cover_tree::CoverTree;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::distance::Distance;

use crate::error::{Result, SpatialError};

/// Immutable set of 2-D point coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    coords: Vec<[f64; 2]>,
}

impl PointSet {
    /// Wrap a vector of `[x, y]` coordinates.
    ///
    /// Fails on an empty set or on non-finite coordinates.
    pub fn new(coords: Vec<[f64; 2]>) -> Result<Self> {
        if coords.is_empty() {
            return Err(SpatialError::InvalidParameter(
                "point set must contain at least one point".to_string(),
            ));
        }
        if let Some(i) = coords
            .iter()
            .position(|p| !p[0].is_finite() || !p[1].is_finite())
        {
            return Err(SpatialError::InvalidParameter(format!(
                "point {} has non-finite coordinates {:?}",
                i, coords[i]
            )));
        }
        debug!("PointSet created with {} points", coords.len());
        Ok(Self { coords })
    }

    /// Build from row vectors, each holding exactly two values.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let mut coords = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != 2 {
                return Err(SpatialError::InvalidParameter(format!(
                    "row {} has {} values, expected 2",
                    i,
                    row.len()
                )));
            }
            coords.push([row[0], row[1]]);
        }
        Self::new(coords)
    }

    /// Build from an N×2 dense matrix (one point per row).
    pub fn from_matrix(matrix: &DenseMatrix<f64>) -> Result<Self> {
        let (n, d) = matrix.shape();
        if d != 2 {
            return Err(SpatialError::InvalidParameter(format!(
                "coordinate matrix must have 2 columns, got {}",
                d
            )));
        }
        let coords = (0..n)
            .map(|i| [*matrix.get((i, 0)), *matrix.get((i, 1))])
            .collect();
        Self::new(coords)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coords(&self) -> &[[f64; 2]] {
        &self.coords
    }

    pub fn get(&self, i: usize) -> [f64; 2] {
        self.coords[i]
    }
}

/// Euclidean distance between two points.
#[inline]
pub fn euclidean(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Planar Euclidean metric for the cover tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarEuclidean;

impl Distance<[f64; 2]> for PlanarEuclidean {
    fn distance(&self, a: &[f64; 2], b: &[f64; 2]) -> f64 {
        euclidean(a, b)
    }
}

#[inline]
fn by_distance_then_index(a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    a.1.partial_cmp(&b.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

/// Read-only neighbor index over a `PointSet`.
pub struct CoordinateIndex<'a> {
    points: &'a PointSet,
    // point indices sorted by x, and the matching x values
    by_x: Vec<usize>,
    xs: Vec<f64>,
}

impl<'a> CoordinateIndex<'a> {
    pub fn new(points: &'a PointSet) -> Self {
        let mut by_x: Vec<usize> = (0..points.len()).collect();
        by_x.sort_unstable_by(|&a, &b| {
            points.coords[a][0]
                .partial_cmp(&points.coords[b][0])
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(&b))
        });
        let xs = by_x.iter().map(|&i| points.coords[i][0]).collect();
        trace!("CoordinateIndex sorted {} points by x", points.len());
        Self { points, by_x, xs }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// For every point, the `k` nearest other points and their distances.
    ///
    /// When fewer than `k` other points exist, all of them are returned.
    pub fn k_nearest(&self, k: usize) -> Result<Vec<Vec<(usize, f64)>>> {
        if k == 0 {
            return Err(SpatialError::InvalidParameter(
                "number of neighbors must be > 0".to_string(),
            ));
        }
        let n = self.points.len();
        if n < 2 {
            return Ok(vec![Vec::new(); n]);
        }

        info!("Building CoverTree over {} points", n);
        let tree = CoverTree::new(self.points.coords.clone(), PlanarEuclidean)
            .map_err(|e| SpatialError::NeighborIndex(e.to_string()))?;
        // one extra slot for the query point itself
        let query_k = (k + 1).min(n);
        info!("Computing {}-NN with CoverTree", k);

        let coords = &self.points.coords;
        let rows: Vec<Vec<(usize, f64)>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let found = tree
                    .find(&coords[i], query_k)
                    .map_err(|e| SpatialError::NeighborIndex(e.to_string()))?;
                let mut row: Vec<(usize, f64)> = found
                    .into_iter()
                    .filter(|&(j, _, _)| j != i)
                    .map(|(j, d, _)| (j, d))
                    .collect();
                row.sort_unstable_by(by_distance_then_index);
                row.truncate(k);
                row.shrink_to_fit();
                Ok(row)
            })
            .collect::<Result<_>>()?;

        debug!(
            "k-NN produced {} neighbor entries",
            rows.iter().map(|r| r.len()).sum::<usize>()
        );
        Ok(rows)
    }

    /// For every point, all other points within distance `radius` (inclusive).
    pub fn within_radius(&self, radius: f64) -> Result<Vec<Vec<(usize, f64)>>> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(SpatialError::InvalidParameter(format!(
                "radius must be a positive finite number, got {}",
                radius
            )));
        }
        let n = self.points.len();
        info!("Computing radius neighbors (r={}) for {} points", radius, n);

        let coords = &self.points.coords;
        let rows: Vec<Vec<(usize, f64)>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let x = coords[i][0];
                let lo = self.xs.partition_point(|&v| v < x - radius);
                let hi = self.xs.partition_point(|&v| v <= x + radius);
                let mut found: Vec<(usize, f64)> = self.by_x[lo..hi]
                    .iter()
                    .filter(|&&j| j != i)
                    .filter_map(|&j| {
                        let d = euclidean(&coords[i], &coords[j]);
                        (d <= radius).then_some((j, d))
                    })
                    .collect();
                found.sort_unstable_by(by_distance_then_index);
                found
            })
            .collect();

        debug!(
            "Radius query produced {} neighbor entries",
            rows.iter().map(|r| r.len()).sum::<usize>()
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> PointSet {
        PointSet::new(vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [4.0, 0.0]]).unwrap()
    }

    #[test]
    fn test_pointset_rejects_empty_and_nan() {
        assert!(matches!(
            PointSet::new(vec![]),
            Err(SpatialError::InvalidParameter(_))
        ));
        assert!(PointSet::new(vec![[0.0, f64::NAN]]).is_err());
        assert!(PointSet::from_rows(&[vec![1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn test_pointset_from_matrix() {
        let m = DenseMatrix::from_2d_vec(&vec![vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap();
        let points = PointSet::from_matrix(&m).unwrap();
        assert_eq!(points.coords(), &[[0.0, 1.0], [2.0, 3.0]]);
    }

    #[test]
    fn test_knn_excludes_self_and_breaks_ties_by_index() {
        let points = line();
        let index = CoordinateIndex::new(&points);
        let knn = index.k_nearest(2).unwrap();
        // point 1 has two neighbors at distance 1
        assert_eq!(knn[1], vec![(0, 1.0), (2, 1.0)]);
        assert_eq!(knn[3], vec![(2, 2.0), (1, 3.0)]);
        assert!(knn.iter().enumerate().all(|(i, r)| r.iter().all(|&(j, _)| j != i)));
    }

    #[test]
    fn test_knn_caps_at_available_points() {
        let points = line();
        let knn = CoordinateIndex::new(&points).k_nearest(10).unwrap();
        assert!(knn.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn test_knn_rows_hold_only_k_entries() {
        let n = 2_000;
        let coords = (0..n)
            .map(|i| [(i % 50) as f64 + 0.01 * (i / 50) as f64, (i / 50) as f64])
            .collect();
        let points = PointSet::new(coords).unwrap();
        let k = 6;
        let knn = CoordinateIndex::new(&points).k_nearest(k).unwrap();
        assert!(knn.iter().all(|r| r.len() == k));
        let retained: usize = knn.iter().map(Vec::capacity).sum();
        assert!(retained < 2 * n * k, "rows retain {} slots", retained);
    }

    #[test]
    fn test_knn_matches_exhaustive_scan() {
        let coords: Vec<[f64; 2]> = (0..300u64)
            .map(|i| {
                let a = (i * 2654435761 % 1000) as f64 / 1000.0;
                let b = (i * 40503 % 997) as f64 / 997.0;
                [a, b]
            })
            .collect();
        let points = PointSet::new(coords.clone()).unwrap();
        let knn = CoordinateIndex::new(&points).k_nearest(5).unwrap();
        for (i, row) in knn.iter().enumerate() {
            let mut all: Vec<(usize, f64)> = (0..coords.len())
                .filter(|&j| j != i)
                .map(|j| (j, euclidean(&coords[i], &coords[j])))
                .collect();
            all.sort_unstable_by(by_distance_then_index);
            let expected: Vec<f64> = all[..5].iter().map(|&(_, d)| d).collect();
            let got: Vec<f64> = row.iter().map(|&(_, d)| d).collect();
            assert_eq!(got, expected, "point {}", i);
        }
    }

    #[test]
    fn test_radius_is_inclusive() {
        let points = line();
        let rad = CoordinateIndex::new(&points).within_radius(1.0).unwrap();
        assert_eq!(rad[0], vec![(1, 1.0)]);
        assert_eq!(rad[1], vec![(0, 1.0), (2, 1.0)]);
        assert!(rad[3].is_empty());
    }

    #[test]
    fn test_invalid_queries() {
        let points = line();
        let index = CoordinateIndex::new(&points);
        assert!(index.k_nearest(0).is_err());
        assert!(index.within_radius(0.0).is_err());
        assert!(index.within_radius(-1.0).is_err());
        assert!(index.within_radius(f64::INFINITY).is_err());
    }
}
