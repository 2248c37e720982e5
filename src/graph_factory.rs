//! # Builds spatial connectivity matrices from spot coordinates
//!
//! ## Regimes
//!
//! * **Generic** point clouds: every point is linked to its `n_neigh` nearest
//!   neighbors, or to every point within `radius` when a radius is given. All
//!   edges get weight 1.0 and the Euclidean distances are returned in a
//!   parallel CSR matrix.
//! * **Grid** (regular hexagonal lattice): the 1-ring graph is a 6-NN graph
//!   with neighbor correction. For `n_rings > 1` the ring matrix is grown by
//!   repeated sparse products `frontier · A`, keeping only entries that were not
//!   discovered before and stamping them with the ring number. The final
//!   adjacency is the binarised ring matrix; ring numbers are returned in place
//!   of distances.
//!
//! ## Neighbor correction
//!
//! On tissue boundaries a fixed-k query reaches across gaps. The correction
//! takes the median of all k-NN distances, multiplies it by 1.3 and drops every
//! edge at or above that cutoff.
//!
//! Row `i` of every produced matrix lists the neighbors found *for* point `i`;
//! k-NN graphs are therefore not necessarily symmetric, radius graphs are.

use log::{debug, info, trace, warn};
use sprs::{CsMat, TriMat};

use crate::error::{Result, SpatialError};
use crate::graph::{CoordType, GraphParams, SpatialGraph};
use crate::points::{CoordinateIndex, PointSet};
use crate::transforms;

/// Neighbors per spot on a hexagonal lattice.
pub const GRID_NEIGHBORS: usize = 6;

/// Slack applied to the median neighbor distance by the neighbor correction.
pub const NEIGH_CORRECTION_FACTOR: f64 = 1.3;

pub struct GraphFactory;

impl GraphFactory {
    /// This is a lower level method: use `SpatialNeighborsBuilder::build`.
    /// Validate `params`, dispatch on the coordinate type, apply the weight
    /// transform and reject empty graphs.
    pub fn build(points: &PointSet, params: &GraphParams) -> Result<SpatialGraph> {
        params.validate()?;
        info!(
            "Creating graph using `{}` coordinates and `{}` transform for {} points",
            params.coord_type,
            params.transform,
            points.len()
        );
        debug!("Graph parameters: {:?}", params);

        let (adjacency, distances) = match params.coord_type {
            CoordType::Generic => {
                let (adj, dst) = Self::build_connectivity(
                    points,
                    params.n_neigh,
                    params.radius,
                    false,
                    false,
                )?;
                (adj, Some(dst))
            }
            CoordType::Grid => {
                if params.radius.is_some() || params.n_neigh != GRID_NEIGHBORS {
                    debug!(
                        "Grid regime uses a fixed {}-neighbor base; n_neigh={} radius={:?} ignored",
                        GRID_NEIGHBORS, params.n_neigh, params.radius
                    );
                }
                Self::build_grid(points, params.n_rings, params.return_distance)?
            }
        };

        if adjacency.nnz() == 0 {
            return Err(SpatialError::EmptyGraph(format!(
                "no edges found among {} points with {:?}",
                points.len(),
                params
            )));
        }

        let connectivities = transforms::apply(&adjacency, params.transform);
        if connectivities.nnz() == 0 {
            return Err(SpatialError::EmptyGraph(format!(
                "`{}` transform removed every edge",
                params.transform
            )));
        }

        let graph = SpatialGraph {
            connectivities,
            distances,
            params: params.clone(),
        };
        info!(
            "Built spatial graph ({}x{}) with {} non-zeros",
            graph.n_nodes(),
            graph.n_nodes(),
            graph.nnz()
        );
        Ok(graph)
    }

    /// Build connectivity and distance matrices from neighbor queries.
    ///
    /// * `radius`: when set, radius neighbors are used and `n_neigh` is ignored
    /// * `neigh_correct`: drop k-NN edges at or beyond `median * 1.3`
    /// * `set_diag`: add a unit self-loop per point to the connectivities
    ///
    /// Returns `(connectivities, distances)`; the distances never carry the
    /// self-loops.
    pub fn build_connectivity(
        points: &PointSet,
        n_neigh: usize,
        radius: Option<f64>,
        neigh_correct: bool,
        set_diag: bool,
    ) -> Result<(CsMat<f64>, CsMat<f64>)> {
        let n = points.len();
        let index = CoordinateIndex::new(points);

        let mut edges: Vec<(usize, usize, f64)> = match radius {
            Some(r) => Self::flatten(index.within_radius(r)?),
            None => Self::flatten(index.k_nearest(n_neigh)?),
        };

        if radius.is_none() && neigh_correct && !edges.is_empty() {
            let mut dists: Vec<f64> = edges.iter().map(|&(_, _, d)| d).collect();
            let cutoff = median(&mut dists) * NEIGH_CORRECTION_FACTOR;
            let before = edges.len();
            edges.retain(|&(_, _, d)| d < cutoff);
            debug!(
                "Neighbor correction: cutoff {:.6}, kept {} of {} edges",
                cutoff,
                edges.len(),
                before
            );
        }

        let mut conns = TriMat::new((n, n));
        let mut dists = TriMat::new((n, n));
        for &(i, j, d) in &edges {
            conns.add_triplet(i, j, 1.0);
            dists.add_triplet(i, j, d);
        }
        if set_diag {
            trace!("Adding {} self-loops", n);
            for i in 0..n {
                conns.add_triplet(i, i, 1.0);
            }
        }

        let conns: CsMat<f64> = conns.to_csr();
        let dists: CsMat<f64> = dists.to_csr();
        debug!("Connectivity matrix has {} non-zeros", conns.nnz());
        Ok((conns, dists))
    }

    /// Hexagonal-grid regime.
    ///
    /// With one ring the 6-NN corrected graph is returned as is, and its ring
    /// matrix (all ones) only when `return_distance` is set. With more rings
    /// the ring matrix is always returned.
    pub fn build_grid(
        points: &PointSet,
        n_rings: usize,
        return_distance: bool,
    ) -> Result<(CsMat<f64>, Option<CsMat<f64>>)> {
        if n_rings < 1 {
            return Err(SpatialError::InvalidParameter(format!(
                "n_rings must be >= 1, got {}",
                n_rings
            )));
        }

        if n_rings == 1 {
            let (adj, _) =
                Self::build_connectivity(points, GRID_NEIGHBORS, None, true, false)?;
            let rings = return_distance.then(|| adj.clone());
            return Ok((adj, rings));
        }

        info!("Expanding hexagonal grid graph to {} rings", n_rings);
        let (base, _) = Self::build_connectivity(points, GRID_NEIGHBORS, None, true, true)?;
        let rings = Self::expand_rings(&base, n_rings);
        let adjacency = rings.map(|_| 1.0);
        Ok((adjacency, Some(rings)))
    }

    /// Grow a ring matrix from a 1-ring adjacency that carries self-loops.
    ///
    /// Entry `(i, j)` of the result is the smallest number of hops from `i`
    /// to `j`, for hop counts up to `n_rings`. The diagonal is removed.
    pub fn expand_rings(base: &CsMat<f64>, n_rings: usize) -> CsMat<f64> {
        let shape = (base.rows(), base.cols());
        let mut acc: CsMat<f64> = base.map(|_| 1.0);
        let mut frontier = acc.clone();

        for step in 0..n_rings.saturating_sub(1) {
            let ring = (step + 2) as f64;
            let walk: CsMat<f64> = &frontier * base;

            // only entries never reached by a shorter walk enter this ring
            let mut fresh = TriMat::new(shape);
            for (i, row) in walk.outer_iterator().enumerate() {
                for (j, &w) in row.iter() {
                    if w != 0.0 && acc.get(i, j).is_none() {
                        fresh.add_triplet(i, j, ring);
                    }
                }
            }
            let fresh: CsMat<f64> = fresh.to_csr();
            debug!("Ring {}: {} new entries", ring, fresh.nnz());

            if fresh.nnz() == 0 {
                warn!(
                    "Ring expansion saturated at ring {} of {}",
                    step + 1,
                    n_rings
                );
                break;
            }

            acc = union_disjoint(&acc, &fresh);
            frontier = fresh;
        }

        let mut out = TriMat::new(shape);
        for (i, row) in acc.outer_iterator().enumerate() {
            for (j, &ring) in row.iter() {
                if i != j {
                    out.add_triplet(i, j, ring);
                }
            }
        }
        out.to_csr()
    }

    fn flatten(rows: Vec<Vec<(usize, f64)>>) -> Vec<(usize, usize, f64)> {
        rows.into_iter()
            .enumerate()
            .flat_map(|(i, row)| row.into_iter().map(move |(j, d)| (i, j, d)))
            .collect()
    }
}

/// Merge two matrices whose sparsity patterns do not overlap.
fn union_disjoint(a: &CsMat<f64>, b: &CsMat<f64>) -> CsMat<f64> {
    let mut triplets = TriMat::with_capacity((a.rows(), a.cols()), a.nnz() + b.nnz());
    for m in [a, b] {
        for (i, row) in m.outer_iterator().enumerate() {
            for (j, &v) in row.iter() {
                triplets.add_triplet(i, j, v);
            }
        }
    }
    triplets.to_csr()
}

/// Median with the mean of the two middle values for even lengths.
fn median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn test_expand_rings_on_path() {
        // 0 - 1 - 2 - 3 with self-loops
        let mut t = TriMat::new((4, 4));
        for i in 0..4 {
            t.add_triplet(i, i, 1.0);
        }
        for &(i, j) in &[(0, 1), (1, 2), (2, 3)] {
            t.add_triplet(i, j, 1.0);
            t.add_triplet(j, i, 1.0);
        }
        let base: CsMat<f64> = t.to_csr();

        let rings = GraphFactory::expand_rings(&base, 3);
        assert_eq!(rings.get(0, 1), Some(&1.0));
        assert_eq!(rings.get(0, 2), Some(&2.0));
        assert_eq!(rings.get(0, 3), Some(&3.0));
        assert_eq!(rings.get(3, 0), Some(&3.0));
        assert!((0..4).all(|i| rings.get(i, i).is_none()));

        let two = GraphFactory::expand_rings(&base, 2);
        assert!(two.get(0, 3).is_none());
    }

    #[test]
    fn test_neighbor_correction_drops_long_edges() {
        // three close points and one far outlier
        let points =
            PointSet::new(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [10.0, 10.0]]).unwrap();
        let (plain, _) = GraphFactory::build_connectivity(&points, 2, None, false, false).unwrap();
        let (corrected, dists) =
            GraphFactory::build_connectivity(&points, 2, None, true, false).unwrap();

        assert_eq!(plain.nnz(), 8);
        assert!(corrected.nnz() < plain.nnz());
        assert!(corrected.outer_view(3).unwrap().nnz() == 0);
        assert_eq!(corrected.nnz(), dists.nnz());
    }
}
