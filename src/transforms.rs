//! Weight transforms applied to a finished adjacency matrix.
//!
//! - Spectral: symmetric degree normalisation `w_ij / sqrt(d_i * d_j)` with
//!   row-sum degrees. A node with zero degree scales its entries to zero and
//!   those entries are dropped.
//! - Cosine: cosine similarity between adjacency rows, computed sparsely as
//!   `A · Aᵀ` scaled by the row norms. The self-similarity diagonal is dropped
//!   so the result keeps a zero diagonal.

use log::{debug, info};
use sprs::{CsMat, TriMat};

use crate::graph::Transform;

/// Apply `transform` to `adj`, returning a new matrix.
pub fn apply(adj: &CsMat<f64>, transform: Transform) -> CsMat<f64> {
    match transform {
        Transform::None => adj.clone(),
        Transform::Spectral => spectral(adj),
        Transform::Cosine => cosine(adj),
    }
}

pub fn spectral(adj: &CsMat<f64>) -> CsMat<f64> {
    info!("Applying spectral transform to {} nodes", adj.rows());
    let inv_sqrt: Vec<f64> = adj
        .outer_iterator()
        .map(|row| {
            let d: f64 = row.iter().map(|(_, &w)| w).sum();
            if d > 0.0 {
                1.0 / d.sqrt()
            } else {
                0.0
            }
        })
        .collect();

    let mut triplets = TriMat::new((adj.rows(), adj.cols()));
    for (i, row) in adj.outer_iterator().enumerate() {
        for (j, &w) in row.iter() {
            let v = w * inv_sqrt[i] * inv_sqrt[j];
            if v != 0.0 {
                triplets.add_triplet(i, j, v);
            }
        }
    }
    let out: CsMat<f64> = triplets.to_csr();
    debug!("Spectral transform kept {} of {} entries", out.nnz(), adj.nnz());
    out
}

pub fn cosine(adj: &CsMat<f64>) -> CsMat<f64> {
    info!("Applying cosine transform to {} nodes", adj.rows());
    let norms: Vec<f64> = adj
        .outer_iterator()
        .map(|row| row.iter().map(|(_, &w)| w * w).sum::<f64>().sqrt())
        .collect();

    let mut t = TriMat::new((adj.cols(), adj.rows()));
    for (i, row) in adj.outer_iterator().enumerate() {
        for (j, &w) in row.iter() {
            t.add_triplet(j, i, w);
        }
    }
    let transposed: CsMat<f64> = t.to_csr();
    let gram: CsMat<f64> = adj * &transposed;

    let mut triplets = TriMat::new((adj.rows(), adj.rows()));
    for (i, row) in gram.outer_iterator().enumerate() {
        for (j, &dot) in row.iter() {
            let denom = norms[i] * norms[j];
            if i == j || denom <= 0.0 || dot == 0.0 {
                continue;
            }
            triplets.add_triplet(i, j, (dot / denom).clamp(-1.0, 1.0));
        }
    }
    let out: CsMat<f64> = triplets.to_csr();
    debug!("Cosine transform produced {} entries", out.nnz());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn path3() -> CsMat<f64> {
        // 0 - 1 - 2
        let mut t = TriMat::new((3, 3));
        for &(i, j) in &[(0, 1), (1, 0), (1, 2), (2, 1)] {
            t.add_triplet(i, j, 1.0);
        }
        t.to_csr()
    }

    #[test]
    fn test_none_is_identity() {
        let a = path3();
        assert_eq!(apply(&a, Transform::None), a);
    }

    #[test]
    fn test_spectral_normalises_by_degrees() {
        let s = spectral(&path3());
        // degrees [1, 2, 1] -> every edge becomes 1/sqrt(2)
        assert_eq!(s.nnz(), 4);
        for (_, &w) in s.outer_view(0).unwrap().iter() {
            assert_relative_eq!(w, 1.0 / 2f64.sqrt());
        }
        assert_relative_eq!(*s.get(1, 2).unwrap(), 1.0 / 2f64.sqrt());
    }

    #[test]
    fn test_cosine_connects_rows_with_shared_neighbors() {
        let c = cosine(&path3());
        // rows 0 and 2 are both [0, 1, 0]
        assert_relative_eq!(*c.get(0, 2).unwrap(), 1.0);
        assert_relative_eq!(*c.get(2, 0).unwrap(), 1.0);
        // row 1 is [1, 0, 1], orthogonal to the others
        assert!(c.get(0, 1).is_none());
        assert!((0..3).all(|i| c.get(i, i).is_none()));
    }
}
