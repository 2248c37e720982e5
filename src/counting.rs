//! Label-pair edge counting over a sparse adjacency.
//!
//! One pass over the stored nonzeros buckets each entry `(a, b, w)` by the
//! labels of its endpoints. Every stored entry is counted exactly once: a
//! symmetric edge is stored twice and therefore contributes both orderings to
//! its unordered label pair.

use std::cmp::Ordering;

use log::trace;
use serde::{Deserialize, Serialize};
use sprs::CsMat;

use crate::error::{Result, SpatialError};
use crate::labels::LabelAssignment;

/// Observed edge weight between two distinct label codes (`code_i < code_j`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairObservation {
    pub code_i: u32,
    pub code_j: u32,
    pub observed_weight: f64,
}

/// Dense index of the unordered pair `(i, j)`, `i < j`, among `n` categories.
#[inline]
pub(crate) fn pair_index(i: usize, j: usize, n: usize) -> usize {
    debug_assert!(i < j && j < n);
    i * n - i * (i + 1) / 2 + (j - i - 1)
}

pub(crate) fn check_dims(adj: &CsMat<f64>, n_labels: usize) -> Result<()> {
    if adj.rows() != adj.cols() {
        return Err(SpatialError::InvalidParameter(format!(
            "adjacency must be square, got {}x{}",
            adj.rows(),
            adj.cols()
        )));
    }
    if adj.rows() != n_labels {
        return Err(SpatialError::InvalidParameter(format!(
            "adjacency has {} nodes but {} labels were given",
            adj.rows(),
            n_labels
        )));
    }
    Ok(())
}

fn check_codes(adj: &CsMat<f64>, codes: &[u32], n_categories: usize) -> Result<()> {
    check_dims(adj, codes.len())?;
    if let Some(&bad) = codes.iter().find(|&&c| c as usize >= n_categories) {
        return Err(SpatialError::InvalidParameter(format!(
            "code {} out of range for {} categories",
            bad, n_categories
        )));
    }
    Ok(())
}

/// Sum adjacency weight per unordered pair of distinct label codes.
///
/// Every pair of categories is reported, including pairs with zero weight,
/// sorted by weight descending then by codes. Fails when `codes` does not
/// cover every node or holds a code outside `0..n_categories`.
pub fn count_pairs(
    adj: &CsMat<f64>,
    codes: &[u32],
    n_categories: usize,
) -> Result<Vec<PairObservation>> {
    check_codes(adj, codes, n_categories)?;
    Ok(tally_pairs(adj, codes, n_categories))
}

/// `count_pairs` without the input checks; callers validate once up front.
pub(crate) fn tally_pairs(
    adj: &CsMat<f64>,
    codes: &[u32],
    n_categories: usize,
) -> Vec<PairObservation> {
    let n_pairs = n_categories * n_categories.saturating_sub(1) / 2;
    let mut sums = vec![0.0f64; n_pairs];

    for (a, row) in adj.outer_iterator().enumerate() {
        let la = codes[a] as usize;
        for (b, &w) in row.iter() {
            let lb = codes[b] as usize;
            match la.cmp(&lb) {
                Ordering::Less => sums[pair_index(la, lb, n_categories)] += w,
                Ordering::Greater => sums[pair_index(lb, la, n_categories)] += w,
                Ordering::Equal => {}
            }
        }
    }

    let mut table = Vec::with_capacity(n_pairs);
    for i in 0..n_categories {
        for j in (i + 1)..n_categories {
            table.push(PairObservation {
                code_i: i as u32,
                code_j: j as u32,
                observed_weight: sums[pair_index(i, j, n_categories)],
            });
        }
    }
    table.sort_by(|a, b| {
        b.observed_weight
            .partial_cmp(&a.observed_weight)
            .unwrap_or(Ordering::Equal)
            .then_with(|| (a.code_i, a.code_j).cmp(&(b.code_i, b.code_j)))
    });
    trace!("Counted {} label pairs over {} entries", table.len(), adj.nnz());
    table
}

/// Observed weight between two distinct labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPair<L> {
    pub label_i: L,
    pub label_j: L,
    pub observed_weight: f64,
}

/// `count_pairs` with dimension checks, reported with label values.
pub fn count_label_pairs<L: Clone + Ord + std::hash::Hash + std::fmt::Debug>(
    adj: &CsMat<f64>,
    labels: &LabelAssignment<L>,
) -> Result<Vec<LabeledPair<L>>> {
    check_dims(adj, labels.len())?;
    Ok(tally_pairs(adj, labels.codes(), labels.n_categories())
        .into_iter()
        .map(|p| LabeledPair {
            label_i: labels.category(p.code_i).clone(),
            label_j: labels.category(p.code_j).clone(),
            observed_weight: p.observed_weight,
        })
        .collect())
}

/// Directed label-interaction matrix.
///
/// Entry `[p][q]` sums the weight of entries whose row point has code `p` and
/// column point has code `q`; same-label interactions sit on the diagonal.
/// With `normalized`, every nonzero row is scaled to sum to one.
pub fn interaction_matrix(
    adj: &CsMat<f64>,
    codes: &[u32],
    n_categories: usize,
    normalized: bool,
) -> Result<Vec<Vec<f64>>> {
    check_codes(adj, codes, n_categories)?;
    let mut out = vec![vec![0.0f64; n_categories]; n_categories];
    for (a, row) in adj.outer_iterator().enumerate() {
        let la = codes[a] as usize;
        for (b, &w) in row.iter() {
            out[la][codes[b] as usize] += w;
        }
    }
    if normalized {
        for row in out.iter_mut() {
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                row.iter_mut().for_each(|v| *v /= total);
            }
        }
    }
    Ok(out)
}
