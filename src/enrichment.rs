//! # Neighborhood enrichment test
//!
//! Scores, for every unordered pair of distinct labels, how much edge weight
//! joins the two labels compared with random relabelings of the same graph:
//!
//! ```text
//! z = (n_obs - mean_null) / std_null
//! ```
//!
//! `std_null` is the sample standard deviation (ddof = 1) over the
//! permutation trials; with fewer than two trials, or trial counts that agree
//! up to summation rounding (`DEGENERATE_STD_RTOL` relative to the mean), it
//! is zero. A zero deviation leaves the z-score undefined: the row is kept
//! with `z_score = None` and a warning is logged, while the other rows are
//! scored normally.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sprs::CsMat;

use crate::counting::{check_dims, tally_pairs, PairObservation};
use crate::error::{Result, SpatialError};
use crate::graph::SpatialGraph;
use crate::labels::LabelAssignment;
use crate::permutation::{NullDistribution, PermutationEngine, ProgressFn};

/// Permutation count used when none is configured.
pub const DEFAULT_PERMUTATIONS: usize = 10;

/// Relative spread below which a null is treated as constant. Weighted
/// counts that only differ in summation order stay far below it.
pub const DEGENERATE_STD_RTOL: f64 = 1e-9;

/// Mean and sample standard deviation of one pair's null counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NullStatistics {
    pub mean: f64,
    pub std: f64,
    pub n: usize,
}

impl NullStatistics {
    fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: f64::NAN, std: 0.0, n };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let (min, max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let scale = mean.abs().max(1.0);
        let std = if n < 2 || max - min <= DEGENERATE_STD_RTOL * scale {
            0.0
        } else {
            let ss: f64 = samples.iter().map(|&v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        };
        Self { mean, std, n }
    }
}

/// Group the null tables by label pair and summarise each group.
pub fn null_statistics(null: &NullDistribution) -> HashMap<(u32, u32), NullStatistics> {
    let mut samples: HashMap<(u32, u32), Vec<f64>> = HashMap::new();
    for run in &null.runs {
        for obs in &run.observations {
            samples
                .entry((obs.code_i, obs.code_j))
                .or_default()
                .push(obs.observed_weight);
        }
    }
    samples
        .into_iter()
        .map(|(key, values)| (key, NullStatistics::from_samples(&values)))
        .collect()
}

/// Enrichment score for one unordered label pair.
///
/// `n_obs`, `n_exp` and `sigma` sum every stored adjacency entry, so on a
/// symmetric graph each undirected edge between the two labels counts twice.
/// The z-score is unaffected by that factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult<L> {
    pub label_i: L,
    pub label_j: L,
    /// points carrying `label_i` / `label_j`
    pub n_i: usize,
    pub n_j: usize,
    pub n_obs: f64,
    pub n_exp: f64,
    pub sigma: f64,
    /// `None` when `sigma` is zero
    pub z_score: Option<f64>,
}

impl<L: Debug> EnrichmentResult<L> {
    pub fn is_degenerate(&self) -> bool {
        self.z_score.is_none()
    }

    /// The z-score, or `DegenerateNull` when it is undefined.
    pub fn z_score(&self) -> Result<f64> {
        self.z_score.ok_or_else(|| SpatialError::DegenerateNull {
            label_i: format!("{:?}", self.label_i),
            label_j: format!("{:?}", self.label_j),
        })
    }
}

pub struct EnrichmentScorer;

impl EnrichmentScorer {
    /// Join null statistics onto the observed table and compute z-scores.
    ///
    /// Fails with `MissingNullData` if an observed pair never occurs in the
    /// null distribution.
    pub fn score<L>(
        observed: &[PairObservation],
        null: &NullDistribution,
        labels: &LabelAssignment<L>,
    ) -> Result<Vec<EnrichmentResult<L>>>
    where
        L: Clone + Ord + Hash + Debug,
    {
        if null.runs.is_empty() {
            return Err(SpatialError::MissingNullData(
                "null distribution has no permutation runs".to_string(),
            ));
        }
        let stats = null_statistics(null);
        let sizes = labels.counts();
        debug!(
            "Scoring {} label pairs against {} permutations",
            observed.len(),
            null.n_perms()
        );

        let mut results = Vec::with_capacity(observed.len());
        for obs in observed {
            let label_i = labels.category(obs.code_i).clone();
            let label_j = labels.category(obs.code_j).clone();
            let s = stats.get(&(obs.code_i, obs.code_j)).ok_or_else(|| {
                SpatialError::MissingNullData(format!(
                    "pair ({:?}, {:?}) absent from every permutation",
                    label_i, label_j
                ))
            })?;

            let z_score = if s.std > 0.0 {
                Some((obs.observed_weight - s.mean) / s.std)
            } else {
                warn!(
                    "Degenerate null for pair ({:?}, {:?}): std is zero over {} permutations",
                    label_i, label_j, s.n
                );
                None
            };

            results.push(EnrichmentResult {
                n_i: sizes[obs.code_i as usize],
                n_j: sizes[obs.code_j as usize],
                label_i,
                label_j,
                n_obs: obs.observed_weight,
                n_exp: s.mean,
                sigma: s.std,
                z_score,
            });
        }
        Ok(results)
    }
}

/// Result table of a neighborhood enrichment test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NhoodEnrichment<L> {
    /// one row per unordered label pair, by observed weight descending
    pub results: Vec<EnrichmentResult<L>>,
    pub n_perms: usize,
    pub seed: u64,
}

impl<L> NhoodEnrichment<L>
where
    L: Clone + PartialEq + Debug,
{
    /// Rows ordered by z-score; degenerate rows come last either way.
    pub fn sorted_by_z(&self, descending: bool) -> Vec<&EnrichmentResult<L>> {
        let mut rows: Vec<&EnrichmentResult<L>> = self.results.iter().collect();
        rows.sort_by(|a, b| match (a.z_score, b.z_score) {
            (Some(x), Some(y)) => {
                let ord = x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal);
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        rows
    }

    /// Most-enriched rows first.
    pub fn enriched(&self) -> Vec<&EnrichmentResult<L>> {
        self.sorted_by_z(true)
    }

    /// Most-depleted rows first.
    pub fn depleted(&self) -> Vec<&EnrichmentResult<L>> {
        self.sorted_by_z(false)
    }

    pub fn degenerate(&self) -> Vec<&EnrichmentResult<L>> {
        self.results.iter().filter(|r| r.is_degenerate()).collect()
    }

    /// Row for the unordered pair `{a, b}`.
    pub fn get(&self, a: &L, b: &L) -> Option<&EnrichmentResult<L>> {
        self.results.iter().find(|r| {
            (r.label_i == *a && r.label_j == *b) || (r.label_i == *b && r.label_j == *a)
        })
    }
}

/// Configures and runs the neighborhood enrichment test.
#[derive(Clone)]
pub struct NhoodEnrichmentBuilder {
    n_perms: usize,
    seed: Option<u64>,
    progress: Option<ProgressFn>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for NhoodEnrichmentBuilder {
    fn default() -> Self {
        Self {
            n_perms: DEFAULT_PERMUTATIONS,
            seed: None,
            progress: None,
            cancel: None,
        }
    }
}

impl NhoodEnrichmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permutations(mut self, n_perms: usize) -> Self {
        self.n_perms = n_perms;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn run<L>(
        &self,
        graph: &SpatialGraph,
        labels: &LabelAssignment<L>,
    ) -> Result<NhoodEnrichment<L>>
    where
        L: Clone + Ord + Hash + Debug,
    {
        self.run_on_adjacency(&graph.connectivities, labels)
    }

    /// Same as `run`, on a bare adjacency matrix.
    pub fn run_on_adjacency<L>(
        &self,
        adj: &CsMat<f64>,
        labels: &LabelAssignment<L>,
    ) -> Result<NhoodEnrichment<L>>
    where
        L: Clone + Ord + Hash + Debug,
    {
        if self.n_perms < 1 {
            return Err(SpatialError::InvalidParameter(
                "number of permutations must be >= 1".to_string(),
            ));
        }
        check_dims(adj, labels.len())?;
        if adj.nnz() == 0 {
            return Err(SpatialError::EmptyGraph(
                "adjacency has no edges to count".to_string(),
            ));
        }

        info!("Calculating pairwise enrichment/depletion on real data");
        let observed = tally_pairs(adj, labels.codes(), labels.n_categories());

        let mut engine = PermutationEngine::new(self.n_perms);
        if let Some(seed) = self.seed {
            engine = engine.with_seed(seed);
        }
        if let Some(progress) = &self.progress {
            engine = engine.with_progress(Arc::clone(progress));
        }
        if let Some(cancel) = &self.cancel {
            engine = engine.with_cancel(Arc::clone(cancel));
        }
        let null = engine.run(adj, labels)?;

        let results = EnrichmentScorer::score(&observed, &null, labels)?;
        let n_degenerate = results.iter().filter(|r| r.is_degenerate()).count();
        info!(
            "Scored {} label pairs ({} degenerate) over {} permutations",
            results.len(),
            n_degenerate,
            null.n_perms()
        );

        Ok(NhoodEnrichment {
            results,
            n_perms: null.n_perms(),
            seed: null.seed,
        })
    }
}
