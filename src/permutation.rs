//! Null distribution of label-pair counts by random relabeling.
//!
//! Each trial shuffles the label codes across positions (a permutation, so the
//! label multiset never changes) and re-counts label pairs on the same
//! adjacency. Trials run in parallel; trial `t` draws from its own ChaCha8
//! stream `t` under a shared base seed, so a fixed seed reproduces the same
//! null regardless of thread scheduling.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use sprs::CsMat;

use crate::counting::{check_dims, tally_pairs, PairObservation};
use crate::error::{Result, SpatialError};
use crate::labels::LabelAssignment;

/// Progress hook called with `(completed, total)` after every trial.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Pair table of one permutation trial.
#[derive(Debug, Clone, PartialEq)]
pub struct PermutationRun {
    pub index: usize,
    pub observations: Vec<PairObservation>,
}

/// All trials of one permutation test.
#[derive(Debug, Clone)]
pub struct NullDistribution {
    pub seed: u64,
    pub n_categories: usize,
    pub runs: Vec<PermutationRun>,
}

impl NullDistribution {
    pub fn n_perms(&self) -> usize {
        self.runs.len()
    }
}

#[derive(Clone)]
pub struct PermutationEngine {
    n_perms: usize,
    seed: Option<u64>,
    progress: Option<ProgressFn>,
    cancel: Option<Arc<AtomicBool>>,
}

impl fmt::Debug for PermutationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermutationEngine")
            .field("n_perms", &self.n_perms)
            .field("seed", &self.seed)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

impl PermutationEngine {
    pub fn new(n_perms: usize) -> Self {
        Self {
            n_perms,
            seed: None,
            progress: None,
            cancel: None,
        }
    }

    /// Fix the base seed; without it a fresh seed is drawn per run.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Flag checked before each trial; setting it aborts the run.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn n_perms(&self) -> usize {
        self.n_perms
    }

    /// Codes of trial `index` under `seed`.
    pub fn shuffled_codes(codes: &[u32], seed: u64, index: usize) -> Vec<u32> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(index as u64);
        let mut shuffled = codes.to_vec();
        shuffled.shuffle(&mut rng);
        shuffled
    }

    pub fn run<L>(&self, adj: &CsMat<f64>, labels: &LabelAssignment<L>) -> Result<NullDistribution>
    where
        L: Clone + Ord + Hash + fmt::Debug,
    {
        if self.n_perms < 1 {
            return Err(SpatialError::InvalidParameter(
                "number of permutations must be >= 1".to_string(),
            ));
        }
        check_dims(adj, labels.len())?;

        let seed = self.seed.unwrap_or_else(rand::random::<u64>);
        let total = self.n_perms;
        let n_categories = labels.n_categories();
        let codes = labels.codes();
        info!(
            "Calculating pairwise enrichment/depletion over {} permutations (seed {})",
            total, seed
        );

        let completed = AtomicUsize::new(0);
        let log_every = (total / 10).max(1);

        let runs = (0..total)
            .into_par_iter()
            .map(|index| {
                if let Some(cancel) = &self.cancel {
                    if cancel.load(Ordering::Relaxed) {
                        return Err(SpatialError::Cancelled {
                            completed: completed.load(Ordering::Relaxed),
                            total,
                        });
                    }
                }

                let shuffled = Self::shuffled_codes(codes, seed, index);
                let observations = tally_pairs(adj, &shuffled, n_categories);

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % log_every == 0 {
                    debug!("{} out of {} permutations", done, total);
                }
                if let Some(progress) = &self.progress {
                    progress(done, total);
                }
                Ok(PermutationRun {
                    index,
                    observations,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(NullDistribution {
            seed,
            n_categories,
            runs,
        })
    }
}
