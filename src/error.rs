//! Error types shared by graph construction and the enrichment test.

use thiserror::Error;

/// Errors raised while building spatial graphs or scoring label enrichment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpatialError {
    /// Bad arguments: non-positive k, radius, ring or permutation count,
    /// empty or malformed input.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unknown coordinate type or transform name.
    #[error("unsupported mode: {0}")]
    UnsupportedMode(String),

    /// The spatial index could not be built or queried.
    #[error("neighbor index error: {0}")]
    NeighborIndex(String),

    /// The adjacency matrix has no nonzero entries after construction.
    #[error("empty graph: {0}")]
    EmptyGraph(String),

    /// Permutation standard deviation is zero for this label pair, so the
    /// z-score is undefined.
    #[error("degenerate null distribution for pair ({label_i}, {label_j})")]
    DegenerateNull { label_i: String, label_j: String },

    /// A label pair of the observed table never appeared in the permutations.
    #[error("missing null data: {0}")]
    MissingNullData(String),

    /// The permutation run was cancelled between trials.
    #[error("cancelled after {completed} of {total} permutations")]
    Cancelled { completed: usize, total: usize },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SpatialError>;
