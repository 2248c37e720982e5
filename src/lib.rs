//! # spotgraph
//!
//! Spatial neighbor graphs over spot/cell coordinates and a permutation-based
//! neighborhood enrichment test for categorical labels.
//!
//! ```
//! use spotgraph::builder::SpatialNeighborsBuilder;
//! use spotgraph::enrichment::NhoodEnrichmentBuilder;
//! use spotgraph::labels::LabelAssignment;
//! use spotgraph::points::PointSet;
//!
//! let points = PointSet::new(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
//! let graph = SpatialNeighborsBuilder::new()
//!     .with_n_neigh(2)
//!     .build(&points)
//!     .unwrap();
//! assert_eq!(graph.nnz(), 8);
//!
//! let labels = LabelAssignment::new(&["a", "a", "b", "b"]).unwrap();
//! let report = NhoodEnrichmentBuilder::new()
//!     .with_permutations(20)
//!     .with_seed(42)
//!     .run(&graph, &labels)
//!     .unwrap();
//! assert_eq!(report.results.len(), 1);
//! ```

pub mod builder;
pub mod counting;
pub mod enrichment;
pub mod error;
pub mod graph;
pub mod graph_factory;
pub mod labels;
pub mod permutation;
pub mod points;
pub mod transforms;

pub use error::{Result, SpatialError};

#[cfg(test)]
mod tests;
