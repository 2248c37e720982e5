use std::fmt;
use std::str::FromStr;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use sprs::CsMat;

use crate::error::{Result, SpatialError};

/// Geometric regime used to build the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordType {
    /// Arbitrary point cloud: k-NN or radius neighbors.
    Generic,
    /// Regular hexagonal lattice (6 neighbors per spot) with ring expansion.
    Grid,
}

impl CoordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordType::Generic => "generic",
            CoordType::Grid => "grid",
        }
    }
}

impl FromStr for CoordType {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(CoordType::Generic),
            // hex-grid arrays are usually called after the Visium platform
            "grid" | "visium" => Ok(CoordType::Grid),
            other => Err(SpatialError::UnsupportedMode(format!(
                "unknown coordinate type `{}`",
                other
            ))),
        }
    }
}

impl fmt::Display for CoordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-hoc transform applied to the adjacency weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    #[default]
    None,
    /// Symmetric degree normalisation D^-1/2 A D^-1/2.
    Spectral,
    /// Cosine similarity between adjacency rows.
    Cosine,
}

impl Transform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transform::None => "none",
            Transform::Spectral => "spectral",
            Transform::Cosine => "cosine",
        }
    }
}

impl FromStr for Transform {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Transform::None),
            "spectral" => Ok(Transform::Spectral),
            "cosine" => Ok(Transform::Cosine),
            other => Err(SpatialError::UnsupportedMode(format!(
                "unknown transform `{}`",
                other
            ))),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphParams {
    pub coord_type: CoordType,
    pub n_neigh: usize,
    pub n_rings: usize,
    pub radius: Option<f64>,
    pub transform: Transform,
    // only consulted by the single-ring grid path; the other paths decide on their own
    pub return_distance: bool,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            coord_type: CoordType::Generic,
            n_neigh: 6,
            n_rings: 1,
            radius: None,
            transform: Transform::None,
            return_distance: false,
        }
    }
}

impl GraphParams {
    /// Fail fast on parameters that cannot produce a graph.
    pub fn validate(&self) -> Result<()> {
        if self.n_rings < 1 {
            return Err(SpatialError::InvalidParameter(format!(
                "n_rings must be >= 1, got {}",
                self.n_rings
            )));
        }
        if self.n_neigh < 1 {
            return Err(SpatialError::InvalidParameter(format!(
                "n_neigh must be >= 1, got {}",
                self.n_neigh
            )));
        }
        if let Some(r) = self.radius {
            if !(r.is_finite() && r > 0.0) {
                return Err(SpatialError::InvalidParameter(format!(
                    "radius must be a positive finite number, got {}",
                    r
                )));
            }
        }
        Ok(())
    }
}

// Custom PartialEq: approximate equality on the radius
impl PartialEq for GraphParams {
    fn eq(&self, other: &Self) -> bool {
        self.coord_type == other.coord_type
            && self.n_neigh == other.n_neigh
            && self.n_rings == other.n_rings
            && match (self.radius, other.radius) {
                (None, None) => true,
                (Some(a), Some(b)) => approx::relative_eq!(a, b),
                _ => false,
            }
            && self.transform == other.transform
            && self.return_distance == other.return_distance
    }
}

impl Eq for GraphParams {}

/// Record of how a graph was built, kept next to the matrices for
/// reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub n_neighbors: usize,
    pub coord_type: CoordType,
    pub n_rings: usize,
    pub radius: Option<f64>,
    pub transform: Transform,
}

/// Spatial neighbor graph: CSR connectivities plus optional distances.
///
/// Row `i` of `connectivities` lists the neighbors found for point `i`.
/// `distances` shares the adjacency's sparsity pattern and holds Euclidean
/// distances (generic regime) or ring numbers (grid regime).
#[derive(Debug, Clone)]
pub struct SpatialGraph {
    pub connectivities: CsMat<f64>,
    pub distances: Option<CsMat<f64>>,
    pub params: GraphParams,
}

impl SpatialGraph {
    pub fn n_nodes(&self) -> usize {
        self.connectivities.rows()
    }

    pub fn nnz(&self) -> usize {
        self.connectivities.nnz()
    }

    pub fn metadata(&self) -> GraphMetadata {
        GraphMetadata {
            n_neighbors: self.params.n_neigh,
            coord_type: self.params.coord_type,
            n_rings: self.params.n_rings,
            radius: self.params.radius,
            transform: self.params.transform,
        }
    }

    /// Row sums of the connectivities.
    pub fn degrees(&self) -> Vec<f64> {
        trace!("Computing degrees for {} nodes", self.n_nodes());
        self.connectivities
            .outer_iterator()
            .map(|row| row.iter().map(|(_, &w)| w).sum())
            .collect()
    }

    /// Number of stored neighbors per node.
    pub fn neighbor_counts(&self) -> Vec<usize> {
        self.connectivities
            .outer_iterator()
            .map(|row| row.nnz())
            .collect()
    }

    /// Neighbors of node `i` as `(j, weight)`.
    pub fn neighbors(&self, i: usize) -> Vec<(usize, f64)> {
        self.connectivities
            .outer_view(i)
            .map(|row| row.iter().map(|(j, &w)| (j, w)).collect())
            .unwrap_or_default()
    }

    /// Check that the connectivities are symmetric within tolerance.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let mut violations = 0usize;
        for (i, row) in self.connectivities.outer_iterator().enumerate() {
            for (j, &w) in row.iter() {
                let back = self.connectivities.get(j, i).copied().unwrap_or(0.0);
                if (w - back).abs() > tolerance {
                    violations += 1;
                }
            }
        }
        debug!("Symmetry check: {} violations", violations);
        violations == 0
    }

    pub fn statistics(&self) -> GraphStats {
        let degrees = self.degrees();
        let counts = self.neighbor_counts();
        let n = self.n_nodes();
        let min_degree = degrees.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max_degree = degrees.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let mean_degree = if n > 0 {
            degrees.iter().sum::<f64>() / n as f64
        } else {
            0.0
        };
        let isolated = counts.iter().filter(|&&c| c == 0).count();
        let total = (n * n).max(1);

        GraphStats {
            nnodes: n,
            nnz: self.nnz(),
            sparsity: (total - self.nnz()) as f64 / total as f64,
            min_degree,
            max_degree,
            mean_degree,
            isolated,
        }
    }
}

/// Summary figures for a built graph.
#[derive(Debug, Clone)]
pub struct GraphStats {
    pub nnodes: usize,
    pub nnz: usize,
    pub sparsity: f64,
    pub min_degree: f64,
    pub max_degree: f64,
    pub mean_degree: f64,
    pub isolated: usize,
}

impl fmt::Display for SpatialGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.n_nodes();
        writeln!(f, "SpatialGraph ({}×{}):", n, n)?;
        writeln!(f, "Parameters: {:?}", self.params)?;

        if n <= 10 {
            for (i, row) in self.connectivities.outer_iterator().enumerate() {
                write!(f, "Row {}: [", i)?;
                for j in 0..n {
                    let w = row.get(j).copied().unwrap_or(0.0);
                    write!(f, "{:8.4} ", w)?;
                }
                writeln!(f, "]")?;
            }
        } else {
            write!(f, "{}", self.statistics())?;
        }
        Ok(())
    }
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Statistics:")?;
        writeln!(f, "  Nodes: {}", self.nnodes)?;
        writeln!(
            f,
            "  Non-zero entries: {} ({:.2}% dense)",
            self.nnz,
            (1.0 - self.sparsity) * 100.0
        )?;
        writeln!(
            f,
            "  Degree range: [{:.4}, {:.4}], mean: {:.4}",
            self.min_degree, self.max_degree, self.mean_degree
        )?;
        writeln!(f, "  Isolated nodes: {}", self.isolated)?;
        Ok(())
    }
}
