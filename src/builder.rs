use crate::error::Result;
use crate::graph::{CoordType, GraphParams, SpatialGraph, Transform};
use crate::graph_factory::GraphFactory;
use crate::points::PointSet;

use log::{debug, info};

pub struct SpatialNeighborsBuilder {
    params: GraphParams,
}

impl Default for SpatialNeighborsBuilder {
    fn default() -> Self {
        debug!("Creating SpatialNeighborsBuilder with default parameters");
        Self {
            params: GraphParams::default(),
        }
    }
}

impl SpatialNeighborsBuilder {
    pub fn new() -> Self {
        info!("Initializing new SpatialNeighborsBuilder");
        Self::default()
    }

    /// Start from an existing parameter set, e.g. one read back from
    /// `GraphMetadata`.
    pub fn from_params(params: GraphParams) -> Self {
        Self { params }
    }

    // -------------------- Geometry --------------------

    pub fn with_coord_type(mut self, coord_type: CoordType) -> Self {
        info!("Setting coordinate type: {}", coord_type);
        self.params.coord_type = coord_type;
        self
    }

    /// Number of nearest neighbors for generic coordinates.
    pub fn with_n_neigh(mut self, n_neigh: usize) -> Self {
        info!("Setting n_neigh: {}", n_neigh);
        self.params.n_neigh = n_neigh;
        self
    }

    /// Number of neighbor rings for grid coordinates.
    pub fn with_n_rings(mut self, n_rings: usize) -> Self {
        info!("Setting n_rings: {}", n_rings);
        self.params.n_rings = n_rings;
        self
    }

    /// Use radius neighbors instead of k-NN for generic coordinates.
    pub fn with_radius(mut self, radius: Option<f64>) -> Self {
        info!("Setting radius: {:?}", radius);
        self.params.radius = radius;
        self
    }

    // -------------------- Weights --------------------

    pub fn with_transform(mut self, transform: Transform) -> Self {
        info!("Setting transform: {}", transform);
        self.params.transform = transform;
        self
    }

    /// Ask the single-ring grid path for its ring matrix.
    pub fn with_distances(mut self, return_distance: bool) -> Self {
        self.params.return_distance = return_distance;
        self
    }

    pub fn params(&self) -> &GraphParams {
        &self.params
    }

    // -------------------- Build --------------------

    /// Build the spatial graph over `points`.
    ///
    /// Parameters are validated before any neighbor query runs.
    pub fn build(&self, points: &PointSet) -> Result<SpatialGraph> {
        debug!("Build configuration: {:?}", self.params);
        let graph = GraphFactory::build(points, &self.params)?;
        debug!("{}", graph.statistics());
        Ok(graph)
    }
}
