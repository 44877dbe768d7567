use std::{num::NonZero, path::PathBuf, time::Duration};

#[derive(Clone, Debug)]
pub struct MeshParameters {
    // dem fit, bound on the largest squared residual in m²
    pub fit_error: f64,

    // triangulation
    pub min_angle: f64,
    pub max_steiner_points: Option<usize>,

    // batch driver
    pub tile_budget: Option<Duration>,
    pub threads: usize,

    // debug params
    pub debug_dump: Option<PathBuf>,
}

impl Default for MeshParameters {
    fn default() -> Self {
        Self {
            fit_error: 2.,
            min_angle: 10.,
            max_steiner_points: Some(100_000),
            tile_budget: Some(Duration::from_secs(60)),
            threads: std::thread::available_parallelism().map_or(4, NonZero::get),
            debug_dump: None,
        }
    }
}
