pub mod clip;
pub mod error;
pub mod geometry;
pub mod least_squares;
pub mod parameters;
pub mod raster;
pub mod registry;
pub mod steps;
pub mod triangulate;

// tolerances are in degrees, the unit of every node handed to the registries
pub const FG_EPSILON: f64 = 0.000_000_1;
// fine tolerance, used for tile corners and feature polygon vertices
pub const FG_PROXIMITY_EPSILON: f64 = 0.000_001;
// coarse tolerance, used only for the bulk of fitted terrain points
pub const FG_COURSE_EPSILON: f64 = 0.000_3;

pub const ARCSEC_PER_DEGREE: f64 = 3600.;
// marks output grid cells that the fit did not keep
pub const NO_DATA: f64 = -9999.;

pub const STACK_SIZE: usize = 8; // worker thread stack size in MiB

pub use error::{Error, Result};
pub use parameters::MeshParameters;
