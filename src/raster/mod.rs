pub mod dem;

pub use self::dem::{DemGrid, FitRegion, FittedGrid};
