use std::time::Duration;

use thiserror::Error;

use crate::geometry::AreaType;
use crate::steps::TileId;

pub type Result<T> = std::result::Result<T, Error>;

/// crate specific Error enum
#[derive(Error, Debug)]
pub enum Error {
    // malformed input
    #[error("Polygon {polygon} of area type {area} has no contours")]
    NoContours { area: AreaType, polygon: usize },
    #[error("Contour {contour} has no vertices")]
    EmptyContour { contour: usize },
    #[error("Contour index {0} is out of range")]
    ContourOutOfRange(usize),
    #[error("Node index {0} is not in the node registry")]
    NodeOutOfRange(usize),
    #[error("Invalid elevation grid: {0}")]
    InvalidGrid(String),
    #[error("Point ({x}, {y}) has a non-finite coordinate")]
    InvalidPoint { x: f64, y: f64 },
    #[error("Unknown area type code {0}")]
    UnknownAreaType(u32),

    // geometric degeneracy
    #[error("No interior point could be found for contour {contour}")]
    NoInteriorPoint { contour: usize },
    #[error("A convex hull polygon needs at least 3 non-collinear points, got {0} hull vertices")]
    DegenerateHull(usize),
    #[error("Point ({x}, {y}) is outside of the elevation grid")]
    OutsideGrid { x: f64, y: f64 },
    #[error("Contour {contour} of polygon {polygon} ({area}): {source}")]
    Feature {
        area: AreaType,
        polygon: usize,
        contour: usize,
        source: Box<Error>,
    },

    // external solver
    #[error("Unknown clip operation code {0}")]
    UnknownClipOp(u8),
    #[error("Unknown triangulation pass {0}, expected 1 or 2")]
    UnknownPass(u8),
    #[error("Invalid triangulation options: {0}")]
    InvalidOptions(String),
    #[error("Triangulator rejected a node: {0}")]
    Insertion(#[from] spade::InsertionError),
    #[error("Segment ({n1}, {n2}) crosses an already constrained segment")]
    ConflictingConstraint { n1: usize, n2: usize },
    #[error("The driver must be built before it can triangulate")]
    NotBuilt,
    #[error("The driver has no triangulation result yet")]
    NotTriangulated,

    // batch driver
    #[error("Tile {tile} failed: {source}")]
    Tile { tile: TileId, source: Box<Error> },
    #[error("Tile budget of {budget:?} exceeded after {elapsed:?}")]
    DeadlineExceeded { elapsed: Duration, budget: Duration },
    #[error("The worker processing this tile panicked")]
    WorkerPanicked,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
