pub mod batch;
pub mod build_tile;
pub mod deadline;

pub use self::batch::{run_batch, TileOutcome};
pub use self::build_tile::{build_tile, clip_features, TileJob};
pub use self::deadline::Deadline;

use std::fmt;

/// position of a tile in the batch, used in logs, errors and dump file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub x: i32,
    pub y: i32,
}

impl TileId {
    pub fn new(x: i32, y: i32) -> TileId {
        TileId { x, y }
    }

    pub fn stem(&self) -> String {
        format!("tile_{}_{}", self.x, self.y)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
