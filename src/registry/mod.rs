pub mod nodes;
pub mod segments;

pub use self::nodes::NodeRegistry;
pub use self::segments::{Segment, SegmentRegistry};
