pub mod area_type;
pub mod contour_polygon;
pub mod convex_hull;
pub mod feature_polygon;
pub mod point3d;

pub use self::area_type::AreaType;
pub use self::contour_polygon::ContourPolygon;
pub use self::convex_hull::{convex_hull, ConvexHull};
pub use self::feature_polygon::{AreaPolygons, FeatureContour, FeaturePolygon};
pub use self::point3d::Point3D;
