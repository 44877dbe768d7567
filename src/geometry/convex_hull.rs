use geo::{LineString, Polygon};

use crate::geometry::Point3D;
use crate::{Error, Result};

use std::cmp::Ordering;

// points on the same ray from the centroid within this angle are one direction
const SAME_RAY: f64 = 1e-12;

/// counter clockwise hull vertices, without a repeated closing vertex
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    pub vertices: Vec<Point3D>,
}

impl ConvexHull {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// fewer than three vertices make no polygon
    pub fn to_polygon(&self) -> Result<Polygon> {
        if self.vertices.len() < 3 {
            return Err(Error::DegenerateHull(self.vertices.len()));
        }
        Ok(Polygon::new(
            LineString::from(self.vertices.iter().map(Point3D::coord).collect::<Vec<_>>()),
            vec![],
        ))
    }
}

struct Polar {
    angle: f64,
    dist_sq: f64,
    point: Point3D,
}

/// Convex hull of unordered points.
///
/// The points are sorted by their angle around the centroid and walked
/// once, popping every vertex that does not turn left. Collinear input
/// gives the two extreme points, coincident input a single point.
pub fn convex_hull(points: &[Point3D]) -> Result<ConvexHull> {
    if points.is_empty() {
        return Err(Error::DegenerateHull(0));
    }
    if let Some(p) = points.iter().find(|p| !(p.x.is_finite() && p.y.is_finite())) {
        return Err(Error::InvalidPoint { x: p.x, y: p.y });
    }

    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;

    let mut polar: Vec<Polar> = points
        .iter()
        .map(|&p| {
            let (dx, dy) = (p.x - cx, p.y - cy);
            Polar {
                angle: dy.atan2(dx),
                dist_sq: dx * dx + dy * dy,
                point: p,
            }
        })
        .filter(|p| p.dist_sq > 0.)
        .collect();

    if polar.is_empty() {
        // every point is the centroid
        return Ok(ConvexHull {
            vertices: vec![points[0]],
        });
    }

    polar.sort_by(|a, b| {
        a.angle
            .partial_cmp(&b.angle)
            .unwrap_or(Ordering::Equal)
            .then(b.dist_sq.partial_cmp(&a.dist_sq).unwrap_or(Ordering::Equal))
    });
    // only the farthest point of a ray can be on the hull
    polar.dedup_by(|later, kept| (later.angle - kept.angle).abs() < SAME_RAY);

    // the farthest point from the centroid is always a hull vertex
    let start = polar
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.dist_sq.partial_cmp(&b.dist_sq).unwrap_or(Ordering::Equal))
        .map_or(0, |(i, _)| i);
    polar.rotate_left(start);

    let mut stack: Vec<Point3D> = Vec::with_capacity(polar.len());
    for p in polar.iter().map(|p| p.point) {
        while stack.len() >= 2 && cross(&stack[stack.len() - 2], &stack[stack.len() - 1], &p) <= 0. {
            stack.pop();
        }
        stack.push(p);
    }
    // close the loop back to the start vertex
    while stack.len() >= 3 && cross(&stack[stack.len() - 2], &stack[stack.len() - 1], &stack[0]) <= 0. {
        stack.pop();
    }

    Ok(ConvexHull { vertices: stack })
}

// positive when a, b, c turn left
fn cross(a: &Point3D, b: &Point3D, c: &Point3D) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}
