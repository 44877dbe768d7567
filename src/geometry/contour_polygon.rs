use crate::geometry::Point3D;
use crate::registry::NodeRegistry;
use crate::{Error, Result};

/// one closed loop of node indices, the closing edge is implicit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    pub nodes: Vec<usize>,
    pub hole: bool,
    pub inside: Option<Point3D>,
}

/// A polygon whose vertices live in a `NodeRegistry`.
///
/// Contours are built up with `add_node`/`set_hole_flag` and get their
/// interior point from `calc_point_inside` once the polygon is complete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourPolygon {
    contours: Vec<Contour>,
}

impl ContourPolygon {
    pub fn new() -> ContourPolygon {
        ContourPolygon::default()
    }

    /// Appends a node to `contour`. Passing the current contour count
    /// starts a new contour.
    pub fn add_node(&mut self, contour: usize, node: usize) -> Result<()> {
        if contour == self.contours.len() {
            self.contours.push(Contour::default());
        }
        self.contours
            .get_mut(contour)
            .ok_or(Error::ContourOutOfRange(contour))?
            .nodes
            .push(node);
        Ok(())
    }

    pub fn set_hole_flag(&mut self, contour: usize, hole: bool) -> Result<()> {
        self.contour_mut(contour)?.hole = hole;
        Ok(())
    }

    pub fn get_hole_flag(&self, contour: usize) -> Result<bool> {
        Ok(self.contour(contour)?.hole)
    }

    pub fn contours(&self) -> usize {
        self.contours.len()
    }

    pub fn contour_size(&self, contour: usize) -> Result<usize> {
        Ok(self.contour(contour)?.nodes.len())
    }

    pub fn get_pt_index(&self, contour: usize, i: usize) -> Result<usize> {
        let c = self.contour(contour)?;
        c.nodes
            .get(i)
            .copied()
            .ok_or(Error::NodeOutOfRange(i))
    }

    pub fn contour(&self, contour: usize) -> Result<&Contour> {
        self.contours
            .get(contour)
            .ok_or(Error::ContourOutOfRange(contour))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contour> {
        self.contours.iter()
    }

    pub fn point_inside(&self, contour: usize) -> Result<Option<Point3D>> {
        Ok(self.contour(contour)?.inside)
    }

    pub fn set_point_inside(&mut self, contour: usize, p: Point3D) -> Result<()> {
        self.contour_mut(contour)?.inside = Some(p);
        Ok(())
    }

    /// Finds a point strictly inside `contour` and caches it.
    ///
    /// The edge from the lowest vertex to its flatter neighbour is the base.
    /// A vertical ray from the middle of the base is cut against every edge
    /// of the polygon, holes included, and the result is halfway between
    /// the base and the closest edge above it, however close that edge is.
    pub fn calc_point_inside(&mut self, contour: usize, nodes: &NodeRegistry) -> Result<Point3D> {
        let no_point = Error::NoInteriorPoint { contour };

        let c = self.contour(contour)?;
        if c.nodes.len() < 3 {
            return Err(no_point);
        }
        let ring = resolve(&c.nodes, nodes)?;
        let n = ring.len();

        // first vertex with the strictly smallest y
        let mut min = 0;
        for (i, p) in ring.iter().enumerate().skip(1) {
            if p.y < ring[min].y {
                min = i;
            }
        }

        let prev = (min + n - 1) % n;
        let next = (min + 1) % n;
        let slope_prev = ring[min].slope_to(&ring[prev]).abs();
        let slope_next = ring[min].slope_to(&ring[next]).abs();
        let ln = if slope_next <= slope_prev { next } else { prev };

        let m = ring[min].midpoint_2d(&ring[ln]);

        let mut p3: Option<f64> = None;
        for (j, other) in self.contours.iter().enumerate() {
            let other_ring = if j == contour {
                ring.clone()
            } else {
                resolve(&other.nodes, nodes)?
            };
            let len = other_ring.len();

            for i in 0..len {
                let k = (i + 1) % len;
                if j == contour && ((i == min && k == ln) || (i == ln && k == min)) {
                    continue;
                }
                if let Some(y) = vertical_cut(&other_ring[i], &other_ring[k], m.x) {
                    if y > m.y && p3.map_or(true, |best| y < best) {
                        p3 = Some(y);
                    }
                }
            }
        }

        let y = p3.ok_or(no_point)?;
        let mid = (m.y + y) / 2.;
        // too thin to put a point strictly between the base and the hit
        if !(mid > m.y && mid < y) {
            return Err(Error::NoInteriorPoint { contour });
        }
        let inside = Point3D::from_xy(m.x, mid);
        self.contour_mut(contour)?.inside = Some(inside);
        Ok(inside)
    }

    fn contour_mut(&mut self, contour: usize) -> Result<&mut Contour> {
        self.contours
            .get_mut(contour)
            .ok_or(Error::ContourOutOfRange(contour))
    }
}

fn resolve(indices: &[usize], nodes: &NodeRegistry) -> Result<Vec<Point3D>> {
    indices
        .iter()
        .map(|&i| nodes.get(i).copied().ok_or(Error::NodeOutOfRange(i)))
        .collect()
}

// y where the edge crosses the vertical line at x, vertical edges never do
fn vertical_cut(a: &Point3D, b: &Point3D, x: f64) -> Option<f64> {
    let slope = a.slope_to(b);
    if slope.is_infinite() {
        return None;
    }
    let (lo, hi) = if a.x < b.x { (a.x, b.x) } else { (b.x, a.x) };
    if x < lo || x > hi {
        return None;
    }
    Some(a.y + (x - a.x) * slope)
}
