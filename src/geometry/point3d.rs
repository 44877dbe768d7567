use geo::Coord;

/// x is longitude and y latitude, both in degrees.
/// z holds the elevation in meters, or 0 for points without one.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Point3D {
        Point3D { x, y, z }
    }

    pub fn from_xy(x: f64, y: f64) -> Point3D {
        Point3D { x, y, z: 0. }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn squared_distance_2d(&self, other: &Point3D) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    // the midpoint is always flat, z is dropped
    pub fn midpoint_2d(&self, other: &Point3D) -> Point3D {
        Point3D::from_xy((self.x + other.x) / 2., (self.y + other.y) / 2.)
    }

    /// slope of the line through self and other, infinite for vertical lines
    pub fn slope_to(&self, other: &Point3D) -> f64 {
        let dx = other.x - self.x;
        if dx.abs() < crate::FG_EPSILON {
            f64::INFINITY
        } else {
            (other.y - self.y) / dx
        }
    }

    pub fn coord(&self) -> Coord {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

impl From<Coord> for Point3D {
    fn from(c: Coord) -> Point3D {
        Point3D::from_xy(c.x, c.y)
    }
}

impl From<Point3D> for Coord {
    fn from(p: Point3D) -> Coord {
        p.coord()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slope_of_vertical_line_is_infinite() {
        let a = Point3D::from_xy(1., 1.);
        let b = Point3D::from_xy(1., 5.);

        assert!(a.slope_to(&b).is_infinite());
        assert_eq!(a.slope_to(&Point3D::from_xy(3., 2.)), 0.5);
    }

    #[test]
    fn midpoint_drops_elevation() {
        let a = Point3D::new(0., 0., 120.);
        let b = Point3D::new(2., 4., 80.);

        assert_eq!(a.midpoint_2d(&b), Point3D::new(1., 2., 0.));
    }
}
