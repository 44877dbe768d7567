pub mod driver;
pub mod poly_file;
pub mod spade_cdt;

pub use self::driver::TriangulationDriver;
pub use self::spade_cdt::SpadeTriangulator;

use crate::geometry::Point3D;
use crate::raster::DemGrid;
use crate::registry::Segment;
use crate::{Error, Result, ARCSEC_PER_DEGREE};

use log::{log, Level};

// largest quality bound the refinement is known to terminate for
pub const MAX_MIN_ANGLE: f64 = 34.;

/// point inside a region, every triangle reached from it gets `attribute`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionMarker {
    pub x: f64,
    pub y: f64,
    pub attribute: u32,
}

/// Everything the constrained Delaunay triangulator gets to see.
#[derive(Debug, Clone, Default)]
pub struct TriangulationInput {
    pub nodes: Vec<Point3D>,
    pub segments: Vec<Segment>,
    pub holes: Vec<Point3D>,
    pub regions: Vec<RegionMarker>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pass {
    /// refine until no angle is below `min_angle` degrees, 0 disables refinement
    Quality { min_angle: f64 },
    /// keep the node set exactly as it is
    NoNewPoints,
}

impl Pass {
    pub fn from_number(pass: u8, min_angle: f64) -> Result<Pass> {
        match pass {
            1 => Ok(Pass::Quality { min_angle }),
            2 => Ok(Pass::NoNewPoints),
            _ => Err(Error::UnknownPass(pass)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangulateOptions {
    /// `None` means no quality refinement and no new points
    pub min_angle: Option<f64>,
    pub max_steiner_points: Option<usize>,
}

impl TriangulateOptions {
    pub fn for_pass(pass: Pass, max_steiner_points: Option<usize>) -> Result<TriangulateOptions> {
        let min_angle = match pass {
            Pass::Quality { min_angle } if min_angle == 0. => None,
            Pass::Quality { min_angle } => Some(min_angle),
            Pass::NoNewPoints => None,
        };
        let options = TriangulateOptions {
            min_angle,
            max_steiner_points,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        match self.min_angle {
            Some(a) if !(a > 0. && a <= MAX_MIN_ANGLE) => Err(Error::InvalidOptions(format!(
                "minimum angle must be in (0, {MAX_MIN_ANGLE}] degrees, got {a}"
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub n1: usize,
    pub n2: usize,
    pub n3: usize,
    /// area type code of the region the triangle belongs to, 0 for none
    pub attribute: u32,
}

/// triangulator output, node z is always 0
#[derive(Debug, Clone, Default)]
pub struct RawMesh {
    pub nodes: Vec<Point3D>,
    pub segments: Vec<Segment>,
    pub triangles: Vec<Triangle>,
}

/// Constrained Delaunay triangulation of a planar straight line graph.
///
/// Hole markers remove every triangle reachable from them without crossing
/// a segment, region markers tag what they reach with their attribute.
pub trait Triangulator {
    fn triangulate(
        &self,
        input: &TriangulationInput,
        options: &TriangulateOptions,
    ) -> Result<RawMesh>;
}

/// The finished mesh of one tile.
#[derive(Debug, Clone, Default)]
pub struct TileMesh {
    pub nodes: Vec<Point3D>,
    pub segments: Vec<Segment>,
    pub triangles: Vec<Triangle>,
}

impl From<RawMesh> for TileMesh {
    fn from(raw: RawMesh) -> TileMesh {
        TileMesh {
            nodes: raw.nodes,
            segments: raw.segments,
            triangles: raw.triangles,
        }
    }
}

impl TileMesh {
    /// Sets the z of every node to the grid elevation below it.
    /// Nodes not used by any triangle keep z = 0.
    pub fn assign_elevations(&mut self, dem: &DemGrid) -> Result<()> {
        let mut used = vec![false; self.nodes.len()];
        for t in self.triangles.iter() {
            for n in [t.n1, t.n2, t.n3] {
                *used.get_mut(n).ok_or(Error::NodeOutOfRange(n))? = true;
            }
        }

        for (node, _) in self.nodes.iter_mut().zip(used).filter(|(_, u)| *u) {
            node.z = dem.interpolate_altitude(
                node.x * ARCSEC_PER_DEGREE,
                node.y * ARCSEC_PER_DEGREE,
            )?;
        }

        let orphans = self.orphan_nodes();
        if orphans > 0 {
            log!(Level::Debug, "{orphans} nodes are not part of any triangle");
        }
        Ok(())
    }

    /// number of nodes no triangle refers to, such as refinement points in holes
    pub fn orphan_nodes(&self) -> usize {
        let mut used = vec![false; self.nodes.len()];
        for t in self.triangles.iter() {
            for n in [t.n1, t.n2, t.n3] {
                if let Some(u) = used.get_mut(n) {
                    *u = true;
                }
            }
        }
        used.iter().filter(|u| !**u).count()
    }

    /// sum of the triangle areas in square degrees
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let (a, b, c) = (self.nodes[t.n1], self.nodes[t.n2], self.nodes[t.n3]);
                ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)).abs() / 2.
            })
            .sum()
    }

    pub fn centroid(&self, t: &Triangle) -> Point3D {
        let (a, b, c) = (self.nodes[t.n1], self.nodes[t.n2], self.nodes[t.n3]);
        Point3D::from_xy((a.x + b.x + c.x) / 3., (a.y + b.y + c.y) / 3.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_numbers() -> Result<()> {
        assert_eq!(Pass::from_number(1, 10.)?, Pass::Quality { min_angle: 10. });
        assert_eq!(Pass::from_number(2, 10.)?, Pass::NoNewPoints);
        assert!(matches!(Pass::from_number(3, 10.), Err(Error::UnknownPass(3))));
        Ok(())
    }

    #[test]
    fn options_per_pass() -> Result<()> {
        let quality = TriangulateOptions::for_pass(Pass::Quality { min_angle: 25. }, None)?;
        let plain = TriangulateOptions::for_pass(Pass::Quality { min_angle: 0. }, None)?;
        let second = TriangulateOptions::for_pass(Pass::NoNewPoints, Some(10))?;

        assert_eq!(quality.min_angle, Some(25.));
        assert_eq!(plain.min_angle, None);
        assert_eq!(second.min_angle, None);
        assert!(matches!(
            TriangulateOptions::for_pass(Pass::Quality { min_angle: 40. }, None),
            Err(Error::InvalidOptions(_))
        ));
        assert!(TriangulateOptions::for_pass(Pass::Quality { min_angle: -1. }, None).is_err());
        Ok(())
    }

    #[test]
    fn elevations_from_grid() -> Result<()> {
        let dem = DemGrid::flat((0., 0.), 3, 3., 3, 3., 250.)?;
        let mut mesh = TileMesh {
            nodes: vec![
                Point3D::from_xy(0., 0.),
                Point3D::from_xy(6. / 3600., 0.),
                Point3D::from_xy(0., 6. / 3600.),
                Point3D::from_xy(1., 1.),
            ],
            segments: vec![],
            triangles: vec![Triangle {
                n1: 0,
                n2: 1,
                n3: 2,
                attribute: 0,
            }],
        };

        mesh.assign_elevations(&dem)?;

        assert!(mesh.nodes[..3].iter().all(|n| (n.z - 250.).abs() < 1e-9));
        // far outside the grid but unused, so it is left alone
        assert_eq!(mesh.nodes[3].z, 0.);
        assert_eq!(mesh.orphan_nodes(), 1);
        Ok(())
    }
}
