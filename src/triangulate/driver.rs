use geo::{Intersects, Point};
use log::{log, Level};

use super::{
    Pass, RawMesh, RegionMarker, SpadeTriangulator, TileMesh, Triangle, TriangulateOptions,
    TriangulationInput, Triangulator,
};
use crate::geometry::{convex_hull, AreaPolygons, AreaType, ContourPolygon, Point3D};
use crate::registry::{NodeRegistry, Segment, SegmentRegistry};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Empty,
    Built,
    Triangulated,
}

/// Assembles the nodes, segments and markers of one tile and runs the
/// triangulator on them.
///
/// `build` (or `rebuild`) has to come before `run_triangulate`, the results
/// are available once a pass has run.
#[derive(Debug)]
pub struct TriangulationDriver<T = SpadeTriangulator> {
    triangulator: T,
    max_steiner_points: Option<usize>,
    state: State,

    nodes: NodeRegistry,
    segments: SegmentRegistry,
    polygons: Vec<(AreaType, ContourPolygon)>,
    holes: Vec<Point3D>,
    regions: Vec<RegionMarker>,

    out_nodes: NodeRegistry,
    out_segments: SegmentRegistry,
    triangles: Vec<Triangle>,
}

impl Default for TriangulationDriver<SpadeTriangulator> {
    fn default() -> Self {
        TriangulationDriver::new(SpadeTriangulator)
    }
}

impl<T: Triangulator> TriangulationDriver<T> {
    pub fn new(triangulator: T) -> TriangulationDriver<T> {
        TriangulationDriver {
            triangulator,
            max_steiner_points: None,
            state: State::Empty,
            nodes: NodeRegistry::new(),
            segments: SegmentRegistry::new(),
            polygons: Vec::new(),
            holes: Vec::new(),
            regions: Vec::new(),
            out_nodes: NodeRegistry::new(),
            out_segments: SegmentRegistry::new(),
            triangles: Vec::new(),
        }
    }

    pub fn with_steiner_limit(mut self, max_steiner_points: Option<usize>) -> Self {
        self.max_steiner_points = max_steiner_points;
        self
    }

    /// Fills the registries from the tile corners, the fitted terrain points
    /// and the clipped feature polygons.
    ///
    /// Corners and polygon vertices are merged with the fine tolerance so
    /// they reach the mesh unchanged, fitted points with the coarse one.
    /// Every contour edge is split at the nodes lying on it.
    pub fn build(
        &mut self,
        corners: &[Point3D],
        fitted: &[Point3D],
        areas: &AreaPolygons,
    ) -> Result<()> {
        self.clear();

        for p in corners {
            check_point(p)?;
            self.nodes.unique_add(*p);
        }

        for (area, polygons) in areas.iter() {
            for (index, feature) in polygons.iter().enumerate() {
                if feature.is_empty() {
                    return Err(Error::NoContours {
                        area,
                        polygon: index,
                    });
                }

                let mut poly = ContourPolygon::new();
                for (c, contour) in feature.contours().iter().enumerate() {
                    let mut ring: Vec<usize> = Vec::with_capacity(contour.vertices.len());
                    for v in contour.vertices.iter() {
                        let p = Point3D::from(*v);
                        check_point(&p)?;
                        ring.push(self.nodes.unique_add(p));
                    }
                    // vertices merged into their neighbour
                    ring.dedup();
                    if ring.len() > 1 && ring.first() == ring.last() {
                        ring.pop();
                    }
                    if ring.is_empty() {
                        return Err(Error::EmptyContour { contour: c });
                    }

                    for n in ring {
                        poly.add_node(c, n)?;
                    }
                    poly.set_hole_flag(c, contour.hole)?;
                }

                for c in 0..poly.contours() {
                    poly.calc_point_inside(c, &self.nodes)
                        .map_err(|e| Error::Feature {
                            area,
                            polygon: index,
                            contour: c,
                            source: Box::new(e),
                        })?;
                }
                log!(
                    Level::Debug,
                    "{area} polygon {index} with {} contours",
                    poly.contours()
                );
                self.polygons.push((area, poly));
            }
        }

        for p in fitted {
            check_point(p)?;
            self.nodes.course_add(*p);
        }

        for (_, poly) in self.polygons.iter() {
            for contour in poly.iter() {
                let n = contour.nodes.len();
                for i in 0..n {
                    let s = Segment::new(contour.nodes[i], contour.nodes[(i + 1) % n]);
                    self.segments.unique_divide_and_add(self.nodes.nodes(), s);
                }
            }
        }

        self.collect_markers();
        self.state = State::Built;

        log!(
            Level::Info,
            "Built {} nodes, {} segments, {} holes and {} regions",
            self.nodes.len(),
            self.segments.len(),
            self.holes.len(),
            self.regions.len()
        );
        Ok(())
    }

    /// Replaces the nodes and segments with an already assembled set,
    /// keeping the hole and region markers of the last build.
    pub fn rebuild(&mut self, nodes: &[Point3D], segments: &[Segment]) -> Result<()> {
        self.nodes.clear();
        self.segments.clear();
        self.clear_output();

        for p in nodes {
            check_point(p)?;
            self.nodes.simple_add(*p);
        }
        for s in segments {
            for n in [s.n1, s.n2] {
                if n >= nodes.len() {
                    return Err(Error::NodeOutOfRange(n));
                }
            }
            self.segments.unique_add(*s);
        }

        self.state = State::Built;
        Ok(())
    }

    /// the triangulator input made from the current registries and markers
    pub fn input(&self) -> Result<TriangulationInput> {
        if self.state == State::Empty {
            return Err(Error::NotBuilt);
        }
        Ok(TriangulationInput {
            nodes: self.nodes.nodes().to_vec(),
            segments: self.segments.segments().to_vec(),
            holes: self.holes.clone(),
            regions: self.regions.clone(),
        })
    }

    /// Runs one triangulation pass and keeps its output, returns the
    /// number of triangles.
    pub fn run_triangulate(&mut self, pass: Pass) -> Result<usize> {
        let input = self.input()?;
        let options = TriangulateOptions::for_pass(pass, self.max_steiner_points)?;
        log!(Level::Info, "Triangulating {pass:?} with {options:?}");

        let RawMesh {
            nodes,
            segments,
            triangles,
        } = self.triangulator.triangulate(&input, &options)?;

        if let Pass::NoNewPoints = pass {
            if nodes.len() != input.nodes.len() {
                return Err(Error::InvalidOptions(format!(
                    "triangulator added {} points in a pass that forbids them",
                    nodes.len().saturating_sub(input.nodes.len())
                )));
            }
        }

        self.clear_output();
        for p in nodes {
            self.out_nodes.simple_add(p);
        }
        for s in segments {
            self.out_segments.unique_add(s);
        }
        self.triangles = triangles;
        self.state = State::Triangulated;

        log!(
            Level::Info,
            "Triangulation gave {} nodes and {} triangles",
            self.out_nodes.len(),
            self.triangles.len()
        );
        Ok(self.triangles.len())
    }

    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    pub fn segments(&self) -> &SegmentRegistry {
        &self.segments
    }

    pub fn polygons(&self) -> &[(AreaType, ContourPolygon)] {
        &self.polygons
    }

    pub fn out_nodes(&self) -> Result<&NodeRegistry> {
        self.triangulated()?;
        Ok(&self.out_nodes)
    }

    pub fn out_segments(&self) -> Result<&SegmentRegistry> {
        self.triangulated()?;
        Ok(&self.out_segments)
    }

    pub fn triangles(&self) -> Result<&[Triangle]> {
        self.triangulated()?;
        Ok(&self.triangles)
    }

    pub fn into_mesh(self) -> Result<TileMesh> {
        self.triangulated()?;
        Ok(TileMesh {
            nodes: self.out_nodes.nodes().to_vec(),
            segments: self.out_segments.segments().to_vec(),
            triangles: self.triangles,
        })
    }

    fn triangulated(&self) -> Result<()> {
        match self.state {
            State::Triangulated => Ok(()),
            _ => Err(Error::NotTriangulated),
        }
    }

    // airport ignore outlines become holes, other outlines regions with their code
    fn collect_markers(&mut self) {
        for (area, poly) in self.polygons.iter() {
            for contour in poly.iter().filter(|c| !c.hole) {
                let Some(p) = contour.inside else {
                    continue;
                };
                if area.is_hole() {
                    self.holes.push(p);
                } else {
                    self.regions.push(RegionMarker {
                        x: p.x,
                        y: p.y,
                        attribute: area.code(),
                    });
                }
            }
        }

        // markers outside of every node's hull can not seed anything
        match convex_hull(self.nodes.nodes()).and_then(|hull| hull.to_polygon()) {
            Ok(hull) => {
                let markers = self.holes.iter().map(|p| (p.x, p.y));
                let regions = self.regions.iter().map(|r| (r.x, r.y));
                for (x, y) in markers.chain(regions) {
                    if !hull.intersects(&Point::new(x, y)) {
                        log!(Level::Warn, "Marker ({x}, {y}) is outside of the node hull");
                    }
                }
            }
            Err(e) => log!(Level::Warn, "No hull around the tile nodes: {e}"),
        }
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.segments.clear();
        self.polygons.clear();
        self.holes.clear();
        self.regions.clear();
        self.clear_output();
        self.state = State::Empty;
    }

    fn clear_output(&mut self) {
        self.out_nodes.clear();
        self.out_segments.clear();
        self.triangles.clear();
    }
}

fn check_point(p: &Point3D) -> Result<()> {
    if p.x.is_finite() && p.y.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidPoint { x: p.x, y: p.y })
    }
}
