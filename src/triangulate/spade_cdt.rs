use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{
    AngleLimit, ConstrainedDelaunayTriangulation, Point2, PositionInTriangulation,
    RefinementParameters, Triangulation,
};

use log::{log, Level};

use super::{
    RawMesh, RegionMarker, Triangle, TriangulateOptions, TriangulationInput, Triangulator,
};
use crate::geometry::Point3D;
use crate::registry::Segment;
use crate::{Error, Result};

use std::collections::VecDeque;

type Cdt = ConstrainedDelaunayTriangulation<Point2<f64>>;

/// `Triangulator` on top of spade's constrained Delaunay triangulation and
/// its Ruppert style refinement.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpadeTriangulator;

impl Triangulator for SpadeTriangulator {
    fn triangulate(
        &self,
        input: &TriangulationInput,
        options: &TriangulateOptions,
    ) -> Result<RawMesh> {
        options.validate()?;
        if let Some(p) = input.nodes.iter().find(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(Error::InvalidPoint { x: p.x, y: p.y });
        }

        let mut cdt = Cdt::new();
        let mut handles = Vec::with_capacity(input.nodes.len());
        for p in input.nodes.iter() {
            handles.push(cdt.insert(Point2::new(p.x, p.y))?);
        }

        for s in input.segments.iter() {
            let from = *handles.get(s.n1).ok_or(Error::NodeOutOfRange(s.n1))?;
            let to = *handles.get(s.n2).ok_or(Error::NodeOutOfRange(s.n2))?;
            if from == to {
                continue;
            }
            if !cdt.can_add_constraint(from, to) {
                return Err(Error::ConflictingConstraint { n1: s.n1, n2: s.n2 });
            }
            cdt.add_constraint(from, to);
        }

        if let Some(angle) = options.min_angle {
            let mut parameters =
                RefinementParameters::<f64>::new().with_angle_limit(AngleLimit::from_deg(angle));
            if let Some(max) = options.max_steiner_points {
                parameters = parameters.with_max_additional_vertices(max);
            }
            let before = cdt.num_vertices();
            let result = cdt.refine(parameters);
            if !result.refinement_complete {
                log!(
                    Level::Warn,
                    "Refinement to {angle} degrees stopped after {} new points",
                    cdt.num_vertices() - before
                );
            }
        }

        let attributes = mark_faces(&cdt, &input.holes, &input.regions);

        let nodes = cdt
            .vertices()
            .map(|v| Point3D::from_xy(v.position().x, v.position().y))
            .collect();

        let segments = cdt
            .undirected_edges()
            .filter(|e| cdt.is_constraint_edge(e.fix()))
            .map(|e| {
                let [a, b] = e.vertices();
                Segment::new(a.fix().index(), b.fix().index())
            })
            .collect();

        let mut triangles = Vec::with_capacity(cdt.num_inner_faces());
        for face in cdt.inner_faces() {
            if let Some(attribute) = attributes[face.fix().index()] {
                let [a, b, c] = face.vertices();
                triangles.push(Triangle {
                    n1: a.fix().index(),
                    n2: b.fix().index(),
                    n3: c.fix().index(),
                    attribute,
                });
            }
        }

        Ok(RawMesh {
            nodes,
            segments,
            triangles,
        })
    }
}

// attribute per face index, None for faces in holes
fn mark_faces(
    cdt: &Cdt,
    holes: &[Point3D],
    regions: &[RegionMarker],
) -> Vec<Option<u32>> {
    let mut attributes = vec![Some(0); cdt.num_all_faces()];
    let mut in_hole = vec![false; cdt.num_all_faces()];

    for hole in holes {
        match locate_face(cdt, hole.x, hole.y) {
            Some(start) => flood(cdt, start, &mut in_hole, |_| true, |_| {}),
            None => log!(
                Level::Warn,
                "Hole marker ({}, {}) is outside the triangulation",
                hole.x,
                hole.y
            ),
        }
    }

    for region in regions {
        let Some(start) = locate_face(cdt, region.x, region.y) else {
            log!(
                Level::Warn,
                "Region marker ({}, {}) is outside the triangulation",
                region.x,
                region.y
            );
            continue;
        };
        if in_hole[start.index()] {
            log!(
                Level::Debug,
                "Region marker ({}, {}) lies in a hole",
                region.x,
                region.y
            );
            continue;
        }

        let mut seen = vec![false; cdt.num_all_faces()];
        let mut reached = Vec::new();
        flood(cdt, start, &mut seen, |f| !in_hole[f], |f| reached.push(f));
        for f in reached {
            attributes[f] = Some(region.attribute);
        }
    }

    for (a, hole) in attributes.iter_mut().zip(in_hole) {
        if hole {
            *a = None;
        }
    }
    attributes
}

// marks every face reachable from start without crossing a constraint edge
fn flood(
    cdt: &Cdt,
    start: FixedFaceHandle<InnerTag>,
    marked: &mut [bool],
    passable: impl Fn(usize) -> bool,
    mut visit: impl FnMut(usize),
) {
    if marked[start.index()] || !passable(start.index()) {
        return;
    }
    marked[start.index()] = true;
    let mut queue = VecDeque::from([start]);

    while let Some(f) = queue.pop_front() {
        visit(f.index());
        for edge in cdt.face(f).adjacent_edges() {
            if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                continue;
            }
            if let Some(next) = edge.rev().face().as_inner() {
                let i = next.fix().index();
                if !marked[i] && passable(i) {
                    marked[i] = true;
                    queue.push_back(next.fix());
                }
            }
        }
    }
}

fn locate_face(cdt: &Cdt, x: f64, y: f64) -> Option<FixedFaceHandle<InnerTag>> {
    match cdt.locate(Point2::new(x, y)) {
        PositionInTriangulation::OnFace(face) => Some(face),
        PositionInTriangulation::OnEdge(edge) => {
            let edge = cdt.directed_edge(edge);
            edge.face()
                .as_inner()
                .or_else(|| edge.rev().face().as_inner())
                .map(|f| f.fix())
        }
        PositionInTriangulation::OnVertex(vertex) => cdt
            .vertex(vertex)
            .out_edges()
            .find_map(|e| e.face().as_inner())
            .map(|f| f.fix()),
        PositionInTriangulation::OutsideOfConvexHull(_)
        | PositionInTriangulation::NoTriangulation => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_input() -> TriangulationInput {
        // unit square with an inner square from 0.25 to 0.75
        let xy = [
            (0., 0.),
            (1., 0.),
            (1., 1.),
            (0., 1.),
            (0.25, 0.25),
            (0.75, 0.25),
            (0.75, 0.75),
            (0.25, 0.75),
        ];
        TriangulationInput {
            nodes: xy.iter().map(|&(x, y)| Point3D::from_xy(x, y)).collect(),
            segments: vec![
                Segment::new(4, 5),
                Segment::new(5, 6),
                Segment::new(6, 7),
                Segment::new(7, 4),
            ],
            holes: vec![],
            regions: vec![],
        }
    }

    fn area(mesh: &RawMesh, attribute: u32) -> f64 {
        mesh.triangles
            .iter()
            .filter(|t| t.attribute == attribute)
            .map(|t| {
                let (a, b, c) = (mesh.nodes[t.n1], mesh.nodes[t.n2], mesh.nodes[t.n3]);
                ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)).abs() / 2.
            })
            .sum()
    }

    fn plain() -> TriangulateOptions {
        TriangulateOptions {
            min_angle: None,
            max_steiner_points: None,
        }
    }

    #[test]
    fn two_triangles_for_a_square() -> Result<()> {
        let input = TriangulationInput {
            nodes: square_input().nodes[..4].to_vec(),
            ..Default::default()
        };

        let mesh = SpadeTriangulator.triangulate(&input, &plain())?;

        assert_eq!(mesh.nodes.len(), 4);
        assert_eq!(mesh.triangles.len(), 2);
        assert!(mesh.triangles.iter().all(|t| t.attribute == 0));
        Ok(())
    }

    #[test]
    fn segments_are_kept() -> Result<()> {
        let mesh = SpadeTriangulator.triangulate(&square_input(), &plain())?;

        assert_eq!(mesh.nodes.len(), 8);
        assert_eq!(mesh.segments.len(), 4);
        for s in square_input().segments {
            assert!(mesh.segments.contains(&s));
        }
        Ok(())
    }

    #[test]
    fn regions_and_holes() -> Result<()> {
        let mut input = square_input();
        input.regions.push(RegionMarker {
            x: 0.5,
            y: 0.5,
            attribute: 3,
        });

        let mesh = SpadeTriangulator.triangulate(&input, &plain())?;
        assert!((area(&mesh, 3) - 0.25).abs() < 1e-12);
        assert!((area(&mesh, 0) - 0.75).abs() < 1e-12);

        input.regions.clear();
        input.holes.push(Point3D::from_xy(0.5, 0.5));

        let mesh = SpadeTriangulator.triangulate(&input, &plain())?;
        assert!((area(&mesh, 0) - 0.75).abs() < 1e-12);
        assert_eq!(mesh.triangles.len(), 8);
        Ok(())
    }

    #[test]
    fn later_regions_win() -> Result<()> {
        let mut input = square_input();
        for attribute in [2, 5] {
            input.regions.push(RegionMarker {
                x: 0.1,
                y: 0.1,
                attribute,
            });
        }

        let mesh = SpadeTriangulator.triangulate(&input, &plain())?;

        assert!((area(&mesh, 5) - 0.75).abs() < 1e-12);
        assert!(area(&mesh, 2).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn refinement_adds_points() -> Result<()> {
        // a long thin rectangle triangulates into sharp triangles
        let input = TriangulationInput {
            nodes: [(0., 0.), (10., 0.), (10., 0.5), (0., 0.5)]
                .iter()
                .map(|&(x, y)| Point3D::from_xy(x, y))
                .collect(),
            ..Default::default()
        };
        let options = TriangulateOptions {
            min_angle: Some(20.),
            max_steiner_points: Some(1000),
        };

        let mesh = SpadeTriangulator.triangulate(&input, &options)?;

        assert!(mesh.nodes.len() > 4);
        assert!((area(&mesh, 0) - 5.).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn steiner_cap_bounds_refinement() -> Result<()> {
        let input = TriangulationInput {
            nodes: [(0., 0.), (10., 0.), (10., 0.5), (0., 0.5)]
                .iter()
                .map(|&(x, y)| Point3D::from_xy(x, y))
                .collect(),
            ..Default::default()
        };
        let capped = |max| TriangulateOptions {
            min_angle: Some(20.),
            max_steiner_points: Some(max),
        };

        let few = SpadeTriangulator.triangulate(&input, &capped(3))?;
        let many = SpadeTriangulator.triangulate(&input, &capped(1000))?;

        assert!(few.nodes.len() < many.nodes.len());
        assert!((area(&few, 0) - 5.).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn crossing_segments_fail() {
        let input = TriangulationInput {
            nodes: [(0., 0.), (1., 0.), (1., 1.), (0., 1.)]
                .iter()
                .map(|&(x, y)| Point3D::from_xy(x, y))
                .collect(),
            segments: vec![Segment::new(0, 2), Segment::new(1, 3)],
            ..Default::default()
        };

        assert!(matches!(
            SpadeTriangulator.triangulate(&input, &plain()),
            Err(Error::ConflictingConstraint { n1: 1, n2: 3 })
        ));
    }

    #[test]
    fn huge_coordinates_are_rejected_by_spade() {
        let input = TriangulationInput {
            nodes: vec![
                Point3D::from_xy(0., 0.),
                Point3D::from_xy(1., 0.),
                Point3D::from_xy(1e100, 1.),
            ],
            ..Default::default()
        };

        let result = SpadeTriangulator.triangulate(&input, &plain());
        assert!(matches!(
            result,
            Err(Error::Insertion(spade::InsertionError::TooLarge))
        ));
    }
}
