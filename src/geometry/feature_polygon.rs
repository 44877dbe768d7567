use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};

use crate::geometry::AreaType;
use crate::{Error, Result};

use std::collections::BTreeMap;

/// one vertex loop of a feature, without the repeated closing vertex
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureContour {
    pub vertices: Vec<Coord>,
    pub hole: bool,
}

/// Feature polygon in plain coordinates, the way clip results and raw
/// feature input are handed around before they reach the node registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeaturePolygon {
    contours: Vec<FeatureContour>,
}

impl FeaturePolygon {
    pub fn new() -> FeaturePolygon {
        FeaturePolygon::default()
    }

    pub fn from_exterior(vertices: Vec<Coord>) -> Result<FeaturePolygon> {
        let mut polygon = FeaturePolygon::new();
        polygon.add_contour(vertices, false)?;
        Ok(polygon)
    }

    pub fn add_contour(&mut self, mut vertices: Vec<Coord>, hole: bool) -> Result<()> {
        if let Some(c) = vertices.iter().find(|c| !(c.x.is_finite() && c.y.is_finite())) {
            return Err(Error::InvalidPoint { x: c.x, y: c.y });
        }
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.is_empty() {
            return Err(Error::EmptyContour {
                contour: self.contours.len(),
            });
        }

        self.contours.push(FeatureContour { vertices, hole });
        Ok(())
    }

    pub fn contours(&self) -> &[FeatureContour] {
        &self.contours
    }

    pub fn num_contours(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// the union of the outer contours minus the union of the holes
    pub fn to_geo(&self) -> MultiPolygon {
        let mut outer = MultiPolygon::new(vec![]);
        let mut holes = MultiPolygon::new(vec![]);

        for contour in self.contours.iter().filter(|c| c.vertices.len() > 2) {
            let ring = MultiPolygon::new(vec![Polygon::new(
                LineString::from(contour.vertices.clone()),
                vec![],
            )]);
            if contour.hole {
                holes = holes.union(&ring);
            } else {
                outer = outer.union(&ring);
            }
        }

        if holes.0.is_empty() {
            outer
        } else {
            outer.difference(&holes)
        }
    }

    pub fn from_geo(mp: &MultiPolygon) -> FeaturePolygon {
        let mut contours = Vec::new();
        for polygon in mp.iter() {
            contours.push(FeatureContour {
                vertices: open_ring(polygon.exterior()),
                hole: false,
            });
            for interior in polygon.interiors() {
                contours.push(FeatureContour {
                    vertices: open_ring(interior),
                    hole: true,
                });
            }
        }
        contours.retain(|c| !c.vertices.is_empty());
        FeaturePolygon { contours }
    }
}

fn open_ring(ls: &LineString) -> Vec<Coord> {
    let mut coords = ls.0.clone();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords
}

/// feature polygons grouped per area type, iterated in priority order
#[derive(Debug, Clone, Default)]
pub struct AreaPolygons {
    areas: BTreeMap<AreaType, Vec<FeaturePolygon>>,
}

impl AreaPolygons {
    pub fn new() -> AreaPolygons {
        AreaPolygons::default()
    }

    pub fn push(&mut self, area: AreaType, polygon: FeaturePolygon) {
        self.areas.entry(area).or_default().push(polygon);
    }

    pub fn get(&self, area: AreaType) -> &[FeaturePolygon] {
        self.areas.get(&area).map_or(&[], |v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (AreaType, &[FeaturePolygon])> {
        self.areas.iter().map(|(&a, v)| (a, v.as_slice()))
    }

    /// total number of polygons over all area types
    pub fn len(&self) -> usize {
        self.areas.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
