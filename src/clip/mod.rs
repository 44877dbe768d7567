use geo::{BooleanOps, MultiPolygon};
use log::{log, Level};

use crate::geometry::FeaturePolygon;
use crate::{Error, Result};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOp {
    Diff,
    Int,
    Xor,
    Union,
}

impl ClipOp {
    /// numeric operation codes of the clip primitive
    pub fn from_code(code: u8) -> Result<ClipOp> {
        match code {
            0 => Ok(ClipOp::Diff),
            1 => Ok(ClipOp::Int),
            2 => Ok(ClipOp::Xor),
            3 => Ok(ClipOp::Union),
            _ => Err(Error::UnknownClipOp(code)),
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ClipOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClipOp::Diff => "difference",
            ClipOp::Int => "intersection",
            ClipOp::Xor => "xor",
            ClipOp::Union => "union",
        };
        write!(f, "{name}")
    }
}

/// Boolean operations on feature polygons.
///
/// The result is a fresh polygon with its own hole flags. Vertices are not
/// deduplicated, callers put them through the node registry.
pub trait Clipper {
    fn clip(&self, op: ClipOp, subject: &FeaturePolygon, clip: &FeaturePolygon)
        -> Result<FeaturePolygon>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeoClipper;

impl Clipper for GeoClipper {
    fn clip(
        &self,
        op: ClipOp,
        subject: &FeaturePolygon,
        clip: &FeaturePolygon,
    ) -> Result<FeaturePolygon> {
        let a = subject.to_geo();
        let b = clip.to_geo();

        let result: MultiPolygon = match op {
            ClipOp::Diff => a.difference(&b),
            ClipOp::Int => a.intersection(&b),
            ClipOp::Xor => a.xor(&b),
            ClipOp::Union => a.union(&b),
        };

        let polygon = FeaturePolygon::from_geo(&result);
        log!(
            Level::Debug,
            "Clip {op} of {} and {} contours gave {} contours",
            subject.num_contours(),
            clip.num_contours(),
            polygon.num_contours()
        );
        Ok(polygon)
    }
}
