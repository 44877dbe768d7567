use crate::geometry::Point3D;
use crate::{FG_EPSILON, FG_PROXIMITY_EPSILON};

use log::{log, Level};

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Undirected edge between two node indices, (a, b) == (b, a).
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub n1: usize,
    pub n2: usize,
}

impl Segment {
    pub fn new(n1: usize, n2: usize) -> Segment {
        Segment { n1, n2 }
    }

    fn key(&self) -> (usize, usize) {
        (self.n1.min(self.n2), self.n1.max(self.n2))
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Segment {}

impl Hash for Segment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

#[derive(Debug, Clone, Default)]
pub struct SegmentRegistry {
    segments: Vec<Segment>,
    lookup: HashMap<Segment, usize>,
}

impl SegmentRegistry {
    pub fn new() -> SegmentRegistry {
        SegmentRegistry::default()
    }

    /// Index of the segment, registering it if it is new.
    /// Self loops are never registered and give `None`.
    pub fn unique_add(&mut self, s: Segment) -> Option<usize> {
        if s.n1 == s.n2 {
            return None;
        }
        if let Some(&index) = self.lookup.get(&s) {
            return Some(index);
        }

        let index = self.segments.len();
        self.segments.push(s);
        self.lookup.insert(s, index);
        Some(index)
    }

    /// Adds the segment, split at every registered node lying on it.
    ///
    /// A node splits the segment when it is strictly between the endpoints
    /// along the dominant axis and closer than `FG_PROXIMITY_EPSILON` to the
    /// line through them. The closest node wins, ties go to the lowest node
    /// index. Returns the number of segments the input ended up as.
    pub fn unique_divide_and_add(&mut self, nodes: &[Point3D], s: Segment) -> usize {
        let mut added = 0;
        let mut stack = vec![s];

        while let Some(s) = stack.pop() {
            if s.n1 == s.n2 || s.n1 >= nodes.len() || s.n2 >= nodes.len() {
                log!(
                    Level::Debug,
                    "Skipping degenerate segment ({}, {})",
                    s.n1,
                    s.n2
                );
                continue;
            }

            match split_node(nodes, &s) {
                Some(k) => {
                    // (n1, k) is handled before (k, n2)
                    stack.push(Segment::new(k, s.n2));
                    stack.push(Segment::new(s.n1, k));
                }
                None => {
                    if self.unique_add(s).is_some() {
                        added += 1;
                    }
                }
            }
        }
        added
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn contains(&self, s: &Segment) -> bool {
        self.lookup.contains_key(s)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.lookup.clear();
    }
}

// the registered node that lies on the segment, if any
fn split_node(nodes: &[Point3D], s: &Segment) -> Option<usize> {
    let p0 = nodes[s.n1];
    let p1 = nodes[s.n2];

    let xdist = (p0.x - p1.x).abs();
    let ydist = (p0.y - p1.y).abs();
    if xdist < FG_EPSILON && ydist < FG_EPSILON {
        return None;
    }

    // run along x when the segment is wider than tall, else along y
    let (a0, b0, a1, b1) = if xdist > ydist {
        (p0.x, p0.y, p1.x, p1.y)
    } else {
        (p0.y, p0.x, p1.y, p1.x)
    };
    let (lo, hi) = if a0 < a1 { (a0, a1) } else { (a1, a0) };

    let m = (b1 - b0) / (a1 - a0);
    let b = b0 - m * a0;
    let norm = (1. + m * m).sqrt();

    let mut best: Option<(usize, f64)> = None;
    for (i, p) in nodes.iter().enumerate() {
        if i == s.n1 || i == s.n2 {
            continue;
        }
        let (a, b_coord) = if xdist > ydist { (p.x, p.y) } else { (p.y, p.x) };
        if !(a > lo + FG_EPSILON && a < hi - FG_EPSILON) {
            continue;
        }

        let residual = (b_coord - (m * a + b)).abs() / norm;
        if residual < FG_PROXIMITY_EPSILON && best.map_or(true, |(_, r)| residual < r) {
            best = Some((i, residual));
        }
    }

    best.map(|(i, _)| i).filter(|&k| {
        // both children must be shorter or the split would never end
        let len = p0.squared_distance_2d(&p1);
        nodes[k].squared_distance_2d(&p0) < len && nodes[k].squared_distance_2d(&p1) < len
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(xy: &[(f64, f64)]) -> Vec<Point3D> {
        xy.iter().map(|&(x, y)| Point3D::from_xy(x, y)).collect()
    }

    #[test]
    fn symmetric_and_no_self_loops() {
        let mut reg = SegmentRegistry::new();

        let a = reg.unique_add(Segment::new(3, 7));
        let b = reg.unique_add(Segment::new(7, 3));

        assert_eq!(a, b);
        assert_eq!(reg.unique_add(Segment::new(4, 4)), None);
        assert_eq!(reg.len(), 1);
        assert_eq!(Segment::new(1, 2), Segment::new(2, 1));
    }

    #[test]
    fn clean_segment_is_added_once() {
        let nodes = pts(&[(0., 0.), (1., 0.), (0.5, 0.3)]);
        let mut reg = SegmentRegistry::new();

        assert_eq!(reg.unique_divide_and_add(&nodes, Segment::new(0, 1)), 1);
        assert!(reg.contains(&Segment::new(1, 0)));
    }

    #[test]
    fn splits_at_t_intersection() {
        let nodes = pts(&[(0., 0.), (1., 0.), (0.25, 0.), (0.75, 2e-7)]);
        let mut reg = SegmentRegistry::new();

        let added = reg.unique_divide_and_add(&nodes, Segment::new(0, 1));

        assert_eq!(added, 3);
        assert_eq!(
            reg.segments(),
            &[Segment::new(0, 2), Segment::new(2, 3), Segment::new(3, 1)]
        );
        assert!(!reg.contains(&Segment::new(0, 1)));
    }

    #[test]
    fn vertical_segment_splits_along_y() {
        let nodes = pts(&[(5., 1.), (5., 2.), (5. + 1e-7, 1.5)]);
        let mut reg = SegmentRegistry::new();

        reg.unique_divide_and_add(&nodes, Segment::new(1, 0));

        assert_eq!(reg.len(), 2);
        assert!(reg.contains(&Segment::new(0, 2)));
        assert!(reg.contains(&Segment::new(2, 1)));
    }

    #[test]
    fn closest_candidate_wins() {
        // both candidates are at the same position along the axis
        let nodes = pts(&[(0., 0.), (1., 0.), (0.5, 8e-7), (0.5, -1e-7)]);
        let mut reg = SegmentRegistry::new();

        reg.unique_divide_and_add(&nodes, Segment::new(0, 1));

        assert!(reg.contains(&Segment::new(0, 3)));
        assert!(reg.contains(&Segment::new(3, 1)));
    }

    #[test]
    fn endpoints_are_not_candidates() {
        // node 2 sits within FG_EPSILON of an endpoint along the axis
        let nodes = pts(&[(0., 0.), (1., 0.), (1. - 5e-8, 0.)]);
        let mut reg = SegmentRegistry::new();

        reg.unique_divide_and_add(&nodes, Segment::new(0, 1));

        assert_eq!(reg.segments(), &[Segment::new(0, 1)]);
    }

    #[test]
    fn no_stored_segment_has_a_node_on_it() {
        // a fan of collinear and near collinear nodes on a slanted line
        let mut xy = vec![(0., 0.), (1., 0.5)];
        for i in 1..20 {
            let t = i as f64 / 20.;
            let off = if i % 3 == 0 { 3e-7 } else { 0. };
            xy.push((t, 0.5 * t + off));
        }
        xy.push((0.5, 0.2));
        let nodes = pts(&xy);
        let mut reg = SegmentRegistry::new();

        reg.unique_divide_and_add(&nodes, Segment::new(0, 1));

        assert_eq!(reg.len(), 20);
        for s in reg.segments() {
            assert!(split_node(&nodes, s).is_none());
        }
    }
}
