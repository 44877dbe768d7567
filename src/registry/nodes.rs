use fastrand::f64 as random;
use kiddo::{float::kdtree::KdTree, SquaredEuclidean};

use crate::geometry::Point3D;
use crate::{FG_COURSE_EPSILON, FG_PROXIMITY_EPSILON};

use std::fmt;

// largest offset added to a tree key on each axis
const KEY_JITTER: f64 = 1e-9;

/// Unique mesh vertices, addressed by their insertion index.
///
/// Two nodes closer than the active tolerance on both axes are merged into
/// the one registered first. The k-d tree only narrows the candidates, the
/// decision is made on the exact coordinates so the result is the same as
/// scanning the list from the start.
pub struct NodeRegistry {
    nodes: Vec<Point3D>,
    tree: KdTree<f64, u64, 2, 32, u32>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        NodeRegistry::new()
    }
}

impl NodeRegistry {
    pub fn new() -> NodeRegistry {
        NodeRegistry {
            nodes: Vec::new(),
            tree: KdTree::new(),
        }
    }

    /// adds the point unless a node within the fine tolerance exists
    pub fn unique_add(&mut self, p: Point3D) -> usize {
        self.add_with_tolerance(p, FG_PROXIMITY_EPSILON)
    }

    /// adds the point unless a node within the coarse tolerance exists,
    /// meant for the bulk of fitted terrain points only
    pub fn course_add(&mut self, p: Point3D) -> usize {
        self.add_with_tolerance(p, FG_COURSE_EPSILON)
    }

    /// adds the point without looking for duplicates
    pub fn simple_add(&mut self, p: Point3D) -> usize {
        let index = self.nodes.len();
        // grid aligned points share coordinates, which the tree can not split on
        let key = [
            p.x + 2. * (random() - 0.5) * KEY_JITTER,
            p.y + 2. * (random() - 0.5) * KEY_JITTER,
        ];
        self.tree.add(&key, index as u64);
        self.nodes.push(p);
        index
    }

    /// index of the first node within the fine tolerance of `p`
    pub fn find(&self, p: &Point3D) -> Option<usize> {
        self.find_with_tolerance(p, FG_PROXIMITY_EPSILON)
    }

    pub fn get(&self, index: usize) -> Option<&Point3D> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[Point3D] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.tree = KdTree::new();
    }

    pub fn set_z(&mut self, index: usize, z: f64) -> Option<()> {
        self.nodes.get_mut(index).map(|n| n.z = z)
    }

    fn add_with_tolerance(&mut self, p: Point3D, tolerance: f64) -> usize {
        match self.find_with_tolerance(&p, tolerance) {
            Some(index) => index,
            None => self.simple_add(p),
        }
    }

    fn find_with_tolerance(&self, p: &Point3D, tolerance: f64) -> Option<usize> {
        if self.nodes.is_empty() {
            return None;
        }

        // the box |dx| < tol, |dy| < tol fits inside this circle, jitter included
        let radius = tolerance * std::f64::consts::SQRT_2 + 4. * KEY_JITTER;
        self.tree
            .within_unsorted::<SquaredEuclidean>(&[p.x, p.y], radius * radius)
            .into_iter()
            .map(|nn| nn.item as usize)
            .filter(|&i| {
                let n = &self.nodes[i];
                (n.x - p.x).abs() < tolerance && (n.y - p.y).abs() < tolerance
            })
            .min()
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.nodes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_twice_is_one_node() {
        let mut reg = NodeRegistry::new();
        let p = Point3D::new(-120.5, 45.25, 0.);

        let a = reg.unique_add(p);
        let b = reg.unique_add(p);

        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.find(&p), Some(a));
    }

    #[test]
    fn find_after_add() {
        let mut reg = NodeRegistry::new();
        for i in 0..200 {
            let p = Point3D::from_xy(-120. + i as f64 * 1e-4, 45. + (i % 7) as f64 * 1e-3);
            let index = reg.unique_add(p);
            assert_eq!(reg.find(&p), Some(index));
        }
        assert_eq!(reg.len(), 200);
    }

    #[test]
    fn merges_within_fine_tolerance() {
        let mut reg = NodeRegistry::new();
        let a = reg.unique_add(Point3D::from_xy(10., 20.));
        let b = reg.unique_add(Point3D::from_xy(10. + 0.6e-6, 20. - 0.6e-6));
        let c = reg.unique_add(Point3D::from_xy(10. + 1.5e-6, 20.));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn first_registered_node_wins() {
        let mut reg = NodeRegistry::new();
        reg.simple_add(Point3D::from_xy(0., 0.));
        reg.simple_add(Point3D::from_xy(2e-4, 0.));

        // within the coarse tolerance of both, the lower index is returned
        assert_eq!(reg.course_add(Point3D::from_xy(1e-4, 0.)), 0);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn course_tolerance_is_wider() {
        let mut reg = NodeRegistry::new();
        let a = reg.unique_add(Point3D::from_xy(1., 1.));

        let fine = reg.find(&Point3D::from_xy(1. + 1e-4, 1.));
        let coarse = reg.course_add(Point3D::from_xy(1. + 1e-4, 1.));

        assert_eq!(fine, None);
        assert_eq!(coarse, a);
    }

    #[test]
    fn simple_add_keeps_duplicates() {
        let mut reg = NodeRegistry::new();
        let p = Point3D::from_xy(3., 4.);

        assert_eq!(reg.simple_add(p), 0);
        assert_eq!(reg.simple_add(p), 1);
        assert_eq!(reg.find(&p), Some(0));
    }

    #[test]
    fn grid_aligned_points() {
        // many nodes share an x or y coordinate, more than a tree bucket holds
        let mut reg = NodeRegistry::new();
        for col in 0..60 {
            for row in 0..60 {
                reg.unique_add(Point3D::from_xy(col as f64 * 1e-3, row as f64 * 1e-3));
            }
        }
        assert_eq!(reg.len(), 3600);
        assert_eq!(reg.find(&Point3D::from_xy(0.017, 0.042)), Some(17 * 60 + 42));
    }

    #[test]
    fn clear_resets() {
        let mut reg = NodeRegistry::new();
        reg.unique_add(Point3D::from_xy(3., 4.));
        reg.clear();

        assert!(reg.is_empty());
        assert_eq!(reg.find(&Point3D::from_xy(3., 4.)), None);
    }
}
