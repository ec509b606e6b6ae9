//! Vertex editing of working-layer features.

use crate::feature::{FeatureKey, WorkingSet};
use crate::geometry::closest_point_on_segment;
use kurbo::Point;

/// A distinct vertex of a feature geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexRef {
    pub feature: FeatureKey,
    pub path: usize,
    pub index: usize,
}

/// Drags vertices, inserts vertices on edges and removes vertices.
#[derive(Debug, Clone, Default)]
pub struct ModifyTool {
    drag: Option<VertexRef>,
}

impl ModifyTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging(&self) -> Option<VertexRef> {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Grab the vertex under the pointer, or insert a vertex on the edge under
    /// it, and start dragging. Returns false if nothing was in range.
    pub fn pointer_down(&mut self, at: Point, features: &mut WorkingSet, tolerance: f64) -> bool {
        if let Some(vertex) = vertex_at(at, features, tolerance) {
            self.drag = Some(vertex);
            return true;
        }

        let Some((feature, path, segment, on_edge)) = edge_at(at, features, tolerance) else {
            return false;
        };
        let inserted = features
            .get_mut(feature)
            .is_some_and(|f| f.geometry.insert_vertex(path, segment, on_edge));
        if inserted {
            self.drag = Some(VertexRef {
                feature,
                path,
                index: segment + 1,
            });
        }
        inserted
    }

    /// Move the grabbed vertex. Ends the drag if its feature disappeared.
    pub fn pointer_drag(&mut self, to: Point, features: &mut WorkingSet) -> bool {
        let Some(vertex) = self.drag else {
            return false;
        };
        let moved = features
            .get_mut(vertex.feature)
            .is_some_and(|f| f.geometry.move_vertex(vertex.path, vertex.index, to));
        if !moved {
            self.drag = None;
        }
        moved
    }

    /// Release the grabbed vertex, returning the modified feature.
    pub fn pointer_up(&mut self) -> Option<FeatureKey> {
        self.drag.take().map(|vertex| vertex.feature)
    }

    /// Remove the vertex under the pointer if its path keeps enough vertices.
    pub fn remove_vertex_at(&mut self, at: Point, features: &mut WorkingSet, tolerance: f64) -> bool {
        let Some(vertex) = vertex_at(at, features, tolerance) else {
            return false;
        };
        features
            .get_mut(vertex.feature)
            .is_some_and(|f| f.geometry.remove_vertex(vertex.path, vertex.index))
    }

    pub fn cancel(&mut self) {
        self.drag = None;
    }
}

fn vertex_at(at: Point, features: &WorkingSet, tolerance: f64) -> Option<VertexRef> {
    let mut best: Option<(f64, VertexRef)> = None;
    for feature in features.iter() {
        for (path, index, p) in feature.geometry.vertices() {
            let distance = p.distance(at);
            if distance <= tolerance && best.is_none_or(|(d, _)| distance < d) {
                best = Some((
                    distance,
                    VertexRef {
                        feature: feature.key(),
                        path,
                        index,
                    },
                ));
            }
        }
    }
    best.map(|(_, vertex)| vertex)
}

fn edge_at(at: Point, features: &WorkingSet, tolerance: f64) -> Option<(FeatureKey, usize, usize, Point)> {
    let mut best: Option<(f64, (FeatureKey, usize, usize, Point))> = None;
    for feature in features.iter() {
        for (path, segment, a, b) in feature.geometry.segments() {
            let on_edge = closest_point_on_segment(at, a, b);
            let distance = on_edge.distance(at);
            if distance <= tolerance && best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, (feature.key(), path, segment, on_edge)));
            }
        }
    }
    best.map(|(_, hit)| hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;
    use crate::geometry::Geometry;

    fn setup() -> (WorkingSet, FeatureKey) {
        let mut set = WorkingSet::new();
        let key = set.add(Feature::new(
            Geometry::polygon(vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 100.0),
                Point::new(0.0, 100.0),
            ]),
            "Buildings",
        ));
        (set, key)
    }

    #[test]
    fn test_drag_vertex() {
        let (mut set, key) = setup();
        let mut tool = ModifyTool::new();

        assert!(tool.pointer_down(Point::new(98.0, 99.0), &mut set, 5.0));
        assert!(tool.pointer_drag(Point::new(120.0, 130.0), &mut set));
        assert_eq!(tool.pointer_up(), Some(key));

        let ring = &set.get(key).unwrap().geometry.paths()[0];
        assert_eq!(ring[2], Point::new(120.0, 130.0));
        assert!(!tool.is_dragging());
    }

    #[test]
    fn test_press_on_edge_inserts_vertex() {
        let (mut set, key) = setup();
        let mut tool = ModifyTool::new();

        assert!(tool.pointer_down(Point::new(50.0, 2.0), &mut set, 5.0));
        assert_eq!(set.get(key).unwrap().geometry.vertex_count(0), 5);
        tool.pointer_drag(Point::new(50.0, -20.0), &mut set);
        tool.pointer_up();

        let ring = &set.get(key).unwrap().geometry.paths()[0];
        assert_eq!(ring[1], Point::new(50.0, -20.0));
    }

    #[test]
    fn test_press_in_empty_space() {
        let (mut set, _) = setup();
        let mut tool = ModifyTool::new();
        assert!(!tool.pointer_down(Point::new(50.0, 50.0), &mut set, 5.0));
        assert!(!tool.pointer_drag(Point::new(60.0, 60.0), &mut set));
    }

    #[test]
    fn test_drag_ends_when_feature_removed() {
        let (mut set, key) = setup();
        let mut tool = ModifyTool::new();
        tool.pointer_down(Point::new(0.0, 0.0), &mut set, 5.0);
        set.remove(key);
        assert!(!tool.pointer_drag(Point::new(1.0, 1.0), &mut set));
        assert!(!tool.is_dragging());
    }

    #[test]
    fn test_remove_vertex() {
        let (mut set, key) = setup();
        let mut tool = ModifyTool::new();
        assert!(tool.remove_vertex_at(Point::new(0.0, 100.0), &mut set, 5.0));
        assert_eq!(set.get(key).unwrap().geometry.vertex_count(0), 3);
        // A triangle keeps its vertices.
        assert!(!tool.remove_vertex_at(Point::new(0.0, 0.0), &mut set, 5.0));
    }
}
