//! Click-to-place sketching of lines and polygons.

use crate::geometry::{Geometry, GeometryKind};
use crate::observer::GeometryMutationObserver;
use crate::view::MapView;
use kurbo::Point;

/// An in-progress draw gesture.
///
/// The sketch geometry holds the placed vertices plus a trailing vertex that
/// follows the pointer; every change goes through the mutation observer.
#[derive(Debug)]
pub struct DrawGesture {
    kind: GeometryKind,
    vertices: Vec<Point>,
    cursor: Point,
    sketch: GeometryMutationObserver,
}

impl DrawGesture {
    /// Start a sketch with its first vertex placed at `first`.
    pub fn begin(kind: GeometryKind, first: Point) -> Self {
        let vertices = vec![first];
        let sketch = GeometryMutationObserver::new(build(kind, &vertices, Some(first)));
        Self {
            kind,
            vertices,
            cursor: first,
            sketch,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Vertices placed so far (without the trailing pointer vertex).
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn sketch(&self) -> &Geometry {
        self.sketch.geometry()
    }

    pub fn observer_mut(&mut self) -> &mut GeometryMutationObserver {
        &mut self.sketch
    }

    /// Move the trailing vertex to follow the pointer.
    pub fn move_cursor(&mut self, to: Point, view: &mut dyn MapView) {
        self.cursor = to;
        let geometry = build(self.kind, &self.vertices, Some(to));
        self.sketch.mutate(view, |g| *g = geometry);
    }

    /// Place a vertex. Clicking the last placed vertex again is ignored.
    pub fn add_vertex(&mut self, at: Point, view: &mut dyn MapView) {
        if self.vertices.last() == Some(&at) {
            return;
        }
        self.vertices.push(at);
        self.move_cursor(at, view);
    }

    /// Enough vertices have been placed to finish.
    pub fn can_finish(&self) -> bool {
        self.vertices.len() >= self.kind.min_vertices()
    }

    /// A click at `at` closes the sketch: on the first vertex of a polygon, or
    /// the last vertex of a line.
    pub fn is_finish_click(&self, at: Point, tolerance: f64) -> bool {
        if !self.can_finish() {
            return false;
        }
        let target = match self.kind {
            GeometryKind::Polygon => self.vertices.first(),
            GeometryKind::LineString => self.vertices.last(),
        };
        target.is_some_and(|t| t.distance(at) <= tolerance)
    }

    /// Drop the trailing vertex and produce the final geometry.
    ///
    /// The final shape is applied through the observer so listeners see it
    /// before they are detached. Returns `None` if too few vertices were placed.
    pub fn finish(&mut self, view: &mut dyn MapView) -> Option<Geometry> {
        if !self.can_finish() {
            return None;
        }
        let geometry = build(self.kind, &self.vertices, None);
        self.sketch.mutate(view, |g| *g = geometry);
        Some(self.sketch.geometry().clone())
    }
}

fn build(kind: GeometryKind, vertices: &[Point], cursor: Option<Point>) -> Geometry {
    let mut points = vertices.to_vec();
    points.extend(cursor);
    match kind {
        GeometryKind::LineString => Geometry::line(points),
        GeometryKind::Polygon => Geometry::polygon(points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::RecordingView;

    #[test]
    fn test_polygon_sketch_tracks_cursor() {
        let mut view = RecordingView::new();
        let mut gesture = DrawGesture::begin(GeometryKind::Polygon, Point::new(0.0, 0.0));
        gesture.add_vertex(Point::new(10.0, 0.0), &mut view);
        gesture.move_cursor(Point::new(10.0, 10.0), &mut view);

        assert_eq!(
            gesture.sketch().paths()[0],
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 0.0),
            ]
        );
        assert_eq!(gesture.vertices().len(), 2);
    }

    #[test]
    fn test_polygon_needs_three_vertices() {
        let mut view = RecordingView::new();
        let mut gesture = DrawGesture::begin(GeometryKind::Polygon, Point::new(0.0, 0.0));
        gesture.add_vertex(Point::new(10.0, 0.0), &mut view);
        assert!(!gesture.can_finish());
        assert!(gesture.finish(&mut view).is_none());

        gesture.add_vertex(Point::new(10.0, 10.0), &mut view);
        let geometry = gesture.finish(&mut view).unwrap();
        assert_eq!(geometry.vertex_count(0), 3);
    }

    #[test]
    fn test_line_finish_drops_cursor() {
        let mut view = RecordingView::new();
        let mut gesture = DrawGesture::begin(GeometryKind::LineString, Point::new(0.0, 0.0));
        gesture.add_vertex(Point::new(5.0, 0.0), &mut view);
        gesture.move_cursor(Point::new(50.0, 50.0), &mut view);

        let geometry = gesture.finish(&mut view).unwrap();
        assert_eq!(geometry, Geometry::line(vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)]));
    }

    #[test]
    fn test_finish_click_targets() {
        let mut view = RecordingView::new();
        let mut polygon = DrawGesture::begin(GeometryKind::Polygon, Point::new(0.0, 0.0));
        polygon.add_vertex(Point::new(10.0, 0.0), &mut view);
        assert!(!polygon.is_finish_click(Point::new(0.5, 0.5), 2.0));
        polygon.add_vertex(Point::new(10.0, 10.0), &mut view);
        assert!(polygon.is_finish_click(Point::new(0.5, 0.5), 2.0));
        assert!(!polygon.is_finish_click(Point::new(10.0, 10.0), 2.0));

        let mut line = DrawGesture::begin(GeometryKind::LineString, Point::new(0.0, 0.0));
        line.add_vertex(Point::new(10.0, 0.0), &mut view);
        assert!(line.is_finish_click(Point::new(10.0, 0.5), 2.0));
    }

    #[test]
    fn test_duplicate_vertex_is_ignored() {
        let mut view = RecordingView::new();
        let mut gesture = DrawGesture::begin(GeometryKind::LineString, Point::new(1.0, 1.0));
        gesture.add_vertex(Point::new(1.0, 1.0), &mut view);
        assert_eq!(gesture.vertices().len(), 1);
    }
}
