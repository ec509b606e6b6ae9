//! Planar geometry in projected map coordinates.

use kurbo::{Point, Rect};

/// The kind of geometry a draw gesture produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    LineString,
    Polygon,
}

impl GeometryKind {
    /// Minimum number of distinct vertices for a finished geometry.
    pub fn min_vertices(self) -> usize {
        match self {
            GeometryKind::LineString => 2,
            GeometryKind::Polygon => 3,
        }
    }
}

/// A line or polygon. Polygon rings are stored closed (first point repeated last).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    LineString(Vec<Point>),
    /// Exterior ring first, holes after.
    Polygon(Vec<Vec<Point>>),
}

impl Geometry {
    /// Create a line string.
    pub fn line(points: Vec<Point>) -> Self {
        Geometry::LineString(points)
    }

    /// Create a polygon from its exterior ring, closing it if needed.
    pub fn polygon(exterior: Vec<Point>) -> Self {
        Self::polygon_with_holes(vec![exterior])
    }

    /// Create a polygon from exterior and hole rings, closing each if needed.
    pub fn polygon_with_holes(rings: Vec<Vec<Point>>) -> Self {
        Geometry::Polygon(rings.into_iter().map(close_ring).collect())
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// The coordinate paths: the single path of a line, or every ring of a polygon.
    pub fn paths(&self) -> &[Vec<Point>] {
        match self {
            Geometry::LineString(points) => std::slice::from_ref(points),
            Geometry::Polygon(rings) => rings,
        }
    }

    fn paths_mut(&mut self) -> &mut [Vec<Point>] {
        match self {
            Geometry::LineString(points) => std::slice::from_mut(points),
            Geometry::Polygon(rings) => rings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths().iter().all(|path| path.is_empty())
    }

    /// Apply `f` to every coordinate, producing a new geometry of the same shape.
    pub fn map_points(&self, f: impl Fn(Point) -> Point) -> Geometry {
        match self {
            Geometry::LineString(points) => {
                Geometry::LineString(points.iter().copied().map(&f).collect())
            }
            Geometry::Polygon(rings) => Geometry::Polygon(
                rings
                    .iter()
                    .map(|ring| ring.iter().copied().map(&f).collect())
                    .collect(),
            ),
        }
    }

    /// Last coordinate of the flattened coordinate list.
    pub fn last_coordinate(&self) -> Option<Point> {
        self.paths().last().and_then(|path| path.last()).copied()
    }

    /// Bounding box of all coordinates.
    pub fn extent(&self) -> Option<Rect> {
        let mut points = self.paths().iter().flatten();
        let first = *points.next()?;
        Some(points.fold(Rect::from_points(first, first), |rect, p| rect.union_pt(*p)))
    }

    /// A point guaranteed to lie inside a polygon, suitable for anchoring a label.
    ///
    /// Casts a horizontal line through the vertical middle of the extent and
    /// returns the midpoint of the widest span inside the polygon. Falls back
    /// to the extent center for degenerate rings and for lines.
    pub fn interior_point(&self) -> Option<Point> {
        let extent = self.extent()?;
        let Geometry::Polygon(rings) = self else {
            return Some(extent.center());
        };

        let y = (extent.y0 + extent.y1) / 2.0;
        let mut crossings = Vec::new();
        for ring in rings {
            for pair in ring.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if (a.y <= y && b.y > y) || (b.y <= y && a.y > y) {
                    crossings.push(a.x + (y - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        let mut best: Option<(f64, Point)> = None;
        for span in crossings.chunks_exact(2) {
            let width = span[1] - span[0];
            if best.is_none_or(|(best_width, _)| width > best_width) {
                best = Some((width, Point::new((span[0] + span[1]) / 2.0, y)));
            }
        }
        Some(best.map_or(extent.center(), |(_, point)| point))
    }

    /// Even-odd containment test. Lines contain nothing.
    pub fn contains(&self, point: Point) -> bool {
        let Geometry::Polygon(rings) = self else {
            return false;
        };
        let mut inside = false;
        for ring in rings {
            for pair in ring.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if (a.y > point.y) != (b.y > point.y)
                    && point.x < a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x)
                {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Every segment as `(path index, segment index, start, end)`.
    pub fn segments(&self) -> impl Iterator<Item = (usize, usize, Point, Point)> + '_ {
        self.paths().iter().enumerate().flat_map(|(path, points)| {
            points
                .windows(2)
                .enumerate()
                .map(move |(segment, pair)| (path, segment, pair[0], pair[1]))
        })
    }

    /// Number of distinct vertices in a path (the closing point of a ring is not counted).
    pub fn vertex_count(&self, path: usize) -> usize {
        let Some(points) = self.paths().get(path) else {
            return 0;
        };
        match self {
            Geometry::LineString(_) => points.len(),
            Geometry::Polygon(_) => points.len().saturating_sub(1),
        }
    }

    /// Distinct vertices as `(path index, vertex index, point)`.
    pub fn vertices(&self) -> impl Iterator<Item = (usize, usize, Point)> + '_ {
        (0..self.paths().len()).flat_map(move |path| {
            let points = &self.paths()[path];
            points[..self.vertex_count(path)]
                .iter()
                .enumerate()
                .map(move |(index, p)| (path, index, *p))
        })
    }

    /// Move a distinct vertex, keeping a polygon ring closed.
    pub fn move_vertex(&mut self, path: usize, index: usize, to: Point) -> bool {
        let count = self.vertex_count(path);
        if index >= count {
            return false;
        }
        let is_polygon = self.kind() == GeometryKind::Polygon;
        let points = &mut self.paths_mut()[path];
        points[index] = to;
        if is_polygon && index == 0 {
            points[count] = to;
        }
        true
    }

    /// Insert a vertex into segment `segment` of a path (between its two endpoints).
    pub fn insert_vertex(&mut self, path: usize, segment: usize, point: Point) -> bool {
        let Some(points) = self.paths_mut().get_mut(path) else {
            return false;
        };
        if segment + 1 >= points.len() {
            return false;
        }
        points.insert(segment + 1, point);
        true
    }

    /// Remove a distinct vertex if the path keeps its minimum vertex count.
    pub fn remove_vertex(&mut self, path: usize, index: usize) -> bool {
        let count = self.vertex_count(path);
        if index >= count || count <= self.kind().min_vertices() {
            return false;
        }
        let is_polygon = self.kind() == GeometryKind::Polygon;
        let points = &mut self.paths_mut()[path];
        points.remove(index);
        if is_polygon && index == 0 {
            let last = points.len() - 1;
            points[last] = points[0];
        }
        true
    }
}

/// Close a ring by repeating its first point, unless it is already closed.
pub fn close_ring(mut ring: Vec<Point>) -> Vec<Point> {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last || ring.len() == 1 {
            ring.push(first);
        }
    }
    ring
}

/// Closest point to `p` on the segment `a`-`b`.
pub fn closest_point_on_segment(p: Point, a: Point, b: Point) -> Point {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}
