//! Snapping pointer coordinates to working-layer vertices and edges.

use crate::feature::{FeatureKey, WorkingSet};
use crate::geometry::closest_point_on_segment;
use kurbo::Point;

/// What kind of feature part a point snapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapTargetKind {
    Vertex,
    Edge,
}

/// The feature part a point snapped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTarget {
    pub point: Point,
    pub kind: SnapTargetKind,
    pub feature: FeatureKey,
}

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point, or the input point if nothing was in range.
    pub point: Point,
    pub target: Option<SnapTarget>,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self { point, target: None }
    }

    pub fn is_snapped(&self) -> bool {
        self.target.is_some()
    }
}

/// Snap `point` to the closest feature edge within `tolerance` map units,
/// preferring an endpoint of that edge when the endpoint is also in range.
pub fn snap_point(point: Point, features: &WorkingSet, tolerance: f64) -> SnapResult {
    let mut best: Option<(f64, Point, Point, Point, FeatureKey)> = None;

    for feature in features.iter() {
        for (_, _, a, b) in feature.geometry.segments() {
            let on_edge = closest_point_on_segment(point, a, b);
            let distance = on_edge.distance(point);
            if distance <= tolerance && best.is_none_or(|(d, ..)| distance < d) {
                best = Some((distance, on_edge, a, b, feature.key()));
            }
        }
    }

    let Some((_, on_edge, a, b, feature)) = best else {
        return SnapResult::none(point);
    };

    let vertex = if a.distance(point) <= b.distance(point) { a } else { b };
    let target = if vertex.distance(point) <= tolerance {
        SnapTarget {
            point: vertex,
            kind: SnapTargetKind::Vertex,
            feature,
        }
    } else {
        SnapTarget {
            point: on_edge,
            kind: SnapTargetKind::Edge,
            feature,
        }
    };
    SnapResult {
        point: target.point,
        target: Some(target),
    }
}
