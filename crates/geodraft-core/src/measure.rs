//! Distance and area measurement sessions and the layer of finished measurements.

use crate::geometry::Geometry;
use crate::tooltip::{MeasureKind, Overlay, TooltipOffsets, TooltipOverlaySession};
use crate::tools::DrawGesture;
use crate::view::{LayerKind, MapView};
use kurbo::Point;

/// A finished measurement: its geometry and the frozen label on top of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub kind: MeasureKind,
    pub geometry: Geometry,
    pub overlay: Overlay,
}

impl Measurement {
    /// Measured length in meters or area in square meters.
    pub fn value(&self) -> f64 {
        self.kind.measure(&self.geometry)
    }
}

/// A live measurement: the tooltip overlay plus the draw gesture it follows.
///
/// The tooltip exists from the moment the session starts; the gesture
/// begins with the first placed vertex.
#[derive(Debug)]
pub struct MeasurementSession {
    tooltip: TooltipOverlaySession,
    gesture: Option<DrawGesture>,
}

impl MeasurementSession {
    pub fn start(kind: MeasureKind, offsets: TooltipOffsets, view: &mut dyn MapView) -> Self {
        Self {
            tooltip: TooltipOverlaySession::start(kind, offsets, view),
            gesture: None,
        }
    }

    pub fn kind(&self) -> MeasureKind {
        self.tooltip.kind()
    }

    pub fn tooltip(&self) -> &TooltipOverlaySession {
        &self.tooltip
    }

    pub fn gesture(&self) -> Option<&DrawGesture> {
        self.gesture.as_ref()
    }

    pub fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    /// Place a vertex, starting the gesture on the first one.
    pub fn add_vertex(&mut self, at: Point, view: &mut dyn MapView) {
        match &mut self.gesture {
            Some(gesture) => gesture.add_vertex(at, view),
            None => {
                let mut gesture = DrawGesture::begin(self.kind().geometry_kind(), at);
                self.tooltip.attach(gesture.observer_mut());
                self.gesture = Some(gesture);
            }
        }
    }

    pub fn move_cursor(&mut self, to: Point, view: &mut dyn MapView) {
        if let Some(gesture) = &mut self.gesture {
            gesture.move_cursor(to, view);
        }
    }

    pub fn can_finish(&self) -> bool {
        self.gesture.as_ref().is_some_and(DrawGesture::can_finish)
    }

    pub fn is_finish_click(&self, at: Point, tolerance: f64) -> bool {
        self.gesture
            .as_ref()
            .is_some_and(|gesture| gesture.is_finish_click(at, tolerance))
    }

    /// Complete the gesture: apply the final shape, freeze the label and
    /// detach the listener. Hands the session back if it cannot finish yet.
    pub fn finish(mut self, view: &mut dyn MapView) -> Result<Measurement, Self> {
        let Some(mut gesture) = self.gesture.take() else {
            return Err(self);
        };
        let Some(geometry) = gesture.finish(view) else {
            self.gesture = Some(gesture);
            return Err(self);
        };
        let kind = self.kind();
        let overlay = self.tooltip.end(gesture.observer_mut(), view);
        Ok(Measurement {
            kind,
            geometry,
            overlay,
        })
    }

    /// Abandon the session: the live overlay is removed and the draft is dropped.
    pub fn cancel(mut self, view: &mut dyn MapView) {
        let observer = self.gesture.as_mut().map(DrawGesture::observer_mut);
        self.tooltip.cancel(observer, view);
    }
}

/// Committed measurements, kept regardless of mode until cleared.
#[derive(Debug, Default)]
pub struct MeasureLayer {
    measurements: Vec<Measurement>,
}

impl MeasureLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, measurement: Measurement, view: &mut dyn MapView) {
        log::debug!(
            "Committed {:?} measurement: {}",
            measurement.kind,
            measurement.overlay.text
        );
        self.measurements.push(measurement);
        view.layer_changed(LayerKind::Measure);
    }

    /// Remove every frozen label and all measurement geometry.
    pub fn clear(&mut self, view: &mut dyn MapView) {
        for measurement in self.measurements.drain(..) {
            view.remove_overlay(measurement.overlay.id);
        }
        view.layer_changed(LayerKind::Measure);
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::from_lon_lat;
    use crate::tooltip::OverlayClass;
    use crate::view::RecordingView;

    fn session(kind: MeasureKind, view: &mut RecordingView) -> MeasurementSession {
        MeasurementSession::start(kind, TooltipOffsets::default(), view)
    }

    #[test]
    fn test_length_session_completes() {
        let mut view = RecordingView::new();
        let mut s = session(MeasureKind::Length, &mut view);
        s.add_vertex(from_lon_lat(0.0, 0.0), &mut view);
        s.move_cursor(from_lon_lat(0.01, 0.0), &mut view);
        assert_eq!(s.tooltip().text(), "1.11 km");
        s.add_vertex(from_lon_lat(0.01, 0.0), &mut view);

        let measurement = s.finish(&mut view).unwrap();
        assert_eq!(measurement.overlay.class, OverlayClass::Frozen);
        assert_eq!(measurement.overlay.text, "1.11 km");
        assert!((measurement.value() - 1111.95).abs() < 0.01);
        assert_eq!(view.overlays().count(), 1);
    }

    #[test]
    fn test_finish_too_early_returns_session() {
        let mut view = RecordingView::new();
        let mut s = session(MeasureKind::Area, &mut view);
        s.add_vertex(from_lon_lat(0.0, 0.0), &mut view);
        s.add_vertex(from_lon_lat(0.01, 0.0), &mut view);

        let s = s.finish(&mut view).unwrap_err();
        assert!(s.is_drawing());
        assert!(s.tooltip().is_listening());
    }

    #[test]
    fn test_cancel_leaves_nothing() {
        let mut view = RecordingView::new();
        let mut s = session(MeasureKind::Area, &mut view);
        s.add_vertex(from_lon_lat(0.0, 0.0), &mut view);
        s.move_cursor(from_lon_lat(0.01, 0.01), &mut view);
        s.cancel(&mut view);
        assert_eq!(view.overlays().count(), 0);
    }

    #[test]
    fn test_cancel_before_first_vertex() {
        let mut view = RecordingView::new();
        let s = session(MeasureKind::Length, &mut view);
        assert_eq!(view.overlays().count(), 1);
        s.cancel(&mut view);
        assert_eq!(view.overlays().count(), 0);
    }

    #[test]
    fn test_clear_removes_all_frozen_labels() {
        let mut view = RecordingView::new();
        let mut layer = MeasureLayer::new();
        for offset in [0.0, 1.0] {
            let mut s = session(MeasureKind::Length, &mut view);
            s.add_vertex(from_lon_lat(offset, 0.0), &mut view);
            s.add_vertex(from_lon_lat(offset, 0.5), &mut view);
            layer.commit(s.finish(&mut view).unwrap(), &mut view);
        }
        assert_eq!(layer.len(), 2);
        assert_eq!(view.overlays().count(), 2);

        layer.clear(&mut view);
        assert!(layer.is_empty());
        assert_eq!(view.overlays().count(), 0);
    }
}
