//! Floating measurement labels that follow a geometry while it is drawn.

use crate::geometry::{Geometry, GeometryKind};
use crate::observer::{GeometryMutationObserver, ListenerKey};
use crate::sphere;
use crate::view::MapView;
use kurbo::{Point, Vec2};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of an overlay on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(u64);

impl OverlayId {
    fn next() -> Self {
        static OVERLAY_COUNTER: AtomicU64 = AtomicU64::new(1);
        OverlayId(OVERLAY_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay-{}", self.0)
    }
}

/// Visual state of a tooltip overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayClass {
    /// Follows the geometry being drawn.
    Live,
    /// Static label sitting on a finished shape.
    Frozen,
}

impl OverlayClass {
    pub fn css_class(self) -> &'static str {
        match self {
            OverlayClass::Live => "tooltip tooltip-measure",
            OverlayClass::Frozen => "tooltip tooltip-static",
        }
    }
}

/// A text label anchored to a map coordinate, positioned bottom-center.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub id: OverlayId,
    pub text: String,
    /// `None` until the first measurement places it.
    pub position: Option<Point>,
    /// Pixel offset from the anchor.
    pub offset: Vec2,
    pub class: OverlayClass,
}

/// Pixel offsets for live and frozen tooltips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TooltipOffsets {
    pub live: Vec2,
    pub frozen: Vec2,
}

impl Default for TooltipOffsets {
    fn default() -> Self {
        Self {
            live: Vec2::new(0.0, -15.0),
            frozen: Vec2::new(0.0, -7.0),
        }
    }
}

/// What a measurement session measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasureKind {
    Length,
    Area,
}

impl MeasureKind {
    /// Geometry drawn for this kind of measurement.
    pub fn geometry_kind(self) -> GeometryKind {
        match self {
            MeasureKind::Length => GeometryKind::LineString,
            MeasureKind::Area => GeometryKind::Polygon,
        }
    }

    /// Raw measured quantity in meters or square meters.
    pub fn measure(self, geometry: &Geometry) -> f64 {
        match self {
            MeasureKind::Length => sphere::length(geometry),
            MeasureKind::Area => sphere::area(geometry),
        }
    }

    pub fn format(self, value: f64) -> String {
        match self {
            MeasureKind::Length => sphere::format_length(value),
            MeasureKind::Area => sphere::format_area(value),
        }
    }

    /// Where the label sits: the last vertex of a line, or inside a polygon.
    pub fn anchor(self, geometry: &Geometry) -> Option<Point> {
        match self {
            MeasureKind::Length => geometry.last_coordinate(),
            MeasureKind::Area => geometry.interior_point(),
        }
    }
}

/// One tooltip overlay plus the listener that keeps it in sync with a draft geometry.
///
/// The overlay is shared with the listener closure; both are released by
/// [`end`](Self::end) or [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct TooltipOverlaySession {
    kind: MeasureKind,
    overlay: Rc<RefCell<Overlay>>,
    listener: Option<ListenerKey>,
    frozen_offset: Vec2,
}

impl TooltipOverlaySession {
    /// Create the overlay (not yet positioned) and add it to the view.
    pub fn start(kind: MeasureKind, offsets: TooltipOffsets, view: &mut dyn MapView) -> Self {
        let overlay = Overlay {
            id: OverlayId::next(),
            text: String::new(),
            position: None,
            offset: offsets.live,
            class: OverlayClass::Live,
        };
        view.add_overlay(&overlay);
        Self {
            kind,
            overlay: Rc::new(RefCell::new(overlay)),
            listener: None,
            frozen_offset: offsets.frozen,
        }
    }

    pub fn kind(&self) -> MeasureKind {
        self.kind
    }

    pub fn overlay_id(&self) -> OverlayId {
        self.overlay.borrow().id
    }

    pub fn text(&self) -> String {
        self.overlay.borrow().text.clone()
    }

    pub fn position(&self) -> Option<Point> {
        self.overlay.borrow().position
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Start following the draft geometry: every change recomputes text and anchor.
    pub fn attach(&mut self, observer: &mut GeometryMutationObserver) {
        if let Some(old) = self.listener.take() {
            observer.un_by_key(old);
        }
        let overlay = Rc::clone(&self.overlay);
        let kind = self.kind;
        let key = observer.on_change(move |geometry, view| {
            let mut overlay = overlay.borrow_mut();
            overlay.text = kind.format(kind.measure(geometry));
            overlay.position = kind.anchor(geometry);
            view.update_overlay(&overlay);
        });
        self.listener = Some(key);
    }

    /// Freeze the label on the finished shape, then detach the listener.
    pub fn end(
        mut self,
        observer: &mut GeometryMutationObserver,
        view: &mut dyn MapView,
    ) -> Overlay {
        let frozen = {
            let mut overlay = self.overlay.borrow_mut();
            overlay.class = OverlayClass::Frozen;
            overlay.offset = self.frozen_offset;
            view.update_overlay(&overlay);
            overlay.clone()
        };
        if let Some(key) = self.listener.take() {
            observer.un_by_key(key);
        }
        frozen
    }

    /// Remove the overlay, then detach the listener if one is attached.
    pub fn cancel(mut self, observer: Option<&mut GeometryMutationObserver>, view: &mut dyn MapView) {
        view.remove_overlay(self.overlay_id());
        if let (Some(key), Some(observer)) = (self.listener.take(), observer) {
            observer.un_by_key(key);
        }
    }
}
