//! Boundary to the map view that renders layers, overlays and tool chrome.
//!
//! The core never draws. It tells the view which interaction tools are
//! attached, which overlays exist, and when a layer needs redrawing.

use crate::tooltip::{Overlay, OverlayId};
use std::collections::{BTreeMap, BTreeSet};

/// Interaction tools the view attaches to the map (cursor, handles, sketch rendering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interaction {
    /// Polygon drawing into the working layer.
    Draw,
    /// Vertex/edge snapping against the working layer.
    Snap,
    /// Vertex editing of working-layer features.
    Modify,
    /// Line or polygon drawing into the measurement layer.
    MeasureDraw,
}

/// Vector layers owned by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Editable features loaded from (or bound for) the store.
    Working,
    /// Committed measurement geometry.
    Measure,
}

/// Operator-facing notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Save was requested with no unsaved features.
    NothingToSave,
    /// The store accepted a save of `count` features.
    Saved { count: usize },
    /// The store rejected a save, or it never arrived.
    SaveFailed { reason: String },
}

impl Notice {
    /// Short message for display.
    pub fn message(&self) -> String {
        match self {
            Notice::NothingToSave => "There are no NEW features for saving".to_string(),
            Notice::Saved { .. } => "Saved successfully".to_string(),
            Notice::SaveFailed { reason } => format!("Save failed: {}", reason),
        }
    }
}

/// The map view driven by the core.
pub trait MapView {
    fn add_interaction(&mut self, interaction: Interaction);
    fn remove_interaction(&mut self, interaction: Interaction);
    fn add_overlay(&mut self, overlay: &Overlay);
    fn update_overlay(&mut self, overlay: &Overlay);
    fn remove_overlay(&mut self, id: OverlayId);
    /// A layer's contents or feature flags changed and it must be redrawn.
    fn layer_changed(&mut self, layer: LayerKind);
    fn notify(&mut self, notice: &Notice);

    /// Map units (meters) per screen pixel at the current zoom.
    fn resolution(&self) -> f64 {
        1.0
    }
}

/// A single call made on a [`MapView`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    InteractionAdded(Interaction),
    InteractionRemoved(Interaction),
    OverlayAdded(Overlay),
    OverlayUpdated(Overlay),
    OverlayRemoved(OverlayId),
    LayerChanged(LayerKind),
    Notice(Notice),
}

/// A view that records every call, for tests and headless use.
#[derive(Debug, Default)]
pub struct RecordingView {
    events: Vec<ViewEvent>,
    interactions: BTreeSet<Interaction>,
    overlays: BTreeMap<OverlayId, Overlay>,
    resolution: Option<f64>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed map resolution instead of the default.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn events(&self) -> &[ViewEvent] {
        &self.events
    }

    /// Drain the recorded calls.
    pub fn take_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn interactions(&self) -> &BTreeSet<Interaction> {
        &self.interactions
    }

    pub fn has_interaction(&self, interaction: Interaction) -> bool {
        self.interactions.contains(&interaction)
    }

    /// Overlays currently on the map.
    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.values()
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(&id)
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.events.iter().filter_map(|event| match event {
            ViewEvent::Notice(notice) => Some(notice),
            _ => None,
        })
    }
}

impl MapView for RecordingView {
    fn add_interaction(&mut self, interaction: Interaction) {
        self.interactions.insert(interaction);
        self.events.push(ViewEvent::InteractionAdded(interaction));
    }

    fn remove_interaction(&mut self, interaction: Interaction) {
        self.interactions.remove(&interaction);
        self.events.push(ViewEvent::InteractionRemoved(interaction));
    }

    fn add_overlay(&mut self, overlay: &Overlay) {
        self.overlays.insert(overlay.id, overlay.clone());
        self.events.push(ViewEvent::OverlayAdded(overlay.clone()));
    }

    fn update_overlay(&mut self, overlay: &Overlay) {
        self.overlays.insert(overlay.id, overlay.clone());
        self.events.push(ViewEvent::OverlayUpdated(overlay.clone()));
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        self.overlays.remove(&id);
        self.events.push(ViewEvent::OverlayRemoved(id));
    }

    fn layer_changed(&mut self, layer: LayerKind) {
        self.events.push(ViewEvent::LayerChanged(layer));
    }

    fn notify(&mut self, notice: &Notice) {
        self.events.push(ViewEvent::Notice(notice.clone()));
    }

    fn resolution(&self) -> f64 {
        self.resolution.unwrap_or(1.0)
    }
}
