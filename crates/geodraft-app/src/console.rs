//! A map view that reports to the terminal.

use geodraft_core::projection::to_lon_lat;
use geodraft_core::{Interaction, LayerKind, MapView, Notice, Overlay, OverlayId};
use std::collections::BTreeSet;

/// Prints overlay changes and notices; tracks attached interactions.
#[derive(Debug)]
pub struct ConsoleView {
    resolution: f64,
    interactions: BTreeSet<Interaction>,
    /// Print every interaction and layer change too.
    pub verbose: bool,
}

impl ConsoleView {
    pub fn new(resolution: f64) -> Self {
        Self {
            resolution,
            interactions: BTreeSet::new(),
            verbose: false,
        }
    }

    pub fn interactions(&self) -> &BTreeSet<Interaction> {
        &self.interactions
    }
}

fn describe(overlay: &Overlay) -> String {
    match overlay.position {
        Some(position) => {
            let lon_lat = to_lon_lat(position);
            format!("{} at {:.6}, {:.6}", overlay.text, lon_lat.x, lon_lat.y)
        }
        None => overlay.text.clone(),
    }
}

impl MapView for ConsoleView {
    fn add_interaction(&mut self, interaction: Interaction) {
        self.interactions.insert(interaction);
        if self.verbose {
            println!("  + {:?}", interaction);
        }
    }

    fn remove_interaction(&mut self, interaction: Interaction) {
        self.interactions.remove(&interaction);
        if self.verbose {
            println!("  - {:?}", interaction);
        }
    }

    fn add_overlay(&mut self, overlay: &Overlay) {
        if self.verbose {
            println!("  [{}] new label", overlay.id);
        }
    }

    fn update_overlay(&mut self, overlay: &Overlay) {
        println!("  [{} {:?}] {}", overlay.id, overlay.class, describe(overlay));
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        if self.verbose {
            println!("  [{}] removed", id);
        }
    }

    fn layer_changed(&mut self, layer: LayerKind) {
        if self.verbose {
            println!("  redraw {:?}", layer);
        }
    }

    fn notify(&mut self, notice: &Notice) {
        println!("! {}", notice.message());
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }
}
