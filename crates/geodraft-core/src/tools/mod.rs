//! Interaction tools: drawing, snapping and vertex modification.

mod draw;
mod modify;
mod snap;

pub use draw::DrawGesture;
pub use modify::{ModifyTool, VertexRef};
pub use snap::{SnapResult, SnapTarget, SnapTargetKind, snap_point};

use crate::tooltip::TooltipOffsets;

/// Pixel tolerances and label offsets shared by the tools.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolConfig {
    /// Snap radius around vertices and edges.
    pub snap_tolerance_px: f64,
    /// Hit radius for grabbing a vertex or edge with the modify tool.
    pub modify_tolerance_px: f64,
    /// Radius around the first (polygon) or last (line) vertex that finishes a sketch.
    pub finish_tolerance_px: f64,
    pub tooltip_offsets: TooltipOffsets,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            snap_tolerance_px: 10.0,
            modify_tolerance_px: 10.0,
            finish_tolerance_px: 12.0,
            tooltip_offsets: TooltipOffsets::default(),
        }
    }
}
