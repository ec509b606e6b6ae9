//! GeoDraft Core Library
//!
//! Interaction core of the GeoDraft map digitizer: drawing, editing and
//! measuring modes over a working set of polygon features, synchronized with
//! a remote feature store.

pub mod feature;
pub mod geometry;
pub mod measure;
pub mod mode;
pub mod observer;
pub mod projection;
pub mod selection;
pub mod sphere;
pub mod style;
pub mod sync;
pub mod tools;
pub mod tooltip;
pub mod view;
pub mod workspace;

pub use feature::{BUILDINGS, Feature, FeatureId, FeatureKey, PARCELS, WorkingSet, category_color};
pub use geometry::{Geometry, GeometryKind};
pub use measure::{MeasureLayer, Measurement, MeasurementSession};
pub use mode::{Mode, ModeContext, ModeController};
pub use observer::{GeometryMutationObserver, ListenerKey};
pub use selection::{ChildLookup, SelectOutcome, SelectionManager};
pub use style::{StyleSpec, measure_style, parse_css_color, style_of};
pub use sync::{FeatureSyncClient, MemoryTransport, SyncError, SyncResult, Transport};
pub use tools::ToolConfig;
pub use tooltip::{MeasureKind, Overlay, OverlayClass, OverlayId, TooltipOffsets, TooltipOverlaySession};
pub use view::{Interaction, LayerKind, MapView, Notice, RecordingView, ViewEvent};
pub use workspace::{CategoryFilter, Workspace};

#[cfg(not(target_arch = "wasm32"))]
pub use sync::HttpTransport;
