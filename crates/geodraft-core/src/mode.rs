//! The interaction-mode state machine.
//!
//! Exactly one mode is active. Every mode owns the interaction tools it
//! attached and any in-progress draft; leaving a mode releases all of them
//! before the next mode's entry runs.

use crate::feature::{Feature, FeatureKey, WorkingSet, category_color};
use crate::geometry::{Geometry, GeometryKind};
use crate::measure::{MeasureLayer, MeasurementSession};
use crate::selection::{ChildLookup, SelectOutcome, SelectionManager};
use crate::tooltip::MeasureKind;
use crate::tools::{DrawGesture, ModifyTool, ToolConfig, snap_point};
use crate::view::{Interaction, LayerKind, MapView};
use kurbo::Point;
use std::collections::BTreeSet;
use std::fmt;

/// The operator-visible interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Idle,
    Drawing,
    Editing,
    MeasuringLength,
    MeasuringArea,
}

impl Mode {
    /// Interaction tools attached while this mode is active.
    pub fn interactions(self) -> &'static [Interaction] {
        match self {
            Mode::Idle => &[],
            Mode::Drawing => &[Interaction::Draw, Interaction::Snap],
            Mode::Editing => &[Interaction::Modify],
            Mode::MeasuringLength | Mode::MeasuringArea => &[Interaction::MeasureDraw, Interaction::Snap],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Idle => "idle",
            Mode::Drawing => "drawing",
            Mode::Editing => "editing",
            Mode::MeasuringLength => "measuring length",
            Mode::MeasuringArea => "measuring area",
        };
        f.write_str(name)
    }
}

/// A polygon sketch and the category it will be filed under.
#[derive(Debug)]
struct PendingDraw {
    gesture: DrawGesture,
    category: String,
}

#[derive(Debug, Default)]
enum ActiveMode {
    #[default]
    Idle,
    Drawing {
        pending: Option<PendingDraw>,
    },
    Editing {
        modify: ModifyTool,
    },
    Measuring(MeasurementSession),
}

/// Everything a mode transition or pointer event may touch besides the
/// controller itself.
pub struct ModeContext<'a> {
    pub view: &'a mut dyn MapView,
    pub features: &'a mut WorkingSet,
    pub selection: &'a mut SelectionManager,
    pub measurements: &'a mut MeasureLayer,
    /// Category given to shapes whose gesture starts now.
    pub category: &'a str,
}

#[derive(Debug, Default)]
pub struct ModeController {
    active: ActiveMode,
    attached: BTreeSet<Interaction>,
    ready: bool,
    config: ToolConfig,
}

impl ModeController {
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Mark the map and tool set as available. Until then every mode
    /// operation is a no-op.
    pub fn initialize(&mut self) {
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        match &self.active {
            ActiveMode::Idle => Mode::Idle,
            ActiveMode::Drawing { .. } => Mode::Drawing,
            ActiveMode::Editing { .. } => Mode::Editing,
            ActiveMode::Measuring(session) => match session.kind() {
                MeasureKind::Length => Mode::MeasuringLength,
                MeasureKind::Area => Mode::MeasuringArea,
            },
        }
    }

    /// Interaction tools currently attached to the map.
    pub fn attached(&self) -> &BTreeSet<Interaction> {
        &self.attached
    }

    /// Geometry of the shape being drawn or measured, if a gesture is in progress.
    pub fn sketch(&self) -> Option<&Geometry> {
        match &self.active {
            ActiveMode::Drawing { pending: Some(draw) } => Some(draw.gesture.sketch()),
            ActiveMode::Measuring(session) => session.gesture().map(DrawGesture::sketch),
            _ => None,
        }
    }

    /// Category captured by the drawing gesture in progress.
    pub fn pending_category(&self) -> Option<&str> {
        match &self.active {
            ActiveMode::Drawing { pending: Some(draw) } => Some(&draw.category),
            _ => None,
        }
    }

    pub fn measurement(&self) -> Option<&MeasurementSession> {
        match &self.active {
            ActiveMode::Measuring(session) => Some(session),
            _ => None,
        }
    }

    pub fn activate_drawing(&mut self, cx: &mut ModeContext<'_>) {
        self.toggle(Mode::Drawing, cx);
    }

    pub fn activate_editing(&mut self, cx: &mut ModeContext<'_>) {
        self.toggle(Mode::Editing, cx);
    }

    pub fn activate_measure_length(&mut self, cx: &mut ModeContext<'_>) {
        self.toggle(Mode::MeasuringLength, cx);
    }

    pub fn activate_measure_area(&mut self, cx: &mut ModeContext<'_>) {
        self.toggle(Mode::MeasuringArea, cx);
    }

    /// Leave the current mode, then enter `target` unless it was the current one.
    fn toggle(&mut self, target: Mode, cx: &mut ModeContext<'_>) {
        if !self.ready {
            log::debug!("Ignoring {} activation: tools not initialized", target);
            return;
        }
        let current = self.mode();
        self.exit(cx);
        if current == target {
            log::debug!("Mode {} -> {}", current, Mode::Idle);
            return;
        }
        self.enter(target, cx);
        log::debug!("Mode {} -> {}", current, target);
    }

    fn exit(&mut self, cx: &mut ModeContext<'_>) {
        match std::mem::take(&mut self.active) {
            ActiveMode::Idle => {}
            ActiveMode::Drawing { pending } => {
                if pending.is_some() {
                    log::debug!("Discarding unfinished drawing");
                }
                self.release_all(cx.view);
            }
            ActiveMode::Editing { mut modify } => {
                modify.cancel();
                self.release_all(cx.view);
                if cx.selection.deselect(cx.features) {
                    cx.view.layer_changed(LayerKind::Working);
                }
            }
            ActiveMode::Measuring(session) => {
                session.cancel(cx.view);
                self.release_all(cx.view);
            }
        }
    }

    fn enter(&mut self, mode: Mode, cx: &mut ModeContext<'_>) {
        for &interaction in mode.interactions() {
            self.attach(interaction, cx.view);
        }
        self.active = match mode {
            Mode::Idle => ActiveMode::Idle,
            Mode::Drawing => ActiveMode::Drawing { pending: None },
            Mode::Editing => ActiveMode::Editing {
                modify: ModifyTool::new(),
            },
            Mode::MeasuringLength => ActiveMode::Measuring(MeasurementSession::start(
                MeasureKind::Length,
                self.config.tooltip_offsets,
                cx.view,
            )),
            Mode::MeasuringArea => ActiveMode::Measuring(MeasurementSession::start(
                MeasureKind::Area,
                self.config.tooltip_offsets,
                cx.view,
            )),
        };
    }

    fn attach(&mut self, interaction: Interaction, view: &mut dyn MapView) {
        if self.attached.insert(interaction) {
            view.add_interaction(interaction);
        }
    }

    fn release_all(&mut self, view: &mut dyn MapView) {
        for interaction in std::mem::take(&mut self.attached) {
            view.remove_interaction(interaction);
        }
    }

    /// Snap to working-set geometry when the snap tool is attached.
    fn snapped(&self, at: Point, cx: &ModeContext<'_>) -> Point {
        if !self.attached.contains(&Interaction::Snap) {
            return at;
        }
        let tolerance = self.config.snap_tolerance_px * cx.view.resolution();
        snap_point(at, cx.features, tolerance).point
    }

    /// Pointer moved: the trailing sketch vertex follows it. Returns the
    /// (possibly snapped) pointer position.
    pub fn pointer_move(&mut self, at: Point, cx: &mut ModeContext<'_>) -> Point {
        let at = self.snapped(at, cx);
        match &mut self.active {
            ActiveMode::Drawing { pending: Some(draw) } => draw.gesture.move_cursor(at, cx.view),
            ActiveMode::Measuring(session) => session.move_cursor(at, cx.view),
            _ => {}
        }
        at
    }

    /// Single click. Places or finishes sketch vertices while drawing or
    /// measuring, and selects while editing. Returns the children lookup to
    /// run for a newly selected persisted feature.
    pub fn click(&mut self, at: Point, cx: &mut ModeContext<'_>) -> Option<ChildLookup> {
        let at = self.snapped(at, cx);
        let finish_tolerance = self.config.finish_tolerance_px * cx.view.resolution();
        match &mut self.active {
            ActiveMode::Idle => None,
            ActiveMode::Editing { .. } => {
                let outcome = cx.selection.select_at(at, cx.features);
                cx.view.layer_changed(LayerKind::Working);
                match outcome {
                    SelectOutcome::Selected { lookup, .. } => lookup,
                    SelectOutcome::Cleared => None,
                }
            }
            ActiveMode::Drawing { pending } => {
                match pending {
                    None => {
                        *pending = Some(PendingDraw {
                            gesture: DrawGesture::begin(GeometryKind::Polygon, at),
                            category: cx.category.to_string(),
                        });
                    }
                    Some(draw) if draw.gesture.is_finish_click(at, finish_tolerance) => {
                        self.finish_drawing(cx);
                    }
                    Some(draw) => draw.gesture.add_vertex(at, cx.view),
                }
                None
            }
            ActiveMode::Measuring(session) => {
                if session.is_finish_click(at, finish_tolerance) {
                    self.finish_measurement(cx);
                } else {
                    session.add_vertex(at, cx.view);
                }
                None
            }
        }
    }

    /// Double click: place a final vertex and finish the sketch.
    pub fn double_click(&mut self, at: Point, cx: &mut ModeContext<'_>) {
        let at = self.snapped(at, cx);
        match &mut self.active {
            ActiveMode::Drawing { pending: Some(draw) } => {
                draw.gesture.add_vertex(at, cx.view);
                self.finish_drawing(cx);
            }
            ActiveMode::Measuring(session) if session.is_drawing() => {
                session.add_vertex(at, cx.view);
                self.finish_measurement(cx);
            }
            _ => {}
        }
    }

    /// Abort the gesture in progress without leaving the mode.
    pub fn escape(&mut self, cx: &mut ModeContext<'_>) {
        match &mut self.active {
            ActiveMode::Drawing { pending } => {
                if pending.take().is_some() {
                    log::debug!("Drawing aborted");
                }
            }
            ActiveMode::Editing { modify } => modify.cancel(),
            ActiveMode::Measuring(session) if session.is_drawing() => {
                let kind = session.kind();
                if let ActiveMode::Measuring(session) = std::mem::take(&mut self.active) {
                    session.cancel(cx.view);
                }
                self.active = ActiveMode::Measuring(MeasurementSession::start(
                    kind,
                    self.config.tooltip_offsets,
                    cx.view,
                ));
                log::debug!("Measurement aborted");
            }
            _ => {}
        }
    }

    /// Press while editing: grab a vertex or insert one on an edge.
    pub fn pointer_down(&mut self, at: Point, cx: &mut ModeContext<'_>) -> bool {
        let tolerance = self.config.modify_tolerance_px * cx.view.resolution();
        let ActiveMode::Editing { modify } = &mut self.active else {
            return false;
        };
        let grabbed = modify.pointer_down(at, cx.features, tolerance);
        if grabbed {
            cx.view.layer_changed(LayerKind::Working);
        }
        grabbed
    }

    pub fn pointer_drag(&mut self, to: Point, cx: &mut ModeContext<'_>) -> bool {
        let ActiveMode::Editing { modify } = &mut self.active else {
            return false;
        };
        let moved = modify.pointer_drag(to, cx.features);
        if moved {
            cx.view.layer_changed(LayerKind::Working);
        }
        moved
    }

    /// Release the grabbed vertex, returning the feature that was modified.
    pub fn pointer_up(&mut self) -> Option<FeatureKey> {
        match &mut self.active {
            ActiveMode::Editing { modify } => modify.pointer_up(),
            _ => None,
        }
    }

    /// Alt-click while editing removes the vertex under the pointer.
    pub fn alt_click(&mut self, at: Point, cx: &mut ModeContext<'_>) -> bool {
        let tolerance = self.config.modify_tolerance_px * cx.view.resolution();
        let ActiveMode::Editing { modify } = &mut self.active else {
            return false;
        };
        let removed = modify.remove_vertex_at(at, cx.features, tolerance);
        if removed {
            cx.view.layer_changed(LayerKind::Working);
        }
        removed
    }

    /// File the finished sketch as an unsaved feature of its captured category.
    fn finish_drawing(&mut self, cx: &mut ModeContext<'_>) {
        let ActiveMode::Drawing { pending } = &mut self.active else {
            return;
        };
        let Some(mut draw) = pending.take() else {
            return;
        };
        match draw.gesture.finish(cx.view) {
            Some(geometry) => {
                let feature =
                    Feature::new(geometry, draw.category.as_str()).with_color(category_color(&draw.category));
                log::debug!("Drew new {} feature {}", draw.category, feature.key());
                cx.features.add(feature);
                cx.view.layer_changed(LayerKind::Working);
            }
            None => *pending = Some(draw),
        }
    }

    /// Commit the measurement and return to idle; its label stays on the map.
    fn finish_measurement(&mut self, cx: &mut ModeContext<'_>) {
        let ActiveMode::Measuring(session) = std::mem::take(&mut self.active) else {
            return;
        };
        match session.finish(cx.view) {
            Ok(measurement) => {
                let from = match measurement.kind {
                    MeasureKind::Length => Mode::MeasuringLength,
                    MeasureKind::Area => Mode::MeasuringArea,
                };
                cx.measurements.commit(measurement, cx.view);
                self.release_all(cx.view);
                log::debug!("Mode {} -> {}", from, Mode::Idle);
            }
            Err(session) => self.active = ActiveMode::Measuring(session),
        }
    }
}
