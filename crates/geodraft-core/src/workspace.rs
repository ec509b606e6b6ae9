//! The digitizing workspace: working set, modes, selection, measurements and
//! the store client, driven from a single interaction thread.
//!
//! Store requests run as local tasks. Their results are queued and applied
//! by [`Workspace::poll`], so every state change happens on the caller's
//! thread between input events.

use crate::feature::{BUILDINGS, Feature, FeatureId, WorkingSet};
use crate::measure::MeasureLayer;
use crate::mode::{Mode, ModeContext, ModeController};
use crate::selection::{ChildLookup, SelectionManager};
use crate::sync::{FeatureSyncClient, SyncResult, Transport};
use crate::tools::ToolConfig;
use crate::view::{LayerKind, MapView, Notice};
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use kurbo::Point;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, VecDeque};
use std::future::Future;
use std::rc::Rc;

/// Which persisted features are loaded into the working set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// Every feature in the store.
    #[default]
    All,
    /// Only these categories. An empty set loads nothing.
    Only(BTreeSet<String>),
}

/// A finished store request waiting to be applied.
enum StoreEvent {
    Loaded(SyncResult<Vec<Feature>>),
    Children {
        generation: u64,
        result: SyncResult<Vec<FeatureId>>,
    },
    Saved(SyncResult<usize>),
    Deleted {
        id: Option<FeatureId>,
        result: SyncResult<()>,
    },
}

pub struct Workspace<V, T> {
    view: V,
    features: WorkingSet,
    measurements: MeasureLayer,
    selection: SelectionManager,
    modes: ModeController,
    client: FeatureSyncClient<T>,
    category: String,
    filter: CategoryFilter,
    pool: LocalPool,
    spawner: LocalSpawner,
    inbox: Rc<RefCell<VecDeque<StoreEvent>>>,
    in_flight: Rc<Cell<usize>>,
}

impl<V: MapView, T: Transport> Workspace<V, T> {
    pub fn new(view: V, transport: T, tools: ToolConfig) -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            view,
            features: WorkingSet::new(),
            measurements: MeasureLayer::new(),
            selection: SelectionManager::new(),
            modes: ModeController::new(tools),
            client: FeatureSyncClient::new(transport),
            category: BUILDINGS.to_string(),
            filter: CategoryFilter::All,
            pool,
            spawner,
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            in_flight: Rc::new(Cell::new(0)),
        }
    }

    /// Category for new drawings.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Initial category filter. Takes effect on [`initialize`](Self::initialize).
    pub fn with_filter(mut self, filter: CategoryFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The map and tools are ready: enable mode switching and load features.
    pub fn initialize(&mut self) {
        self.modes.initialize();
        log::info!("Workspace initialized, loading features");
        self.reload();
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn features(&self) -> &WorkingSet {
        &self.features
    }

    pub fn measurements(&self) -> &MeasureLayer {
        &self.measurements
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn modes(&self) -> &ModeController {
        &self.modes
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    pub fn client(&self) -> &FeatureSyncClient<T> {
        &self.client
    }

    /// Whether any store request is still outstanding.
    pub fn has_pending(&self) -> bool {
        self.in_flight.get() > 0 || !self.inbox.borrow().is_empty()
    }

    fn with_modes<R>(&mut self, f: impl FnOnce(&mut ModeController, &mut ModeContext<'_>) -> R) -> R {
        let mut cx = ModeContext {
            view: &mut self.view,
            features: &mut self.features,
            selection: &mut self.selection,
            measurements: &mut self.measurements,
            category: &self.category,
        };
        f(&mut self.modes, &mut cx)
    }

    pub fn activate_drawing(&mut self) {
        self.with_modes(|modes, cx| modes.activate_drawing(cx));
    }

    pub fn activate_editing(&mut self) {
        self.with_modes(|modes, cx| modes.activate_editing(cx));
    }

    pub fn activate_measure_length(&mut self) {
        self.with_modes(|modes, cx| modes.activate_measure_length(cx));
    }

    pub fn activate_measure_area(&mut self) {
        self.with_modes(|modes, cx| modes.activate_measure_area(cx));
    }

    /// Change the category used by drawing gestures started from now on.
    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
        log::debug!("Category set to {}", self.category);
    }

    /// Load only the given categories, replacing the working set.
    pub fn set_category_filter(&mut self, categories: BTreeSet<String>) {
        self.filter = CategoryFilter::Only(categories);
        self.reload();
    }

    /// Load every category, replacing the working set.
    pub fn show_all(&mut self) {
        self.filter = CategoryFilter::All;
        self.reload();
    }

    /// Replace the working set with the store's features under the current filter.
    /// Unsaved local features are discarded when the response arrives.
    pub fn reload(&mut self) {
        let request = match &self.filter {
            CategoryFilter::All => self.client.fetch_all(),
            CategoryFilter::Only(categories) => self.client.fetch_by_categories(categories),
        };
        self.spawn(request, StoreEvent::Loaded);
    }

    pub fn pointer_move(&mut self, at: Point) -> Point {
        self.with_modes(|modes, cx| modes.pointer_move(at, cx))
    }

    pub fn click(&mut self, at: Point) {
        if let Some(lookup) = self.with_modes(|modes, cx| modes.click(at, cx)) {
            self.request_children(lookup);
        }
    }

    pub fn double_click(&mut self, at: Point) {
        self.with_modes(|modes, cx| modes.double_click(at, cx));
    }

    pub fn alt_click(&mut self, at: Point) -> bool {
        self.with_modes(|modes, cx| modes.alt_click(at, cx))
    }

    pub fn pointer_down(&mut self, at: Point) -> bool {
        self.with_modes(|modes, cx| modes.pointer_down(at, cx))
    }

    pub fn pointer_drag(&mut self, to: Point) -> bool {
        self.with_modes(|modes, cx| modes.pointer_drag(to, cx))
    }

    pub fn pointer_up(&mut self) {
        if let Some(key) = self.modes.pointer_up() {
            log::debug!("Modified feature {}", key);
        }
    }

    pub fn escape(&mut self) {
        self.with_modes(|modes, cx| modes.escape(cx));
    }

    /// Clear the selection and inner marks without contacting the store.
    pub fn deselect(&mut self) {
        if self.selection.deselect(&mut self.features) {
            self.view.layer_changed(LayerKind::Working);
        }
    }

    /// Remove the selected feature locally, then ask the store to delete it.
    /// A failed delete is only logged; the feature stays removed locally.
    pub fn delete_selected(&mut self) {
        let Some(key) = self.selection.selected() else {
            return;
        };
        self.selection.deselect(&mut self.features);
        let Some(feature) = self.features.remove(key) else {
            return;
        };
        self.view.layer_changed(LayerKind::Working);

        let id = feature.id;
        log::info!("Deleting feature {:?}", id);
        let request = self.client.delete_by_id(id.as_ref());
        self.spawn(request, move |result| StoreEvent::Deleted { id, result });
    }

    /// Send the unsaved features to the store under the current category.
    pub fn save(&mut self) {
        let unsaved: Vec<Feature> = self.features.unsaved().cloned().collect();
        if unsaved.is_empty() {
            self.view.notify(&Notice::NothingToSave);
            return;
        }
        let request = self.client.save_new(&self.category, &unsaved);
        self.spawn(request, StoreEvent::Saved);
    }

    /// Remove every committed measurement and its label.
    pub fn clear_measurements(&mut self) {
        self.measurements.clear(&mut self.view);
    }

    fn request_children(&mut self, lookup: ChildLookup) {
        let request = self.client.fetch_children(&lookup.id);
        let generation = lookup.generation;
        self.spawn(request, move |result| StoreEvent::Children { generation, result });
    }

    fn spawn<R: 'static>(
        &mut self,
        request: impl Future<Output = R> + 'static,
        into_event: impl FnOnce(R) -> StoreEvent + 'static,
    ) {
        let inbox = Rc::clone(&self.inbox);
        let in_flight = Rc::clone(&self.in_flight);
        in_flight.set(in_flight.get() + 1);
        let task = async move {
            let result = request.await;
            inbox.borrow_mut().push_back(into_event(result));
            in_flight.set(in_flight.get() - 1);
        };
        if let Err(e) = self.spawner.spawn_local(task) {
            log::error!("Failed to spawn store request: {}", e);
            self.in_flight.set(self.in_flight.get().saturating_sub(1));
        }
    }

    /// Run store requests that can make progress and apply their results.
    /// Returns the number of results applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        loop {
            self.pool.run_until_stalled();
            let n = self.apply_events();
            if n == 0 {
                return applied;
            }
            applied += n;
        }
    }

    /// Block until every outstanding store request has completed and its
    /// result has been applied.
    pub fn wait(&mut self) -> usize {
        let mut applied = 0;
        loop {
            self.pool.run();
            let n = self.apply_events();
            if n == 0 && self.in_flight.get() == 0 {
                return applied;
            }
            applied += n;
        }
    }

    fn apply_events(&mut self) -> usize {
        let events: Vec<StoreEvent> = self.inbox.borrow_mut().drain(..).collect();
        let count = events.len();
        for event in events {
            self.apply(event);
        }
        count
    }

    fn apply(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Loaded(Ok(features)) => {
                log::info!("Loaded {} features", features.len());
                self.selection.forget();
                self.features.replace_all(features);
                self.view.layer_changed(LayerKind::Working);
            }
            StoreEvent::Loaded(Err(e)) => {
                log::error!("Failed to load features: {}", e);
            }
            StoreEvent::Children { generation, result } => match result {
                Ok(children) => {
                    if self.selection.apply_children(generation, &children, &mut self.features) {
                        self.view.layer_changed(LayerKind::Working);
                    }
                }
                Err(e) => log::error!("Failed to fetch children: {}", e),
            },
            StoreEvent::Saved(Ok(count)) => {
                log::info!("Saved {} features", count);
                self.view.notify(&Notice::Saved { count });
                self.reload();
            }
            StoreEvent::Saved(Err(e)) => {
                log::error!("Failed to save features: {}", e);
                self.view.notify(&Notice::SaveFailed { reason: e.to_string() });
            }
            StoreEvent::Deleted { id, result } => match result {
                Ok(()) => log::debug!("Deleted feature {:?}", id),
                Err(e) => log::error!("Failed to delete feature {:?}: {}", id, e),
            },
        }
    }
}
