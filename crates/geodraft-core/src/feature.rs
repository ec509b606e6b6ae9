//! Features, categories and the in-memory working set.

use crate::geometry::Geometry;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Local handle for a feature in the working set. Stable for the feature's
/// lifetime in memory, unlike [`FeatureId`] which only exists once saved.
pub type FeatureKey = Uuid;

/// Identifier assigned by the feature store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Number(i64),
    Text(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{}", n),
            FeatureId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FeatureId {
    fn from(n: i64) -> Self {
        FeatureId::Number(n)
    }
}

impl From<&str> for FeatureId {
    fn from(s: &str) -> Self {
        FeatureId::Text(s.to_string())
    }
}

/// Category label for buildings.
pub const BUILDINGS: &str = "Buildings";
/// Category label for land parcels.
pub const PARCELS: &str = "Parcels";

/// Default fill color for a category.
pub fn category_color(category: &str) -> &'static str {
    if category == BUILDINGS { "red" } else { "blue" }
}

/// A polygon (or line) feature with its category and selection flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    key: FeatureKey,
    /// Store-assigned id; `None` until saved and reloaded.
    pub id: Option<FeatureId>,
    /// Geometry in projected (EPSG:3857) coordinates.
    pub geometry: Geometry,
    /// Category label.
    pub layer_type: String,
    /// Explicit color stored with the feature, overriding the category default.
    pub color: Option<String>,
    selected: bool,
    is_inner: bool,
}

impl Feature {
    /// Create an unsaved feature.
    pub fn new(geometry: Geometry, layer_type: impl Into<String>) -> Self {
        Self {
            key: Uuid::new_v4(),
            id: None,
            geometry,
            layer_type: layer_type.into(),
            color: None,
            selected: false,
            is_inner: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<FeatureId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn key(&self) -> FeatureKey {
        self.key
    }

    /// Effective fill color: the stored color, or the category default.
    pub fn color(&self) -> &str {
        self.color
            .as_deref()
            .unwrap_or_else(|| category_color(&self.layer_type))
    }

    /// Whether the store has assigned an id to this feature.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_inner(&self) -> bool {
        self.is_inner
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub(crate) fn set_inner(&mut self, inner: bool) {
        self.is_inner = inner;
    }
}

/// The features currently loaded into the editable layer, in draw order.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    features: HashMap<FeatureKey, Feature>,
    /// Back to front.
    z_order: Vec<FeatureKey>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature on top of the others.
    pub fn add(&mut self, feature: Feature) -> FeatureKey {
        let key = feature.key();
        self.z_order.push(key);
        self.features.insert(key, feature);
        key
    }

    pub fn remove(&mut self, key: FeatureKey) -> Option<Feature> {
        self.z_order.retain(|&k| k != key);
        self.features.remove(&key)
    }

    pub fn get(&self, key: FeatureKey) -> Option<&Feature> {
        self.features.get(&key)
    }

    pub fn get_mut(&mut self, key: FeatureKey) -> Option<&mut Feature> {
        self.features.get_mut(&key)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features back to front.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.z_order.iter().filter_map(|key| self.features.get(key))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Feature> {
        self.features.values_mut()
    }

    pub fn clear(&mut self) {
        self.features.clear();
        self.z_order.clear();
    }

    /// Replace every feature with a freshly loaded set.
    pub fn replace_all(&mut self, features: impl IntoIterator<Item = Feature>) {
        self.clear();
        for feature in features {
            self.add(feature);
        }
    }

    /// Features the store has not assigned an id to yet.
    pub fn unsaved(&self) -> impl Iterator<Item = &Feature> {
        self.iter().filter(|feature| !feature.is_persisted())
    }

    pub fn find_by_id(&self, id: &FeatureId) -> Option<&Feature> {
        self.iter().find(|feature| feature.id.as_ref() == Some(id))
    }

    /// Topmost feature whose geometry contains `point`.
    pub fn topmost_at(&self, point: Point) -> Option<FeatureKey> {
        self.z_order
            .iter()
            .rev()
            .copied()
            .find(|key| self.features.get(key).is_some_and(|f| f.geometry.contains(point)))
    }

    /// Currently selected feature, if any.
    pub fn selected(&self) -> Option<&Feature> {
        self.iter().find(|feature| feature.is_selected())
    }
}
