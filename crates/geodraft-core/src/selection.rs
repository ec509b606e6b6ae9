//! Single-feature selection with inner (child) feature highlighting.
//!
//! The selection manager is the only writer of the `selected` and `is_inner`
//! flags on features. Child ids come from an asynchronous store lookup; each
//! lookup is tagged with the selection generation it was issued for, and a
//! response for an older generation is discarded.

use crate::feature::{FeatureId, FeatureKey, WorkingSet};
use kurbo::Point;

/// A children lookup to issue for a newly selected persisted feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildLookup {
    pub generation: u64,
    pub id: FeatureId,
}

/// Result of a pointer selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// A feature is now selected. `lookup` is set when it has a store id.
    Selected {
        key: FeatureKey,
        lookup: Option<ChildLookup>,
    },
    /// Nothing was under the pointer; any previous selection was cleared.
    Cleared,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    selected: Option<FeatureKey>,
    generation: u64,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<FeatureKey> {
        self.selected
    }

    /// Incremented on every selection change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Select the topmost working-set feature under `point`, or clear the
    /// selection if there is none.
    pub fn select_at(&mut self, point: Point, features: &mut WorkingSet) -> SelectOutcome {
        match features.topmost_at(point) {
            Some(key) => self.select(key, features),
            None => {
                self.deselect(features);
                SelectOutcome::Cleared
            }
        }
    }

    /// Make `key` the single selected feature.
    pub fn select(&mut self, key: FeatureKey, features: &mut WorkingSet) -> SelectOutcome {
        self.clear_flags(features);
        self.generation += 1;

        let Some(feature) = features.get_mut(key) else {
            self.selected = None;
            return SelectOutcome::Cleared;
        };
        feature.set_selected(true);
        self.selected = Some(key);

        let lookup = feature.id.clone().map(|id| ChildLookup {
            generation: self.generation,
            id,
        });
        log::debug!("Selected feature {} (id {:?})", key, feature.id);
        SelectOutcome::Selected { key, lookup }
    }

    /// Clear the selection and every inner flag. Returns true if something was selected.
    pub fn deselect(&mut self, features: &mut WorkingSet) -> bool {
        let had_selection = self.selected.is_some();
        self.clear_flags(features);
        if had_selection {
            self.generation += 1;
        }
        had_selection
    }

    /// Drop the selection reference without touching features, for when the
    /// working set is about to be replaced. Outstanding lookups become stale.
    pub fn forget(&mut self) {
        self.selected = None;
        self.generation += 1;
    }

    /// Apply a children lookup response: features whose id is listed become
    /// inner, all others are unmarked. Stale responses are ignored.
    pub fn apply_children(
        &mut self,
        generation: u64,
        children: &[FeatureId],
        features: &mut WorkingSet,
    ) -> bool {
        if generation != self.generation || self.selected.is_none() {
            log::debug!(
                "Discarding children lookup for generation {} (current {})",
                generation,
                self.generation
            );
            return false;
        }
        for feature in features.iter_mut() {
            let inner = feature.id.as_ref().is_some_and(|id| children.contains(id));
            feature.set_inner(inner);
        }
        true
    }

    fn clear_flags(&mut self, features: &mut WorkingSet) {
        for feature in features.iter_mut() {
            feature.set_selected(false);
            feature.set_inner(false);
        }
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;
    use crate::geometry::Geometry;

    fn square(x: f64, y: f64, size: f64) -> Geometry {
        Geometry::polygon(vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ])
    }

    /// A parcel (id 1) containing two buildings (ids 2, 3) and an unsaved sketch.
    fn working_set() -> (WorkingSet, [FeatureKey; 4]) {
        let mut set = WorkingSet::new();
        let parcel = set.add(Feature::new(square(0.0, 0.0, 100.0), "Parcels").with_id(1));
        let a = set.add(Feature::new(square(10.0, 10.0, 10.0), "Buildings").with_id(2));
        let b = set.add(Feature::new(square(50.0, 50.0, 10.0), "Buildings").with_id(3));
        let fresh = set.add(Feature::new(square(200.0, 0.0, 10.0), "Buildings"));
        (set, [parcel, a, b, fresh])
    }

    fn selected_count(set: &WorkingSet) -> usize {
        set.iter().filter(|f| f.is_selected()).count()
    }

    #[test]
    fn test_select_persisted_feature_requests_children() {
        let (mut set, [parcel, ..]) = working_set();
        let mut selection = SelectionManager::new();

        let outcome = selection.select_at(Point::new(90.0, 90.0), &mut set);
        let SelectOutcome::Selected { key, lookup } = outcome else {
            panic!("expected a selection");
        };
        assert_eq!(key, parcel);
        assert_eq!(lookup.unwrap().id, FeatureId::Number(1));
        assert!(set.get(parcel).unwrap().is_selected());
    }

    #[test]
    fn test_select_unsaved_feature_skips_lookup() {
        let (mut set, [.., fresh]) = working_set();
        let mut selection = SelectionManager::new();
        let outcome = selection.select_at(Point::new(205.0, 5.0), &mut set);
        assert_eq!(outcome, SelectOutcome::Selected { key: fresh, lookup: None });
    }

    #[test]
    fn test_at_most_one_selected() {
        let (mut set, [parcel, a, b, fresh]) = working_set();
        let mut selection = SelectionManager::new();

        for point in [
            Point::new(15.0, 15.0),
            Point::new(55.0, 55.0),
            Point::new(90.0, 90.0),
            Point::new(205.0, 5.0),
            Point::new(15.0, 15.0),
        ] {
            selection.select_at(point, &mut set);
            assert_eq!(selected_count(&set), 1);
        }
        assert_eq!(selection.selected(), Some(a));
        assert!(!set.get(parcel).unwrap().is_selected());
        assert!(!set.get(b).unwrap().is_selected());
        assert!(!set.get(fresh).unwrap().is_selected());
    }

    #[test]
    fn test_children_mark_inner_features() {
        let (mut set, [parcel, a, b, _]) = working_set();
        let mut selection = SelectionManager::new();
        let SelectOutcome::Selected { lookup: Some(lookup), .. } =
            selection.select_at(Point::new(90.0, 90.0), &mut set)
        else {
            panic!("expected a lookup");
        };

        assert!(selection.apply_children(lookup.generation, &[FeatureId::Number(2)], &mut set));
        assert!(set.get(a).unwrap().is_inner());
        assert!(!set.get(b).unwrap().is_inner());
        assert!(!set.get(parcel).unwrap().is_inner());

        // A second response replaces the marks.
        assert!(selection.apply_children(lookup.generation, &[FeatureId::Number(3)], &mut set));
        assert!(!set.get(a).unwrap().is_inner());
        assert!(set.get(b).unwrap().is_inner());
    }

    #[test]
    fn test_selecting_nothing_clears_flags() {
        let (mut set, [_, a, ..]) = working_set();
        let mut selection = SelectionManager::new();
        let SelectOutcome::Selected { lookup: Some(lookup), .. } =
            selection.select_at(Point::new(90.0, 90.0), &mut set)
        else {
            panic!("expected a lookup");
        };
        selection.apply_children(lookup.generation, &[FeatureId::Number(2)], &mut set);

        assert_eq!(selection.select_at(Point::new(500.0, 500.0), &mut set), SelectOutcome::Cleared);
        assert_eq!(selected_count(&set), 0);
        assert!(!set.get(a).unwrap().is_inner());
        assert_eq!(selection.selected(), None);
    }

    #[test]
    fn test_deselect_clears_inner_flags() {
        let (mut set, [_, a, ..]) = working_set();
        let mut selection = SelectionManager::new();
        let SelectOutcome::Selected { lookup: Some(lookup), .. } =
            selection.select_at(Point::new(90.0, 90.0), &mut set)
        else {
            panic!("expected a lookup");
        };
        selection.apply_children(lookup.generation, &[FeatureId::Number(2)], &mut set);

        assert!(selection.deselect(&mut set));
        assert!(set.iter().all(|f| !f.is_inner() && !f.is_selected()));
        assert!(!selection.deselect(&mut set));
        assert!(!set.get(a).unwrap().is_inner());
    }

    #[test]
    fn test_changing_selection_clears_inner_flags() {
        let (mut set, [_, a, ..]) = working_set();
        let mut selection = SelectionManager::new();
        let SelectOutcome::Selected { lookup: Some(lookup), .. } =
            selection.select_at(Point::new(90.0, 90.0), &mut set)
        else {
            panic!("expected a lookup");
        };
        selection.apply_children(lookup.generation, &[FeatureId::Number(2)], &mut set);

        selection.select_at(Point::new(55.0, 55.0), &mut set);
        assert!(!set.get(a).unwrap().is_inner());
    }

    #[test]
    fn test_stale_children_response_is_discarded() {
        let (mut set, [_, a, ..]) = working_set();
        let mut selection = SelectionManager::new();
        let SelectOutcome::Selected { lookup: Some(first), .. } =
            selection.select_at(Point::new(90.0, 90.0), &mut set)
        else {
            panic!("expected a lookup");
        };
        selection.select_at(Point::new(55.0, 55.0), &mut set);

        assert!(!selection.apply_children(first.generation, &[FeatureId::Number(2)], &mut set));
        assert!(!set.get(a).unwrap().is_inner());
    }

    #[test]
    fn test_response_after_forget_is_discarded() {
        let (mut set, _) = working_set();
        let mut selection = SelectionManager::new();
        let SelectOutcome::Selected { lookup: Some(lookup), .. } =
            selection.select_at(Point::new(90.0, 90.0), &mut set)
        else {
            panic!("expected a lookup");
        };
        selection.forget();
        assert!(!selection.apply_children(lookup.generation, &[FeatureId::Number(2)], &mut set));
    }
}
