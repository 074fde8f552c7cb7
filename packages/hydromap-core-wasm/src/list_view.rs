// List side of the selection sync: one row per feature, selected-state by
// identity, and scrolling the selected row into view.
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::dataset::{Dataset, Feature};
use crate::identity::FeatureIdentity;
use crate::models::ListRow;
use crate::selection::{Selection, SelectionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBlock {
    Start,
    Center,
    End,
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOptions {
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

impl ScrollOptions {
    pub const SMOOTH_CENTER: ScrollOptions = ScrollOptions {
        behavior: ScrollBehavior::Smooth,
        block: ScrollBlock::Center,
    };
}

/// A rendered row that can bring itself into the viewport.
pub trait ScrollTarget {
    fn scroll_into_view(&self, options: ScrollOptions);
}

/// Owns the scroll-target registry for the rendered rows.
pub struct ListView<T: ScrollTarget> {
    targets: HashMap<FeatureIdentity, T>,
}

impl<T: ScrollTarget> Default for ListView<T> {
    fn default() -> Self {
        ListView {
            targets: HashMap::new(),
        }
    }
}

impl<T: ScrollTarget> ListView<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in load order. A row is selected iff its identity equals the
    /// selected identity.
    pub fn rows(&self, dataset: &Dataset, selection: &SelectionState) -> Vec<ListRow> {
        dataset
            .iter()
            .map(|feature| ListRow {
                key: feature.identity().key(),
                name: feature.name().to_string(),
                kind: feature.kind_label(),
                positional_index: feature.positional_index(),
                selected: selection.is_selected(feature.identity()),
            })
            .collect()
    }

    /// Feature behind a clicked row.
    pub fn row_for_key<'d>(&self, dataset: &'d Dataset, key: &str) -> Option<&'d Rc<Feature>> {
        dataset.resolve_key(key)
    }

    /// Rows sharing an identity share one target; the last one registered wins.
    pub fn register_row(&mut self, identity: FeatureIdentity, target: T) {
        self.targets.insert(identity, target);
    }

    pub fn unregister_row(&mut self, identity: &FeatureIdentity) -> Option<T> {
        self.targets.remove(identity)
    }

    pub fn registered(&self) -> usize {
        self.targets.len()
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }

    /// Scroll the newly selected row into view. Nothing happens for an empty
    /// selection or a feature without a row. Returns whether a row scrolled.
    pub fn on_selection_changed(&self, dataset: &Dataset, selection: &Selection) -> bool {
        let Some(selected) = selection.feature() else {
            return false;
        };
        if dataset.resolve(selected.identity()).is_none() {
            debug!("'{}' has no row in the current dataset", selected.name());
            return false;
        }
        match self.targets.get(selected.identity()) {
            Some(target) => {
                target.scroll_into_view(ScrollOptions::SMOOTH_CENTER);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DuplicatePolicy, RecordFields};
    use crate::test_support::{feature, lake_records, RecordingRow};

    fn lakes() -> Dataset {
        Dataset::from_records(lake_records(), &RecordFields::default(), DuplicatePolicy::Merge)
    }

    fn registered(dataset: &Dataset) -> ListView<RecordingRow> {
        let mut view = ListView::new();
        for f in dataset.iter() {
            view.register_row(f.identity().clone(), RecordingRow::default());
        }
        view
    }

    #[test]
    fn rows_show_name_and_lowercased_kind() {
        let dataset = lakes();
        let view: ListView<RecordingRow> = ListView::new();
        let rows = view.rows(&dataset, &SelectionState::new());

        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].name.as_str(), rows[0].kind.as_str()), ("Lake A", "lake"));
        assert_eq!((rows[1].name.as_str(), rows[1].kind.as_str()), ("Pond B", "pond"));
        assert!(rows.iter().all(|r| !r.selected));
    }

    #[test]
    fn selected_row_follows_identity_not_object() {
        let dataset = lakes();
        let view: ListView<RecordingRow> = ListView::new();
        let mut selection = SelectionState::new();
        // An equal feature built separately, as after a re-fetch
        selection.select(Some(Rc::new(feature("Pond B", "POND", 2.0, 1))));

        let rows = view.rows(&dataset, &selection);
        assert_eq!(rows.iter().filter(|r| r.selected).count(), 1);
        assert!(rows[1].selected);
    }

    #[test]
    fn row_keys_resolve_back_to_features() {
        let dataset = lakes();
        let view: ListView<RecordingRow> = ListView::new();
        let rows = view.rows(&dataset, &SelectionState::new());
        let pond = view.row_for_key(&dataset, &rows[1].key).expect("pond");
        assert_eq!(pond.positional_index(), 1);
    }

    #[test]
    fn scrolls_selected_row_smoothly_to_center() {
        let dataset = lakes();
        let view = registered(&dataset);
        let pond = Rc::clone(dataset.feature_at(1).unwrap());

        assert!(view.on_selection_changed(&dataset, &Selection::Selected(Rc::clone(&pond))));
        let target = view.targets.get(pond.identity()).unwrap();
        assert_eq!(target.scrolls.borrow().as_slice(), &[ScrollOptions::SMOOTH_CENTER]);
        let lake = dataset.feature_at(0).unwrap();
        assert!(view.targets.get(lake.identity()).unwrap().scrolls.borrow().is_empty());
    }

    #[test]
    fn no_scroll_for_empty_or_unknown_selection() {
        let dataset = lakes();
        let view = registered(&dataset);

        assert!(!view.on_selection_changed(&dataset, &Selection::Empty));
        let stranger = Rc::new(feature("Elsewhere", "LAKE", 40.0, 9));
        assert!(!view.on_selection_changed(&dataset, &Selection::Selected(stranger)));
        assert!(view.targets.values().all(|t| t.scrolls.borrow().is_empty()));
    }

    #[test]
    fn unregistered_rows_are_not_scrolled() {
        let dataset = lakes();
        let mut view = registered(&dataset);
        let pond = Rc::clone(dataset.feature_at(1).unwrap());

        assert!(view.unregister_row(pond.identity()).is_some());
        assert_eq!(view.registered(), 1);
        assert!(!view.on_selection_changed(&dataset, &Selection::Selected(pond)));

        view.clear();
        assert_eq!(view.registered(), 0);
    }
}
