// The single authoritative "which feature is selected" value.
use std::rc::Rc;

use log::debug;

use crate::dataset::Feature;
use crate::identity::FeatureIdentity;

#[derive(Debug, Clone, Default)]
pub enum Selection {
    #[default]
    Empty,
    Selected(Rc<Feature>),
}

impl Selection {
    pub fn feature(&self) -> Option<&Rc<Feature>> {
        match self {
            Selection::Empty => None,
            Selection::Selected(feature) => Some(feature),
        }
    }

    pub fn identity(&self) -> Option<&FeatureIdentity> {
        self.feature().map(|f| f.identity())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Empty)
    }
}

/// Owned by the container; both views read it and request changes through
/// [`SelectionState::select`].
#[derive(Debug, Default)]
pub struct SelectionState {
    current: Selection,
    revision: u64,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Selection {
        &self.current
    }

    /// Bumped on every change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// `Some(feature)` selects it, `None` clears. Returns whether the value
    /// changed; selecting the same identity again is not a change.
    pub fn select(&mut self, feature: Option<Rc<Feature>>) -> bool {
        let next = match feature {
            Some(feature) => Selection::Selected(feature),
            None => Selection::Empty,
        };
        if self.current.identity() == next.identity() {
            return false;
        }
        debug!(
            "Selection {} -> {}",
            describe(&self.current),
            describe(&next)
        );
        self.current = next;
        self.revision += 1;
        true
    }

    pub fn clear(&mut self) -> bool {
        self.select(None)
    }

    pub fn selected_identity(&self) -> Option<&FeatureIdentity> {
        self.current.identity()
    }

    pub fn is_selected(&self, identity: &FeatureIdentity) -> bool {
        self.selected_identity() == Some(identity)
    }
}

fn describe(selection: &Selection) -> String {
    match selection {
        Selection::Empty => "empty".to_string(),
        Selection::Selected(f) => format!("'{}' (#{})", f.name(), f.positional_index()),
    }
}
