//! Static contributions from enabled extensions' manifests.
//!
//! Unlike the other registries, this one is replaced wholesale whenever the
//! environment changes: the set of contributions is a pure function of the
//! enabled extensions, not of extension-host activity.

use std::sync::RwLock;

use crate::environment::{ActionContribution, Contributions};

/// Holds the contributions of all currently enabled extensions.
#[derive(Default)]
pub struct ContributionRegistry {
    entries: RwLock<Vec<Contributions>>,
}

impl ContributionRegistry {
    pub fn new() -> ContributionRegistry {
        ContributionRegistry::default()
    }

    /// Replaces the full set of contributions.
    pub fn replace_all(&self, contributions: Vec<Contributions>) {
        *self.entries.write().unwrap() = contributions;
    }

    pub fn all(&self) -> Vec<Contributions> {
        self.entries.read().unwrap().clone()
    }

    /// All contributed actions, flattened in contribution order.
    pub fn actions(&self) -> Vec<ActionContribution> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .flat_map(|contributions| contributions.actions.iter().cloned())
            .collect()
    }
}
