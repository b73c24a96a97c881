//! Panel views contributed by extensions.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::protocol::PanelViewUpdate;

/// A panel view shown in the client's panel area.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelView {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// Registry of panel views, keyed by view id.
#[derive(Default)]
pub struct ViewRegistry {
    views: RwLock<HashMap<String, PanelView>>,
}

impl ViewRegistry {
    pub fn new() -> ViewRegistry {
        ViewRegistry::default()
    }

    /// Registers an empty panel view under the given id, replacing any
    /// existing view with that id.
    pub fn register(&self, id: impl Into<String>) {
        let id = id.into();
        let view = PanelView {
            id: id.clone(),
            ..Default::default()
        };
        self.views.write().unwrap().insert(id, view);
    }

    /// Applies a partial update to a registered view. Returns false when no
    /// view with the id exists.
    pub fn update(&self, id: &str, update: &PanelViewUpdate) -> bool {
        let mut views = self.views.write().unwrap();
        let Some(view) = views.get_mut(id) else {
            return false;
        };
        if let Some(title) = &update.title {
            view.title = title.clone();
        }
        if let Some(content) = &update.content {
            view.content = content.clone();
        }
        true
    }

    pub fn remove(&self, id: &str) {
        self.views.write().unwrap().remove(id);
    }

    pub fn get(&self, id: &str) -> Option<PanelView> {
        self.views.read().unwrap().get(id).cloned()
    }

    /// All registered views, ordered by id.
    pub fn list(&self) -> Vec<PanelView> {
        let mut views: Vec<PanelView> = self.views.read().unwrap().values().cloned().collect();
        views.sort_by(|a, b| a.id.cmp(&b.id));
        views
    }
}
