//! Text document decorations set by extensions.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::protocol::TextDocumentDecoration;

/// The latest decorations per document, keyed by document URI. Setting
/// decorations replaces the document's previous set wholesale.
#[derive(Default)]
pub struct DecorationRegistry {
    decorations: RwLock<HashMap<String, Vec<TextDocumentDecoration>>>,
}

impl DecorationRegistry {
    pub fn new() -> DecorationRegistry {
        DecorationRegistry::default()
    }

    pub fn set(&self, uri: impl Into<String>, decorations: Vec<TextDocumentDecoration>) {
        self.decorations.write().unwrap().insert(uri.into(), decorations);
    }

    pub fn get(&self, uri: &str) -> Vec<TextDocumentDecoration> {
        self.decorations
            .read()
            .unwrap()
            .get(uri)
            .cloned()
            .unwrap_or_default()
    }
}
