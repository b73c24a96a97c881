//! Host-side view of text documents.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::connection::Connection;
use crate::protocol::{methods, TextDocumentItem};

type OpenSubscriber = Arc<dyn Fn(&TextDocumentItem) + Send + Sync>;

/// The documents the client has shared with the host, keyed by URI.
/// Documents are never forgotten during a session; a document that leaves
/// the visible set keeps its last-seen contents.
#[derive(Default)]
pub struct ExtDocuments {
    documents: Mutex<HashMap<String, TextDocumentItem>>,
    open_subscribers: RwLock<Vec<OpenSubscriber>>,
}

impl ExtDocuments {
    pub(super) fn new() -> ExtDocuments {
        ExtDocuments::default()
    }

    pub fn get(&self, uri: &str) -> Option<TextDocumentItem> {
        self.documents.lock().unwrap().get(uri).cloned()
    }

    /// All known documents, ordered by URI.
    pub fn all(&self) -> Vec<TextDocumentItem> {
        let mut documents: Vec<TextDocumentItem> =
            self.documents.lock().unwrap().values().cloned().collect();
        documents.sort_by(|a, b| a.uri.cmp(&b.uri));
        documents
    }

    /// Adds a subscriber invoked once for each document the first time it
    /// becomes known.
    pub fn on_did_open(&self, subscriber: impl Fn(&TextDocumentItem) + Send + Sync + 'static) {
        self.open_subscribers
            .write()
            .unwrap()
            .push(Arc::new(subscriber));
    }

    fn accept(&self, incoming: Vec<TextDocumentItem>) {
        let mut opened = Vec::new();
        {
            let mut documents = self.documents.lock().unwrap();
            for document in incoming {
                if !documents.contains_key(&document.uri) {
                    opened.push(document.clone());
                }
                documents.insert(document.uri.clone(), document);
            }
        }
        if opened.is_empty() {
            return;
        }
        let subscribers: Vec<OpenSubscriber> =
            self.open_subscribers.read().unwrap().clone();
        for document in &opened {
            for subscriber in &subscribers {
                subscriber(document);
            }
        }
    }
}

pub(super) fn wire(connection: &Connection, documents: &Arc<ExtDocuments>) {
    let documents = documents.clone();
    connection.on_notification(methods::documents::ACCEPT_DATA, move |params| {
        match serde_json::from_value(params) {
            Ok(incoming) => documents.accept(incoming),
            Err(err) => tracing::error!("invalid document data: {err}"),
        }
    });
}
