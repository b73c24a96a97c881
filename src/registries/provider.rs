//! Language-feature provider registries.
//!
//! Each provider is registered together with a [`DocumentSelector`]; queries
//! consult only the providers whose selector matches the target document.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::protocol::{
    DocumentFilter, DocumentSelector, Hover, Location, TextDocumentItem,
    TextDocumentPositionParams,
};

/// Provides hover information for a position in a document.
#[async_trait]
pub trait HoverProvider: Send + Sync {
    async fn provide_hover(&self, params: TextDocumentPositionParams)
        -> anyhow::Result<Option<Hover>>;
}

/// Provides locations (definitions, references, ...) for a position in a
/// document.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn provide_locations(
        &self,
        params: TextDocumentPositionParams,
    ) -> anyhow::Result<Vec<Location>>;
}

struct ProviderEntry<P: ?Sized> {
    id: u64,
    selector: DocumentSelector,
    provider: Arc<P>,
}

/// Ordered registry of providers keyed by document selector.
///
/// Providers are numbered on registration so the extension host can refer to
/// them when unregistering.
pub struct ProviderRegistry<P: ?Sized> {
    entries: RwLock<Vec<ProviderEntry<P>>>,
    next_id: std::sync::atomic::AtomicU64,
}

pub type HoverProviderRegistry = ProviderRegistry<dyn HoverProvider>;
pub type LocationProviderRegistry = ProviderRegistry<dyn LocationProvider>;

impl<P: ?Sized> Default for ProviderRegistry<P> {
    fn default() -> Self {
        ProviderRegistry {
            entries: RwLock::new(Vec::new()),
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }
}

impl<P: ?Sized> ProviderRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider and returns its registration id.
    pub fn register(&self, selector: DocumentSelector, provider: Arc<P>) -> u64 {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.entries.write().unwrap().push(ProviderEntry {
            id,
            selector,
            provider,
        });
        id
    }

    /// Removes the registration with the given id, if any.
    pub fn unregister(&self, id: u64) {
        self.entries.write().unwrap().retain(|entry| entry.id != id);
    }

    pub fn provider_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// The providers whose selector matches the document, in registration
    /// order.
    pub fn providers_for(&self, document: &TextDocumentItem) -> Vec<Arc<P>> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|entry| selector_matches(&entry.selector, document))
            .map(|entry| entry.provider.clone())
            .collect()
    }
}

impl ProviderRegistry<dyn HoverProvider> {
    /// Queries matching hover providers in registration order; the first
    /// non-empty result wins. Provider errors are logged and skipped.
    pub async fn get_hover(
        &self,
        document: &TextDocumentItem,
        params: TextDocumentPositionParams,
    ) -> Option<Hover> {
        for provider in self.providers_for(document) {
            match provider.provide_hover(params.clone()).await {
                Ok(Some(hover)) => return Some(hover),
                Ok(None) => {}
                Err(err) => tracing::warn!(uri = %params.text_document.uri, "hover provider failed: {err:#}"),
            }
        }
        None
    }
}

impl ProviderRegistry<dyn LocationProvider> {
    /// Queries all matching location providers and concatenates their
    /// results in registration order. Provider errors are logged and skipped.
    pub async fn get_locations(
        &self,
        document: &TextDocumentItem,
        params: TextDocumentPositionParams,
    ) -> Vec<Location> {
        let mut locations = Vec::new();
        for provider in self.providers_for(document) {
            match provider.provide_locations(params.clone()).await {
                Ok(mut found) => locations.append(&mut found),
                Err(err) => tracing::warn!(uri = %params.text_document.uri, "location provider failed: {err:#}"),
            }
        }
        locations
    }
}

/// Whether the selector matches the document. An empty selector matches
/// everything; otherwise at least one filter must match on all the fields it
/// sets.
pub fn selector_matches(selector: &DocumentSelector, document: &TextDocumentItem) -> bool {
    if selector.is_empty() {
        return true;
    }
    selector
        .iter()
        .any(|filter| filter_matches(filter, document))
}

fn filter_matches(filter: &DocumentFilter, document: &TextDocumentItem) -> bool {
    if let Some(language) = &filter.language {
        if *language != document.language_id {
            return false;
        }
    }
    if let Some(scheme) = &filter.scheme {
        let document_scheme = document.uri.split(':').next().unwrap_or("");
        if scheme != document_scheme {
            return false;
        }
    }
    true
}
