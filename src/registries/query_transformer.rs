//! Search query transformers.
//!
//! Extensions may register transformers that rewrite a search query before it
//! is executed. Transformers compose: each one receives the previous
//! transformer's output, in registration order.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// The future a query transformer resolves to.
pub type TransformFuture = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;

/// A registered query transformer.
pub type QueryTransformerFn = Arc<dyn Fn(String) -> TransformFuture + Send + Sync>;

struct TransformerEntry {
    id: u64,
    transformer: QueryTransformerFn,
}

/// Ordered registry of search query transformers.
#[derive(Default)]
pub struct QueryTransformerRegistry {
    entries: RwLock<Vec<TransformerEntry>>,
    next_id: AtomicU64,
}

impl QueryTransformerRegistry {
    pub fn new() -> QueryTransformerRegistry {
        QueryTransformerRegistry::default()
    }

    /// Registers a transformer and returns its registration id.
    pub fn register(&self, transformer: QueryTransformerFn) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .write()
            .unwrap()
            .push(TransformerEntry { id, transformer });
        id
    }

    pub fn unregister(&self, id: u64) {
        self.entries.write().unwrap().retain(|entry| entry.id != id);
    }

    pub fn transformer_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Runs the query through every registered transformer in registration
    /// order. A failing transformer aborts the chain.
    pub async fn transform_query(&self, query: String) -> anyhow::Result<String> {
        let transformers: Vec<QueryTransformerFn> = self
            .entries
            .read()
            .unwrap()
            .iter()
            .map(|entry| entry.transformer.clone())
            .collect();
        let mut query = query;
        for transformer in transformers {
            query = transformer(query).await?;
        }
        Ok(query)
    }
}
