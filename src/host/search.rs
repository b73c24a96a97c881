//! Host-side search query transformers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::connection::{Connection, ConnectionError, HandlerFuture, ResponseError};
use crate::protocol::{methods, HandleParams, TransformQueryParams};

/// Rewrites a search query before it is executed.
pub trait QueryTransformer: Send + Sync {
    fn transform_query(&self, query: &str) -> String;
}

impl<F> QueryTransformer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn transform_query(&self, query: &str) -> String {
        self(query)
    }
}

/// Query transformers registered by extensions, mirrored into the client's
/// transformer chain and invoked back over the connection.
pub struct ExtSearch {
    connection: Connection,
    transformers: Mutex<HashMap<u64, Arc<dyn QueryTransformer>>>,
    next_handle: AtomicU64,
}

impl ExtSearch {
    pub(super) fn new(connection: Connection) -> ExtSearch {
        ExtSearch {
            connection,
            transformers: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Registers a transformer and returns its handle.
    pub fn register_query_transformer(
        &self,
        transformer: Arc<dyn QueryTransformer>,
    ) -> Result<u64, ConnectionError> {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.transformers.lock().unwrap().insert(handle, transformer);
        let params = serde_json::to_value(HandleParams { id: handle }).unwrap_or_default();
        self.connection
            .send_notification(methods::search::REGISTER_TRANSFORMER, params)?;
        Ok(handle)
    }

    pub fn unregister_query_transformer(&self, handle: u64) -> Result<(), ConnectionError> {
        self.transformers.lock().unwrap().remove(&handle);
        let params = serde_json::to_value(HandleParams { id: handle }).unwrap_or_default();
        self.connection
            .send_notification(methods::search::UNREGISTER_TRANSFORMER, params)
    }
}

pub(super) fn wire(connection: &Connection, search: &Arc<ExtSearch>) {
    let search = search.clone();
    connection.on_request(methods::search::TRANSFORM_QUERY, move |params| {
        let search = search.clone();
        Box::pin(async move {
            let params: TransformQueryParams = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid query: {err}")))?;
            let transformer = search
                .transformers
                .lock()
                .unwrap()
                .get(&params.id)
                .cloned()
                .ok_or_else(|| {
                    ResponseError::internal(format!("no query transformer with id {}", params.id))
                })?;
            let transformed = transformer.transform_query(&params.query);
            Ok(serde_json::Value::String(transformed))
        }) as HandlerFuture
    });
}
