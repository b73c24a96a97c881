//! Host-side language-feature providers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::connection::{Connection, ConnectionError, HandlerFuture, ResponseError};
use crate::protocol::{
    methods, DocumentSelector, HandleParams, ProviderQueryParams, ProviderRegistrationParams,
    TextDocumentPositionParams,
};
use crate::registries::provider::{HoverProvider, LocationProvider};

enum ProviderEntry {
    Hover(Arc<dyn HoverProvider>),
    Locations(Arc<dyn LocationProvider>),
}

/// Language-feature providers registered by extensions, mirrored into the
/// client's provider registries and invoked back over the connection.
pub struct ExtLanguageFeatures {
    connection: Connection,
    providers: Mutex<HashMap<u64, ProviderEntry>>,
    next_handle: AtomicU64,
}

impl ExtLanguageFeatures {
    pub(super) fn new(connection: Connection) -> ExtLanguageFeatures {
        ExtLanguageFeatures {
            connection,
            providers: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn register_hover_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn HoverProvider>,
    ) -> Result<u64, ConnectionError> {
        self.register(
            methods::language_features::REGISTER_HOVER,
            selector,
            ProviderEntry::Hover(provider),
        )
    }

    pub fn register_definition_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn LocationProvider>,
    ) -> Result<u64, ConnectionError> {
        self.register(
            methods::language_features::REGISTER_DEFINITION,
            selector,
            ProviderEntry::Locations(provider),
        )
    }

    pub fn register_type_definition_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn LocationProvider>,
    ) -> Result<u64, ConnectionError> {
        self.register(
            methods::language_features::REGISTER_TYPE_DEFINITION,
            selector,
            ProviderEntry::Locations(provider),
        )
    }

    pub fn register_implementation_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn LocationProvider>,
    ) -> Result<u64, ConnectionError> {
        self.register(
            methods::language_features::REGISTER_IMPLEMENTATION,
            selector,
            ProviderEntry::Locations(provider),
        )
    }

    pub fn register_reference_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn LocationProvider>,
    ) -> Result<u64, ConnectionError> {
        self.register(
            methods::language_features::REGISTER_REFERENCES,
            selector,
            ProviderEntry::Locations(provider),
        )
    }

    pub fn unregister(&self, handle: u64) -> Result<(), ConnectionError> {
        self.providers.lock().unwrap().remove(&handle);
        let params = serde_json::to_value(HandleParams { id: handle }).unwrap_or_default();
        self.connection
            .send_notification(methods::language_features::UNREGISTER, params)
    }

    fn register(
        &self,
        method: &str,
        selector: DocumentSelector,
        entry: ProviderEntry,
    ) -> Result<u64, ConnectionError> {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.providers.lock().unwrap().insert(handle, entry);
        let params = serde_json::to_value(ProviderRegistrationParams {
            id: handle,
            document_selector: selector,
        })
        .unwrap_or_default();
        self.connection.send_notification(method, params)?;
        Ok(handle)
    }
}

fn position_params(params: ProviderQueryParams) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: params.text_document,
        position: params.position,
    }
}

pub(super) fn wire(connection: &Connection, features: &Arc<ExtLanguageFeatures>) {
    let hover_features = features.clone();
    connection.on_request(methods::language_features::GET_HOVER, move |params| {
        let features = hover_features.clone();
        Box::pin(async move {
            let params: ProviderQueryParams = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid hover query: {err}")))?;
            let provider = {
                let providers = features.providers.lock().unwrap();
                match providers.get(&params.id) {
                    Some(ProviderEntry::Hover(provider)) => provider.clone(),
                    _ => {
                        return Err(ResponseError::internal(format!(
                            "no hover provider with id {}",
                            params.id
                        )))
                    }
                }
            };
            let hover = provider
                .provide_hover(position_params(params))
                .await
                .map_err(|err| ResponseError::internal(format!("{err:#}")))?;
            serde_json::to_value(hover).map_err(|err| ResponseError::internal(err.to_string()))
        }) as HandlerFuture
    });

    let location_features = features.clone();
    connection.on_request(methods::language_features::GET_LOCATIONS, move |params| {
        let features = location_features.clone();
        Box::pin(async move {
            let params: ProviderQueryParams = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid location query: {err}")))?;
            let provider = {
                let providers = features.providers.lock().unwrap();
                match providers.get(&params.id) {
                    Some(ProviderEntry::Locations(provider)) => provider.clone(),
                    _ => {
                        return Err(ResponseError::internal(format!(
                            "no location provider with id {}",
                            params.id
                        )))
                    }
                }
            };
            let locations = provider
                .provide_locations(position_params(params))
                .await
                .map_err(|err| ResponseError::internal(format!("{err:#}")))?;
            serde_json::to_value(locations).map_err(|err| ResponseError::internal(err.to_string()))
        }) as HandlerFuture
    });
}
