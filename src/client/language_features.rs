//! Language-features proxy: mirrors host-side providers into the local
//! provider registries.
//!
//! Each mirrored provider forwards its queries back over the connection,
//! addressed by the handle the host chose at registration time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::connection::Connection;
use crate::protocol::{
    methods, HandleParams, Hover, Location, ProviderQueryParams, ProviderRegistrationParams,
    TextDocumentPositionParams,
};
use crate::registries::provider::{HoverProvider, LocationProvider};
use crate::registries::Registries;

/// Which registry a host-side registration landed in.
#[derive(Debug, Clone, Copy)]
enum ProviderKind {
    Hover,
    Definition,
    TypeDefinition,
    Implementation,
    References,
}

struct ProxyProvider {
    connection: Connection,
    handle: u64,
}

impl ProxyProvider {
    fn query_params(&self, params: TextDocumentPositionParams) -> ProviderQueryParams {
        ProviderQueryParams {
            id: self.handle,
            text_document: params.text_document,
            position: params.position,
        }
    }
}

#[async_trait]
impl HoverProvider for ProxyProvider {
    async fn provide_hover(
        &self,
        params: TextDocumentPositionParams,
    ) -> anyhow::Result<Option<Hover>> {
        let params = serde_json::to_value(self.query_params(params))?;
        let result = self
            .connection
            .send_request(methods::language_features::GET_HOVER, params)
            .await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl LocationProvider for ProxyProvider {
    async fn provide_locations(
        &self,
        params: TextDocumentPositionParams,
    ) -> anyhow::Result<Vec<Location>> {
        let params = serde_json::to_value(self.query_params(params))?;
        let result = self
            .connection
            .send_request(methods::language_features::GET_LOCATIONS, params)
            .await?;
        Ok(serde_json::from_value(result)?)
    }
}

pub(super) fn wire(connection: &Connection, registries: &Arc<Registries>) {
    // Host handle -> (registry, local registration id).
    let handles: Arc<Mutex<HashMap<u64, (ProviderKind, u64)>>> =
        Arc::new(Mutex::new(HashMap::new()));

    for (method, kind) in [
        (methods::language_features::REGISTER_HOVER, ProviderKind::Hover),
        (
            methods::language_features::REGISTER_DEFINITION,
            ProviderKind::Definition,
        ),
        (
            methods::language_features::REGISTER_TYPE_DEFINITION,
            ProviderKind::TypeDefinition,
        ),
        (
            methods::language_features::REGISTER_IMPLEMENTATION,
            ProviderKind::Implementation,
        ),
        (
            methods::language_features::REGISTER_REFERENCES,
            ProviderKind::References,
        ),
    ] {
        let connection_for_proxy = connection.clone();
        let registries = registries.clone();
        let handles = handles.clone();
        connection.on_notification(method, move |params| {
            let params: ProviderRegistrationParams = match serde_json::from_value(params) {
                Ok(params) => params,
                Err(err) => {
                    tracing::error!("invalid provider registration: {err}");
                    return;
                }
            };
            let proxy = Arc::new(ProxyProvider {
                connection: connection_for_proxy.clone(),
                handle: params.id,
            });
            let registration = match kind {
                ProviderKind::Hover => registries
                    .text_document_hover
                    .register(params.document_selector, proxy),
                ProviderKind::Definition => registries
                    .text_document_definition
                    .register(params.document_selector, proxy),
                ProviderKind::TypeDefinition => registries
                    .text_document_type_definition
                    .register(params.document_selector, proxy),
                ProviderKind::Implementation => registries
                    .text_document_implementation
                    .register(params.document_selector, proxy),
                ProviderKind::References => registries
                    .text_document_references
                    .register(params.document_selector, proxy),
            };
            handles
                .lock()
                .unwrap()
                .insert(params.id, (kind, registration));
        });
    }

    let unregister_registries = registries.clone();
    connection.on_notification(methods::language_features::UNREGISTER, move |params| {
        let params: HandleParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(err) => {
                tracing::error!("invalid provider unregistration: {err}");
                return;
            }
        };
        let Some((kind, registration)) = handles.lock().unwrap().remove(&params.id) else {
            tracing::warn!(id = params.id, "unregistration for unknown provider");
            return;
        };
        match kind {
            ProviderKind::Hover => unregister_registries.text_document_hover.unregister(registration),
            ProviderKind::Definition => unregister_registries
                .text_document_definition
                .unregister(registration),
            ProviderKind::TypeDefinition => unregister_registries
                .text_document_type_definition
                .unregister(registration),
            ProviderKind::Implementation => unregister_registries
                .text_document_implementation
                .unregister(registration),
            ProviderKind::References => unregister_registries
                .text_document_references
                .unregister(registration),
        }
    });
}
