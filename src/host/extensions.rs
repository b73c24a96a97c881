//! Extension activation on the host.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::connection::{Connection, HandlerFuture, ResponseError};
use crate::protocol::{methods, ActivateExtensionParams, DeactivateExtensionParams};

/// An extension ready to run: its id and the resolved script URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableExtension {
    pub id: String,
    pub script_url: String,
}

/// The seam to whatever evaluates extension bundles. Tests substitute a
/// recording fake.
#[async_trait]
pub trait ExtensionRuntime: Send + Sync {
    /// Fetches and evaluates the extension's bundle and runs its activation
    /// entrypoint.
    async fn activate(&self, extension: &ExecutableExtension) -> anyhow::Result<()>;

    /// Runs the extension's deactivation hook, if any.
    async fn deactivate(&self, id: &str) -> anyhow::Result<()>;
}

pub(super) fn wire(connection: &Connection, runtime: Arc<dyn ExtensionRuntime>) {
    let active: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));

    let activate_runtime = runtime.clone();
    let activate_active = active.clone();
    connection.on_request(methods::extensions::ACTIVATE, move |params| {
        let runtime = activate_runtime.clone();
        let active = activate_active.clone();
        Box::pin(async move {
            let params: ActivateExtensionParams = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid activation: {err}")))?;
            let extension = ExecutableExtension {
                id: params.id,
                script_url: params.script_url,
            };
            if !active.lock().unwrap().insert(extension.id.clone()) {
                // Activating an already-active extension is a no-op.
                return Ok(serde_json::Value::Null);
            }
            tracing::info!(id = %extension.id, "activating extension");
            if let Err(err) = runtime.activate(&extension).await {
                // Roll back a partial activation before reporting failure.
                active.lock().unwrap().remove(&extension.id);
                if let Err(deactivate_err) = runtime.deactivate(&extension.id).await {
                    tracing::warn!(
                        id = %extension.id,
                        "cleanup after failed activation failed: {deactivate_err:#}"
                    );
                }
                return Err(ResponseError::internal(format!(
                    "activating extension {:?}: {err:#}",
                    extension.id
                )));
            }
            Ok(serde_json::Value::Null)
        }) as HandlerFuture
    });

    connection.on_request(methods::extensions::DEACTIVATE, move |params| {
        let runtime = runtime.clone();
        let active = active.clone();
        Box::pin(async move {
            let params: DeactivateExtensionParams = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid deactivation: {err}")))?;
            if !active.lock().unwrap().remove(&params.id) {
                return Err(ResponseError::internal(format!(
                    "extension not activated: {:?}",
                    params.id
                )));
            }
            tracing::info!(id = %params.id, "deactivating extension");
            runtime
                .deactivate(&params.id)
                .await
                .map_err(|err| ResponseError::internal(format!("{err:#}")))?;
            Ok(serde_json::Value::Null)
        }) as HandlerFuture
    });
}
