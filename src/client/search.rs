//! Search proxy: mirrors host-side query transformers into the local
//! registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::connection::Connection;
use crate::protocol::{methods, HandleParams, TransformQueryParams};
use crate::registries::query_transformer::TransformFuture;
use crate::registries::Registries;

pub(super) fn wire(connection: &Connection, registries: &Arc<Registries>) {
    // Host handle -> local registration id.
    let handles: Arc<Mutex<HashMap<u64, u64>>> = Arc::new(Mutex::new(HashMap::new()));

    let forwarder = connection.clone();
    let register_registries = registries.clone();
    let register_handles = handles.clone();
    connection.on_notification(methods::search::REGISTER_TRANSFORMER, move |params| {
        let params: HandleParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(err) => {
                tracing::error!("invalid transformer registration: {err}");
                return;
            }
        };
        let forwarder = forwarder.clone();
        let handle = params.id;
        let registration = register_registries.query_transformer.register(Arc::new(
            move |query| {
                let forwarder = forwarder.clone();
                Box::pin(async move {
                    let params =
                        serde_json::to_value(TransformQueryParams { id: handle, query })?;
                    let transformed = forwarder
                        .send_request(methods::search::TRANSFORM_QUERY, params)
                        .await?;
                    let transformed: String = serde_json::from_value(transformed)?;
                    Ok(transformed)
                }) as TransformFuture
            },
        ));
        register_handles.lock().unwrap().insert(handle, registration);
    });

    let unregister_registries = registries.clone();
    connection.on_notification(methods::search::UNREGISTER_TRANSFORMER, move |params| {
        let params: HandleParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(err) => {
                tracing::error!("invalid transformer unregistration: {err}");
                return;
            }
        };
        if let Some(registration) = handles.lock().unwrap().remove(&params.id) {
            unregister_registries
                .query_transformer
                .unregister(registration);
        }
    });
}
