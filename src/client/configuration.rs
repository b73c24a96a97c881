//! Configuration proxy: forwards the settings cascade to the extension host
//! and bridges settings edits back to the platform.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};

use crate::connection::{Connection, HandlerFuture, ResponseError};
use crate::environment::SettingsCascade;
use crate::protocol::methods;
use crate::store::EnvironmentStore;

use super::{report_send_error, ConfigurationUpdate, ProxyError};

pub(super) fn wire(
    connection: &Connection,
    store: &Arc<EnvironmentStore>,
    updates: mpsc::UnboundedSender<ConfigurationUpdate>,
    errors: mpsc::UnboundedSender<ProxyError>,
) {
    // Only valid cascades are forwarded. While settings are being edited the
    // cascade passes through an error state; the host keeps the last-known
    // good cascade for the duration.
    let forwarder = connection.clone();
    let last_sent: Mutex<Option<SettingsCascade>> = Mutex::new(None);
    store.subscribe(move |environment| {
        let Some(cascade) = environment.configuration.valid() else {
            return;
        };
        {
            let mut last_sent = last_sent.lock().unwrap();
            if last_sent.as_ref() == Some(cascade) {
                return;
            }
            *last_sent = Some(cascade.clone());
        }
        let params = match serde_json::to_value(cascade) {
            Ok(params) => params,
            Err(err) => {
                tracing::error!("failed to serialize settings cascade: {err}");
                return;
            }
        };
        if let Err(err) = forwarder.send_notification(methods::configuration::ACCEPT_DATA, params)
        {
            report_send_error(&errors, "configuration data", err);
        }
    });

    connection.on_request(methods::configuration::ACCEPT_UPDATE, move |params| {
        let updates = updates.clone();
        Box::pin(async move {
            let params = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid update params: {err}")))?;
            let (responder, applied) = oneshot::channel();
            updates
                .send(ConfigurationUpdate { params, responder })
                .map_err(|_| ResponseError::internal("configuration updates not accepted"))?;
            match applied.await {
                Ok(Ok(())) => Ok(serde_json::Value::Null),
                Ok(Err(message)) => Err(ResponseError::internal(message)),
                Err(_) => Err(ResponseError::internal("configuration update dropped")),
            }
        }) as HandlerFuture
    });
}
