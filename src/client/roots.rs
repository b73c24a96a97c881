//! Roots proxy: forwards the open workspace roots.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::connection::Connection;
use crate::protocol::{methods, WorkspaceRoot};
use crate::store::EnvironmentStore;

use super::{report_send_error, ProxyError};

pub(super) fn wire(
    connection: &Connection,
    store: &Arc<EnvironmentStore>,
    errors: mpsc::UnboundedSender<ProxyError>,
) {
    let forwarder = connection.clone();
    let last_sent: Mutex<Option<Vec<WorkspaceRoot>>> = Mutex::new(None);
    store.subscribe(move |environment| {
        let roots = environment.roots.clone().unwrap_or_default();
        {
            let mut last_sent = last_sent.lock().unwrap();
            if last_sent.as_ref() == Some(&roots) {
                return;
            }
            *last_sent = Some(roots.clone());
        }
        let params = serde_json::to_value(&roots).unwrap_or_default();
        if let Err(err) = forwarder.send_notification(methods::roots::ACCEPT_ROOTS, params) {
            report_send_error(&errors, "roots", err);
        }
    });
}
