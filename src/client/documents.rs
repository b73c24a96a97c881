//! Documents proxy: forwards the full contents of visible documents.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::connection::Connection;
use crate::protocol::{methods, TextDocumentItem};
use crate::store::EnvironmentStore;

use super::{report_send_error, ProxyError};

pub(super) fn wire(
    connection: &Connection,
    store: &Arc<EnvironmentStore>,
    errors: mpsc::UnboundedSender<ProxyError>,
) {
    let forwarder = connection.clone();
    let last_sent: Mutex<Option<Vec<TextDocumentItem>>> = Mutex::new(None);
    store.subscribe(move |environment| {
        let documents = environment
            .visible_text_documents
            .clone()
            .unwrap_or_default();
        {
            let mut last_sent = last_sent.lock().unwrap();
            if last_sent.as_ref() == Some(&documents) {
                return;
            }
            *last_sent = Some(documents.clone());
        }
        let params = serde_json::to_value(&documents).unwrap_or_default();
        if let Err(err) = forwarder.send_notification(methods::documents::ACCEPT_DATA, params) {
            report_send_error(&errors, "document data", err);
        }
    });
}
