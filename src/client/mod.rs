//! Client-side capability proxies.
//!
//! Each submodule wires one capability namespace onto the connection: it
//! watches its slice of the environment store and forwards changes to the
//! extension host, and it handles the host-bound requests and notifications
//! of its namespace against the local registries.
//!
//! User-interaction requests from the host (messages, prompts, settings
//! edits) are not answered here; they are bridged onto the [`ClientEvents`]
//! streams for the embedding platform to drain and resolve.

mod code_editor;
mod commands;
mod configuration;
mod context;
mod documents;
mod extensions;
mod language_features;
mod roots;
mod search;
mod views;
mod windows;

use std::sync::Arc;

use serde_json::json;
use tokio::sync::{mpsc, oneshot};

use crate::connection::{Connection, HandlerFuture};
use crate::protocol::{
    methods, ConfigurationUpdateParams, LogMessageParams, MessageActionItem, ShowInputParams,
    ShowMessageParams, ShowMessageRequestParams,
};
use crate::registries::Registries;
use crate::store::EnvironmentStore;

/// A `showMessageRequest` in flight: the host's request stays pending until
/// the platform resolves the responder (with the chosen action, or `None` if
/// dismissed).
#[derive(Debug)]
pub struct ShowMessageRequest {
    pub params: ShowMessageRequestParams,
    pub responder: oneshot::Sender<Option<MessageActionItem>>,
}

/// A `showInputBox` in flight. Resolve with the entered string, or `None` if
/// the user cancelled.
#[derive(Debug)]
pub struct ShowInputRequest {
    pub params: ShowInputParams,
    pub responder: oneshot::Sender<Option<String>>,
}

/// A settings edit requested by an extension. The host's request stays
/// pending until the platform applies (or rejects) the edit.
#[derive(Debug)]
pub struct ConfigurationUpdate {
    pub params: ConfigurationUpdateParams,
    pub responder: oneshot::Sender<Result<(), String>>,
}

/// A proxy-side failure that is not part of normal teardown: a send that
/// failed, or an activation the host rejected. Surfaced so passive
/// observers (a toast UI) see it, in addition to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyError {
    /// The capability or extension the failure originated from.
    pub source: String,
    pub message: String,
}

/// The sending half of the user-interaction streams, handed to [`connect`].
#[derive(Clone)]
pub struct ClientEvents {
    pub messages: mpsc::UnboundedSender<ShowMessageParams>,
    pub message_requests: mpsc::UnboundedSender<ShowMessageRequest>,
    pub input_requests: mpsc::UnboundedSender<ShowInputRequest>,
    pub log_messages: mpsc::UnboundedSender<LogMessageParams>,
    pub configuration_updates: mpsc::UnboundedSender<ConfigurationUpdate>,
    pub errors: mpsc::UnboundedSender<ProxyError>,
}

/// The receiving half of the user-interaction streams, drained by the
/// embedding platform.
pub struct ClientEventReceivers {
    pub messages: mpsc::UnboundedReceiver<ShowMessageParams>,
    pub message_requests: mpsc::UnboundedReceiver<ShowMessageRequest>,
    pub input_requests: mpsc::UnboundedReceiver<ShowInputRequest>,
    pub log_messages: mpsc::UnboundedReceiver<LogMessageParams>,
    pub configuration_updates: mpsc::UnboundedReceiver<ConfigurationUpdate>,
    pub errors: mpsc::UnboundedReceiver<ProxyError>,
}

impl ClientEvents {
    pub fn channel() -> (ClientEvents, ClientEventReceivers) {
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        let (message_requests_tx, message_requests_rx) = mpsc::unbounded_channel();
        let (input_requests_tx, input_requests_rx) = mpsc::unbounded_channel();
        let (log_messages_tx, log_messages_rx) = mpsc::unbounded_channel();
        let (configuration_updates_tx, configuration_updates_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        (
            ClientEvents {
                messages: messages_tx,
                message_requests: message_requests_tx,
                input_requests: input_requests_tx,
                log_messages: log_messages_tx,
                configuration_updates: configuration_updates_tx,
                errors: errors_tx,
            },
            ClientEventReceivers {
                messages: messages_rx,
                message_requests: message_requests_rx,
                input_requests: input_requests_rx,
                log_messages: log_messages_rx,
                configuration_updates: configuration_updates_rx,
                errors: errors_rx,
            },
        )
    }
}

/// Wires every capability proxy onto the connection.
///
/// After this returns, environment changes applied to `store` propagate to
/// the extension host, and the host's registrations land in `registries`.
pub fn connect(
    connection: &Connection,
    store: &Arc<EnvironmentStore>,
    registries: &Arc<Registries>,
    events: ClientEvents,
) {
    connection.on_request(methods::PING, |_params| {
        Box::pin(async { Ok(json!("pong")) }) as HandlerFuture
    });

    configuration::wire(
        connection,
        store,
        events.configuration_updates.clone(),
        events.errors.clone(),
    );
    context::wire(connection, store);
    extensions::wire(connection, store, events.errors.clone());
    windows::wire(connection, store, &events);
    documents::wire(connection, store, events.errors.clone());
    roots::wire(connection, store, events.errors.clone());
    commands::wire(connection, registries);
    search::wire(connection, registries);
    language_features::wire(connection, registries);
    views::wire(connection, registries);
    code_editor::wire(connection, registries);
}

/// Reports a proxy-side send failure: logged and emitted on the error
/// stream, unless it is the expected teardown error.
pub(crate) fn report_send_error(
    errors: &mpsc::UnboundedSender<ProxyError>,
    source: &str,
    err: crate::connection::ConnectionError,
) {
    if err.is_unsubscribed() {
        return;
    }
    tracing::error!("failed to send {source}: {err}");
    let _ = errors.send(ProxyError {
        source: source.to_owned(),
        message: err.to_string(),
    });
}
