//! The client-side controller: owns the environment store, the registries,
//! and the connection to the extension host.
//!
//! The embedding application talks only to the controller: it pushes
//! environment snapshots in, executes commands, and drains the event
//! streams for user interaction. Everything else (forwarding state to the
//! host, driving extension activation, mirroring registrations) happens in
//! the capability proxies wired up at connect time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::client::{self, ClientEvents, ConfigurationUpdate, ShowInputRequest, ShowMessageRequest};
use crate::connection::{Connection, ConnectionError, Tracer};
use crate::environment::{is_extension_enabled, Contributions, Environment};
use crate::protocol::{methods, ClientApplication, InitData, MessageType};
use crate::registries::command::{CommandError, ExecuteCommandParams};
use crate::registries::Registries;
use crate::store::{EnvironmentStore, StoreError};

/// Transforms each environment snapshot before the proxies observe it.
/// Lets the embedder hide state from extensions (e.g. documents in schemes
/// extensions should not see).
pub type EnvironmentFilter = Box<dyn Fn(Environment) -> Environment + Send + Sync>;

/// The execution context hosting the extension host (a worker, a child
/// process). Terminated when the controller shuts down.
pub trait ExecutionContextHandle: Send + Sync {
    fn terminate(&self);
}

pub struct ControllerOptions {
    /// The endpoint extensions should direct API calls at.
    pub endpoint_url: String,
    pub client_application: ClientApplication,
    pub environment_filter: Option<EnvironmentFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    Connecting,
    Ready,
    Closed,
}

/// A message surfaced to the user through the controller's notifications
/// stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub type_: MessageType,
    /// The command or extension the notification originated from, if known.
    pub source: Option<String>,
}

/// The receiving half of the controller's event streams.
pub struct ControllerEvents {
    pub notifications: mpsc::UnboundedReceiver<Notification>,
    pub message_requests: mpsc::UnboundedReceiver<ShowMessageRequest>,
    pub input_requests: mpsc::UnboundedReceiver<ShowInputRequest>,
    pub configuration_updates: mpsc::UnboundedReceiver<ConfigurationUpdate>,
}

pub struct Controller {
    connection: Connection,
    store: Arc<EnvironmentStore>,
    registries: Arc<Registries>,
    environment_filter: Option<EnvironmentFilter>,
    notifications: mpsc::UnboundedSender<Notification>,
    status: Mutex<ControllerStatus>,
    execution_context: Option<Box<dyn ExecutionContextHandle>>,
    unsubscribed: AtomicBool,
}

impl Controller {
    /// Wires the capability proxies onto `connection` and performs the
    /// `initialize` handshake. The connection's peer must be (or become) a
    /// running extension host.
    pub async fn connect(
        connection: Connection,
        options: ControllerOptions,
        execution_context: Option<Box<dyn ExecutionContextHandle>>,
    ) -> Result<(Controller, ControllerEvents), ConnectionError> {
        let store = EnvironmentStore::new(Environment::empty());
        let registries = Arc::new(Registries::default());

        // Contributions are a pure function of the environment, recomputed
        // on every snapshot (including context-only updates).
        {
            let registries = registries.clone();
            store.subscribe(move |environment| {
                registries
                    .contribution
                    .replace_all(enabled_contributions(environment));
            });
        }

        let (events, receivers) = ClientEvents::channel();
        client::connect(&connection, &store, &registries, events);

        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
        // showMessage becomes a notification; $logMessage goes to the log.
        {
            let notifications = notifications_tx.clone();
            let mut messages = receivers.messages;
            tokio::spawn(async move {
                while let Some(params) = messages.recv().await {
                    let _ = notifications.send(Notification {
                        message: params.message,
                        type_: params.type_,
                        source: None,
                    });
                }
            });
        }
        // Proxy-side failures (a rejected activation, a failed send) become
        // error notifications so they reach the user, not just the log.
        {
            let notifications = notifications_tx.clone();
            let mut errors = receivers.errors;
            tokio::spawn(async move {
                while let Some(error) = errors.recv().await {
                    let _ = notifications.send(Notification {
                        message: error.message,
                        type_: MessageType::Error,
                        source: Some(error.source),
                    });
                }
            });
        }
        {
            let mut log_messages = receivers.log_messages;
            tokio::spawn(async move {
                while let Some(params) = log_messages.recv().await {
                    match params.type_ {
                        MessageType::Error => tracing::error!("[extension] {}", params.message),
                        MessageType::Warning => tracing::warn!("[extension] {}", params.message),
                        MessageType::Info | MessageType::Log => {
                            tracing::info!("[extension] {}", params.message)
                        }
                    }
                }
            });
        }

        let controller = Controller {
            connection,
            store,
            registries,
            environment_filter: options.environment_filter,
            notifications: notifications_tx,
            status: Mutex::new(ControllerStatus::Connecting),
            execution_context,
            unsubscribed: AtomicBool::new(false),
        };

        let init = InitData {
            endpoint_url: options.endpoint_url,
            client_application: options.client_application,
        };
        let params = serde_json::to_value(&init).unwrap_or_default();
        controller
            .connection
            .send_request(methods::INITIALIZE, params)
            .await?;
        *controller.status.lock().unwrap() = ControllerStatus::Ready;
        tracing::info!("extension host connection ready");

        let events = ControllerEvents {
            notifications: notifications_rx,
            message_requests: receivers.message_requests,
            input_requests: receivers.input_requests,
            configuration_updates: receivers.configuration_updates,
        };
        Ok((controller, events))
    }

    pub fn status(&self) -> ControllerStatus {
        *self.status.lock().unwrap()
    }

    /// The current environment snapshot.
    pub fn environment(&self) -> Environment {
        self.store.current()
    }

    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    /// Replaces the environment. A snapshot with an empty context inherits
    /// the current context (which extensions mutate through `updateContext`);
    /// a non-empty context replaces it. An update that changes nothing is
    /// skipped.
    pub fn set_environment(&self, next: Environment) -> Result<(), StoreError> {
        let current = self.store.current();
        let mut next = next;
        if next.context.is_empty() {
            next.context = current.context.clone();
        }
        if let Some(filter) = &self.environment_filter {
            next = filter(next);
        }
        if next == current {
            return Ok(());
        }
        self.store.set(next)
    }

    /// Executes a command from the command registry.
    ///
    /// A failure is surfaced twice: to the caller through the returned
    /// error, and to the user through the notifications stream.
    pub async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Value, CommandError> {
        let command = params.command.clone();
        match self.registries.commands.execute_command(params).await {
            Ok(result) => Ok(result),
            Err(err) => {
                let _ = self.notifications.send(Notification {
                    message: err.to_string(),
                    type_: MessageType::Error,
                    source: Some(command),
                });
                Err(err)
            }
        }
    }

    /// Sets (or clears) the tracer observing the connection.
    pub fn set_tracer(&self, tracer: Option<Arc<dyn Tracer>>) {
        self.connection.set_tracer(tracer);
    }

    /// Round-trips a ping to the extension host.
    pub async fn ping(&self) -> Result<(), ConnectionError> {
        self.connection
            .send_request(methods::PING, Value::Null)
            .await
            .map(|_| ())
    }

    /// Shuts the controller down: tears down the connection and terminates
    /// the extension host's execution context. Idempotent.
    pub fn unsubscribe(&self) {
        if self.unsubscribed.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.status.lock().unwrap() = ControllerStatus::Closed;
        self.connection.unsubscribe();
        if let Some(context) = &self.execution_context {
            context.terminate();
        }
        tracing::debug!("controller unsubscribed");
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// The static contributions of all extensions that are enabled and carry a
/// valid manifest.
fn enabled_contributions(environment: &Environment) -> Vec<Contributions> {
    let Some(cascade) = environment.configuration.valid() else {
        return Vec::new();
    };
    environment
        .extensions
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|extension| is_extension_enabled(&cascade.final_settings, &extension.id))
        .filter_map(|extension| match &extension.manifest {
            Some(Ok(manifest)) => manifest.contributes.clone(),
            _ => None,
        })
        .collect()
}
