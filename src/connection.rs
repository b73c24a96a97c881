//! The RPC substrate: a JSON-RPC-style connection between the client and the
//! extension host.
//!
//! A [`Connection`] exposes the transport contract the rest of the crate is
//! written against: `send_request` (expects a response), `send_notification`
//! (fire-and-forget), `on_request`/`on_notification` handler registration,
//! and a [`Tracer`] hook for diagnostics.
//!
//! [`Connection::in_process_pair`] wires two connections back-to-back over
//! crossed unbounded channels, modeling a worker's postMessage boundary.
//! Each side runs a dispatch task that routes incoming messages: responses
//! resolve the matching pending request, requests run their handler on a
//! spawned task, notifications run their handler inline (preserving FIFO
//! order per sender).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// A boxed future returned by request handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, ResponseError>> + Send>>;

type RequestHandler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;
type NotificationHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// One message on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Message {
    Request {
        id: u64,
        method: String,
        params: Value,
    },
    Response {
        id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ResponseError>,
    },
    Notification {
        method: String,
        params: Value,
    },
}

/// An error returned by the peer in response to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
}

impl ResponseError {
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL: i64 = -32603;

    pub fn method_not_found(method: &str) -> Self {
        ResponseError {
            code: Self::METHOD_NOT_FOUND,
            message: format!("method not found: {method}"),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ResponseError {
            code: Self::INTERNAL,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// The connection was unsubscribed before or while the call was in
    /// flight. Expected during normal extension/session teardown.
    #[error("connection unsubscribed")]
    Unsubscribed,
    /// The peer rejected the request.
    #[error("request failed: {0}")]
    Response(ResponseError),
}

impl ConnectionError {
    /// Whether this error is the expected outcome of the peer tearing down
    /// its side of the connection (as opposed to a genuine failure).
    pub fn is_unsubscribed(&self) -> bool {
        matches!(self, ConnectionError::Unsubscribed)
    }
}

/// Observes every message sent and received on a connection.
pub trait Tracer: Send + Sync {
    fn sent(&self, message: &Message);
    fn received(&self, message: &Message);
}

struct Inner {
    /// Taken (set to `None`) on unsubscribe so the peer's dispatch loop
    /// observes end-of-stream.
    outgoing: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<Value, ConnectionError>>>>,
    request_handlers: RwLock<HashMap<String, RequestHandler>>,
    notification_handlers: RwLock<HashMap<String, NotificationHandler>>,
    tracer: RwLock<Option<Arc<dyn Tracer>>>,
}

impl Inner {
    fn send(&self, message: Message) -> Result<(), ConnectionError> {
        let outgoing = self.outgoing.lock().unwrap();
        let Some(sender) = outgoing.as_ref() else {
            return Err(ConnectionError::Unsubscribed);
        };
        if let Some(tracer) = self.tracer.read().unwrap().as_ref() {
            tracer.sent(&message);
        }
        sender.send(message).map_err(|_| ConnectionError::Unsubscribed)
    }

    fn fail_pending(&self) {
        let pending = std::mem::take(&mut *self.pending.lock().unwrap());
        for (_, responder) in pending {
            let _ = responder.send(Err(ConnectionError::Unsubscribed));
        }
    }
}

/// One side of a client/extension-host connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Creates a connected pair of in-process connections. The first element
    /// is conventionally the client side, the second the host side.
    ///
    /// Must be called from within a tokio runtime: each side spawns a
    /// dispatch task that runs until its peer unsubscribes.
    pub fn in_process_pair() -> (Connection, Connection) {
        let (client_tx, host_rx) = mpsc::unbounded_channel();
        let (host_tx, client_rx) = mpsc::unbounded_channel();
        let client = Connection::new(client_tx);
        let host = Connection::new(host_tx);
        tokio::spawn(dispatch_loop(client.inner.clone(), client_rx));
        tokio::spawn(dispatch_loop(host.inner.clone(), host_rx));
        (client, host)
    }

    fn new(outgoing: mpsc::UnboundedSender<Message>) -> Connection {
        Connection {
            inner: Arc::new(Inner {
                outgoing: Mutex::new(Some(outgoing)),
                next_id: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
                request_handlers: RwLock::new(HashMap::new()),
                notification_handlers: RwLock::new(HashMap::new()),
                tracer: RwLock::new(None),
            }),
        }
    }

    /// Sends a request; the returned future resolves with the peer's
    /// response.
    ///
    /// The request message is enqueued before this returns, not when the
    /// future is first polled, so two calls from the same task reach the
    /// peer in call order even if their responses are awaited elsewhere.
    pub fn send_request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ConnectionError>> + Send + 'static {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (responder, response) = oneshot::channel();
        self.inner.pending.lock().unwrap().insert(id, responder);
        let sent = self.inner.send(Message::Request {
            id,
            method: method.to_owned(),
            params,
        });
        if sent.is_err() {
            self.inner.pending.lock().unwrap().remove(&id);
        }
        async move {
            sent?;
            match response.await {
                Ok(result) => result,
                // Dispatch loop ended without responding.
                Err(_) => Err(ConnectionError::Unsubscribed),
            }
        }
    }

    /// Sends a fire-and-forget notification.
    pub fn send_notification(&self, method: &str, params: Value) -> Result<(), ConnectionError> {
        self.inner.send(Message::Notification {
            method: method.to_owned(),
            params,
        })
    }

    /// Registers the handler for an inbound request method, replacing any
    /// previous handler for the same method.
    pub fn on_request<F>(&self, method: &str, handler: F)
    where
        F: Fn(Value) -> HandlerFuture + Send + Sync + 'static,
    {
        self.inner
            .request_handlers
            .write()
            .unwrap()
            .insert(method.to_owned(), Arc::new(handler));
    }

    /// Registers the handler for an inbound notification method.
    pub fn on_notification<F>(&self, method: &str, handler: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.inner
            .notification_handlers
            .write()
            .unwrap()
            .insert(method.to_owned(), Arc::new(handler));
    }

    /// Sets (or clears) the tracer observing this connection's messages.
    pub fn set_tracer(&self, tracer: Option<Arc<dyn Tracer>>) {
        *self.inner.tracer.write().unwrap() = tracer;
    }

    /// Tears the connection down. Idempotent. Pending requests on this side
    /// fail with [`ConnectionError::Unsubscribed`]; the peer's dispatch loop
    /// observes end-of-stream and fails its own pending requests the same
    /// way. Responses to calls issued before unsubscribe are no longer
    /// routed.
    pub fn unsubscribe(&self) {
        self.inner.outgoing.lock().unwrap().take();
        self.inner.fail_pending();
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.inner.outgoing.lock().unwrap().is_none()
    }
}

async fn dispatch_loop(inner: Arc<Inner>, mut incoming: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = incoming.recv().await {
        if let Some(tracer) = inner.tracer.read().unwrap().as_ref() {
            tracer.received(&message);
        }
        match message {
            Message::Request { id, method, params } => {
                let handler = inner.request_handlers.read().unwrap().get(&method).cloned();
                match handler {
                    Some(handler) => {
                        let inner = inner.clone();
                        tokio::spawn(async move {
                            let response = match handler(params).await {
                                Ok(result) => Message::Response {
                                    id,
                                    result: Some(result),
                                    error: None,
                                },
                                Err(error) => Message::Response {
                                    id,
                                    result: None,
                                    error: Some(error),
                                },
                            };
                            let _ = inner.send(response);
                        });
                    }
                    None => {
                        tracing::warn!(method, "request for unhandled method");
                        let _ = inner.send(Message::Response {
                            id,
                            result: None,
                            error: Some(ResponseError::method_not_found(&method)),
                        });
                    }
                }
            }
            Message::Response { id, result, error } => {
                let responder = inner.pending.lock().unwrap().remove(&id);
                match responder {
                    Some(responder) => {
                        let outcome = match error {
                            Some(error) => Err(ConnectionError::Response(error)),
                            None => Ok(result.unwrap_or(Value::Null)),
                        };
                        let _ = responder.send(outcome);
                    }
                    None => tracing::debug!(id, "response for unknown request id"),
                }
            }
            Message::Notification { method, params } => {
                let handler = inner
                    .notification_handlers
                    .read()
                    .unwrap()
                    .get(&method)
                    .cloned();
                match handler {
                    Some(handler) => handler(params),
                    None => tracing::debug!(method, "dropped unhandled notification"),
                }
            }
        }
    }
    // Peer went away; nothing outstanding will ever resolve.
    inner.fail_pending();
}
