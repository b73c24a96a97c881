//! Host-side view of workspace roots.

use std::sync::{Arc, Mutex, RwLock};

use crate::connection::Connection;
use crate::protocol::{methods, WorkspaceRoot};

type Subscriber = Arc<dyn Fn(&[WorkspaceRoot]) + Send + Sync>;

/// The workspace roots as last accepted from the client.
#[derive(Default)]
pub struct ExtRoots {
    roots: Mutex<Vec<WorkspaceRoot>>,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl ExtRoots {
    pub(super) fn new() -> ExtRoots {
        ExtRoots::default()
    }

    pub fn all(&self) -> Vec<WorkspaceRoot> {
        self.roots.lock().unwrap().clone()
    }

    /// Adds a subscriber invoked on every change, starting with the current
    /// roots.
    pub fn on_did_change(&self, subscriber: impl Fn(&[WorkspaceRoot]) + Send + Sync + 'static) {
        subscriber(&self.all());
        self.subscribers.write().unwrap().push(Arc::new(subscriber));
    }

    fn accept(&self, roots: Vec<WorkspaceRoot>) {
        *self.roots.lock().unwrap() = roots.clone();
        let subscribers: Vec<Subscriber> = self.subscribers.read().unwrap().clone();
        for subscriber in &subscribers {
            subscriber(&roots);
        }
    }
}

pub(super) fn wire(connection: &Connection, roots: &Arc<ExtRoots>) {
    let roots = roots.clone();
    connection.on_notification(methods::roots::ACCEPT_ROOTS, move |params| {
        match serde_json::from_value(params) {
            Ok(incoming) => roots.accept(incoming),
            Err(err) => tracing::error!("invalid roots: {err}"),
        }
    });
}
