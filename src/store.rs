//! The environment store: a single-writer, multi-reader broadcast container
//! with replay-latest semantics.
//!
//! Subscribers are invoked synchronously, in subscription order, on every
//! update; a new subscriber immediately observes the current snapshot. A
//! handler reacting to an update must never set the environment again from
//! within the notification (that is a logic bug, rejected by the reentrancy
//! guard); such updates must be scheduled through the RPC loop or a deferred
//! task instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::environment::Environment;

type Subscriber = Arc<dyn Fn(&Environment) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// `set` was called from within a subscriber triggered by the same
    /// `set` call. The nested update is not applied.
    #[error("environment may not be set recursively from within an update notification")]
    ReentrantSet,
}

/// Holds the current [`Environment`] and broadcasts every replacement to all
/// subscribers.
pub struct EnvironmentStore {
    value: RwLock<Environment>,
    subscribers: RwLock<Vec<Subscriber>>,
    notifying: AtomicBool,
}

impl EnvironmentStore {
    pub fn new(initial: Environment) -> Arc<EnvironmentStore> {
        Arc::new(EnvironmentStore {
            value: RwLock::new(initial),
            subscribers: RwLock::new(Vec::new()),
            notifying: AtomicBool::new(false),
        })
    }

    /// The latest snapshot.
    pub fn current(&self) -> Environment {
        self.value.read().unwrap().clone()
    }

    /// Adds a subscriber and immediately invokes it with the current
    /// snapshot (replay-latest). Subscribers live as long as the store.
    pub fn subscribe(&self, subscriber: impl Fn(&Environment) + Send + Sync + 'static) {
        let current = self.current();
        subscriber(&current);
        self.subscribers.write().unwrap().push(Arc::new(subscriber));
    }

    /// Replaces the snapshot and notifies all subscribers in subscription
    /// order. Fails (without applying the update) when called reentrantly
    /// from within a subscriber.
    pub fn set(&self, next: Environment) -> Result<(), StoreError> {
        if self.notifying.swap(true, Ordering::SeqCst) {
            return Err(StoreError::ReentrantSet);
        }
        let guard = NotifyGuard {
            notifying: &self.notifying,
        };
        self.replace_and_notify(next);
        drop(guard);
        Ok(())
    }

    /// Replaces the snapshot without the reentrancy guard.
    ///
    /// This is the narrow carve-out for trusted in-process collaborators
    /// (the context-update handler): an extension's activation handler may
    /// trigger a context update while an environment update is still being
    /// propagated, and routing that through [`EnvironmentStore::set`] would
    /// trip the guard.
    pub(crate) fn set_internal(&self, next: Environment) {
        self.replace_and_notify(next);
    }

    fn replace_and_notify(&self, next: Environment) {
        *self.value.write().unwrap() = next.clone();
        // Clone the list out of the lock: a subscriber may re-enter the
        // store through the internal setter.
        let subscribers: Vec<Subscriber> = self.subscribers.read().unwrap().clone();
        for subscriber in &subscribers {
            subscriber(&next);
        }
    }
}

/// Clears the notifying flag even if a subscriber panics.
struct NotifyGuard<'a> {
    notifying: &'a AtomicBool,
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.notifying.store(false, Ordering::SeqCst);
    }
}
