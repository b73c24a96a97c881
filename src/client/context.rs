//! Context proxy: applies context updates sent by the extension host.

use std::sync::Arc;

use crate::connection::Connection;
use crate::context::{apply_context_update, Context};
use crate::environment::Environment;
use crate::protocol::methods;
use crate::store::EnvironmentStore;

pub(super) fn wire(connection: &Connection, store: &Arc<EnvironmentStore>) {
    let store = store.clone();
    connection.on_notification(methods::context::UPDATE, move |params| {
        let updates: Context = match serde_json::from_value(params) {
            Ok(updates) => updates,
            Err(err) => {
                tracing::error!("invalid context update: {err}");
                return;
            }
        };
        let current = store.current();
        let context = apply_context_update(&current.context, &updates);
        // Context updates may arrive while an environment update is still
        // propagating (an activation handler reacting synchronously), so
        // this goes through the unguarded setter.
        store.set_internal(Environment { context, ..current });
    });
}
