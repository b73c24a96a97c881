//! Host-side context updates.

use crate::connection::{Connection, ConnectionError};
use crate::context::Context;
use crate::protocol::methods;

/// Lets extensions publish context values back to the client.
pub struct ExtContext {
    connection: Connection,
}

impl ExtContext {
    pub(super) fn new(connection: Connection) -> ExtContext {
        ExtContext { connection }
    }

    /// Sends a partial context update. A key mapped to `null` deletes it.
    pub fn update(&self, updates: Context) -> Result<(), ConnectionError> {
        let params = serde_json::to_value(&updates).unwrap_or_default();
        self.connection
            .send_notification(methods::context::UPDATE, params)
    }
}
