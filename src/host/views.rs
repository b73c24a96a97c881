//! Host-side panel views.

use crate::connection::{Connection, ConnectionError};
use crate::protocol::{methods, PanelViewRegistrationParams, PanelViewUpdate, PanelViewUpdateParams};

/// Creates panel views in the client's panel area.
pub struct ExtViews {
    connection: Connection,
}

impl ExtViews {
    pub(super) fn new(connection: Connection) -> ExtViews {
        ExtViews { connection }
    }

    /// Registers a new (empty) panel view and returns a handle for updating
    /// it.
    pub fn create_panel_view(
        &self,
        id: impl Into<String>,
    ) -> Result<PanelViewHandle, ConnectionError> {
        let id = id.into();
        let params = serde_json::to_value(PanelViewRegistrationParams { id: id.clone() })
            .unwrap_or_default();
        self.connection
            .send_notification(methods::views::REGISTER_PANEL_VIEW, params)?;
        Ok(PanelViewHandle {
            connection: self.connection.clone(),
            id,
        })
    }
}

/// Updates one panel view.
pub struct PanelViewHandle {
    connection: Connection,
    id: String,
}

impl PanelViewHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_title(&self, title: impl Into<String>) -> Result<(), ConnectionError> {
        self.send(PanelViewUpdate {
            title: Some(title.into()),
            content: None,
        })
    }

    pub fn set_content(&self, content: impl Into<String>) -> Result<(), ConnectionError> {
        self.send(PanelViewUpdate {
            title: None,
            content: Some(content.into()),
        })
    }

    fn send(&self, update: PanelViewUpdate) -> Result<(), ConnectionError> {
        let params = serde_json::to_value(PanelViewUpdateParams {
            id: self.id.clone(),
            update,
        })
        .unwrap_or_default();
        self.connection
            .send_notification(methods::views::ACCEPT_PANEL_VIEW_UPDATE, params)
    }
}
