//! Host-side window interaction: visible documents, user-facing messages
//! and prompts, and editor decorations.

use std::sync::{Arc, Mutex};

use crate::connection::{Connection, ConnectionError};
use crate::protocol::{
    methods, LogMessageParams, MessageActionItem, MessageType, SetDecorationsParams,
    ShowInputParams, ShowMessageParams, ShowMessageRequestParams, TextDocumentDecoration,
    TextDocumentItem,
};

/// The client's window, as seen by extensions.
pub struct ExtWindows {
    connection: Connection,
    visible_text_documents: Mutex<Vec<TextDocumentItem>>,
}

impl ExtWindows {
    pub(super) fn new(connection: Connection) -> ExtWindows {
        ExtWindows {
            connection,
            visible_text_documents: Mutex::new(Vec::new()),
        }
    }

    pub fn visible_text_documents(&self) -> Vec<TextDocumentItem> {
        self.visible_text_documents.lock().unwrap().clone()
    }

    /// Shows a message to the user. Resolves once the client queued it.
    pub async fn show_message(
        &self,
        type_: MessageType,
        message: impl Into<String>,
    ) -> Result<(), ConnectionError> {
        let params = ShowMessageParams {
            type_,
            message: message.into(),
        };
        let params = serde_json::to_value(&params).unwrap_or_default();
        self.connection
            .send_request(methods::windows::SHOW_MESSAGE, params)
            .await
            .map(|_| ())
    }

    /// Shows a message with action buttons; resolves with the chosen action
    /// once the user picks one (or dismisses). No timeout applies.
    pub async fn show_message_request(
        &self,
        params: ShowMessageRequestParams,
    ) -> Result<Option<MessageActionItem>, ConnectionError> {
        let params = serde_json::to_value(&params).unwrap_or_default();
        let result = self
            .connection
            .send_request(methods::windows::SHOW_MESSAGE_REQUEST, params)
            .await?;
        Ok(serde_json::from_value(result).unwrap_or(None))
    }

    /// Prompts the user for a line of input.
    pub async fn show_input_box(
        &self,
        params: ShowInputParams,
    ) -> Result<Option<String>, ConnectionError> {
        let params = serde_json::to_value(&params).unwrap_or_default();
        let result = self
            .connection
            .send_request(methods::windows::SHOW_INPUT_BOX, params)
            .await?;
        Ok(serde_json::from_value(result).unwrap_or(None))
    }

    /// Writes to the client's extension log.
    pub fn log_message(
        &self,
        type_: MessageType,
        message: impl Into<String>,
    ) -> Result<(), ConnectionError> {
        let params = LogMessageParams {
            type_,
            message: message.into(),
        };
        let params = serde_json::to_value(&params).unwrap_or_default();
        self.connection
            .send_notification(methods::windows::LOG_MESSAGE, params)
    }

    /// Replaces the decorations for a document.
    pub fn set_decorations(
        &self,
        uri: impl Into<String>,
        decorations: Vec<TextDocumentDecoration>,
    ) -> Result<(), ConnectionError> {
        let params = SetDecorationsParams {
            uri: uri.into(),
            decorations,
        };
        let params = serde_json::to_value(&params).unwrap_or_default();
        self.connection
            .send_notification(methods::code_editor::SET_DECORATIONS, params)
    }

    fn accept(&self, documents: Vec<TextDocumentItem>) {
        *self.visible_text_documents.lock().unwrap() = documents;
    }
}

pub(super) fn wire(connection: &Connection, windows: &Arc<ExtWindows>) {
    let windows = windows.clone();
    connection.on_notification(
        methods::windows::ACCEPT_VISIBLE_TEXT_DOCUMENTS,
        move |params| match serde_json::from_value(params) {
            Ok(documents) => windows.accept(documents),
            Err(err) => tracing::error!("invalid visible text documents: {err}"),
        },
    );
}
