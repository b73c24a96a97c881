//! Wire types for the client/extension-host RPC protocol.
//!
//! Every type here crosses the connection as a JSON payload, so all of them
//! use camelCase field names on the wire. The method-name constants in
//! [`methods`] are the full routing table: each capability owns a namespace
//! (`configuration/...`, `windows/...`, etc.) so request routing is
//! unambiguous.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// RPC method names, grouped by capability namespace.
pub mod methods {
    /// Handshake. Must be the first request on a new connection.
    pub const INITIALIZE: &str = "initialize";
    /// Liveness check and test synchronization. Responds with `"pong"`.
    pub const PING: &str = "ping";

    pub mod configuration {
        pub const ACCEPT_DATA: &str = "configuration/$acceptConfigurationData";
        pub const ACCEPT_UPDATE: &str = "configuration/$acceptConfigurationUpdate";
    }

    pub mod context {
        pub const UPDATE: &str = "context/updateContext";
    }

    pub mod extensions {
        pub const ACTIVATE: &str = "extensions/$activateExtension";
        pub const DEACTIVATE: &str = "extensions/$deactivateExtension";
    }

    pub mod windows {
        pub const ACCEPT_VISIBLE_TEXT_DOCUMENTS: &str = "windows/$acceptVisibleTextDocuments";
        pub const SHOW_MESSAGE: &str = "windows/showMessage";
        pub const SHOW_MESSAGE_REQUEST: &str = "windows/showMessageRequest";
        pub const SHOW_INPUT_BOX: &str = "windows/showInputBox";
        pub const LOG_MESSAGE: &str = "windows/$logMessage";
    }

    pub mod documents {
        pub const ACCEPT_DATA: &str = "documents/$acceptDocumentData";
    }

    pub mod roots {
        pub const ACCEPT_ROOTS: &str = "roots/$acceptRoots";
    }

    pub mod commands {
        /// Host-bound: execute a command in the client's command registry.
        pub const EXECUTE: &str = "commands/executeCommand";
        /// Client-bound: run a command previously registered by an extension.
        pub const EXECUTE_REGISTERED: &str = "commands/$executeCommand";
        pub const REGISTER: &str = "commands/$registerCommand";
        pub const UNREGISTER: &str = "commands/$unregisterCommand";
    }

    pub mod search {
        pub const REGISTER_TRANSFORMER: &str = "search/$registerQueryTransformer";
        pub const UNREGISTER_TRANSFORMER: &str = "search/$unregisterQueryTransformer";
        pub const TRANSFORM_QUERY: &str = "search/$transformQuery";
    }

    pub mod language_features {
        pub const REGISTER_HOVER: &str = "languageFeatures/$registerHoverProvider";
        pub const REGISTER_DEFINITION: &str = "languageFeatures/$registerDefinitionProvider";
        pub const REGISTER_TYPE_DEFINITION: &str =
            "languageFeatures/$registerTypeDefinitionProvider";
        pub const REGISTER_IMPLEMENTATION: &str =
            "languageFeatures/$registerImplementationProvider";
        pub const REGISTER_REFERENCES: &str = "languageFeatures/$registerReferenceProvider";
        pub const UNREGISTER: &str = "languageFeatures/$unregisterProvider";
        pub const GET_HOVER: &str = "languageFeatures/$getHover";
        pub const GET_LOCATIONS: &str = "languageFeatures/$getLocations";
    }

    pub mod views {
        pub const REGISTER_PANEL_VIEW: &str = "views/$registerPanelViewProvider";
        pub const ACCEPT_PANEL_VIEW_UPDATE: &str = "views/$acceptPanelViewUpdate";
    }

    pub mod code_editor {
        pub const SET_DECORATIONS: &str = "codeEditor/$setDecorations";
    }
}

/// The application flavor the client identifies itself as during the
/// handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientApplication {
    Editor,
    Other,
}

/// Payload of the `initialize` request. Must be the first message the client
/// sends on a new connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitData {
    /// The endpoint the extension host should direct API calls at.
    pub endpoint_url: String,
    pub client_application: ClientApplication,
}

/// Severity of a message shown to (or logged for) the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Error,
    Warning,
    Info,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessageParams {
    #[serde(rename = "type")]
    pub type_: MessageType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowMessageParams {
    #[serde(rename = "type")]
    pub type_: MessageType,
    pub message: String,
}

/// An action offered to the user in a show-message request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageActionItem {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowMessageRequestParams {
    #[serde(rename = "type")]
    pub type_: MessageType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<MessageActionItem>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowInputParams {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// One step of a [`KeyPath`]: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for KeyPathSegment {
    fn from(key: &str) -> Self {
        KeyPathSegment::Key(key.to_owned())
    }
}

impl From<usize> for KeyPathSegment {
    fn from(index: usize) -> Self {
        KeyPathSegment::Index(index)
    }
}

/// A key path that refers to a location in a JSON document.
///
/// Each successive element specifies an index in an object or array to
/// descend into. In `{"a": ["x", "y"]}`, the key path `["a", 1]` refers to
/// the value `"y"`. Object-key and array-index segments may be mixed in the
/// same path.
pub type KeyPath = Vec<KeyPathSegment>;

/// A settings edit requested by an extension: insert `value` at `path` in
/// the settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationUpdateParams {
    pub path: KeyPath,
    pub value: Value,
}

/// A workspace root (typically a single repository) open in the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRoot {
    pub uri: String,
}

/// A text document visible in the client, with its full contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentItem {
    pub uri: String,
    pub language_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Zero-based line.
    pub line: u32,
    /// Zero-based character offset within the line.
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    PlainText,
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupContent {
    pub kind: MarkupKind,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hover {
    pub contents: MarkupContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

/// Identifies a position in a specific document; the parameter shape shared
/// by all language-feature invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentPositionParams {
    pub text_document: TextDocumentIdentifier,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDocumentIdentifier {
    pub uri: String,
}

/// A single filter of a [`DocumentSelector`]. A filter with no fields set
/// matches every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocumentFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

/// Selects the documents a provider applies to. An empty selector matches
/// every document.
pub type DocumentSelector = Vec<DocumentFilter>;

/// A decoration applied to a line of a text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentDecoration {
    pub range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<DecorationAttachment>,
}

/// Content rendered after the decorated range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecorationAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Instructs the extension host to activate an extension by fetching and
/// evaluating its script bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateExtensionParams {
    pub id: String,
    #[serde(rename = "scriptURL")]
    pub script_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateExtensionParams {
    pub id: String,
}

/// Registration of an extension-provided command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRegistrationParams {
    pub command: String,
}

/// Registration of a host-side resource referred to by a numeric handle
/// (query transformers, panel views by string id use their own shapes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleParams {
    pub id: u64,
}

/// Runs a host-side query transformer identified by its handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformQueryParams {
    pub id: u64,
    pub query: String,
}

/// Registration of a host-side language-feature provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRegistrationParams {
    pub id: u64,
    pub document_selector: DocumentSelector,
}

/// Invokes a host-side language-feature provider identified by its handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQueryParams {
    pub id: u64,
    pub text_document: TextDocumentIdentifier,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelViewRegistrationParams {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelViewUpdateParams {
    pub id: String,
    #[serde(flatten)]
    pub update: PanelViewUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDecorationsParams {
    pub uri: String,
    pub decorations: Vec<TextDocumentDecoration>,
}

/// Incremental update to a panel view: only the present fields change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PanelViewUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
