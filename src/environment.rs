//! The environment: the canonical snapshot of application state visible to
//! extensions.
//!
//! An [`Environment`] value is immutable once constructed. Every change
//! produces a whole new snapshot; capability proxies only ever read a
//! projected slice of it and compare by equality to decide whether to
//! propagate a change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::protocol::{TextDocumentItem, WorkspaceRoot};

/// A description of the state of the client application, as represented to
/// extensions: open roots, visible documents, the available extensions, the
/// settings cascade, and arbitrary context values.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    /// The currently open workspace roots (typically a single repository).
    pub roots: Option<Vec<WorkspaceRoot>>,
    /// The text documents that are currently visible.
    pub visible_text_documents: Option<Vec<TextDocumentItem>>,
    /// The available extensions, or `None` if there are none.
    pub extensions: Option<Vec<ConfiguredExtension>>,
    /// The settings cascade, possibly in an error state.
    pub configuration: ConfigurationCascade,
    /// Arbitrary key-value pairs that describe other application state.
    pub context: Context,
}

impl Environment {
    /// The empty environment a controller starts from.
    pub fn empty() -> Environment {
        Environment {
            roots: None,
            visible_text_documents: None,
            extensions: None,
            configuration: ConfigurationCascade::default(),
            context: Context::new(),
        }
    }
}

impl Default for Environment {
    fn default() -> Environment {
        Environment::empty()
    }
}

/// A plain-data stand-in for an arbitrary error, so parse failures can live
/// inside otherwise-cloneable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ErrorLike {
    pub message: String,
}

impl ErrorLike {
    pub fn new(message: impl Into<String>) -> ErrorLike {
        ErrorLike {
            message: message.into(),
        }
    }
}

/// An extension as configured in the client, together with its parsed
/// manifest. A missing or unparseable manifest keeps the extension visible
/// (so UI can show a "not found" state) but makes it ineligible for
/// activation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredExtension {
    /// Uniquely identifies the extension among all configured extensions.
    pub id: String,
    /// The parsed manifest, `None` if there is none, or the parse error.
    pub manifest: Option<Result<ExtensionManifest, ErrorLike>>,
}

impl ConfiguredExtension {
    pub fn new(id: impl Into<String>, manifest: ExtensionManifest) -> ConfiguredExtension {
        ConfiguredExtension {
            id: id.into(),
            manifest: Some(Ok(manifest)),
        }
    }

    /// Parses a raw manifest, retaining the parse error on failure rather
    /// than propagating it.
    pub fn parse(id: impl Into<String>, raw_manifest: Option<&str>) -> ConfiguredExtension {
        ConfiguredExtension {
            id: id.into(),
            manifest: raw_manifest.map(|raw| {
                serde_json::from_str(raw).map_err(|err| ErrorLike::new(err.to_string()))
            }),
        }
    }
}

/// An extension's manifest: where its code lives and when to activate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    /// URL of the extension's script bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Events that cause the extension to be activated, e.g. `*` or
    /// `onLanguage:rust`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_events: Option<Vec<String>>,
    /// Features the extension contributes statically (actions etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributes: Option<Contributions>,
}

/// Features contributed by an extension's manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Contributions {
    #[serde(default)]
    pub actions: Vec<ActionContribution>,
}

/// An action contributed by an extension (surfaced in menus/palettes by the
/// platform).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionContribution {
    pub id: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The layered settings visible to extensions: the merged final object plus
/// the per-subject raw settings it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsCascade {
    /// The deeply-merged settings across all subjects.
    #[serde(rename = "final")]
    pub final_settings: Value,
    #[serde(default)]
    pub subjects: Vec<ConfiguredSubject>,
}

impl Default for SettingsCascade {
    fn default() -> SettingsCascade {
        SettingsCascade {
            final_settings: Value::Object(Default::default()),
            subjects: Vec::new(),
        }
    }
}

/// One subject's settings within the cascade (user, organization, etc.).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredSubject {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

/// The settings cascade, or the error state a cascade passes through while
/// settings are being edited. Only valid cascades are ever forwarded to the
/// extension host.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationCascade {
    Valid(SettingsCascade),
    Invalid(ErrorLike),
}

impl ConfigurationCascade {
    /// The cascade if it is valid, `None` while it is in an error state.
    pub fn valid(&self) -> Option<&SettingsCascade> {
        match self {
            ConfigurationCascade::Valid(cascade) => Some(cascade),
            ConfigurationCascade::Invalid(_) => None,
        }
    }
}

impl Default for ConfigurationCascade {
    fn default() -> ConfigurationCascade {
        ConfigurationCascade::Valid(SettingsCascade::default())
    }
}

impl From<SettingsCascade> for ConfigurationCascade {
    fn from(cascade: SettingsCascade) -> ConfigurationCascade {
        ConfigurationCascade::Valid(cascade)
    }
}

/// Reports whether the extension is enabled in the final settings (the
/// `extensions` object maps extension IDs to booleans).
pub fn is_extension_enabled(final_settings: &Value, extension_id: &str) -> bool {
    final_settings
        .get("extensions")
        .and_then(|extensions| extensions.get(extension_id))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Resolves the extension's activation script URL from its manifest.
///
/// This step is allowed to be nondeterministic in other deployments (e.g.
/// resolving a blob URL from a remote bundle), so callers must run it only
/// after deciding *whether* to activate, never as part of that decision.
pub fn script_url_from_manifest(extension: &ConfiguredExtension) -> anyhow::Result<String> {
    let manifest = match &extension.manifest {
        Some(Ok(manifest)) => manifest,
        Some(Err(err)) => {
            anyhow::bail!("unable to run extension {:?}: invalid manifest: {err}", extension.id)
        }
        None => anyhow::bail!("unable to run extension {:?}: no manifest found", extension.id),
    };
    match &manifest.url {
        Some(url) => Ok(url.clone()),
        None => anyhow::bail!(
            "unable to run extension {:?}: no \"url\" property in manifest",
            extension.id
        ),
    }
}
