//! Extensions proxy: decides which extensions should run and drives their
//! activation on the extension host.
//!
//! The active set is recomputed from every environment snapshot: an
//! extension belongs to it if it currently matches the activation filter, or
//! if it was ever activated during this session and is still present in the
//! environment. Successive active sets are diffed by id; additions are
//! activated and removals deactivated. Because once-activated extensions
//! stay in the set while present, disabling an extension in settings does
//! not deactivate it mid-session.
//!
//! Script URL resolution happens strictly after the diff: it is the one
//! nondeterministic step, and letting it influence *whether* an extension
//! activates would make the lifecycle unreproducible.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::connection::Connection;
use crate::environment::{
    is_extension_enabled, script_url_from_manifest, ConfiguredExtension, Environment,
};
use crate::protocol::{methods, ActivateExtensionParams, DeactivateExtensionParams};
use crate::store::EnvironmentStore;

use super::ProxyError;

pub(super) fn wire(
    connection: &Connection,
    store: &Arc<EnvironmentStore>,
    errors: mpsc::UnboundedSender<ProxyError>,
) {
    let connection = connection.clone();
    let state: Mutex<LifecycleState> = Mutex::new(LifecycleState::default());
    store.subscribe(move |environment| {
        let (to_activate, to_deactivate) = {
            let mut state = state.lock().unwrap();
            state.advance(environment)
        };
        // Requests are enqueued here, in diff order, so the host observes
        // an add-then-remove as activate before deactivate even across
        // back-to-back snapshots. Only the responses are awaited off-task.
        for extension in to_activate {
            // Resolution is fallible (missing manifest or url); failures
            // leave the extension inert but keep everything else running.
            let script_url = match script_url_from_manifest(&extension) {
                Ok(url) => url,
                Err(err) => {
                    tracing::warn!("{err:#}");
                    continue;
                }
            };
            let params = ActivateExtensionParams {
                id: extension.id.clone(),
                script_url,
            };
            let params = serde_json::to_value(&params).unwrap_or_default();
            let response = connection.send_request(methods::extensions::ACTIVATE, params);
            let errors = errors.clone();
            tokio::spawn(async move {
                match response.await {
                    Ok(_) => tracing::debug!(id = %extension.id, "extension activated"),
                    Err(err) if err.is_unsubscribed() => {}
                    Err(err) => {
                        tracing::error!(id = %extension.id, "extension activation failed: {err}");
                        let _ = errors.send(ProxyError {
                            source: extension.id.clone(),
                            message: err.to_string(),
                        });
                    }
                }
            });
        }
        for id in to_deactivate {
            let params = serde_json::to_value(DeactivateExtensionParams { id: id.clone() })
                .unwrap_or_default();
            let response = connection.send_request(methods::extensions::DEACTIVATE, params);
            tokio::spawn(async move {
                match response.await {
                    Ok(_) => tracing::debug!(id = %id, "extension deactivated"),
                    Err(err) if err.is_unsubscribed() => {}
                    Err(err) => {
                        tracing::warn!(id = %id, "extension deactivation failed: {err}")
                    }
                }
            });
        }
    });
}

#[derive(Default)]
struct LifecycleState {
    /// Ids that have ever been activated this session. Append-only.
    ever_activated: HashSet<String>,
    /// The active set emitted for the previous environment.
    previous_active: Vec<String>,
}

impl LifecycleState {
    /// Folds in the next environment and returns the extensions to activate
    /// and the ids to deactivate.
    fn advance(
        &mut self,
        environment: &Environment,
    ) -> (Vec<ConfiguredExtension>, Vec<String>) {
        for extension in matching_extensions(environment) {
            self.ever_activated.insert(extension.id.clone());
        }
        let active: Vec<ConfiguredExtension> = environment
            .extensions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|extension| self.ever_activated.contains(&extension.id))
            .cloned()
            .collect();
        let active_ids: Vec<String> = active.iter().map(|e| e.id.clone()).collect();

        let (added, removed) = diff_by_id(&self.previous_active, &active_ids);
        self.previous_active = active_ids;

        let to_activate = active
            .into_iter()
            .filter(|extension| added.contains(&extension.id))
            .collect();
        (to_activate, removed)
    }
}

/// The extensions that currently satisfy the activation filter: enabled in
/// the final settings, with a parseable manifest whose activation events
/// match the environment.
fn matching_extensions(environment: &Environment) -> Vec<&ConfiguredExtension> {
    let Some(cascade) = environment.configuration.valid() else {
        return Vec::new();
    };
    environment
        .extensions
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|extension| {
            is_extension_enabled(&cascade.final_settings, &extension.id)
                && activation_events_match(extension, environment)
        })
        .collect()
}

fn activation_events_match(extension: &ConfiguredExtension, environment: &Environment) -> bool {
    let Some(Ok(manifest)) = &extension.manifest else {
        return false;
    };
    let Some(events) = &manifest.activation_events else {
        return false;
    };
    events.iter().any(|event| {
        if event == "*" {
            return true;
        }
        match event.strip_prefix("onLanguage:") {
            Some(language) => environment
                .visible_text_documents
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(|document| document.language_id == language),
            None => {
                tracing::warn!(id = %extension.id, event, "unknown activation event");
                false
            }
        }
    })
}

/// Splits the transition from `previous` to `current` into the added and
/// removed ids, preserving `current`'s order for additions.
fn diff_by_id(previous: &[String], current: &[String]) -> (Vec<String>, Vec<String>) {
    let previous_set: HashSet<&String> = previous.iter().collect();
    let current_set: HashSet<&String> = current.iter().collect();
    let added = current
        .iter()
        .filter(|id| !previous_set.contains(id))
        .cloned()
        .collect();
    let removed = previous
        .iter()
        .filter(|id| !current_set.contains(id))
        .cloned()
        .collect();
    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{ConfigurationCascade, ExtensionManifest, SettingsCascade};
    use crate::protocol::TextDocumentItem;
    use serde_json::json;

    fn extension(id: &str, events: &[&str]) -> ConfiguredExtension {
        ConfiguredExtension::new(
            id,
            ExtensionManifest {
                url: Some(format!("https://example.com/{id}.js")),
                activation_events: Some(events.iter().map(|e| (*e).to_owned()).collect()),
                contributes: None,
            },
        )
    }

    fn environment(
        extensions: Vec<ConfiguredExtension>,
        enabled: &[&str],
        languages: &[&str],
    ) -> Environment {
        let settings = json!({
            "extensions": enabled
                .iter()
                .map(|id| ((*id).to_owned(), json!(true)))
                .collect::<serde_json::Map<_, _>>()
        });
        Environment {
            extensions: Some(extensions),
            visible_text_documents: Some(
                languages
                    .iter()
                    .map(|language| TextDocumentItem {
                        uri: format!("file:///doc.{language}"),
                        language_id: (*language).to_owned(),
                        text: String::new(),
                    })
                    .collect(),
            ),
            configuration: ConfigurationCascade::Valid(SettingsCascade {
                final_settings: settings,
                subjects: vec![],
            }),
            ..Environment::empty()
        }
    }

    #[test]
    fn test_diff_by_id() {
        let previous = vec!["a".to_owned(), "b".to_owned()];
        let current = vec!["b".to_owned(), "c".to_owned()];
        let (added, removed) = diff_by_id(&previous, &current);
        assert_eq!(added, vec!["c"]);
        assert_eq!(removed, vec!["a"]);
    }

    #[test]
    fn test_filter_requires_enabled_and_matching_event() {
        let env = environment(
            vec![
                extension("wildcard", &["*"]),
                extension("rust-only", &["onLanguage:rust"]),
                extension("go-only", &["onLanguage:go"]),
                extension("disabled", &["*"]),
            ],
            &["wildcard", "rust-only", "go-only"],
            &["rust"],
        );
        let ids: Vec<&str> = matching_extensions(&env)
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["wildcard", "rust-only"]);
    }

    #[test]
    fn test_invalid_cascade_matches_nothing() {
        let mut env = environment(vec![extension("x", &["*"])], &["x"], &[]);
        env.configuration =
            ConfigurationCascade::Invalid(crate::environment::ErrorLike::new("editing"));
        assert!(matching_extensions(&env).is_empty());
    }

    #[test]
    fn test_manifest_error_is_ineligible() {
        let broken = ConfiguredExtension::parse("broken", Some("{not json"));
        let env = environment(vec![broken], &["broken"], &[]);
        assert!(matching_extensions(&env).is_empty());
    }

    #[test]
    fn test_disabling_does_not_deactivate() {
        let mut state = LifecycleState::default();
        let ext = extension("x", &["*"]);

        let (activated, deactivated) = state.advance(&environment(vec![ext.clone()], &["x"], &[]));
        assert_eq!(activated.len(), 1);
        assert!(deactivated.is_empty());

        // Same extension, now disabled in settings: stays active.
        let (activated, deactivated) = state.advance(&environment(vec![ext.clone()], &[], &[]));
        assert!(activated.is_empty());
        assert!(deactivated.is_empty());

        // Re-enabling does not activate a second time.
        let (activated, deactivated) = state.advance(&environment(vec![ext], &["x"], &[]));
        assert!(activated.is_empty());
        assert!(deactivated.is_empty());
    }

    #[test]
    fn test_removal_deactivates_and_reappearance_reactivates() {
        let mut state = LifecycleState::default();
        let ext = extension("x", &["*"]);

        let (activated, _) = state.advance(&environment(vec![ext.clone()], &["x"], &[]));
        assert_eq!(activated.len(), 1);

        let (activated, deactivated) = state.advance(&environment(vec![], &["x"], &[]));
        assert!(activated.is_empty());
        assert_eq!(deactivated, vec!["x"]);

        let (activated, deactivated) = state.advance(&environment(vec![ext], &["x"], &[]));
        assert_eq!(activated.len(), 1);
        assert!(deactivated.is_empty());
    }
}
