// Shared fixtures for the integration tests: an in-process client/host pair
// with a recording extension runtime.

pub mod tracing;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use extbridge::connection::Connection;
use extbridge::controller::{Controller, ControllerEvents, ControllerOptions};
use extbridge::environment::{
    ConfigurationCascade, ConfiguredExtension, Environment, ExtensionManifest, SettingsCascade,
};
use extbridge::host::{
    start_extension_host, ExecutableExtension, ExtensionHostHandle, ExtensionRuntime,
};
use extbridge::protocol::{ClientApplication, TextDocumentItem};

/// An extension runtime that records every activation and deactivation.
/// Activation fails for ids listed in `failing_ids`.
#[derive(Default)]
pub struct FakeRuntime {
    pub activated: Mutex<Vec<ExecutableExtension>>,
    pub deactivated: Mutex<Vec<String>>,
    pub failing_ids: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn activated_ids(&self) -> Vec<String> {
        self.activated
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn deactivated_ids(&self) -> Vec<String> {
        self.deactivated.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtensionRuntime for FakeRuntime {
    async fn activate(&self, extension: &ExecutableExtension) -> anyhow::Result<()> {
        if self.failing_ids.lock().unwrap().contains(&extension.id) {
            anyhow::bail!("scripted activation failure");
        }
        self.activated.lock().unwrap().push(extension.clone());
        Ok(())
    }

    async fn deactivate(&self, id: &str) -> anyhow::Result<()> {
        self.deactivated.lock().unwrap().push(id.to_owned());
        Ok(())
    }
}

pub struct Fixture {
    pub controller: Controller,
    pub events: ControllerEvents,
    pub host: ExtensionHostHandle,
    pub runtime: Arc<FakeRuntime>,
}

/// Connects a controller to an in-process extension host and completes the
/// handshake.
pub async fn connect() -> Fixture {
    tracing::init_tracing_from_env();
    let (client_side, host_side) = Connection::in_process_pair();
    let runtime = Arc::new(FakeRuntime::default());
    let host = start_extension_host(host_side, runtime.clone());
    let (controller, events) = Controller::connect(
        client_side,
        ControllerOptions {
            endpoint_url: "https://example.test/.api".into(),
            client_application: ClientApplication::Editor,
            environment_filter: None,
        },
        None,
    )
    .await
    .expect("handshake failed");
    Fixture {
        controller,
        events,
        host,
        runtime,
    }
}

/// An environment with the given extensions, the enabled subset, and one
/// visible document per language.
pub fn environment(
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
                    text: format!("contents of the {language} document"),
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

/// A wildcard-activated extension with a script URL derived from its id.
pub fn extension(id: &str) -> ConfiguredExtension {
    ConfiguredExtension::new(
        id,
        ExtensionManifest {
            url: Some(format!("https://example.test/{id}.js")),
            activation_events: Some(vec!["*".into()]),
            contributes: None,
        },
    )
}

/// Polls `condition` until it holds or the timeout elapses. Activation and
/// deactivation run on spawned tasks, so tests wait for their effects.
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Duration::from_secs(5);
    let poll = Duration::from_millis(5);
    tokio::time::timeout(deadline, async {
        while !condition() {
            tokio::time::sleep(poll).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
