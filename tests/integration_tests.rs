// Integration tests - controller and extension host wired over an
// in-process connection pair.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use common::{connect, environment, extension, wait_until, FakeRuntime};
use extbridge::connection::{Connection, ConnectionError, Message, Tracer};
use extbridge::controller::{Controller, ControllerOptions, ControllerStatus, ExecutionContextHandle};
use extbridge::environment::{ConfigurationCascade, ConfiguredExtension, Environment, ErrorLike};
use extbridge::host::start_extension_host;
use extbridge::protocol::{
    methods, ClientApplication, DocumentFilter, Hover, InitData, KeyPathSegment, MarkupContent,
    MarkupKind, MessageActionItem, MessageType, Position, Range, ShowMessageRequestParams,
    TextDocumentDecoration, TextDocumentIdentifier, TextDocumentItem, TextDocumentPositionParams,
    WorkspaceRoot,
};
use extbridge::registries::command::{CommandFuture, ExecuteCommandParams};
use extbridge::registries::provider::HoverProvider;

#[tokio::test]
async fn test_handshake_and_ping() {
    let fixture = connect().await;
    assert_eq!(fixture.controller.status(), ControllerStatus::Ready);
    fixture.controller.ping().await.unwrap();
    fixture.host.api().sync().await.unwrap();
    assert_eq!(
        fixture.host.init_data().unwrap(),
        InitData {
            endpoint_url: "https://example.test/.api".into(),
            client_application: ClientApplication::Editor,
        }
    );
}

#[tokio::test]
async fn test_second_initialize_is_rejected() {
    common::tracing::init_tracing_from_env();
    let (client_side, host_side) = Connection::in_process_pair();
    let _host = start_extension_host(host_side, Arc::new(FakeRuntime::default()));

    let init = serde_json::to_value(InitData {
        endpoint_url: "https://example.test/.api".into(),
        client_application: ClientApplication::Other,
    })
    .unwrap();
    client_side
        .send_request(methods::INITIALIZE, init.clone())
        .await
        .unwrap();
    let err = client_side
        .send_request(methods::INITIALIZE, init)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectionError::Response(_)));
}

#[tokio::test]
async fn test_configuration_reaches_host() {
    let fixture = connect().await;
    let mut env = environment(vec![], &[], &[]);
    if let ConfigurationCascade::Valid(cascade) = &mut env.configuration {
        cascade.final_settings = json!({"search.scope": "repo"});
    }
    fixture.controller.set_environment(env).unwrap();
    fixture.controller.ping().await.unwrap();
    assert_eq!(
        fixture.host.api().configuration.get(),
        json!({"search.scope": "repo"})
    );
}

#[tokio::test]
async fn test_invalid_cascade_keeps_last_good_settings() {
    let fixture = connect().await;
    let mut env = environment(vec![], &[], &[]);
    if let ConfigurationCascade::Valid(cascade) = &mut env.configuration {
        cascade.final_settings = json!({"a": 1});
    }
    fixture.controller.set_environment(env.clone()).unwrap();
    fixture.controller.ping().await.unwrap();

    env.configuration = ConfigurationCascade::Invalid(ErrorLike::new("settings being edited"));
    fixture.controller.set_environment(env).unwrap();
    fixture.controller.ping().await.unwrap();
    assert_eq!(fixture.host.api().configuration.get(), json!({"a": 1}));
}

#[tokio::test]
async fn test_unchanged_environment_is_not_resent() {
    let fixture = connect().await;

    #[derive(Default)]
    struct RecordingTracer {
        sent: Mutex<Vec<String>>,
    }
    impl Tracer for RecordingTracer {
        fn sent(&self, message: &Message) {
            if let Message::Notification { method, .. } = message {
                self.sent.lock().unwrap().push(method.clone());
            }
        }
        fn received(&self, _message: &Message) {}
    }

    let tracer = Arc::new(RecordingTracer::default());
    fixture.controller.set_tracer(Some(tracer.clone()));

    let mut env = environment(vec![], &[], &[]);
    if let ConfigurationCascade::Valid(cascade) = &mut env.configuration {
        cascade.final_settings = json!({"a": 1});
    }
    fixture.controller.set_environment(env.clone()).unwrap();
    fixture.controller.set_environment(env).unwrap();

    let config_sends = tracer
        .sent
        .lock()
        .unwrap()
        .iter()
        .filter(|method| method.as_str() == methods::configuration::ACCEPT_DATA)
        .count();
    assert_eq!(config_sends, 1);
}

#[tokio::test]
async fn test_host_tracer_observes_incoming_requests() {
    let fixture = connect().await;

    #[derive(Default)]
    struct RecordingTracer {
        received: Mutex<Vec<String>>,
    }
    impl Tracer for RecordingTracer {
        fn sent(&self, _message: &Message) {}
        fn received(&self, message: &Message) {
            if let Message::Request { method, .. } = message {
                self.received.lock().unwrap().push(method.clone());
            }
        }
    }

    let tracer = Arc::new(RecordingTracer::default());
    fixture.host.set_tracer(Some(tracer.clone()));
    fixture.controller.ping().await.unwrap();
    assert_eq!(
        tracer.received.lock().unwrap().as_slice(),
        [methods::PING.to_owned()]
    );

    // Clearing the tracer stops observation.
    fixture.host.set_tracer(None);
    fixture.controller.ping().await.unwrap();
    assert_eq!(tracer.received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_documents_and_roots_reach_host() {
    let fixture = connect().await;
    let mut env = environment(vec![], &[], &["rust", "go"]);
    env.roots = Some(vec![WorkspaceRoot {
        uri: "git://example.test/repo".into(),
    }]);
    fixture.controller.set_environment(env).unwrap();
    fixture.controller.ping().await.unwrap();

    let api = fixture.host.api();
    let uris: Vec<String> = api.documents.all().into_iter().map(|d| d.uri).collect();
    assert_eq!(uris, vec!["file:///doc.go", "file:///doc.rust"]);
    assert_eq!(api.windows.visible_text_documents().len(), 2);
    assert_eq!(
        api.roots.all(),
        vec![WorkspaceRoot {
            uri: "git://example.test/repo".into()
        }]
    );
}

#[tokio::test]
async fn test_enabled_matching_extension_activates() {
    let fixture = connect().await;
    fixture
        .controller
        .set_environment(environment(vec![extension("x")], &["x"], &[]))
        .unwrap();

    let runtime = fixture.runtime.clone();
    wait_until(move || runtime.activated_ids() == vec!["x"]).await;
    let activated = fixture.runtime.activated.lock().unwrap().clone();
    assert_eq!(activated[0].script_url, "https://example.test/x.js");
}

#[tokio::test]
async fn test_disabled_or_broken_extensions_do_not_activate() {
    let fixture = connect().await;
    let broken = ConfiguredExtension::parse("broken", Some("{not json"));
    fixture
        .controller
        .set_environment(environment(
            vec![extension("disabled"), broken, extension("enabled")],
            &["broken", "enabled"],
            &[],
        ))
        .unwrap();

    let runtime = fixture.runtime.clone();
    wait_until(move || runtime.activated_ids() == vec!["enabled"]).await;
    fixture.controller.ping().await.unwrap();
    assert_eq!(fixture.runtime.activated_ids(), vec!["enabled"]);
}

#[tokio::test]
async fn test_disabling_does_not_deactivate() {
    let fixture = connect().await;
    let ext = extension("x");
    fixture
        .controller
        .set_environment(environment(vec![ext.clone()], &["x"], &[]))
        .unwrap();
    let runtime = fixture.runtime.clone();
    wait_until(move || runtime.activated_ids() == vec!["x"]).await;

    // Disable, then re-enable. No deactivation, no second activation.
    fixture
        .controller
        .set_environment(environment(vec![ext.clone()], &[], &[]))
        .unwrap();
    fixture
        .controller
        .set_environment(environment(vec![ext], &["x"], &[]))
        .unwrap();
    fixture.controller.ping().await.unwrap();
    assert_eq!(fixture.runtime.activated_ids(), vec!["x"]);
    assert!(fixture.runtime.deactivated_ids().is_empty());
}

#[tokio::test]
async fn test_removed_extension_deactivates() {
    let fixture = connect().await;
    fixture
        .controller
        .set_environment(environment(vec![extension("x")], &["x"], &[]))
        .unwrap();
    let runtime = fixture.runtime.clone();
    wait_until(move || runtime.activated_ids() == vec!["x"]).await;

    fixture
        .controller
        .set_environment(environment(vec![], &["x"], &[]))
        .unwrap();
    let runtime = fixture.runtime.clone();
    wait_until(move || runtime.deactivated_ids() == vec!["x"]).await;
}

#[tokio::test]
async fn test_rapid_add_then_remove_activates_before_deactivating() {
    let fixture = connect().await;
    // Two snapshots applied back-to-back, without yielding in between: the
    // host must still observe the activation before the deactivation.
    fixture
        .controller
        .set_environment(environment(vec![extension("x")], &["x"], &[]))
        .unwrap();
    fixture
        .controller
        .set_environment(environment(vec![], &["x"], &[]))
        .unwrap();

    let runtime = fixture.runtime.clone();
    wait_until(move || runtime.deactivated_ids() == vec!["x"]).await;
    assert_eq!(fixture.runtime.activated_ids(), vec!["x"]);
}

#[tokio::test]
async fn test_failed_activation_leaves_others_running() {
    let fixture = connect().await;
    fixture
        .runtime
        .failing_ids
        .lock()
        .unwrap()
        .push("bad".into());
    fixture
        .controller
        .set_environment(environment(
            vec![extension("bad"), extension("good")],
            &["bad", "good"],
            &[],
        ))
        .unwrap();

    let runtime = fixture.runtime.clone();
    wait_until(move || runtime.activated_ids() == vec!["good"]).await;
    // The failed activation triggered cleanup on the host.
    let runtime = fixture.runtime.clone();
    wait_until(move || runtime.deactivated_ids() == vec!["bad"]).await;
}

#[tokio::test]
async fn test_failed_activation_surfaces_error_notification() {
    let mut fixture = connect().await;
    fixture
        .runtime
        .failing_ids
        .lock()
        .unwrap()
        .push("bad".into());
    fixture
        .controller
        .set_environment(environment(vec![extension("bad")], &["bad"], &[]))
        .unwrap();

    let notification = fixture.events.notifications.recv().await.unwrap();
    assert_eq!(notification.type_, MessageType::Error);
    assert_eq!(notification.source.as_deref(), Some("bad"));
    assert!(notification.message.contains("scripted activation failure"));
}

#[tokio::test]
async fn test_context_updates_merge_and_delete() {
    let fixture = connect().await;
    let api = fixture.host.api();

    let mut updates = extbridge::context::Context::new();
    updates.insert("clientId".into(), json!("editor"));
    updates.insert("debug".into(), json!(true));
    api.context.update(updates).unwrap();
    api.sync().await.unwrap();
    assert_eq!(
        fixture.controller.environment().context.get("clientId"),
        Some(&json!("editor"))
    );

    let mut updates = extbridge::context::Context::new();
    updates.insert("debug".into(), Value::Null);
    api.context.update(updates).unwrap();
    api.sync().await.unwrap();

    let context = fixture.controller.environment().context;
    assert_eq!(context.get("clientId"), Some(&json!("editor")));
    assert!(!context.contains_key("debug"));
}

#[tokio::test]
async fn test_extension_context_survives_environment_snapshots() {
    let fixture = connect().await;
    let api = fixture.host.api();

    let mut updates = extbridge::context::Context::new();
    updates.insert("clientId".into(), json!("editor"));
    api.context.update(updates).unwrap();
    api.sync().await.unwrap();

    // Snapshots are usually built without context; the extension-written
    // values carry over.
    fixture
        .controller
        .set_environment(environment(vec![], &[], &["rust"]))
        .unwrap();
    assert_eq!(
        fixture.controller.environment().context.get("clientId"),
        Some(&json!("editor"))
    );

    // A snapshot that does supply context replaces it wholesale.
    let mut env = environment(vec![], &[], &["rust"]);
    env.context.insert("theme".into(), json!("dark"));
    fixture.controller.set_environment(env).unwrap();
    let context = fixture.controller.environment().context;
    assert_eq!(context.get("theme"), Some(&json!("dark")));
    assert!(!context.contains_key("clientId"));
}

#[tokio::test]
async fn test_host_registered_command_round_trip() {
    let fixture = connect().await;
    let api = fixture.host.api();
    api.commands
        .register(
            "repo.echo",
            Arc::new(|args| {
                Box::pin(async move { Ok(json!({ "got": args })) }) as CommandFuture
            }),
        )
        .unwrap();
    api.sync().await.unwrap();

    let result = fixture
        .controller
        .execute_command(ExecuteCommandParams {
            command: "repo.echo".into(),
            args: vec![json!(1), json!("two")],
        })
        .await
        .unwrap();
    assert_eq!(result, json!({"got": [1, "two"]}));

    api.commands.unregister("repo.echo").unwrap();
    api.sync().await.unwrap();
    assert!(!fixture.controller.registries().commands.is_registered("repo.echo"));
}

#[tokio::test]
async fn test_command_errors_reach_caller_and_notifications() {
    let mut fixture = connect().await;
    let api = fixture.host.api();
    api.commands
        .register(
            "always.fails",
            Arc::new(|_args| {
                Box::pin(async { Err(anyhow::anyhow!("scripted failure")) }) as CommandFuture
            }),
        )
        .unwrap();
    api.sync().await.unwrap();

    let err = fixture
        .controller
        .execute_command(ExecuteCommandParams {
            command: "always.fails".into(),
            args: vec![],
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("always.fails"));

    let notification = fixture.events.notifications.recv().await.unwrap();
    assert_eq!(notification.type_, MessageType::Error);
    assert_eq!(notification.source.as_deref(), Some("always.fails"));
}

#[tokio::test]
async fn test_query_transformers_compose_and_unregister() {
    let fixture = connect().await;
    let api = fixture.host.api();
    let first = api
        .search
        .register_query_transformer(Arc::new(|query: &str| format!("{query} lang:rust")))
        .unwrap();
    api.search
        .register_query_transformer(Arc::new(|query: &str| format!("{query} count:100")))
        .unwrap();
    api.sync().await.unwrap();

    let transformed = fixture
        .controller
        .registries()
        .query_transformer
        .transform_query("auth".into())
        .await
        .unwrap();
    assert_eq!(transformed, "auth lang:rust count:100");

    api.search.unregister_query_transformer(first).unwrap();
    api.sync().await.unwrap();
    let transformed = fixture
        .controller
        .registries()
        .query_transformer
        .transform_query("auth".into())
        .await
        .unwrap();
    assert_eq!(transformed, "auth count:100");
}

struct StaticHover(&'static str);

#[async_trait]
impl HoverProvider for StaticHover {
    async fn provide_hover(
        &self,
        _params: TextDocumentPositionParams,
    ) -> anyhow::Result<Option<Hover>> {
        Ok(Some(Hover {
            contents: MarkupContent {
                kind: MarkupKind::Markdown,
                value: self.0.into(),
            },
            range: None,
        }))
    }
}

#[tokio::test]
async fn test_hover_provider_round_trip() {
    let fixture = connect().await;
    let api = fixture.host.api();
    let selector = vec![DocumentFilter {
        language: Some("rust".into()),
        scheme: None,
    }];
    let handle = api
        .language_features
        .register_hover_provider(selector, Arc::new(StaticHover("a **hover**")))
        .unwrap();
    api.sync().await.unwrap();

    let document = TextDocumentItem {
        uri: "file:///doc.rs".into(),
        language_id: "rust".into(),
        text: String::new(),
    };
    let params = TextDocumentPositionParams {
        text_document: TextDocumentIdentifier {
            uri: document.uri.clone(),
        },
        position: Position { line: 0, character: 3 },
    };
    let hover = fixture
        .controller
        .registries()
        .text_document_hover
        .get_hover(&document, params.clone())
        .await
        .unwrap();
    assert_eq!(hover.contents.value, "a **hover**");

    // Documents outside the selector see no provider.
    let go_document = TextDocumentItem {
        uri: "file:///doc.go".into(),
        language_id: "go".into(),
        text: String::new(),
    };
    assert!(fixture
        .controller
        .registries()
        .text_document_hover
        .get_hover(&go_document, params.clone())
        .await
        .is_none());

    api.language_features.unregister(handle).unwrap();
    api.sync().await.unwrap();
    assert!(fixture
        .controller
        .registries()
        .text_document_hover
        .get_hover(&document, params)
        .await
        .is_none());
}

#[tokio::test]
async fn test_panel_views_and_decorations() {
    let fixture = connect().await;
    let api = fixture.host.api();

    let panel = api.views.create_panel_view("deps").unwrap();
    panel.set_title("Dependencies").unwrap();
    panel.set_content("## none").unwrap();

    let decoration = TextDocumentDecoration {
        range: Range {
            start: Position { line: 2, character: 0 },
            end: Position { line: 2, character: 0 },
        },
        background_color: Some("rgba(0,0,255,0.2)".into()),
        border_color: None,
        after: None,
    };
    api.windows
        .set_decorations("file:///doc.rs", vec![decoration.clone()])
        .unwrap();
    api.sync().await.unwrap();

    let registries = fixture.controller.registries();
    let view = registries.views.get("deps").unwrap();
    assert_eq!(view.title, "Dependencies");
    assert_eq!(view.content, "## none");
    assert_eq!(
        registries.text_document_decoration.get("file:///doc.rs"),
        vec![decoration]
    );
}

#[tokio::test]
async fn test_show_message_becomes_notification() {
    let mut fixture = connect().await;
    let api = fixture.host.api();
    api.windows
        .show_message(MessageType::Info, "indexing done")
        .await
        .unwrap();

    let notification = fixture.events.notifications.recv().await.unwrap();
    assert_eq!(notification.message, "indexing done");
    assert_eq!(notification.type_, MessageType::Info);
    assert_eq!(notification.source, None);
}

#[tokio::test]
async fn test_show_message_request_resolves_with_chosen_action() {
    let mut fixture = connect().await;
    let api = fixture.host.api();
    let pending = tokio::spawn(async move {
        api.windows
            .show_message_request(ShowMessageRequestParams {
                type_: MessageType::Warning,
                message: "reload?".into(),
                actions: Some(vec![MessageActionItem {
                    title: "Reload".into(),
                }]),
            })
            .await
    });

    let request = fixture.events.message_requests.recv().await.unwrap();
    assert_eq!(request.params.message, "reload?");
    request
        .responder
        .send(Some(MessageActionItem {
            title: "Reload".into(),
        }))
        .unwrap();

    let chosen = pending.await.unwrap().unwrap();
    assert_eq!(chosen, Some(MessageActionItem { title: "Reload".into() }));
}

#[tokio::test]
async fn test_show_input_box_can_be_cancelled() {
    let mut fixture = connect().await;
    let api = fixture.host.api();
    let pending = tokio::spawn(async move {
        api.windows
            .show_input_box(extbridge::protocol::ShowInputParams {
                message: "branch name?".into(),
                default_value: Some("main".into()),
            })
            .await
    });

    let request = fixture.events.input_requests.recv().await.unwrap();
    assert_eq!(request.params.default_value.as_deref(), Some("main"));
    request.responder.send(None).unwrap();
    assert_eq!(pending.await.unwrap().unwrap(), None);
}

#[tokio::test]
async fn test_configuration_update_resolves_after_platform_applies() {
    let mut fixture = connect().await;
    let api = fixture.host.api();
    let pending = tokio::spawn(async move {
        api.configuration
            .update(vec![KeyPathSegment::from("search.scope")], json!("all"))
            .await
    });

    let update = fixture.events.configuration_updates.recv().await.unwrap();
    assert_eq!(update.params.path, vec![KeyPathSegment::from("search.scope")]);
    assert_eq!(update.params.value, json!("all"));
    update.responder.send(Ok(())).unwrap();
    pending.await.unwrap().unwrap();

    // A second edit produces exactly one more update event.
    let api = fixture.host.api();
    let pending = tokio::spawn(async move {
        api.configuration
            .update(vec![KeyPathSegment::from("search.scope")], json!("repo"))
            .await
    });
    let update = fixture.events.configuration_updates.recv().await.unwrap();
    assert_eq!(update.params.value, json!("repo"));
    update.responder.send(Ok(())).unwrap();
    pending.await.unwrap().unwrap();
    assert!(fixture.events.configuration_updates.try_recv().is_err());
}

#[tokio::test]
async fn test_environment_filter_hides_state_from_host() {
    common::tracing::init_tracing_from_env();
    let (client_side, host_side) = Connection::in_process_pair();
    let runtime = Arc::new(FakeRuntime::default());
    let host = start_extension_host(host_side, runtime);
    let (controller, _events) = Controller::connect(
        client_side,
        ControllerOptions {
            endpoint_url: "https://example.test/.api".into(),
            client_application: ClientApplication::Editor,
            environment_filter: Some(Box::new(|mut env: Environment| {
                env.visible_text_documents = Some(vec![]);
                env
            })),
        },
        None,
    )
    .await
    .unwrap();

    controller
        .set_environment(environment(vec![], &[], &["rust"]))
        .unwrap();
    controller.ping().await.unwrap();
    assert!(host.api().documents.all().is_empty());
}

#[tokio::test]
async fn test_unsubscribe_terminates_execution_context() {
    common::tracing::init_tracing_from_env();

    #[derive(Default)]
    struct TerminateRecorder {
        terminations: Mutex<u32>,
    }
    struct RecorderHandle(Arc<TerminateRecorder>);
    impl ExecutionContextHandle for RecorderHandle {
        fn terminate(&self) {
            *self.0.terminations.lock().unwrap() += 1;
        }
    }

    let (client_side, host_side) = Connection::in_process_pair();
    let host = start_extension_host(host_side, Arc::new(FakeRuntime::default()));
    let recorder = Arc::new(TerminateRecorder::default());
    let (controller, _events) = Controller::connect(
        client_side,
        ControllerOptions {
            endpoint_url: "https://example.test/.api".into(),
            client_application: ClientApplication::Editor,
            environment_filter: None,
        },
        Some(Box::new(RecorderHandle(recorder.clone()))),
    )
    .await
    .unwrap();

    controller.unsubscribe();
    controller.unsubscribe();
    assert_eq!(controller.status(), ControllerStatus::Closed);
    assert_eq!(*recorder.terminations.lock().unwrap(), 1);

    // The host's side of the connection is gone.
    assert!(host.api().sync().await.unwrap_err().is_unsubscribed());
    // Teardown errors in the proxies are swallowed; updating the
    // environment afterwards still succeeds locally.
    controller
        .set_environment(environment(vec![], &[], &["rust"]))
        .unwrap();
}
