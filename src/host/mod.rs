//! The extension host: the peer that runs extension code and speaks to the
//! client over a [`Connection`].
//!
//! [`start_extension_host`] returns immediately with a handle; the host
//! stays dormant until the client's `initialize` request arrives, at which
//! point every capability service is wired onto the connection. Requests
//! received before the handshake are rejected as unhandled methods.

pub mod commands;
pub mod configuration;
pub mod context;
pub mod documents;
pub mod extensions;
pub mod language_features;
pub mod roots;
pub mod search;
pub mod views;
pub mod windows;

pub use commands::ExtCommands;
pub use configuration::ExtConfiguration;
pub use context::ExtContext;
pub use documents::ExtDocuments;
pub use extensions::{ExecutableExtension, ExtensionRuntime};
pub use language_features::ExtLanguageFeatures;
pub use roots::ExtRoots;
pub use search::{ExtSearch, QueryTransformer};
pub use views::{ExtViews, PanelViewHandle};
pub use windows::ExtWindows;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::connection::{Connection, ConnectionError, HandlerFuture, ResponseError, Tracer};
use crate::protocol::{methods, InitData};

/// The API surface extensions (and embedders of the host) program against.
/// Cheap to clone; all clones share the same services.
#[derive(Clone)]
pub struct ExtensionHostApi {
    connection: Connection,
    pub configuration: Arc<ExtConfiguration>,
    pub context: Arc<ExtContext>,
    pub documents: Arc<ExtDocuments>,
    pub roots: Arc<ExtRoots>,
    pub windows: Arc<ExtWindows>,
    pub commands: Arc<ExtCommands>,
    pub search: Arc<ExtSearch>,
    pub language_features: Arc<ExtLanguageFeatures>,
    pub views: Arc<ExtViews>,
}

impl ExtensionHostApi {
    /// Round-trips a ping to the client. Because notifications and requests
    /// on one connection are delivered in order, a completed sync means all
    /// previously sent messages have been processed.
    pub async fn sync(&self) -> Result<(), ConnectionError> {
        self.connection
            .send_request(methods::PING, serde_json::Value::Null)
            .await
            .map(|_| ())
    }
}

/// Handle to a running extension host.
pub struct ExtensionHostHandle {
    api: ExtensionHostApi,
    connection: Connection,
    init_data: Arc<Mutex<Option<InitData>>>,
}

impl ExtensionHostHandle {
    pub fn api(&self) -> ExtensionHostApi {
        self.api.clone()
    }

    /// The data received in the `initialize` handshake, once it happened.
    pub fn init_data(&self) -> Option<InitData> {
        self.init_data.lock().unwrap().clone()
    }

    /// Sets (or clears) the tracer observing the host side of the
    /// connection.
    pub fn set_tracer(&self, tracer: Option<Arc<dyn Tracer>>) {
        self.connection.set_tracer(tracer);
    }

    pub fn unsubscribe(&self) {
        self.connection.unsubscribe();
    }
}

/// Attaches an extension host to the host side of a connection.
///
/// `runtime` is the seam to whatever actually evaluates extension bundles;
/// tests substitute a recording fake.
pub fn start_extension_host(
    connection: Connection,
    runtime: Arc<dyn ExtensionRuntime>,
) -> ExtensionHostHandle {
    let api = ExtensionHostApi {
        connection: connection.clone(),
        configuration: Arc::new(ExtConfiguration::new(connection.clone())),
        context: Arc::new(ExtContext::new(connection.clone())),
        documents: Arc::new(ExtDocuments::new()),
        roots: Arc::new(ExtRoots::new()),
        windows: Arc::new(ExtWindows::new(connection.clone())),
        commands: Arc::new(ExtCommands::new(connection.clone())),
        search: Arc::new(ExtSearch::new(connection.clone())),
        language_features: Arc::new(ExtLanguageFeatures::new(connection.clone())),
        views: Arc::new(ExtViews::new(connection.clone())),
    };

    connection.on_request(methods::PING, |_params| {
        Box::pin(async { Ok(serde_json::Value::String("pong".into())) }) as HandlerFuture
    });

    let init_data = Arc::new(Mutex::new(None));
    let initialized = Arc::new(AtomicBool::new(false));
    {
        let connection_for_wiring = connection.clone();
        let api = api.clone();
        let init_data = init_data.clone();
        connection.on_request(methods::INITIALIZE, move |params| {
            let connection = connection_for_wiring.clone();
            let api = api.clone();
            let runtime = runtime.clone();
            let init_data = init_data.clone();
            let initialized = initialized.clone();
            Box::pin(async move {
                if initialized.swap(true, Ordering::SeqCst) {
                    return Err(ResponseError::internal("already initialized"));
                }
                let data: InitData = serde_json::from_value(params)
                    .map_err(|err| ResponseError::internal(format!("invalid init data: {err}")))?;
                tracing::info!(endpoint = %data.endpoint_url, "extension host initializing");
                *init_data.lock().unwrap() = Some(data);

                configuration::wire(&connection, &api.configuration);
                documents::wire(&connection, &api.documents);
                roots::wire(&connection, &api.roots);
                windows::wire(&connection, &api.windows);
                extensions::wire(&connection, runtime);
                commands::wire(&connection, &api.commands);
                search::wire(&connection, &api.search);
                language_features::wire(&connection, &api.language_features);

                Ok(serde_json::Value::Null)
            }) as HandlerFuture
        });
    }

    ExtensionHostHandle {
        api,
        connection,
        init_data,
    }
}
