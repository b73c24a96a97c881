//! Host-side view of the settings cascade.

use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

use crate::connection::{Connection, ConnectionError};
use crate::environment::SettingsCascade;
use crate::protocol::{methods, ConfigurationUpdateParams, KeyPath};

type Subscriber = Arc<dyn Fn(&SettingsCascade) + Send + Sync>;

/// The settings cascade as last accepted from the client, plus the edit
/// path back to it.
pub struct ExtConfiguration {
    connection: Connection,
    cascade: Mutex<SettingsCascade>,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl ExtConfiguration {
    pub(super) fn new(connection: Connection) -> ExtConfiguration {
        ExtConfiguration {
            connection,
            cascade: Mutex::new(SettingsCascade::default()),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// The last accepted cascade. Starts out empty until the client sends
    /// the first one.
    pub fn cascade(&self) -> SettingsCascade {
        self.cascade.lock().unwrap().clone()
    }

    /// The merged final settings.
    pub fn get(&self) -> Value {
        self.cascade.lock().unwrap().final_settings.clone()
    }

    /// Adds a subscriber invoked on every accepted cascade, starting with
    /// the current one.
    pub fn subscribe(&self, subscriber: impl Fn(&SettingsCascade) + Send + Sync + 'static) {
        subscriber(&self.cascade());
        self.subscribers.write().unwrap().push(Arc::new(subscriber));
    }

    /// Requests a settings edit from the client. Resolves once the client
    /// applied (or rejected) the edit; the updated cascade arrives
    /// separately.
    pub async fn update(&self, path: KeyPath, value: Value) -> Result<(), ConnectionError> {
        let params = ConfigurationUpdateParams { path, value };
        let params = serde_json::to_value(&params).unwrap_or_default();
        self.connection
            .send_request(methods::configuration::ACCEPT_UPDATE, params)
            .await
            .map(|_| ())
    }

    fn accept(&self, cascade: SettingsCascade) {
        *self.cascade.lock().unwrap() = cascade.clone();
        let subscribers: Vec<Subscriber> = self.subscribers.read().unwrap().clone();
        for subscriber in &subscribers {
            subscriber(&cascade);
        }
    }
}

pub(super) fn wire(connection: &Connection, configuration: &Arc<ExtConfiguration>) {
    let configuration = configuration.clone();
    connection.on_notification(methods::configuration::ACCEPT_DATA, move |params| {
        match serde_json::from_value(params) {
            Ok(cascade) => configuration.accept(cascade),
            Err(err) => tracing::error!("invalid settings cascade: {err}"),
        }
    });
}
