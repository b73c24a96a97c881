// Extension bridge library - client/extension-host RPC plumbing

pub mod client;
pub mod connection;
pub mod context;
pub mod controller;
pub mod environment;
pub mod host;
pub mod protocol;
pub mod registries;
pub mod store;

pub use connection::{Connection, ConnectionError, Message, ResponseError, Tracer};
pub use controller::{
    Controller, ControllerEvents, ControllerOptions, ControllerStatus, EnvironmentFilter,
    ExecutionContextHandle, Notification,
};
pub use environment::{
    ConfigurationCascade, ConfiguredExtension, Environment, ExtensionManifest, SettingsCascade,
};
pub use host::{
    start_extension_host, ExecutableExtension, ExtensionHostApi, ExtensionHostHandle,
    ExtensionRuntime,
};
pub use store::{EnvironmentStore, StoreError};
