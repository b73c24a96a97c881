//! Host-side command registration and execution.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::connection::{Connection, ConnectionError, HandlerFuture, ResponseError};
use crate::protocol::{methods, CommandRegistrationParams};
use crate::registries::command::{CommandHandler, ExecuteCommandParams};

/// Commands registered by extensions. Each registration is mirrored into
/// the client's command registry; invocations come back over the
/// connection and run the local handler.
pub struct ExtCommands {
    connection: Connection,
    handlers: Mutex<HashMap<String, CommandHandler>>,
}

impl ExtCommands {
    pub(super) fn new(connection: Connection) -> ExtCommands {
        ExtCommands {
            connection,
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a command, replacing a previous registration with the same
    /// name.
    pub fn register(
        &self,
        command: impl Into<String>,
        handler: CommandHandler,
    ) -> Result<(), ConnectionError> {
        let command = command.into();
        self.handlers
            .lock()
            .unwrap()
            .insert(command.clone(), handler);
        let params = serde_json::to_value(CommandRegistrationParams { command })
            .unwrap_or_default();
        self.connection
            .send_notification(methods::commands::REGISTER, params)
    }

    pub fn unregister(&self, command: &str) -> Result<(), ConnectionError> {
        self.handlers.lock().unwrap().remove(command);
        let params = serde_json::to_value(CommandRegistrationParams {
            command: command.to_owned(),
        })
        .unwrap_or_default();
        self.connection
            .send_notification(methods::commands::UNREGISTER, params)
    }

    /// Executes a command in the client's registry (an extension's own
    /// command, another extension's, or a client built-in).
    pub async fn execute(
        &self,
        command: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<Value, ConnectionError> {
        let params = ExecuteCommandParams {
            command: command.into(),
            args,
        };
        let params = serde_json::to_value(&params).unwrap_or_default();
        self.connection
            .send_request(methods::commands::EXECUTE, params)
            .await
    }

    async fn run(&self, params: ExecuteCommandParams) -> Result<Value, ResponseError> {
        let handler = self
            .handlers
            .lock()
            .unwrap()
            .get(&params.command)
            .cloned()
            .ok_or_else(|| {
                ResponseError::internal(format!("command not registered: {:?}", params.command))
            })?;
        handler(params.args)
            .await
            .map_err(|err| ResponseError::internal(format!("{err:#}")))
    }
}

pub(super) fn wire(connection: &Connection, commands: &Arc<ExtCommands>) {
    let commands = commands.clone();
    connection.on_request(methods::commands::EXECUTE_REGISTERED, move |params| {
        let commands = commands.clone();
        Box::pin(async move {
            let params: ExecuteCommandParams = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid command params: {err}")))?;
            commands.run(params).await
        }) as HandlerFuture
    });
}
