//! Dynamic command registry.
//!
//! Commands registered by extensions (through the RPC boundary) and by the
//! platform itself live side by side; registering a command with an already
//! used identifier replaces the previous entry, which lets extensions
//! override built-ins.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The future a command handler resolves to.
pub type CommandFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;

/// A command implementation. Receives the caller's arguments and resolves to
/// the command's result.
pub type CommandHandler = Arc<dyn Fn(Vec<Value>) -> CommandFuture + Send + Sync>;

/// Wire shape of a command invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteCommandParams {
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("command not registered: {0}")]
    NotFound(String),
    #[error("command {command} failed: {message}")]
    Execution { command: String, message: String },
}

struct CommandEntry {
    command: String,
    handler: CommandHandler,
}

/// Registry for executable commands.
#[derive(Default)]
pub struct CommandRegistry {
    entries: RwLock<Vec<CommandEntry>>,
}

impl CommandRegistry {
    pub fn new() -> CommandRegistry {
        CommandRegistry::default()
    }

    /// Registers a command, replacing any existing command with the same
    /// identifier.
    pub fn register(&self, command: impl Into<String>, handler: CommandHandler) {
        let command = command.into();
        let mut entries = self.entries.write().unwrap();
        entries.retain(|entry| entry.command != command);
        entries.push(CommandEntry { command, handler });
    }

    pub fn unregister(&self, command: &str) {
        self.entries
            .write()
            .unwrap()
            .retain(|entry| entry.command != command);
    }

    pub fn is_registered(&self, command: &str) -> bool {
        self.entries
            .read()
            .unwrap()
            .iter()
            .any(|entry| entry.command == command)
    }

    pub fn command_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Executes a registered command. The handler runs outside the registry
    /// lock, so commands may themselves register or execute other commands.
    pub async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Value, CommandError> {
        let handler = {
            let entries = self.entries.read().unwrap();
            entries
                .iter()
                .find(|entry| entry.command == params.command)
                .map(|entry| entry.handler.clone())
        };
        let Some(handler) = handler else {
            return Err(CommandError::NotFound(params.command));
        };
        handler(params.args)
            .await
            .map_err(|err| CommandError::Execution {
                command: params.command,
                message: err.to_string(),
            })
    }
}
