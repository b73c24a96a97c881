//! Commands proxy: mirrors extension-registered commands into the client's
//! command registry and executes registry commands on the host's behalf.

use std::sync::Arc;

use crate::connection::{Connection, HandlerFuture, ResponseError};
use crate::protocol::{methods, CommandRegistrationParams};
use crate::registries::command::{CommandFuture, ExecuteCommandParams};
use crate::registries::Registries;

pub(super) fn wire(connection: &Connection, registries: &Arc<Registries>) {
    // A command registered by an extension runs on the host: the local
    // registry entry forwards the invocation back over the connection.
    let forwarder = connection.clone();
    let register_registries = registries.clone();
    connection.on_notification(methods::commands::REGISTER, move |params| {
        let params: CommandRegistrationParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(err) => {
                tracing::error!("invalid command registration: {err}");
                return;
            }
        };
        let command = params.command.clone();
        let forwarder = forwarder.clone();
        register_registries.commands.register(
            params.command,
            Arc::new(move |args| {
                let forwarder = forwarder.clone();
                let command = command.clone();
                Box::pin(async move {
                    let params = serde_json::to_value(ExecuteCommandParams { command, args })?;
                    let result = forwarder
                        .send_request(methods::commands::EXECUTE_REGISTERED, params)
                        .await?;
                    Ok(result)
                }) as CommandFuture
            }),
        );
    });

    let unregister_registries = registries.clone();
    connection.on_notification(methods::commands::UNREGISTER, move |params| {
        match serde_json::from_value::<CommandRegistrationParams>(params) {
            Ok(params) => unregister_registries.commands.unregister(&params.command),
            Err(err) => tracing::error!("invalid command unregistration: {err}"),
        }
    });

    // The host may also invoke any registry command (including built-ins the
    // platform registered directly).
    let execute_registries = registries.clone();
    connection.on_request(methods::commands::EXECUTE, move |params| {
        let registries = execute_registries.clone();
        Box::pin(async move {
            let params: ExecuteCommandParams = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid command params: {err}")))?;
            registries
                .commands
                .execute_command(params)
                .await
                .map_err(|err| ResponseError::internal(err.to_string()))
        }) as HandlerFuture
    });
}
