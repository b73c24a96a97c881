//! Code editor proxy: applies decorations sent by the extension host.

use std::sync::Arc;

use crate::connection::Connection;
use crate::protocol::{methods, SetDecorationsParams};
use crate::registries::Registries;

pub(super) fn wire(connection: &Connection, registries: &Arc<Registries>) {
    let registries = registries.clone();
    connection.on_notification(methods::code_editor::SET_DECORATIONS, move |params| {
        match serde_json::from_value::<SetDecorationsParams>(params) {
            Ok(params) => registries
                .text_document_decoration
                .set(params.uri, params.decorations),
            Err(err) => tracing::error!("invalid decorations: {err}"),
        }
    });
}
