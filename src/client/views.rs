//! Views proxy: mirrors extension panel views into the view registry.

use std::sync::Arc;

use crate::connection::Connection;
use crate::protocol::{methods, PanelViewRegistrationParams, PanelViewUpdateParams};
use crate::registries::Registries;

pub(super) fn wire(connection: &Connection, registries: &Arc<Registries>) {
    let register_registries = registries.clone();
    connection.on_notification(methods::views::REGISTER_PANEL_VIEW, move |params| {
        match serde_json::from_value::<PanelViewRegistrationParams>(params) {
            Ok(params) => register_registries.views.register(params.id),
            Err(err) => tracing::error!("invalid panel view registration: {err}"),
        }
    });

    let update_registries = registries.clone();
    connection.on_notification(methods::views::ACCEPT_PANEL_VIEW_UPDATE, move |params| {
        let params: PanelViewUpdateParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(err) => {
                tracing::error!("invalid panel view update: {err}");
                return;
            }
        };
        if !update_registries.views.update(&params.id, &params.update) {
            tracing::warn!(id = %params.id, "update for unregistered panel view");
        }
    });
}
