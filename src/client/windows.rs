//! Windows proxy: forwards the visible documents and bridges user-facing
//! messages and prompts onto the platform streams.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::connection::{Connection, HandlerFuture, ResponseError};
use crate::protocol::{methods, TextDocumentItem};
use crate::store::EnvironmentStore;

use super::{report_send_error, ClientEvents, ShowInputRequest, ShowMessageRequest};

pub(super) fn wire(connection: &Connection, store: &Arc<EnvironmentStore>, events: &ClientEvents) {
    let forwarder = connection.clone();
    let errors = events.errors.clone();
    let last_sent: Mutex<Option<Vec<TextDocumentItem>>> = Mutex::new(None);
    store.subscribe(move |environment| {
        let documents = environment
            .visible_text_documents
            .clone()
            .unwrap_or_default();
        {
            let mut last_sent = last_sent.lock().unwrap();
            if last_sent.as_ref() == Some(&documents) {
                return;
            }
            *last_sent = Some(documents.clone());
        }
        let params = serde_json::to_value(&documents).unwrap_or_default();
        if let Err(err) =
            forwarder.send_notification(methods::windows::ACCEPT_VISIBLE_TEXT_DOCUMENTS, params)
        {
            report_send_error(&errors, "visible text documents", err);
        }
    });

    // showMessage resolves as soon as the message is queued for display.
    let messages = events.messages.clone();
    connection.on_request(methods::windows::SHOW_MESSAGE, move |params| {
        let messages = messages.clone();
        Box::pin(async move {
            let params = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid message: {err}")))?;
            messages
                .send(params)
                .map_err(|_| ResponseError::internal("messages not accepted"))?;
            Ok(serde_json::Value::Null)
        }) as HandlerFuture
    });

    // showMessageRequest stays pending until the platform resolves the
    // user's choice. There is no timeout.
    let message_requests = events.message_requests.clone();
    connection.on_request(methods::windows::SHOW_MESSAGE_REQUEST, move |params| {
        let message_requests = message_requests.clone();
        Box::pin(async move {
            let params = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid message request: {err}")))?;
            let (responder, chosen) = oneshot::channel();
            message_requests
                .send(ShowMessageRequest { params, responder })
                .map_err(|_| ResponseError::internal("message requests not accepted"))?;
            let chosen = chosen
                .await
                .map_err(|_| ResponseError::internal("message request dropped"))?;
            serde_json::to_value(chosen).map_err(|err| ResponseError::internal(err.to_string()))
        }) as HandlerFuture
    });

    let input_requests = events.input_requests.clone();
    connection.on_request(methods::windows::SHOW_INPUT_BOX, move |params| {
        let input_requests = input_requests.clone();
        Box::pin(async move {
            let params = serde_json::from_value(params)
                .map_err(|err| ResponseError::internal(format!("invalid input request: {err}")))?;
            let (responder, entered) = oneshot::channel();
            input_requests
                .send(ShowInputRequest { params, responder })
                .map_err(|_| ResponseError::internal("input requests not accepted"))?;
            let entered = entered
                .await
                .map_err(|_| ResponseError::internal("input request dropped"))?;
            serde_json::to_value(entered).map_err(|err| ResponseError::internal(err.to_string()))
        }) as HandlerFuture
    });

    let log_messages = events.log_messages.clone();
    connection.on_notification(methods::windows::LOG_MESSAGE, move |params| {
        match serde_json::from_value(params) {
            Ok(params) => {
                let _ = log_messages.send(params);
            }
            Err(err) => tracing::error!("invalid log message: {err}"),
        }
    });
}
