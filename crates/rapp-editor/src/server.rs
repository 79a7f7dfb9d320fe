//! Editor WebSocket endpoint
//!
//! Every session receives the shared broadcast stream plus the replies to
//! its own commands. Frames are single JSON documents.

use crate::backend::EditorBackend;
use crate::error::{EditorError, EditorResult};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use rapp_protocol::{Command, Event, WireMessage};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

/// Build the editor router
pub fn router(backend: EditorBackend) -> Router {
    Router::new().route("/ws", get(websocket_handler)).with_state(backend)
}

/// Serve the editor endpoint on `listener`
///
/// # Errors
/// Returns [`EditorError::Io`] if the server stops with an error
pub async fn serve(listener: TcpListener, backend: EditorBackend) -> EditorResult<()> {
    let address = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "editor".to_string());
    tracing::info!(address = %address, "editor endpoint listening");
    axum::serve(listener, router(backend))
        .await
        .map_err(|e| EditorError::io_error(address, e))
}

/// Decode one frame and run it
///
/// Returns the events addressed to the sender only.
///
/// # Errors
/// Returns decode failures and command failures
pub async fn respond(backend: &EditorBackend, text: &str) -> EditorResult<Vec<Event>> {
    let command = Command::from_text(text)?;
    backend.handle(command).await
}

async fn websocket_handler(ws: WebSocketUpgrade, State(backend): State<EditorBackend>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, backend))
}

async fn handle_websocket(socket: WebSocket, backend: EditorBackend) {
    let mut broadcasts = backend.subscribe();
    let (replies_tx, mut replies) = mpsc::unbounded_channel::<Event>();
    let (mut sender, mut receiver) = socket.split();

    let mut outgoing = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                reply = replies.recv() => match reply {
                    Some(event) => event,
                    None => break,
                },
                broadcast = broadcasts.recv() => match broadcast {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "editor session lagging behind");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            let text = match event.to_text() {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut incoming = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => match respond(&backend, &text).await {
                    Ok(events) => {
                        for event in events {
                            if replies_tx.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "editor command failed"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut incoming => outgoing.abort(),
        _ = &mut outgoing => incoming.abort(),
    }
    tracing::debug!("editor session closed");
}
