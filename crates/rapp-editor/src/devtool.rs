//! Devtool endpoint
//!
//! Instrumented programs connect over TCP and exchange newline-delimited
//! JSON: [`AppMessage`]s flow in and are broadcast to editor sessions,
//! [`RuntimeCommand`]s flow out.

use crate::backend::EditorBackend;
use crate::error::{EditorError, EditorResult};
use rapp_protocol::{AppMessage, Event, RuntimeCommand, WireMessage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Accept instrumented programs until the listener fails
///
/// # Errors
/// Returns [`EditorError::Io`] if accepting fails
pub async fn serve_devtool(listener: TcpListener, backend: EditorBackend) -> EditorResult<()> {
    let address = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "devtool".to_string());
    tracing::info!(address = %address, "devtool listening");
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| EditorError::io_error(address.clone(), e))?;
        tracing::debug!(peer = %peer, "devtool connection");
        tokio::spawn(handle_program(stream, backend.clone()));
    }
}

async fn handle_program(stream: TcpStream, backend: EditorBackend) {
    let ticket = backend.attach_program();
    let (reader, writer) = stream.into_split();
    let writer_task = tokio::spawn(write_commands(writer, ticket.commands));

    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match AppMessage::from_text(&line) {
                Ok(message) => backend.publish(Event::App(message)),
                Err(e) => tracing::warn!(error = %e, "dropping malformed runtime message"),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "devtool connection failed");
                break;
            }
        }
    }

    writer_task.abort();
    backend.detach_program(ticket.id);
}

async fn write_commands(mut writer: OwnedWriteHalf, mut commands: mpsc::UnboundedReceiver<RuntimeCommand>) {
    while let Some(command) = commands.recv().await {
        let line = match command.to_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode runtime command");
                continue;
            }
        };
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::warn!(error = %e, "failed to deliver runtime command");
            break;
        }
    }
}
