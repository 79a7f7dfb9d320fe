//! Reporting channel
//!
//! A container built without a reporter skips every report after a single
//! `Option` check. [`TcpReporter`] streams newline-delimited JSON to the
//! devtool address and reads [`RuntimeCommand`]s back on the same socket.

use crate::error::{RuntimeError, RuntimeResult};
use crossbeam::channel::{self, Receiver, Sender};
use rapp_protocol::{AppMessage, RuntimeCommand, WireMessage};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::thread;

/// Receiver of instrumentation events
#[cfg_attr(test, mockall::automock)]
pub trait Reporter: Send + Sync {
    /// Deliver one event; must not block the caller for long
    fn report(&self, message: AppMessage);
}

/// Reporter feeding an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: Sender<AppMessage>,
}

impl ChannelReporter {
    /// Create reporter and the receiving end
    #[must_use]
    pub fn new() -> (Self, Receiver<AppMessage>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, message: AppMessage) {
        // A dropped receiver disables reporting
        let _ = self.tx.send(message);
    }
}

/// Reporter streaming to the devtool over TCP
///
/// Messages are queued and written by a background thread, so reporting
/// never waits on the socket.
#[derive(Debug, Clone)]
pub struct TcpReporter {
    address: String,
    tx: Sender<AppMessage>,
}

impl TcpReporter {
    /// Connect to the devtool at `host:port`
    ///
    /// Returns the reporter and the commands the devtool sends back.
    ///
    /// # Errors
    /// Returns [`RuntimeError::Devtool`] if the connection fails
    pub fn connect(address: &str) -> RuntimeResult<(Self, Receiver<RuntimeCommand>)> {
        let devtool_error = |source| RuntimeError::Devtool {
            address: address.to_string(),
            source,
        };
        let stream = TcpStream::connect(address).map_err(devtool_error)?;
        let reader = stream.try_clone().map_err(devtool_error)?;

        let (tx, rx) = channel::unbounded();
        let (command_tx, command_rx) = channel::unbounded();
        thread::Builder::new()
            .name("rapp-devtool-writer".into())
            .spawn(move || write_loop(stream, rx))
            .map_err(devtool_error)?;
        thread::Builder::new()
            .name("rapp-devtool-reader".into())
            .spawn(move || read_loop(reader, command_tx))
            .map_err(devtool_error)?;

        tracing::info!(address = %address, "connected to devtool");
        Ok((
            Self {
                address: address.to_string(),
                tx,
            },
            command_rx,
        ))
    }

    /// Devtool address
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Reporter for TcpReporter {
    fn report(&self, message: AppMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!(address = %self.address, "devtool writer stopped");
        }
    }
}

fn write_loop(stream: TcpStream, rx: Receiver<AppMessage>) {
    let mut writer = BufWriter::new(stream);
    for message in rx {
        let line = match message.to_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unencodable message");
                continue;
            }
        };
        if let Err(e) = writer.write_all(line.as_bytes()).and_then(|()| writer.flush()) {
            tracing::warn!(error = %e, "devtool connection lost");
            return;
        }
    }
}

fn read_loop(stream: TcpStream, tx: Sender<RuntimeCommand>) {
    for line in BufReader::new(stream).lines() {
        let Ok(line) = line else {
            return;
        };
        if line.trim().is_empty() {
            continue;
        }
        match RuntimeCommand::from_text(&line) {
            Ok(command) => {
                if tx.send(command).is_err() {
                    return;
                }
            }
            Err(e) => tracing::warn!(error = %e, "ignoring devtool command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::TcpListener;

    #[test]
    fn tcp_reporter_streams_lines_and_reads_commands() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let (reporter, commands) = TcpReporter::connect(&address).unwrap();
        let (socket, _) = listener.accept().unwrap();

        reporter.report(AppMessage::Instance {
            class_id: "A".into(),
            instance_id: 1,
        });
        let mut lines = BufReader::new(socket.try_clone().unwrap()).lines();
        let line = lines.next().unwrap().unwrap();
        assert_eq!(
            AppMessage::from_text(&line).unwrap(),
            AppMessage::Instance {
                class_id: "A".into(),
                instance_id: 1
            }
        );

        let mut socket = socket;
        socket
            .write_all(b"{\"type\":\"run-action\",\"data\":{\"instanceId\":1,\"name\":\"increment\"}}\n")
            .unwrap();
        assert_eq!(
            commands.recv().unwrap(),
            RuntimeCommand::RunAction {
                instance_id: 1,
                name: "increment".into(),
                args: Vec::new()
            }
        );
    }

    #[test]
    fn unreachable_devtool_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpReporter::connect(&address).unwrap_err();
        assert!(matches!(err, RuntimeError::Devtool { .. }));
    }
}
