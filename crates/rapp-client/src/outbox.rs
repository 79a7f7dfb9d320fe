//! Buffered command delivery
//!
//! Commands sent before the connection opens are queued in send order and
//! flushed once it opens. A connection found closed at send time queues the
//! command again and asks the transport to reconnect; nothing is dropped.

use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use rapp_protocol::{Command, WireMessage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Connection to the editor backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Check if the connection can carry messages right now
    fn is_open(&self) -> bool;

    /// Start (re)connecting; completion is signalled through [`Outbox::opened`]
    async fn connect(&self) -> ClientResult<()>;

    /// Deliver one encoded command
    async fn send(&self, text: String) -> ClientResult<()>;
}

/// Outcome of [`Outbox::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the transport
    Sent,
    /// Queued until the connection opens
    Buffered,
}

/// Ordered outgoing command queue
#[derive(Debug)]
pub struct Outbox<T> {
    transport: T,
    pending: VecDeque<Command>,
    connected: bool,
}

impl<T: Transport> Outbox<T> {
    /// Create a disconnected outbox
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            pending: VecDeque::new(),
            connected: false,
        }
    }

    /// Underlying transport
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether commands currently go straight to the transport
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Commands waiting for the connection, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &Command> {
        self.pending.iter()
    }

    /// Send or queue a command
    ///
    /// # Errors
    /// Returns [`ClientError::Protocol`] if the command cannot be encoded
    pub async fn send(&mut self, command: Command) -> ClientResult<Delivery> {
        if !self.connected {
            self.pending.push_back(command);
            return Ok(Delivery::Buffered);
        }

        if !self.transport.is_open() {
            self.connected = false;
            self.pending.push_back(command);
            if let Err(e) = self.transport.connect().await {
                tracing::warn!(error = %e, "reconnect failed");
            }
            return Ok(Delivery::Buffered);
        }

        let text = command.to_text()?;
        match self.transport.send(text).await {
            Ok(()) => Ok(Delivery::Sent),
            Err(e) => {
                tracing::warn!(error = %e, "send failed, buffering");
                self.connected = false;
                self.pending.push_back(command);
                Ok(Delivery::Buffered)
            }
        }
    }

    /// Flush queued commands after the connection opened
    ///
    /// Returns how many commands were delivered. The outbox is connected
    /// only once the queue is empty.
    ///
    /// # Errors
    /// Returns the first delivery failure; that command and every later one
    /// stay queued
    pub async fn opened(&mut self) -> ClientResult<usize> {
        let mut delivered = 0;
        while let Some(command) = self.pending.pop_front() {
            let text = match command.to_text() {
                Ok(text) => text,
                Err(e) => {
                    self.pending.push_front(command);
                    return Err(e.into());
                }
            };
            if let Err(e) = self.transport.send(text).await {
                self.pending.push_front(command);
                return Err(e);
            }
            delivered += 1;
        }
        self.connected = true;
        tracing::debug!(delivered, "outbox flushed");
        Ok(delivered)
    }

    /// Mark the connection as lost; later sends are queued
    pub fn closed(&mut self) {
        self.connected = false;
    }
}

/// In-process transport delivering encoded commands to a channel
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
    open: AtomicBool,
}

impl ChannelTransport {
    /// Create an open transport and the receiving end
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            tx,
            open: AtomicBool::new(true),
        };
        (transport, rx)
    }

    /// Simulate the connection closing or reopening
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    async fn connect(&self) -> ClientResult<()> {
        if self.tx.is_closed() {
            return Err(ClientError::transport("receiver dropped"));
        }
        Ok(())
    }

    async fn send(&self, text: String) -> ClientResult<()> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(ClientError::transport("connection closed"));
        }
        self.tx
            .send(text)
            .map_err(|_| ClientError::transport("receiver dropped"))
    }
}
