//! Text codec
//!
//! Editor sessions exchange one JSON document per frame; the devtool
//! channel exchanges newline-delimited JSON.

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{AppMessage, Command, Event, RuntimeCommand};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A message that travels as text
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Encode as a single JSON document
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails
    fn to_text(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode { source })
    }

    /// Encode as one newline-terminated line
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails
    fn to_line(&self) -> ProtocolResult<String> {
        let mut text = self.to_text()?;
        text.push('\n');
        Ok(text)
    }

    /// Decode from a JSON document, ignoring surrounding whitespace
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the text is not a valid message
    fn from_text(text: &str) -> ProtocolResult<Self> {
        serde_json::from_str(text.trim()).map_err(|source| ProtocolError::Decode { source })
    }
}

impl WireMessage for Command {}
impl WireMessage for Event {}
impl WireMessage for AppMessage {}
impl WireMessage for RuntimeCommand {}
