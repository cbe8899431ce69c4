//! JSON control-message protocol for the transcription connection.
//!
//! The wire carries JSON control messages and raw binary audio over one
//! bidirectional stream. Client control messages come in two shapes,
//! `{"type": ...}` probes and `{"command": ...}` lifecycle commands, so
//! parsing goes through a small classifier rather than one tagged enum.

use crate::token::TranscriptDelta;
use serde_json::{json, Value};

/// Control messages sent by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `{"type":"config"}`: capability probe.
    ConfigRequest,
    /// `{"command":"start","language"?:...}`: begin a session.
    Start { language: Option<String> },
    /// `{"command":"stop"}`: explicit finalize.
    Stop,
}

impl ClientMessage {
    /// Parses a text frame. Returns `None` for malformed JSON or any
    /// message that is none of the known shapes.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;

        if value.get("type").and_then(Value::as_str) == Some("config") {
            return Some(ClientMessage::ConfigRequest);
        }

        match value.get("command").and_then(Value::as_str) {
            Some("start") => Some(ClientMessage::Start {
                language: value
                    .get("language")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            Some("stop") => Some(ClientMessage::Stop),
            _ => None,
        }
    }
}

/// Messages sent to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Capability reply to a config probe.
    Config { use_audio_worklet: bool },
    /// An incremental transcript result, passed through unchanged.
    Delta(TranscriptDelta),
    /// Terminal signal: no more deltas forthcoming.
    ReadyToStop,
}

impl ServerMessage {
    /// Serializes to the wire JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            ServerMessage::Config { use_audio_worklet } => serde_json::to_string(&json!({
                "type": "config",
                "useAudioWorklet": use_audio_worklet,
            })),
            ServerMessage::Delta(delta) => serde_json::to_string(delta),
            ServerMessage::ReadyToStop => serde_json::to_string(&json!({
                "type": "ready_to_stop",
            })),
        }
    }
}

/// Connection close codes, mirroring WebSocket numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    /// Normal closure.
    Normal,
    /// Protocol violation: the first meaningful message was neither a
    /// config probe nor a start command.
    UnsupportedData,
}

impl CloseCode {
    /// Numeric wire value.
    pub fn as_u16(self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::UnsupportedData => 1003,
        }
    }
}
