//! Token and event types flowing through the stabilization pipeline.

use serde::{Deserialize, Serialize};

/// A unit of recognized text with start/end times on the audio timeline.
///
/// Produced by the external recognizer; immutable once created. Times are
/// seconds from the start of the session's audio stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsrToken {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl AsrToken {
    /// Creates a token without a confidence score.
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            confidence: None,
        }
    }

    /// Attaches a confidence score.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Duration of the token in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// An incremental transcript update sent to the client.
///
/// Deltas pass through the stabilization pipeline unchanged; this core only
/// filters and orders them, it does not reshape the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDelta {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl From<AsrToken> for TranscriptDelta {
    fn from(token: AsrToken) -> Self {
        Self {
            text: token.text,
            start: token.start,
            end: token.end,
            confidence: token.confidence,
        }
    }
}

/// What the external recognizer yields into the stabilization pipeline.
///
/// Silence detection itself is external (VAD); the pipeline only reacts to
/// the transitions. Timestamps are seconds on the session audio timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    /// A freshly decoded hypothesis token.
    Token(AsrToken),
    /// Silence began at the given time.
    SilenceStart(f64),
    /// Speech resumed at the given time.
    SilenceEnd(f64),
}

impl RecognizerEvent {
    /// Returns true if this is a token event.
    pub fn is_token(&self) -> bool {
        matches!(self, RecognizerEvent::Token(_))
    }

    /// Extracts the token if this is a Token variant.
    pub fn into_token(self) -> Option<AsrToken> {
        match self {
            RecognizerEvent::Token(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = AsrToken::new("hello", 1.0, 1.4);
        assert_eq!(token.text, "hello");
        assert_eq!(token.start, 1.0);
        assert_eq!(token.end, 1.4);
        assert!(token.confidence.is_none());
    }

    #[test]
    fn test_token_with_confidence() {
        let token = AsrToken::new("hello", 0.0, 0.5).with_confidence(0.92);
        assert_eq!(token.confidence, Some(0.92));
    }

    #[test]
    fn test_token_duration() {
        let token = AsrToken::new("word", 2.5, 3.1);
        assert!((token.duration() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_delta_from_token_preserves_fields() {
        let token = AsrToken::new("cat", 0.6, 0.9).with_confidence(0.8);
        let delta = TranscriptDelta::from(token.clone());
        assert_eq!(delta.text, token.text);
        assert_eq!(delta.start, token.start);
        assert_eq!(delta.end, token.end);
        assert_eq!(delta.confidence, token.confidence);
    }

    #[test]
    fn test_delta_serialization_omits_missing_confidence() {
        let delta = TranscriptDelta::from(AsrToken::new("hi", 0.0, 0.2));
        let json = serde_json::to_string(&delta).unwrap();
        assert!(!json.contains("confidence"));
        assert!(json.contains("\"text\":\"hi\""));
    }

    #[test]
    fn test_recognizer_event_variants() {
        let event = RecognizerEvent::Token(AsrToken::new("a", 0.0, 0.1));
        assert!(event.is_token());
        assert_eq!(event.into_token().unwrap().text, "a");

        let event = RecognizerEvent::SilenceStart(3.0);
        assert!(!event.is_token());
        assert!(event.into_token().is_none());
    }
}
