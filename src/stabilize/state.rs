//! Per-session aggregate of the stabilization sub-components.

use crate::stabilize::dedup::{DedupConfig, DedupStats, TokenDeduplicator};
use crate::stabilize::silence::SilenceStateManager;
use crate::token::AsrToken;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Diagnostic snapshot of a session's processing state.
///
/// Observability only; never consulted for control-flow decisions.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingStats {
    pub last_output_time: f64,
    pub last_token_id: Option<String>,
    pub silence_duration: f64,
    pub is_in_silence: bool,
    pub deduplicator: DedupStats,
}

/// Per-session bookkeeping composing the silence state manager and the
/// token deduplicator.
///
/// Exclusively owned by one session's stabilization task; both sub-managers
/// are fully initialized by the constructor.
#[derive(Debug)]
pub struct TokenProcessingState {
    last_output_time: f64,
    last_token_id: Option<String>,
    pub silence_state: SilenceStateManager,
    pub deduplicator: TokenDeduplicator,
    buffer_validation_state: HashMap<String, serde_json::Value>,
}

impl TokenProcessingState {
    /// Creates a fully initialized processing state.
    pub fn new(dedup: DedupConfig) -> Self {
        Self {
            last_output_time: 0.0,
            last_token_id: None,
            silence_state: SilenceStateManager::new(),
            deduplicator: TokenDeduplicator::with_config(dedup),
            buffer_validation_state: HashMap::new(),
        }
    }

    /// Records bookkeeping for an emitted token.
    pub fn mark_output(&mut self, token: &AsrToken) {
        self.last_output_time = token.end;
        self.last_token_id = Some(format!("{}:{:.3}", token.text, token.start));
    }

    /// End time of the most recently emitted token.
    pub fn last_output_time(&self) -> f64 {
        self.last_output_time
    }

    /// Identifier of the most recently emitted token, if any.
    pub fn last_token_id(&self) -> Option<&str> {
        self.last_token_id.as_deref()
    }

    /// Stores a buffer-validation entry.
    pub fn set_validation(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.buffer_validation_state.insert(key.into(), value);
    }

    /// Looks up a buffer-validation entry.
    pub fn validation(&self, key: &str) -> Option<&serde_json::Value> {
        self.buffer_validation_state.get(key)
    }

    /// Resets both sub-components and all session-level bookkeeping.
    ///
    /// Used at the start of a fresh session or to recover from a detected
    /// inconsistency.
    pub fn reset_state(&mut self) {
        info!("resetting token processing state");
        self.last_output_time = 0.0;
        self.last_token_id = None;
        self.silence_state.reset();
        self.deduplicator.clear_history();
        self.buffer_validation_state.clear();
    }

    /// Diagnostic snapshot combining both sub-components' stats.
    ///
    /// `now` must come from the session's time source. No side effects.
    pub fn stats(&self, now: f64) -> ProcessingStats {
        ProcessingStats {
            last_output_time: self.last_output_time,
            last_token_id: self.last_token_id.clone(),
            silence_duration: self.silence_state.silence_duration(now),
            is_in_silence: self.silence_state.is_in_silence(),
            deduplicator: self.deduplicator.stats(),
        }
    }
}

impl Default for TokenProcessingState {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}
