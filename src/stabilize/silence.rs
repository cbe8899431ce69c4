//! Silence state tracking for the stabilization pipeline.
//!
//! Two states, Speech (initial) and Silence, with no terminal state: the
//! manager lives as long as the session. Tokens that arrive while silence
//! detection is still settling are parked as pending and handed back for
//! finalization on the next silence transition.

use crate::token::AsrToken;
use tracing::debug;

/// Tracks speech/silence transitions and buffers tokens pending
/// finalization during silence.
#[derive(Debug, Default)]
pub struct SilenceStateManager {
    in_silence: bool,
    /// Invariant: `Some` iff `in_silence` is true.
    silence_start_time: Option<f64>,
    pending_tokens: Vec<AsrToken>,
    last_speech_end_time: Option<f64>,
}

impl SilenceStateManager {
    /// Creates a new manager in the Speech state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles the transition into silence.
    ///
    /// Idempotent: returns an empty vec and leaves the recorded start time
    /// untouched if already in silence. Otherwise transitions, records the
    /// start time, and hands back the pending tokens exactly once; the
    /// caller must finalize them before the silence period is settled.
    pub fn enter_silence(&mut self, timestamp: f64) -> Vec<AsrToken> {
        if self.in_silence {
            return Vec::new();
        }

        debug!("entering silence at {:.2}s", timestamp);
        self.in_silence = true;
        self.silence_start_time = Some(timestamp);

        std::mem::take(&mut self.pending_tokens)
    }

    /// Handles the transition from silence back to speech.
    ///
    /// No-op when already in Speech.
    pub fn exit_silence(&mut self, timestamp: f64) {
        if !self.in_silence {
            return;
        }

        let duration = timestamp - self.silence_start_time.unwrap_or(timestamp);
        debug!(
            "exiting silence at {:.2}s (duration: {:.2}s)",
            timestamp, duration
        );

        self.in_silence = false;
        self.last_speech_end_time = Some(timestamp);
        self.silence_start_time = None;
    }

    /// Returns true iff the current state is Speech.
    ///
    /// Callers use this to gate whether freshly-decoded tokens are treated
    /// as final or provisional.
    pub fn should_process_transcription(&self) -> bool {
        !self.in_silence
    }

    /// Returns true if currently in the Silence state.
    pub fn is_in_silence(&self) -> bool {
        self.in_silence
    }

    /// Appends a token to the pending list.
    ///
    /// Valid in either state, meaningful only during silence.
    pub fn add_pending_token(&mut self, token: AsrToken) {
        self.pending_tokens.push(token);
    }

    /// Number of tokens currently pending finalization.
    pub fn pending_count(&self) -> usize {
        self.pending_tokens.len()
    }

    /// Duration of the current silence period in seconds.
    ///
    /// `now` must come from the session's single time source; returns 0 when
    /// not in silence.
    pub fn silence_duration(&self, now: f64) -> f64 {
        match self.silence_start_time {
            Some(start) if self.in_silence => now - start,
            _ => 0.0,
        }
    }

    /// Time at which speech last resumed, if it has.
    pub fn last_speech_end_time(&self) -> Option<f64> {
        self.last_speech_end_time
    }

    /// Returns to Speech and clears all timestamps and pending tokens.
    ///
    /// Used at session reset, not mid-session.
    pub fn reset(&mut self) {
        debug!("resetting silence state");
        self.in_silence = false;
        self.silence_start_time = None;
        self.pending_tokens.clear();
        self.last_speech_end_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_speech() {
        let manager = SilenceStateManager::new();
        assert!(manager.should_process_transcription());
        assert!(!manager.is_in_silence());
        assert_eq!(manager.silence_duration(10.0), 0.0);
    }

    #[test]
    fn test_enter_silence_transitions_and_flushes_pending() {
        let mut manager = SilenceStateManager::new();
        manager.add_pending_token(AsrToken::new("one", 0.0, 0.3));
        manager.add_pending_token(AsrToken::new("two", 0.3, 0.6));

        let flushed = manager.enter_silence(1.0);
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[0].text, "one");
        assert_eq!(flushed[1].text, "two");
        assert_eq!(manager.pending_count(), 0);
        assert!(manager.is_in_silence());
        assert!(!manager.should_process_transcription());
    }

    #[test]
    fn test_enter_silence_is_idempotent() {
        let mut manager = SilenceStateManager::new();
        manager.add_pending_token(AsrToken::new("word", 0.0, 0.2));

        let first = manager.enter_silence(1.0);
        assert_eq!(first.len(), 1);
        assert!((manager.silence_duration(2.0) - 1.0).abs() < 1e-9);

        // Second call with no intervening exit: empty flush, start unchanged.
        manager.add_pending_token(AsrToken::new("late", 1.5, 1.7));
        let second = manager.enter_silence(5.0);
        assert!(second.is_empty());
        assert!((manager.silence_duration(2.0) - 1.0).abs() < 1e-9);
        assert_eq!(manager.pending_count(), 1);
    }

    #[test]
    fn test_exit_silence_records_timestamp() {
        let mut manager = SilenceStateManager::new();
        manager.enter_silence(1.0);
        manager.exit_silence(3.5);

        assert!(manager.should_process_transcription());
        assert_eq!(manager.last_speech_end_time(), Some(3.5));
        assert_eq!(manager.silence_duration(4.0), 0.0);
    }

    #[test]
    fn test_exit_silence_when_in_speech_is_noop() {
        let mut manager = SilenceStateManager::new();
        manager.exit_silence(2.0);

        assert!(manager.should_process_transcription());
        assert_eq!(manager.last_speech_end_time(), None);
    }

    #[test]
    fn test_silence_duration_uses_caller_clock() {
        let mut manager = SilenceStateManager::new();
        manager.enter_silence(10.0);
        assert!((manager.silence_duration(12.5) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let mut manager = SilenceStateManager::new();
        manager.add_pending_token(AsrToken::new("word", 0.0, 0.2));
        manager.enter_silence(1.0);
        manager.add_pending_token(AsrToken::new("other", 1.2, 1.4));

        manager.reset();

        assert!(manager.should_process_transcription());
        assert_eq!(manager.pending_count(), 0);
        assert_eq!(manager.silence_duration(5.0), 0.0);
        assert_eq!(manager.last_speech_end_time(), None);
    }

    #[test]
    fn test_pending_flushed_exactly_once_per_cycle() {
        let mut manager = SilenceStateManager::new();
        manager.add_pending_token(AsrToken::new("a", 0.0, 0.1));
        assert_eq!(manager.enter_silence(1.0).len(), 1);

        manager.exit_silence(2.0);
        manager.add_pending_token(AsrToken::new("b", 2.1, 2.2));

        // Only the token added since the last flush comes back.
        let flushed = manager.enter_silence(3.0);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].text, "b");
    }
}
