//! Duplicate-token suppression over a bounded emission history.
//!
//! Incremental decoders re-decode the trailing audio window and re-emit the
//! same word with marginally different timestamps. The filter scans a short
//! lookback of recently emitted tokens for an exact text match within a
//! small time window; anything further back is treated as a legitimate
//! repetition.

use crate::defaults;
use crate::token::AsrToken;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

/// Configuration for the token deduplicator.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Maximum number of emitted tokens kept in history.
    pub history_size: usize,
    /// Similarity threshold (0.0-1.0) reserved for fuzzy matching.
    ///
    /// Not consulted by the current duplicate check, which is windowed
    /// exact-text matching only. Kept configurable for future extension.
    pub similarity_threshold: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            history_size: defaults::DEDUP_HISTORY_SIZE,
            similarity_threshold: defaults::SIMILARITY_THRESHOLD,
        }
    }
}

/// Snapshot of deduplicator state for observability.
#[derive(Debug, Clone, Serialize)]
pub struct DedupStats {
    pub history_len: usize,
    pub last_token_time: f64,
    pub recent_tokens: Vec<String>,
}

/// Bounded-history duplicate-suppression filter over emitted tokens.
#[derive(Debug)]
pub struct TokenDeduplicator {
    /// Insertion order = emission order; oldest at the front.
    history: VecDeque<AsrToken>,
    config: DedupConfig,
    last_token_time: f64,
}

impl TokenDeduplicator {
    /// Creates a deduplicator with default configuration.
    pub fn new() -> Self {
        Self::with_config(DedupConfig::default())
    }

    /// Creates a deduplicator with custom configuration.
    pub fn with_config(config: DedupConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_size),
            config,
            last_token_time: 0.0,
        }
    }

    /// Returns true if the token is a re-emission of a recently emitted one.
    ///
    /// Scans the most recent `DEDUP_LOOKBACK` history entries for an exact
    /// text match whose start time lies within `DEDUP_WINDOW_SECS` of the
    /// candidate's.
    pub fn is_duplicate(&self, token: &AsrToken) -> bool {
        if self.history.is_empty() {
            return false;
        }

        let lookback = self.history.len().saturating_sub(defaults::DEDUP_LOOKBACK);
        for hist in self.history.range(lookback..).rev() {
            if hist.text == token.text
                && (hist.start - token.start).abs() < defaults::DEDUP_WINDOW_SECS
            {
                debug!(
                    "suppressing duplicate token '{}' at {:.2}s",
                    token.text, token.start
                );
                return true;
            }
        }

        false
    }

    /// Records a token that passed validation and was emitted.
    ///
    /// Evicts from the front once the history exceeds its size bound.
    pub fn add_validated_token(&mut self, token: AsrToken) {
        self.last_token_time = token.end;
        self.history.push_back(token);

        while self.history.len() > self.config.history_size {
            self.history.pop_front();
        }
    }

    /// Empties the history and resets the last token time.
    ///
    /// Called on silence transitions so a stale pre-silence token cannot
    /// match a similarly-timed post-silence one.
    pub fn clear_history(&mut self) {
        debug!("clearing token deduplication history");
        self.history.clear();
        self.last_token_time = 0.0;
    }

    /// Number of tokens currently held in history.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// End time of the most recently validated token.
    pub fn last_token_time(&self) -> f64 {
        self.last_token_time
    }

    /// Diagnostic snapshot; no side effects.
    pub fn stats(&self) -> DedupStats {
        let recent_start = self.history.len().saturating_sub(5);
        DedupStats {
            history_len: self.history.len(),
            last_token_time: self.last_token_time,
            recent_tokens: self
                .history
                .range(recent_start..)
                .map(|t| t.text.clone())
                .collect(),
        }
    }
}

impl Default for TokenDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_is_never_duplicate() {
        let dedup = TokenDeduplicator::new();
        let token = AsrToken::new("anything", 0.0, 0.5);
        assert!(!dedup.is_duplicate(&token));
    }

    #[test]
    fn test_same_text_within_window_is_duplicate() {
        let mut dedup = TokenDeduplicator::new();
        dedup.add_validated_token(AsrToken::new("hello", 10.0, 10.4));

        // Within [9.5, 10.5) of the recorded start.
        assert!(dedup.is_duplicate(&AsrToken::new("hello", 10.0, 10.4)));
        assert!(dedup.is_duplicate(&AsrToken::new("hello", 10.3, 10.7)));
        assert!(dedup.is_duplicate(&AsrToken::new("hello", 9.6, 10.0)));
    }

    #[test]
    fn test_same_text_outside_window_is_not_duplicate() {
        let mut dedup = TokenDeduplicator::new();
        dedup.add_validated_token(AsrToken::new("hello", 10.0, 10.4));

        assert!(!dedup.is_duplicate(&AsrToken::new("hello", 10.5, 10.9)));
        assert!(!dedup.is_duplicate(&AsrToken::new("hello", 9.4, 9.8)));
        assert!(!dedup.is_duplicate(&AsrToken::new("hello", 15.0, 15.4)));
    }

    #[test]
    fn test_different_text_close_in_time_is_not_duplicate() {
        let mut dedup = TokenDeduplicator::new();
        dedup.add_validated_token(AsrToken::new("hello", 10.0, 10.4));

        assert!(!dedup.is_duplicate(&AsrToken::new("yellow", 10.1, 10.5)));
    }

    #[test]
    fn test_lookback_is_bounded_to_ten_tokens() {
        let mut dedup = TokenDeduplicator::new();
        dedup.add_validated_token(AsrToken::new("old", 1.0, 1.2));
        // Push the old token past the lookback horizon.
        for i in 0..10 {
            let start = 2.0 + i as f64;
            dedup.add_validated_token(AsrToken::new(format!("w{}", i), start, start + 0.2));
        }

        // Same text and time as "old", but it is 11 entries back.
        assert!(!dedup.is_duplicate(&AsrToken::new("old", 1.0, 1.2)));
        // The most recent ones still match.
        assert!(dedup.is_duplicate(&AsrToken::new("w9", 11.0, 11.2)));
    }

    #[test]
    fn test_history_eviction_is_fifo() {
        let mut dedup = TokenDeduplicator::with_config(DedupConfig {
            history_size: 3,
            ..Default::default()
        });

        for i in 0..5 {
            let start = i as f64;
            dedup.add_validated_token(AsrToken::new(format!("t{}", i), start, start + 0.1));
        }

        assert_eq!(dedup.history_len(), 3);
        let stats = dedup.stats();
        assert_eq!(stats.recent_tokens, vec!["t2", "t3", "t4"]);
    }

    #[test]
    fn test_add_validated_token_updates_last_time() {
        let mut dedup = TokenDeduplicator::new();
        assert_eq!(dedup.last_token_time(), 0.0);

        dedup.add_validated_token(AsrToken::new("word", 1.0, 1.6));
        assert_eq!(dedup.last_token_time(), 1.6);
    }

    #[test]
    fn test_clear_history() {
        let mut dedup = TokenDeduplicator::new();
        dedup.add_validated_token(AsrToken::new("word", 1.0, 1.6));

        dedup.clear_history();

        assert_eq!(dedup.history_len(), 0);
        assert_eq!(dedup.last_token_time(), 0.0);
        assert!(!dedup.is_duplicate(&AsrToken::new("word", 1.0, 1.6)));
    }

    #[test]
    fn test_stats_reports_recent_five() {
        let mut dedup = TokenDeduplicator::new();
        for i in 0..8 {
            let start = i as f64;
            dedup.add_validated_token(AsrToken::new(format!("t{}", i), start, start + 0.1));
        }

        let stats = dedup.stats();
        assert_eq!(stats.history_len, 8);
        assert_eq!(stats.recent_tokens, vec!["t3", "t4", "t5", "t6", "t7"]);
    }

    #[test]
    fn test_similarity_threshold_is_stored_but_not_consulted() {
        // A threshold of 0.0 must not change the exact-match behavior.
        let mut dedup = TokenDeduplicator::with_config(DedupConfig {
            similarity_threshold: 0.0,
            ..Default::default()
        });
        dedup.add_validated_token(AsrToken::new("hello", 10.0, 10.4));

        assert!(dedup.is_duplicate(&AsrToken::new("hello", 10.1, 10.5)));
        assert!(!dedup.is_duplicate(&AsrToken::new("hullo", 10.1, 10.5)));
    }
}
