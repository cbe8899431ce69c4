//! Default configuration constants for scribed.
//!
//! Shared tuning constants used across configuration types and the
//! stabilization pipeline, kept in one place for consistency.

/// Maximum number of emitted tokens the deduplicator keeps in history.
pub const DEDUP_HISTORY_SIZE: usize = 50;

/// How many of the most recent history entries the duplicate check scans.
///
/// Bounds the cost of the check and avoids false positives against words
/// legitimately repeated far apart in the conversation.
pub const DEDUP_LOOKBACK: usize = 10;

/// Time window in seconds within which a same-text token counts as a
/// re-emission of an already-emitted token.
///
/// Incremental decoders re-score the trailing audio window and re-emit the
/// same word with slightly shifted timestamps; 500 ms tolerates that jitter
/// without suppressing genuine repetitions.
pub const DEDUP_WINDOW_SECS: f64 = 0.5;

/// Default similarity threshold carried by the deduplicator.
///
/// Stored for future fuzzy-matching configurability; the current duplicate
/// check is windowed exact-text matching and does not consult it.
pub const SIMILARITY_THRESHOLD: f32 = 0.9;

/// Default language code for transcription.
///
/// "auto" lets the recognizer detect the spoken language; clients may select
/// a specific code (e.g., "en", "de") in the start command.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Capacity of the per-session transcript-delta channel.
///
/// Bounded so a stalled consumer backpressures the stabilization task
/// instead of growing an unbounded queue.
pub const DELTA_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the per-session outbound message queue feeding the
/// connection writer.
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// Default TCP host the server binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port the server binds to.
pub const DEFAULT_PORT: u16 = 8765;
