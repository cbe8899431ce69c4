//! Result-stabilization pipeline.
//!
//! Converts the repeatedly-revised hypothesis stream from an incremental
//! recognizer into a clean, ordered, de-duplicated delta stream:
//! Silence State → Deduplicator → emitted deltas.

pub mod dedup;
pub mod silence;
pub mod state;

pub use dedup::{DedupConfig, DedupStats, TokenDeduplicator};
pub use silence::SilenceStateManager;
pub use state::{ProcessingStats, TokenProcessingState};
