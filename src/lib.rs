//! scribed - Streaming transcription server with result stabilization
//!
//! Accepts framed audio over TCP, runs it through a recognition backend,
//! and emits a stabilized stream of transcript deltas: silence-gated,
//! deduplicated, in hypothesis order.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod cli;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod stabilize;
pub mod token;
pub mod transport;

// Engine seam (backend implementors start here)
pub use engine::{EngineContext, EngineSession, MockEngine, NullEngine, SpeechEngine};

// Stabilization pipeline
pub use stabilize::{
    DedupConfig, DedupStats, ProcessingStats, SilenceStateManager, TokenDeduplicator,
    TokenProcessingState,
};

// Session lifecycle
pub use session::{SessionProcessor, SessionProtocol};

// Error handling
pub use error::{Result, ScribedError};

// Config
pub use config::Config;

// Tokens and wire types
pub use token::{AsrToken, RecognizerEvent, TranscriptDelta};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
