//! Session-scoped result processor.
//!
//! Glues an engine session to the stabilization pipeline: a dedicated task
//! owns the `TokenProcessingState` exclusively and hands accepted deltas to
//! the emit side through a bounded channel, so the two session tasks never
//! share mutable state.

use crate::defaults;
use crate::engine::EngineSession;
use crate::error::{Result, ScribedError};
use crate::stabilize::{DedupConfig, TokenProcessingState};
use crate::token::{AsrToken, RecognizerEvent, TranscriptDelta};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Owns the engine session and the stabilization task for one session.
pub struct SessionProcessor {
    session: Box<dyn EngineSession>,
    stabilize_task: JoinHandle<()>,
}

impl SessionProcessor {
    /// Starts the stabilization task and returns the ordered delta stream.
    ///
    /// The returned receiver yields deltas in production order and closes
    /// once the engine's event stream is exhausted.
    pub fn start(
        mut session: Box<dyn EngineSession>,
        dedup: DedupConfig,
    ) -> Result<(Self, mpsc::Receiver<TranscriptDelta>)> {
        let events = session.take_events().ok_or_else(|| ScribedError::Engine {
            message: "engine session yielded no event stream".to_string(),
        })?;

        let (delta_tx, delta_rx) = mpsc::channel(defaults::DELTA_CHANNEL_CAPACITY);
        let stabilize_task = tokio::spawn(stabilize_events(events, delta_tx, dedup));

        Ok((
            Self {
                session,
                stabilize_task,
            },
            delta_rx,
        ))
    }

    /// Forwards raw audio bytes to the engine, in arrival order.
    pub async fn feed_audio(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.session.feed_audio(bytes).await
    }

    /// Signals end of audio; the engine finishes decoding and closes its
    /// event stream, which in turn ends the delta stream.
    pub async fn end_audio(&mut self) -> Result<()> {
        self.session.end_audio().await
    }

    /// Releases session resources through the engine's teardown contract.
    ///
    /// The stabilization task is stopped afterwards; its cancellation is
    /// awaited so teardown never races it.
    pub async fn cleanup(&mut self) -> Result<()> {
        let result = self.session.cleanup().await;

        self.stabilize_task.abort();
        if let Err(e) = (&mut self.stabilize_task).await {
            if !e.is_cancelled() {
                return Err(ScribedError::Other(format!(
                    "stabilization task failed: {}",
                    e
                )));
            }
        }

        result
    }
}

/// The stabilization loop: single exclusive owner of the processing state.
async fn stabilize_events(
    mut events: mpsc::Receiver<RecognizerEvent>,
    deltas: mpsc::Sender<TranscriptDelta>,
    dedup: DedupConfig,
) {
    let mut state = TokenProcessingState::new(dedup);

    while let Some(event) = events.recv().await {
        match event {
            RecognizerEvent::Token(token) => {
                if state.silence_state.should_process_transcription() {
                    if !emit_if_new(&mut state, token, &deltas).await {
                        return;
                    }
                } else {
                    // Silence still settling; park until finalization.
                    state.silence_state.add_pending_token(token);
                }
            }
            RecognizerEvent::SilenceStart(timestamp) => {
                let pending = state.silence_state.enter_silence(timestamp);
                for token in pending {
                    if !emit_if_new(&mut state, token, &deltas).await {
                        return;
                    }
                }
                // A stale pre-silence token must not suppress a
                // similarly-timed token after speech resumes.
                state.deduplicator.clear_history();
            }
            RecognizerEvent::SilenceEnd(timestamp) => {
                state.silence_state.exit_silence(timestamp);
            }
        }
    }

    debug!("recognizer event stream exhausted");
    // Dropping the sender closes the delta stream.
}

/// Emits the token as a delta unless it duplicates recent output.
///
/// Returns false when the delta consumer is gone.
async fn emit_if_new(
    state: &mut TokenProcessingState,
    token: AsrToken,
    deltas: &mpsc::Sender<TranscriptDelta>,
) -> bool {
    if state.deduplicator.is_duplicate(&token) {
        return true;
    }

    state.deduplicator.add_validated_token(token.clone());
    state.mark_output(&token);
    deltas.send(token.into()).await.is_ok()
}
