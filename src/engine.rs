//! Recognition engine seam.
//!
//! The acoustic/decoding engine is an external collaborator: this module
//! defines the traits a backend implements and the engine-wide context
//! object constructed once at process start and handed to each session.

use crate::config::Config;
use crate::defaults;
use crate::error::{Result, ScribedError};
use crate::token::{AsrToken, RecognizerEvent};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Engine-wide handle to a speech recognizer.
///
/// Shared across sessions; each session gets its own [`EngineSession`] and
/// no cross-session mutable state.
#[async_trait::async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Opens a session-scoped recognizer instance for the given language.
    async fn open_session(&self, language: &str) -> Result<Box<dyn EngineSession>>;
}

/// A per-session recognizer instance.
///
/// Audio goes in via [`feed_audio`](EngineSession::feed_audio); hypothesis
/// tokens and silence/speech transitions come out of the event stream. The
/// event stream ends (sender dropped) once all audio has been processed
/// after [`end_audio`](EngineSession::end_audio).
#[async_trait::async_trait]
pub trait EngineSession: Send {
    /// Forwards raw audio bytes to the recognizer, in arrival order.
    async fn feed_audio(&mut self, bytes: Vec<u8>) -> Result<()>;

    /// Signals that no more audio is coming (end-of-audio sentinel).
    async fn end_audio(&mut self) -> Result<()>;

    /// Takes the event stream. Yields `None` on the second call.
    fn take_events(&mut self) -> Option<mpsc::Receiver<RecognizerEvent>>;

    /// Releases session resources: flushes buffered audio, frees any
    /// accelerator memory held by the backend. Best-effort.
    async fn cleanup(&mut self) -> Result<()>;
}

/// Engine-wide context constructed once at process start.
///
/// Replaces a process-global singleton: sessions receive this by `Arc` and
/// there is no hidden re-initialization.
pub struct EngineContext {
    engine: Arc<dyn SpeechEngine>,
    default_language: String,
    pcm_input: bool,
}

impl EngineContext {
    /// Builds the context from the loaded configuration.
    pub fn new(engine: Arc<dyn SpeechEngine>, config: &Config) -> Self {
        Self {
            engine,
            default_language: config.engine.language.clone(),
            pcm_input: config.engine.pcm_input,
        }
    }

    /// Context with explicit settings, mainly for tests.
    pub fn with_settings(
        engine: Arc<dyn SpeechEngine>,
        default_language: impl Into<String>,
        pcm_input: bool,
    ) -> Self {
        Self {
            engine,
            default_language: default_language.into(),
            pcm_input,
        }
    }

    /// Opens a session, falling back to the engine-wide default language.
    pub async fn open_session(&self, language: Option<&str>) -> Result<Box<dyn EngineSession>> {
        let language = language.unwrap_or(&self.default_language);
        self.engine.open_session(language).await
    }

    /// Engine-wide default language.
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Whether the client should stream raw PCM (capability descriptor bit).
    pub fn pcm_input(&self) -> bool {
        self.pcm_input
    }

    /// Backend name for logs.
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }
}

/// Backend that accepts audio and produces no tokens.
///
/// Used when no recognition backend is linked in. Keeps the whole session
/// protocol exercisable (handshake, streaming, end-of-audio, cleanup)
/// without a model on disk.
pub struct NullEngine {
    model: String,
}

impl NullEngine {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl SpeechEngine for NullEngine {
    fn name(&self) -> &str {
        &self.model
    }

    async fn open_session(&self, _language: &str) -> Result<Box<dyn EngineSession>> {
        let (tx, rx) = mpsc::channel(defaults::DELTA_CHANNEL_CAPACITY);
        Ok(Box::new(NullEngineSession {
            events_tx: Some(tx),
            events_rx: Some(rx),
        }))
    }
}

struct NullEngineSession {
    events_tx: Option<mpsc::Sender<RecognizerEvent>>,
    events_rx: Option<mpsc::Receiver<RecognizerEvent>>,
}

#[async_trait::async_trait]
impl EngineSession for NullEngineSession {
    async fn feed_audio(&mut self, _bytes: Vec<u8>) -> Result<()> {
        Ok(())
    }

    async fn end_audio(&mut self) -> Result<()> {
        self.events_tx = None;
        Ok(())
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<RecognizerEvent>> {
        self.events_rx.take()
    }

    async fn cleanup(&mut self) -> Result<()> {
        self.events_tx = None;
        Ok(())
    }
}

/// Scripted engine for testing.
///
/// Each audio chunk fed in releases the next batch of scripted events onto
/// the event stream; `end_audio` releases any remaining batches and closes
/// the stream. Sessions share the engine's counters so tests can assert
/// against them after the session is boxed away.
pub struct MockEngine {
    name: String,
    script: Vec<Vec<RecognizerEvent>>,
    fail_on_open: bool,
    cleaned_up: Arc<AtomicBool>,
    fed_chunks: Arc<AtomicUsize>,
    last_language: Arc<std::sync::Mutex<Option<String>>>,
}

impl MockEngine {
    /// Creates a mock engine with an empty script.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Vec::new(),
            fail_on_open: false,
            cleaned_up: Arc::new(AtomicBool::new(false)),
            fed_chunks: Arc::new(AtomicUsize::new(0)),
            last_language: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    /// Sets the event batches released per audio chunk.
    pub fn with_script(mut self, script: Vec<Vec<RecognizerEvent>>) -> Self {
        self.script = script;
        self
    }

    /// Convenience: one token per audio chunk.
    pub fn with_tokens(mut self, tokens: Vec<AsrToken>) -> Self {
        self.script = tokens
            .into_iter()
            .map(|t| vec![RecognizerEvent::Token(t)])
            .collect();
        self
    }

    /// Configures `open_session` to fail.
    pub fn with_open_failure(mut self) -> Self {
        self.fail_on_open = true;
        self
    }

    /// True once any session's `cleanup` has run.
    pub fn cleanup_ran(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }

    /// Total audio chunks fed across sessions.
    pub fn fed_chunks(&self) -> usize {
        self.fed_chunks.load(Ordering::SeqCst)
    }

    /// Language the most recent session was opened with.
    pub fn last_language(&self) -> Option<String> {
        self.last_language.lock().ok().and_then(|l| l.clone())
    }
}

#[async_trait::async_trait]
impl SpeechEngine for MockEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open_session(&self, language: &str) -> Result<Box<dyn EngineSession>> {
        if self.fail_on_open {
            return Err(ScribedError::EngineNotReady {
                message: format!("mock engine refused session for '{}'", language),
            });
        }

        if let Ok(mut last) = self.last_language.lock() {
            *last = Some(language.to_string());
        }

        let (tx, rx) = mpsc::channel(defaults::DELTA_CHANNEL_CAPACITY);
        Ok(Box::new(MockEngineSession {
            script: self.script.clone().into(),
            events_tx: Some(tx),
            events_rx: Some(rx),
            cleaned_up: Arc::clone(&self.cleaned_up),
            fed_chunks: Arc::clone(&self.fed_chunks),
        }))
    }
}

/// Session half of [`MockEngine`].
struct MockEngineSession {
    script: VecDeque<Vec<RecognizerEvent>>,
    events_tx: Option<mpsc::Sender<RecognizerEvent>>,
    events_rx: Option<mpsc::Receiver<RecognizerEvent>>,
    cleaned_up: Arc<AtomicBool>,
    fed_chunks: Arc<AtomicUsize>,
}

impl MockEngineSession {
    async fn release_batch(&mut self) -> Result<()> {
        if let Some(batch) = self.script.pop_front() {
            if let Some(tx) = &self.events_tx {
                for event in batch {
                    tx.send(event).await.map_err(|_| ScribedError::Engine {
                        message: "event stream consumer gone".to_string(),
                    })?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EngineSession for MockEngineSession {
    async fn feed_audio(&mut self, _bytes: Vec<u8>) -> Result<()> {
        self.fed_chunks.fetch_add(1, Ordering::SeqCst);
        self.release_batch().await
    }

    async fn end_audio(&mut self) -> Result<()> {
        while !self.script.is_empty() {
            self.release_batch().await?;
        }
        // Dropping the sender closes the event stream.
        self.events_tx = None;
        Ok(())
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<RecognizerEvent>> {
        self.events_rx.take()
    }

    async fn cleanup(&mut self) -> Result<()> {
        self.events_tx = None;
        self.script.clear();
        self.cleaned_up.store(true, Ordering::SeqCst);
        Ok(())
    }
}
