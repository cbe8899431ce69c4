//! Per-connection session orchestration.
//!
//! One `SessionProtocol` per accepted connection drives the state machine
//! AwaitingHandshake → Active → Draining → Closed. While Active, three
//! tasks cooperate: the ingest loop (this module, inline), the emit task
//! (sole producer of transcript deltas), and the writer task (sole owner of
//! the socket write half). Stop and disconnect converge on the same
//! Draining sequence.

pub mod processor;

pub use processor::SessionProcessor;

use crate::defaults;
use crate::engine::EngineContext;
use crate::error::Result;
use crate::protocol::{ClientMessage, CloseCode, ServerMessage};
use crate::stabilize::DedupConfig;
use crate::token::TranscriptDelta;
use crate::transport::{Frame, FrameReader, FrameWriter, Incoming};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    AwaitingHandshake,
    Active,
    Draining,
    Closed,
}

/// Everything sent to the client funnels through one queue so a single
/// writer task owns the socket write half.
enum Outbound {
    Message(ServerMessage),
    Close(CloseCode),
}

/// The per-connection orchestrator.
pub struct SessionProtocol {
    engine: Arc<EngineContext>,
    dedup: DedupConfig,
    state: SessionState,
}

impl SessionProtocol {
    pub fn new(engine: Arc<EngineContext>, dedup: DedupConfig) -> Self {
        Self {
            engine,
            dedup,
            state: SessionState::AwaitingHandshake,
        }
    }

    /// Runs the session to completion.
    ///
    /// Transport-level failures are handled here and never escape; an `Err`
    /// means an unexpected internal failure (engine refusing a session,
    /// task panic) and the connection is torn down.
    pub async fn run<R, W>(mut self, mut reader: FrameReader<R>, writer: FrameWriter<W>) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::channel(defaults::OUTBOUND_CHANNEL_CAPACITY);
        let writer_task = tokio::spawn(write_outbound(writer, out_rx));

        let result = self.run_inner(&mut reader, &out_tx).await;

        // Closing the queue ends the writer task.
        drop(out_tx);
        if let Err(e) = writer_task.await {
            if !e.is_cancelled() {
                warn!("writer task failed: {}", e);
            }
        }
        self.state = SessionState::Closed;
        debug!("session closed");
        result
    }

    async fn run_inner<R>(
        &mut self,
        reader: &mut FrameReader<R>,
        out: &mpsc::Sender<Outbound>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        // 1. Handshake: accept config probes until a start command arrives.
        let language = loop {
            match reader.next().await {
                Incoming::Frame(Frame::Text(text)) => match ClientMessage::parse(&text) {
                    Some(ClientMessage::ConfigRequest) => {
                        if !self.send_capabilities(out).await {
                            return Ok(());
                        }
                    }
                    Some(ClientMessage::Start { language }) => break language,
                    Some(ClientMessage::Stop) | None => {
                        info!("protocol violation: first message was neither config nor start");
                        let _ = out.send(Outbound::Close(CloseCode::UnsupportedData)).await;
                        return Ok(());
                    }
                },
                Incoming::Frame(Frame::Binary(_)) => {
                    info!("protocol violation: binary frame before start");
                    let _ = out.send(Outbound::Close(CloseCode::UnsupportedData)).await;
                    return Ok(());
                }
                Incoming::Closed => {
                    info!("client disconnected during handshake");
                    return Ok(());
                }
                Incoming::Error(reason) => {
                    info!("transport error during handshake: {}", reason);
                    return Ok(());
                }
            }
        };

        // 2. Activate: session-scoped processor plus the emit task.
        let selected = language.as_deref().unwrap_or(self.engine.default_language());
        info!(
            "starting transcription session (engine: {}, language: {})",
            self.engine.engine_name(),
            selected
        );
        let engine_session = match self.engine.open_session(language.as_deref()).await {
            Ok(session) => session,
            Err(e) => {
                warn!("failed to open engine session: {}", e);
                // The client gets an explicit close, not a dropped socket.
                let _ = out.send(Outbound::Close(CloseCode::Normal)).await;
                return Err(e);
            }
        };
        let (mut processor, deltas) = SessionProcessor::start(engine_session, self.dedup.clone())?;
        let emit_task = tokio::spawn(emit_results(deltas, out.clone()));
        self.state = SessionState::Active;

        // 3. Ingest loop: audio in, control commands, disconnects.
        loop {
            match reader.next().await {
                Incoming::Frame(Frame::Binary(bytes)) => {
                    let result = if bytes.is_empty() {
                        debug!("end-of-audio sentinel received");
                        processor.end_audio().await
                    } else {
                        processor.feed_audio(bytes).await
                    };
                    if let Err(e) = result {
                        warn!("engine rejected audio: {}", e);
                        break;
                    }
                }
                Incoming::Frame(Frame::Text(text)) => match ClientMessage::parse(&text) {
                    Some(ClientMessage::ConfigRequest) => {
                        if !self.send_capabilities(out).await {
                            break;
                        }
                    }
                    Some(ClientMessage::Stop) => {
                        info!("stop command received");
                        break;
                    }
                    Some(ClientMessage::Start { .. }) | None => {
                        debug!("ignoring unexpected message: {}", text);
                    }
                },
                Incoming::Closed => {
                    info!("client disconnected");
                    break;
                }
                Incoming::Error(reason) => {
                    info!("transport error, ending session: {}", reason);
                    break;
                }
            }
        }

        // 4. Draining: cancel emit, then release processor resources.
        self.state = SessionState::Draining;
        emit_task.abort();
        match emit_task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!("emit task failed: {}", e),
        }
        if let Err(e) = processor.cleanup().await {
            warn!("session cleanup failed: {}", e);
        }

        Ok(())
    }

    /// Sends the capability descriptor; false if the writer is gone.
    async fn send_capabilities(&self, out: &mpsc::Sender<Outbound>) -> bool {
        out.send(Outbound::Message(ServerMessage::Config {
            use_audio_worklet: self.engine.pcm_input(),
        }))
        .await
        .is_ok()
    }
}

/// Emit task: forwards deltas in strict production order, then the terminal
/// ready-to-stop signal once the stream is exhausted.
async fn emit_results(
    mut deltas: mpsc::Receiver<TranscriptDelta>,
    out: mpsc::Sender<Outbound>,
) {
    while let Some(delta) = deltas.recv().await {
        if out
            .send(Outbound::Message(ServerMessage::Delta(delta)))
            .await
            .is_err()
        {
            // Writer gone: client disconnected while we were sending.
            return;
        }
    }
    debug!("delta stream finished; sending ready_to_stop");
    let _ = out.send(Outbound::Message(ServerMessage::ReadyToStop)).await;
}

/// Writer task: sole owner of the write half. A failed write means the
/// client is gone; that ends the task quietly.
async fn write_outbound<W>(mut writer: FrameWriter<W>, mut queue: mpsc::Receiver<Outbound>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    while let Some(item) = queue.recv().await {
        let write = match item {
            Outbound::Message(message) => match message.to_json() {
                Ok(json) => writer.send_text(&json).await,
                Err(e) => {
                    warn!("failed to serialize outbound message: {}", e);
                    continue;
                }
            },
            Outbound::Close(code) => writer.send_close(code).await,
        };
        if let Err(e) = write {
            debug!("outbound write failed (client disconnected?): {}", e);
            return;
        }
    }
}

/// Spawns a detached session for an accepted connection.
pub fn spawn<R, W>(
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    engine: Arc<EngineContext>,
    dedup: DedupConfig,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let session = SessionProtocol::new(engine, dedup);
        if let Err(e) = session.run(reader, writer).await {
            warn!("session ended abnormally: {}", e);
        }
    })
}
