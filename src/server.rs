//! TCP accept loop: one detached session per connection.

use crate::engine::EngineContext;
use crate::error::{Result, ScribedError};
use crate::session;
use crate::stabilize::DedupConfig;
use crate::transport::FramedConnection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// State for managing server shutdown.
#[derive(Debug, Clone)]
struct ServerState {
    shutdown: Arc<Mutex<bool>>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            shutdown: Arc::new(Mutex::new(false)),
        }
    }

    async fn is_shutdown(&self) -> bool {
        *self.shutdown.lock().await
    }

    async fn set_shutdown(&self) {
        *self.shutdown.lock().await = true;
    }
}

/// The transcription server: accepts connections and spawns sessions.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    dedup: DedupConfig,
    state: ServerState,
}

impl Server {
    /// Binds the listener.
    pub async fn bind(host: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| ScribedError::Transport {
                message: format!("failed to bind {}:{}: {}", host, port, e),
            })?;
        let local_addr = listener.local_addr().map_err(ScribedError::Io)?;
        Ok(Self {
            listener,
            local_addr,
            dedup: DedupConfig::default(),
            state: ServerState::new(),
        })
    }

    /// Overrides the per-session deduplication configuration.
    pub fn with_dedup(mut self, dedup: DedupConfig) -> Self {
        self.dedup = dedup;
        self
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that requests shutdown of the accept loop.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            state: self.state.clone(),
        }
    }

    /// Runs the accept loop until shutdown is requested.
    ///
    /// Per-connection failures are logged and contained; they never stop
    /// the loop.
    pub async fn serve(&self, engine: Arc<EngineContext>) -> Result<()> {
        info!(
            "listening on {} (engine: {})",
            self.local_addr,
            engine.engine_name()
        );

        loop {
            if self.state.is_shutdown().await {
                break;
            }

            // Accept with a timeout so the shutdown flag is re-checked.
            let accepted = tokio::time::timeout(
                tokio::time::Duration::from_millis(100),
                self.listener.accept(),
            )
            .await;

            match accepted {
                Ok(Ok((stream, peer))) => {
                    info!("connection from {}", peer);
                    let (reader, writer) = FramedConnection::new(stream).split();
                    session::spawn(reader, writer, Arc::clone(&engine), self.dedup.clone());
                }
                Ok(Err(e)) => {
                    warn!("accept failed: {}", e);
                }
                Err(_) => {
                    // Timeout; check the shutdown flag again.
                    continue;
                }
            }
        }

        info!("server stopped");
        Ok(())
    }
}

/// Requests shutdown of a running server.
#[derive(Clone)]
pub struct ShutdownHandle {
    state: ServerState,
}

impl ShutdownHandle {
    pub async fn shutdown(&self) {
        self.state.set_shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockEngine, SpeechEngine};
    use crate::transport::{Frame, Incoming};
    use tokio::net::TcpStream;

    fn test_engine() -> Arc<EngineContext> {
        Arc::new(EngineContext::with_settings(
            Arc::new(MockEngine::new("mock")) as Arc<dyn SpeechEngine>,
            "auto",
            false,
        ))
    }

    #[tokio::test]
    async fn test_bind_to_ephemeral_port() {
        let server = Server::bind("127.0.0.1", 0).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_serve_handles_a_session_and_shuts_down() {
        let server = Server::bind("127.0.0.1", 0).await.unwrap();
        let addr = server.local_addr();
        let shutdown = server.shutdown_handle();

        let server_task = tokio::spawn(async move { server.serve(test_engine()).await });

        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut reader, mut writer) = FramedConnection::new(stream).split();

        writer.send_text(r#"{"command":"start"}"#).await.unwrap();
        writer.send_binary(&[]).await.unwrap();

        match reader.next().await {
            Incoming::Frame(Frame::Text(text)) => {
                assert!(text.contains("ready_to_stop"));
            }
            other => panic!("expected ready_to_stop, got {:?}", other),
        }

        writer.send_text(r#"{"command":"stop"}"#).await.unwrap();

        shutdown.shutdown().await;
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_isolated() {
        let server = Server::bind("127.0.0.1", 0).await.unwrap();
        let addr = server.local_addr();
        let shutdown = server.shutdown_handle();
        let server_task = tokio::spawn(async move { server.serve(test_engine()).await });

        let mut clients = Vec::new();
        for _ in 0..3 {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (mut reader, mut writer) = FramedConnection::new(stream).split();
            clients.push(tokio::spawn(async move {
                writer.send_text(r#"{"command":"start"}"#).await.unwrap();
                writer.send_binary(&[]).await.unwrap();
                match reader.next().await {
                    Incoming::Frame(Frame::Text(text)) => {
                        assert!(text.contains("ready_to_stop"));
                    }
                    other => panic!("expected ready_to_stop, got {:?}", other),
                }
            }));
        }
        for client in clients {
            client.await.unwrap();
        }

        shutdown.shutdown().await;
        server_task.await.unwrap().unwrap();
    }
}
