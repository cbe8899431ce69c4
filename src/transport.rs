//! Framed bidirectional byte-stream transport.
//!
//! The connection carries JSON control text and raw binary audio over one
//! stream, framed as a kind byte plus a big-endian u32 length. The framing
//! is deliberately minimal; a WebSocket layer would replace this module
//! without touching the session code, which only sees [`Incoming`] values
//! and the reader/writer halves.

use crate::error::ScribedError;
use crate::protocol::CloseCode;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

/// Upper bound on a single frame's payload.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const KIND_BINARY: u8 = 0;
const KIND_TEXT: u8 = 1;
const KIND_CLOSE: u8 = 2;

/// A received frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Raw audio bytes. A zero-length payload is the end-of-audio sentinel.
    Binary(Vec<u8>),
    /// A JSON control message.
    Text(String),
}

/// Tagged outcome of a receive operation.
///
/// Disconnects surface as ordinary values here, not as errors to catch:
/// the session branches on them like any other input.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Frame(Frame),
    /// The peer closed the connection (close frame or clean EOF).
    Closed,
    /// The transport failed: truncated frame, oversized frame, bad UTF-8.
    Error(String),
}

/// A framed connection over any bidirectional byte stream.
pub struct FramedConnection<S> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Send + Unpin> FramedConnection<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Splits into independently owned read and write halves, one per task.
    pub fn split(self) -> (FrameReader<ReadHalf<S>>, FrameWriter<WriteHalf<S>>) {
        let (read, write) = tokio::io::split(self.stream);
        (FrameReader { reader: read }, FrameWriter { writer: write })
    }
}

/// Read half: yields [`Incoming`] values until `Closed` or `Error`.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Receives the next frame.
    ///
    /// EOF at a frame boundary is a clean close; EOF inside a frame is a
    /// transport error.
    pub async fn next(&mut self) -> Incoming {
        let kind = match self.reader.read_u8().await {
            Ok(kind) => kind,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Incoming::Closed,
            Err(e) => return Incoming::Error(format!("read failed: {}", e)),
        };

        let len = match self.reader.read_u32().await {
            Ok(len) => len as usize,
            Err(e) => return Incoming::Error(format!("truncated frame header: {}", e)),
        };

        if len > MAX_FRAME_LEN {
            return Incoming::Error(
                ScribedError::FrameTooLarge {
                    size: len,
                    max: MAX_FRAME_LEN,
                }
                .to_string(),
            );
        }

        let mut payload = vec![0u8; len];
        if let Err(e) = self.reader.read_exact(&mut payload).await {
            return Incoming::Error(format!("truncated frame payload: {}", e));
        }

        match kind {
            KIND_BINARY => Incoming::Frame(Frame::Binary(payload)),
            KIND_TEXT => match String::from_utf8(payload) {
                Ok(text) => Incoming::Frame(Frame::Text(text)),
                Err(_) => Incoming::Error("text frame is not valid UTF-8".to_string()),
            },
            KIND_CLOSE => Incoming::Closed,
            other => Incoming::Error(format!("unknown frame kind: {}", other)),
        }
    }
}

/// Write half: owned by exactly one task per session.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    async fn send_frame(&mut self, kind: u8, payload: &[u8]) -> io::Result<()> {
        self.writer.write_u8(kind).await?;
        self.writer.write_u32(payload.len() as u32).await?;
        self.writer.write_all(payload).await?;
        self.writer.flush().await
    }

    /// Sends a JSON control message.
    pub async fn send_text(&mut self, text: &str) -> io::Result<()> {
        self.send_frame(KIND_TEXT, text.as_bytes()).await
    }

    /// Sends raw audio bytes (client side; zero length is the sentinel).
    pub async fn send_binary(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.send_frame(KIND_BINARY, bytes).await
    }

    /// Sends a close frame carrying the code.
    pub async fn send_close(&mut self, code: CloseCode) -> io::Result<()> {
        self.send_frame(KIND_CLOSE, &code.as_u16().to_be_bytes())
            .await
    }
}
