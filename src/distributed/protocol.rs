//! Controller/walker wire protocol
//!
//! This module defines the messages a walker sends to the controller. The
//! protocol uses MessagePack (rmp-serde) for compact binary serialization.
//!
//! # Protocol Version
//!
//! Current version: 1
//!
//! # Message Flow
//!
//! Every walker opens one connection, identifies itself, sends its single
//! report and closes the connection. The controller never writes back.
//!
//! ```text
//! Walker (rank r)                 Controller (rank 0)
//!     |                              |
//!     |-------- HELLO(r) ----------->|
//!     |                              |
//!     |-------- REPORT(tag 0, n) --->|
//!     |                              |
//!     |-------- FIN ---------------->|
//! ```
//!
//! The rank travels in HELLO, so the report body carries only the step count:
//! the controller learns the source from the connection, not the payload.
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```

use crate::error::ProtocolError;
use crate::group::Rank;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Increment this when making breaking changes to the protocol.
/// Controller and walkers must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Tag carried by every completion report
pub const REPORT_TAG: u32 = 0;

/// Largest frame body accepted from a peer
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Hello message (Walker → Controller)
    ///
    /// First message on every connection. Binds the connection to a rank.
    Hello(HelloMessage),

    /// Report message (Walker → Controller)
    ///
    /// The walker's single completion report. Sent exactly once.
    Report(ReportMessage),
}

impl Message {
    /// Short name used in protocol errors
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello(_) => "HELLO",
            Message::Report(_) => "REPORT",
        }
    }
}

/// Hello message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    /// Protocol version (must match)
    pub protocol_version: u32,

    /// Sender's rank in the group
    pub rank: Rank,

    /// Host the walker runs on (diagnostics only)
    pub host: String,
}

/// Report message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMessage {
    /// Message tag, always `REPORT_TAG`
    pub tag: u32,

    /// Steps the walker took before terminating
    pub steps_taken: u64,
}

/// Serialize a message to bytes
///
/// Prepends a 4-byte length field for framing.
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg).context("Failed to serialize message")?;

    let msg_len = u32::try_from(msg_bytes.len()).context("Message length exceeds u32")?;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Read a complete message from a stream
///
/// Reads the length prefix, then reads the complete message.
pub async fn read_message<S>(stream: &mut S) -> Result<Message>
where
    S: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .context("Failed to read message length")?;

    let msg_len = u32::from_le_bytes(len_buf) as usize;
    if msg_len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(msg_len).into());
    }

    let mut msg_buf = vec![0u8; msg_len];
    stream
        .read_exact(&mut msg_buf)
        .await
        .context("Failed to read message body")?;

    let msg = rmp_serde::from_slice(&msg_buf).context("Failed to deserialize message")?;

    Ok(msg)
}

/// Write a message to a stream
///
/// Serializes the message with length prefix, writes and flushes it.
pub async fn write_message<S>(stream: &mut S, msg: &Message) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let framed = serialize_message(msg)?;

    stream
        .write_all(&framed)
        .await
        .context("Failed to write message")?;

    stream.flush().await.context("Failed to flush stream")?;

    Ok(())
}
