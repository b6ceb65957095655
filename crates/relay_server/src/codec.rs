//! Length-delimited packet framing over TCP.
//!
//! Wire format: a 4-byte big-endian length prefix followed by a
//! JSON-serialized [`Packet`]. The frame size limit from
//! [`RelayConfig::max_frame_size`] bounds allocation against malformed or
//! malicious length prefixes.
//!
//! [`RelayConfig::max_frame_size`]: crate::config::RelayConfig::max_frame_size

use crate::error::RelayError;
use crate::packet::Packet;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads one length-delimited packet.
///
/// A stream that closes before or inside a frame surfaces as an
/// `UnexpectedEof` I/O error (see [`RelayError::is_clean_eof`]); a length
/// prefix over `max_frame_size` or undecodable JSON is a
/// [`RelayError::Protocol`] failure.
pub async fn read_packet<R>(reader: &mut R, max_frame_size: usize) -> Result<Packet, RelayError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame_size {
        return Err(RelayError::Protocol(format!(
            "frame too large: {len} bytes (max {max_frame_size})"
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    serde_json::from_slice(&payload)
        .map_err(|e| RelayError::Protocol(format!("malformed packet: {e}")))
}

/// Writes one length-delimited packet and flushes.
pub async fn write_packet<W>(
    writer: &mut W,
    packet: &Packet,
    max_frame_size: usize,
) -> Result<(), RelayError>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(packet)
        .map_err(|e| RelayError::Protocol(format!("unencodable packet: {e}")))?;
    if payload.len() > max_frame_size {
        return Err(RelayError::Protocol(format!(
            "frame too large: {} bytes (max {max_frame_size})",
            payload.len()
        )));
    }

    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
