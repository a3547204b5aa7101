//! Length-prefixed framing for the binary/streaming transport.
//!
//! Each frame is a `u32` big-endian byte length followed by the
//! prost-encoded [`ExportRequest`]. The receiver answers every frame with a
//! one-byte [`Ack`].

use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{ExportRequest, ProtoError};

/// Upper bound on a single frame body.
pub const MAX_FRAME_LEN: usize = 8 * 1024 * 1024;

/// Per-frame receipt status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
    /// The frame was decoded and accepted.
    Ok,
    /// The frame was received but rejected.
    Error,
}

impl Ack {
    fn to_byte(self) -> u8 {
        match self {
            Ack::Ok => 0,
            Ack::Error => 1,
        }
    }

    fn from_byte(byte: u8) -> Ack {
        if byte == 0 {
            Ack::Ok
        } else {
            Ack::Error
        }
    }
}

/// Write one request as a length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, request: &ExportRequest) -> Result<(), ProtoError>
where
    W: AsyncWrite + Unpin,
{
    let body = request.encode_to_vec();
    if body.len() > MAX_FRAME_LEN {
        return Err(ProtoError::FrameTooLarge(body.len()));
    }
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. Returns `Ok(None)` when the peer closed the stream
/// cleanly between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<ExportRequest>, ProtoError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if len > MAX_FRAME_LEN {
        return Err(ProtoError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(ExportRequest::decode(body.as_slice())?))
}

/// Write a one-byte receipt for the last frame read.
pub async fn write_ack<W>(writer: &mut W, ack: Ack) -> Result<(), ProtoError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(ack.to_byte()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the receipt for the last frame written.
pub async fn read_ack<R>(reader: &mut R) -> Result<Ack, ProtoError>
where
    R: AsyncRead + Unpin,
{
    Ok(Ack::from_byte(reader.read_u8().await?))
}
