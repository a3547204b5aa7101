//! Wire protocol shared by SDK exporters and the collector.
//!
//! One message family, two encodings:
//!
//! - the binary/streaming transport sends prost-encoded [`ExportRequest`]s
//!   in length-prefixed frames over plain TCP ([`framing`]);
//! - the text transport POSTs the JSON (serde) encoding of a single
//!   payload to `/v1/traces`, `/v1/metrics` or `/v1/logs`.
//!
//! The prost annotations are written by hand, so no protobuf toolchain is
//! needed at build time. [`transform`] converts between the SDK's signal
//! types and these messages, in both directions.

pub mod framing;
pub mod transform;

mod messages;

pub use messages::*;

use thiserror::Error;

/// Errors produced while encoding, decoding or framing payloads.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtoError {
    /// Underlying stream failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The frame body was not a valid message.
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),

    /// The peer announced a frame larger than [`framing::MAX_FRAME_LEN`].
    #[error("frame of {0} bytes exceeds the maximum frame length")]
    FrameTooLarge(usize),

    /// A trace or span id field did not hold valid lowercase hex.
    #[error("invalid id on the wire: {0:?}")]
    InvalidId(String),
}
