//! Length-prefixed binary framing.
//!
//! Every packet travels as one WebSocket binary message laid out as:
//!
//! - 4 bytes: length of everything that follows (u32, big-endian)
//! - 1 byte: packet kind
//! - N bytes: bincode-serialized body
//!
//! The kind byte is read before the body so decoders can recognise kinds
//! they do not understand and hand them back as a value instead of
//! failing.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the fixed header (length prefix plus kind byte).
pub const HEADER_SIZE: usize = 5;

/// Largest frame accepted or produced (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// A message that can travel through the codec.
///
/// Implementors map each variant to a kind byte and a body. Decoding a
/// kind the implementor does not know must succeed with a placeholder
/// variant rather than an error.
pub trait Packet: Sized {
    /// Kind byte written into the frame header.
    fn kind(&self) -> u8;

    /// Serialize the variant's body.
    fn encode_body(&self) -> Result<Vec<u8>, CodecError>;

    /// Rebuild a packet from its kind byte and body.
    fn decode_body(kind: u8, body: &[u8]) -> Result<Self, CodecError>;
}

/// Encode a packet into a complete frame.
pub fn encode<P: Packet>(packet: &P) -> Result<Bytes, CodecError> {
    let body = packet.encode_body()?;
    let payload_len = body.len().saturating_add(1);
    let declared = match u32::try_from(payload_len) {
        Ok(len) if payload_len <= MAX_FRAME_SIZE => len,
        _ => {
            return Err(CodecError::FrameTooLarge {
                len: payload_len,
                max: MAX_FRAME_SIZE,
            });
        }
    };

    let mut frame = BytesMut::with_capacity(payload_len.saturating_add(LENGTH_PREFIX_SIZE));
    frame.put_u32(declared);
    frame.put_u8(packet.kind());
    frame.put_slice(&body);
    Ok(frame.freeze())
}

/// Decode one complete frame.
pub fn decode<P: Packet>(frame: &[u8]) -> Result<P, CodecError> {
    if frame.len() < HEADER_SIZE {
        return Err(CodecError::Truncated {
            len: frame.len(),
            needed: HEADER_SIZE,
        });
    }

    let mut buf = frame;
    let declared = buf.get_u32() as usize;
    if declared > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            len: declared,
            max: MAX_FRAME_SIZE,
        });
    }
    if declared != buf.remaining() {
        return Err(CodecError::LengthMismatch {
            declared,
            actual: buf.remaining(),
        });
    }

    let kind = buf.get_u8();
    P::decode_body(kind, buf)
}

/// Serialize a body value with bincode.
pub(crate) fn body_to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(bincode::serialize(value)?)
}

/// Deserialize a body value with bincode.
pub(crate) fn body_from_slice<T: DeserializeOwned>(body: &[u8]) -> Result<T, CodecError> {
    Ok(bincode::deserialize(body)?)
}
