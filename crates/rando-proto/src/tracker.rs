//! Packets sent from the local hub to tracker clients.

use rando_types::TrackerUpdate;

use crate::codec::{Packet, body_from_slice, body_to_vec};
use crate::error::CodecError;

/// Kind byte of [`TrackerPacket::Reset`].
pub const KIND_RESET: u8 = 1;
/// Kind byte of [`TrackerPacket::Update`].
pub const KIND_UPDATE: u8 = 2;
/// Kind byte of [`TrackerPacket::Flags`].
pub const KIND_FLAGS: u8 = 3;

/// A packet on the local tracker socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerPacket {
    /// Clear all local tracker state; a full baseline follows.
    Reset,
    /// A single tracked value changed.
    Update(TrackerUpdate),
    /// The flags of the currently loaded seed.
    Flags(Vec<String>),
    /// A kind this build does not know. Decode-only.
    Unknown {
        /// The unrecognised kind byte.
        kind: u8,
    },
}

impl Packet for TrackerPacket {
    fn kind(&self) -> u8 {
        match self {
            Self::Reset => KIND_RESET,
            Self::Update(_) => KIND_UPDATE,
            Self::Flags(_) => KIND_FLAGS,
            Self::Unknown { kind } => *kind,
        }
    }

    fn encode_body(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Reset => Ok(Vec::new()),
            Self::Update(update) => body_to_vec(update),
            Self::Flags(flags) => body_to_vec(flags),
            Self::Unknown { kind } => Err(CodecError::Unencodable(*kind)),
        }
    }

    fn decode_body(kind: u8, body: &[u8]) -> Result<Self, CodecError> {
        match kind {
            KIND_RESET => Ok(Self::Reset),
            KIND_UPDATE => Ok(Self::Update(body_from_slice(body)?)),
            KIND_FLAGS => Ok(Self::Flags(body_from_slice(body)?)),
            other => Ok(Self::Unknown { kind: other }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};

    #[test]
    fn update_survives_the_wire() {
        let packet = TrackerPacket::Update(TrackerUpdate::new("tp_wellspring", -3));
        let decoded = encode(&packet).and_then(|frame| decode::<TrackerPacket>(&frame));
        assert_eq!(decoded.ok(), Some(packet));
    }

    #[test]
    fn flags_keep_their_order() {
        let packet = TrackerPacket::Flags(vec!["Bingo".to_owned(), "Rain".to_owned()]);
        let decoded = encode(&packet).and_then(|frame| decode::<TrackerPacket>(&frame));
        assert_eq!(decoded.ok(), Some(packet));
    }

    #[test]
    fn unknown_kind_decodes_to_placeholder() {
        let decoded = decode::<TrackerPacket>(&[0, 0, 0, 3, 99, 1, 2]);
        assert_eq!(decoded.ok(), Some(TrackerPacket::Unknown { kind: 99 }));
    }

    #[test]
    fn unknown_kind_cannot_be_encoded() {
        let result = encode(&TrackerPacket::Unknown { kind: 99 });
        assert!(matches!(result, Err(CodecError::Unencodable(99))));
    }
}
