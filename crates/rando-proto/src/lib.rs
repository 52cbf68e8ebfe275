//! Wire packets and the binary codec shared by the tracker hub and the
//! observer client.
//!
//! Packets are tagged enums. The codec reads the kind byte first, so a
//! decoder always yields exactly one variant and a kind it does not know
//! becomes an explicit `Unknown` variant the caller can match on.
//!
//! - [`codec`] -- length-prefixed framing, [`Packet`] trait
//! - [`tracker`] -- hub → tracker client packets
//! - [`observer`] -- observer ↔ match server packets

pub mod codec;
pub mod error;
pub mod observer;
pub mod tracker;

pub use codec::{MAX_FRAME_SIZE, Packet, decode, encode};
pub use error::CodecError;
pub use observer::ObserverPacket;
pub use tracker::TrackerPacket;
