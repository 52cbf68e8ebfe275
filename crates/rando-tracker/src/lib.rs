//! Local tracker hub for the randomizer.
//!
//! Mirrors a curated subset of uber states to any number of tracker
//! clients (overlays, item trackers) over a loopback `WebSocket`.
//!
//! # Architecture
//!
//! The [`TrackerHub`] is the single fan-out point. It reads from a
//! [`GameStateSource`], converts raw values through the
//! [`TrackedStateRegistry`] and queues encoded
//! [`TrackerPacket`](rando_proto::TrackerPacket)s for each client. Every
//! new client first receives `Reset`, a full snapshot and the seed flags;
//! only then does it see incremental updates.
//!
//! The server is Axum: `GET /` upgrades to the tracker socket, and
//! `POST /debug/states/{tracking_id}` writes values back through the
//! source when debug routes are enabled.

pub mod error;
pub mod handlers;
pub mod hub;
pub mod registry;
pub mod router;
pub mod server;
pub mod source;
pub mod ws;

pub use error::HubError;
pub use hub::{CLIENT_QUEUE_CAPACITY, ClientId, ClientSession, Outbound, TrackerHub};
pub use registry::{
    RegistryError, TRACKED_STATES, TrackedStateDefinition, TrackedStateRegistry, ValueConversion,
};
pub use router::build_router;
pub use server::{DEFAULT_TRACKER_PORT, HubConfig};
pub use source::{GameStateSource, MemorySource, SourceError, StateEvent};
