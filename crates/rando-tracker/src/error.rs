//! Error types for the tracker hub.
//!
//! [`HubError`] covers hub lifecycle and synchronization failures. It
//! converts into an Axum response so the debug routes can return it
//! directly.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rando_proto::CodecError;

use crate::registry::RegistryError;
use crate::source::SourceError;

/// Errors that can occur in the tracker hub.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The listen address could not be bound. Not retried.
    #[error("failed to bind tracker socket on {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// `start` was called while the server is already bound.
    #[error("tracker hub already running on {0}")]
    AlreadyRunning(SocketAddr),

    /// The game state source could not answer.
    #[error("game state source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    /// The tracked state definitions are inconsistent.
    #[error("invalid tracked state registry: {0}")]
    Registry(#[from] RegistryError),

    /// A packet could not be encoded.
    #[error("packet encoding failed: {0}")]
    Codec(#[from] CodecError),

    /// No tracked state has the requested tracking id.
    #[error("unknown tracking id: {0}")]
    UnknownTrackingId(String),
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UnknownTrackingId(_) => StatusCode::NOT_FOUND,
            Self::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::AlreadyRunning(_) => StatusCode::CONFLICT,
            Self::Bind { .. } | Self::Registry(_) | Self::Codec(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
