//! Tracker server configuration and socket binding.
//!
//! The hub owns the server lifecycle (see
//! [`TrackerHub::start`](crate::hub::TrackerHub::start)); this module only
//! knows how to turn a [`HubConfig`] into a bound listener and serve a
//! router on it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::HubError;

/// Port tracker clients expect the hub on.
pub const DEFAULT_TRACKER_PORT: u16 = 31410;

/// Configuration for the tracker hub server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Address to bind to. Loopback unless you know what you are doing.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// TCP port to listen on. `0` picks a free port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Expose `POST /debug/states/{tracking_id}`.
    #[serde(default)]
    pub debug_routes: bool,
}

impl HubConfig {
    /// The socket address this configuration binds to.
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug_routes: false,
        }
    }
}

const fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

const fn default_port() -> u16 {
    DEFAULT_TRACKER_PORT
}

/// Bind the tracker listener.
///
/// # Errors
///
/// Returns [`HubError::Bind`] if the address is in use or otherwise
/// unavailable.
pub async fn bind(config: &HubConfig) -> Result<TcpListener, HubError> {
    let addr = config.socket_addr();
    TcpListener::bind(addr).await.map_err(|source| HubError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Serve `router` on an already bound listener until the task is aborted
/// or the listener fails.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Tracker server listening");
    }
    axum::serve(listener, router).await
}
