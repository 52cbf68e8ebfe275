//! Axum router construction for the tracker server.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::hub::TrackerHub;
use crate::source::GameStateSource;
use crate::ws;

/// Build the tracker server router.
///
/// - `GET /` -- tracker `WebSocket`
/// - `POST /debug/states/{tracking_id}` -- debug write, only when
///   `debug_routes` is set
pub fn build_router<S: GameStateSource>(hub: Arc<TrackerHub<S>>, debug_routes: bool) -> Router {
    let mut router: Router<Arc<TrackerHub<S>>> =
        Router::new().route("/", get(ws::ws_tracker::<S>));

    if debug_routes {
        router = router.route(
            "/debug/states/{tracking_id}",
            post(handlers::set_state::<S>),
        );
    }

    router.layer(TraceLayer::new_for_http()).with_state(hub)
}
