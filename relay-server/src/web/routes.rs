//! Router construction.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_hook, delete_hook, get_hook, is_alive, is_ready, list_hooks, receive_hook, AppState,
};

/// Build the relay router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/isAlive", get(is_alive))
        .route("/isReady", get(is_ready))
        .route("/hooks", get(list_hooks).post(create_hook))
        .route(
            "/hooks/:id",
            get(get_hook).post(receive_hook).delete(delete_hook),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
