// The http module is the only place that knows about axum.
// Handlers translate wire bodies into core types and core errors into
// status codes; everything else lives in core/ and infra/.

#[path = "errors.rs"]
pub mod errors;
#[path = "handlers.rs"]
pub mod handlers;
#[path = "origin.rs"]
pub mod origin;
#[path = "state.rs"]
pub mod state;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use origin::OriginPolicy;
pub use state::AppState;

/// Builds the full application router.
///
/// Layer order (outermost first): request tracing, origin guard, CORS headers.
/// The guard sits outside CORS so a disallowed origin gets a 403 even on preflight.
pub fn build_router(state: AppState, policy: OriginPolicy) -> Router {
    let cors = policy.cors_layer();

    Router::new()
        .route("/summarize-single-todo", post(handlers::summarize_single_todo))
        .route(
            "/send-single-todo-to-slack",
            post(handlers::send_single_todo_to_slack),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            Arc::new(policy),
            origin::enforce_origin,
        ))
        .layer(TraceLayer::new_for_http())
}
