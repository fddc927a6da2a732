//! API route definitions.

use axum::{Router, handler::HandlerWithoutStateExt, routing::get};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::error::panic_response;
use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    finish_router(routes(), state)
}

/// Routes served by the application, without fallbacks or middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        // User management
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}

/// Attach the not-found handling, static files and middleware to `router`.
///
/// Unmatched paths are looked up in the static directory, if one is
/// configured, before answering "Route not found". A known path used with an
/// unsupported method gets the same answer.
pub fn finish_router(router: Router<AppState>, state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let router = router.method_not_allowed_fallback(handlers::route_not_found);

    let router = match &state.static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir)
                .call_fallback_on_method_not_allowed(true)
                .not_found_service(handlers::route_not_found.into_service()),
        ),
        None => router.fallback(handlers::route_not_found),
    };

    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(trace_layer)
        .with_state(state)
}
