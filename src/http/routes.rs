use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/sessions", post(handlers::start_session))
        .route(
            "/sessions/:interview_id",
            get(handlers::get_session).delete(handlers::close_session),
        )
        .route(
            "/sessions/:interview_id/transcript",
            get(handlers::get_transcript),
        )
        // Answer recording
        .route(
            "/sessions/:interview_id/record/start",
            post(handlers::start_recording),
        )
        .route(
            "/sessions/:interview_id/record/stop",
            post(handlers::stop_recording),
        )
        // Manual progression
        .route(
            "/sessions/:interview_id/next",
            post(handlers::next_question),
        )
        // Request logging + permissive CORS for the local UI
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
