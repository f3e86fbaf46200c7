//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    // Base64 inflates uploads by a third; leave room for all files plus the JSON envelope.
    let body_limit = state.limits.max_files * state.limits.max_file_bytes * 4 / 3 + 64 * 1024;

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/files/process", post(http::http_post_process_files))
        .route("/api/v1/quizzes", post(http::http_post_quiz))
        .route(
            "/api/v1/quizzes/:quiz_id",
            get(http::http_get_quiz).delete(http::http_delete_quiz),
        )
        .route("/api/v1/quizzes/:quiz_id/validate", get(http::http_get_validate))
        .route("/api/v1/quizzes/:quiz_id/export", get(http::http_get_export))
        .route("/api/v1/quizzes/:quiz_id/questions/batch", post(http::http_post_batch))
        .route(
            "/api/v1/quizzes/:quiz_id/questions/:question_id",
            put(http::http_put_question).delete(http::http_delete_question),
        )
        .route(
            "/api/v1/quizzes/:quiz_id/questions/:question_id/regenerate",
            post(http::http_post_regenerate),
        )
        .route(
            "/api/v1/quizzes/:quiz_id/questions/:question_id/options",
            post(http::http_post_option),
        )
        .route(
            "/api/v1/quizzes/:quiz_id/questions/:question_id/options/:option_id",
            axum::routing::delete(http::http_delete_option),
        )
        .route(
            "/api/v1/quizzes/:quiz_id/questions/:question_id/options/:option_id/correct",
            post(http::http_post_toggle_correct),
        )
        // State + body limit + CORS + HTTP tracing
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
