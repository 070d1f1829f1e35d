use crate::handlers;
use crate::state::AppState;
use crate::theme::MAX_BACKGROUND_BYTES;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

/// Leaves headroom above the image limit so oversize uploads reach the handler.
const UPLOAD_BODY_LIMIT: usize = MAX_BACKGROUND_BYTES + 2 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/reports", get(handlers::get_reports))
        .route("/api/theme", get(handlers::get_theme))
        .route("/api/theme/opacity", post(handlers::set_opacity))
        .route("/api/theme/blur", post(handlers::set_blur))
        .route(
            "/api/theme/background",
            post(handlers::upload_background).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/theme/reset", post(handlers::reset_theme))
        .route(
            "/api/plans/:year/:month",
            get(handlers::get_plan).put(handlers::put_plan),
        )
        .route("/api/cleanup", post(handlers::clean_text))
        .route("/reporter/extract/", get(handlers::extract))
        .route("/reporter/send-report/", post(handlers::send_report))
        .with_state(state)
}
