//! Stub routes for the browser UIs and static asset passthrough. The UIs
//! themselves are out of scope for this core; these exist only so the
//! documented route surface resolves to something rather than 404ing.

use axum::{
    Router,
    http::StatusCode,
    routing::get,
};

async fn not_implemented() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "UI not served by this core")
}

/// Configure the stub routes for out-of-scope static UI pages and assets.
pub fn router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new()
        .route("/admin", get(not_implemented))
        .route("/launcher", get(not_implemented))
        .route("/play", get(not_implemented))
        .route("/dashboard", get(not_implemented))
        .route("/static/{*path}", get(not_implemented))
}
