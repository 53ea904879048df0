//! Analysis router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Page routes live at the root; JSON routes are nested under `/api/`.

use axum::extract::DefaultBodyLimit;
use axum::http::header::{CACHE_CONTROL, X_CONTENT_TYPE_OPTIONS};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::config::MAX_IMAGE_BYTES;

/// Request body cap: the image limit plus multipart overhead.
pub const BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// Build the full router for one `ApiContext`.
pub fn analysis_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/analyze", post(endpoints::analysis::analyze));

    Router::new()
        .route("/", get(endpoints::page::index))
        .route("/upload", post(endpoints::page::upload))
        .route("/analyze", post(endpoints::page::analyze))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        // Reports are per-session and may carry clinical findings.
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .with_state(ctx)
}
