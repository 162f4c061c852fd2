//! Application router.
//!
//! Every GET, on any path, renders the page picked by `routing::route`.
//! The predict and report actions are POST-only; other methods on those
//! paths fall through to page rendering as well.

use axum::http::{header, HeaderValue};
use axum::routing::post;
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::AppContext;

/// Build the full router over a shared `AppContext`.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route(
            "/:disease/predict",
            post(endpoints::predict::submit).fallback(endpoints::pages::page),
        )
        .route(
            "/:disease/report",
            post(endpoints::report::download).fallback(endpoints::pages::page),
        )
        .fallback(endpoints::pages::page)
        .with_state(ctx)
        // Verdicts and reports are per-submission; never cache them.
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
}
