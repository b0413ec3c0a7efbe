//! # printshop-api
//!
//! HTTP surface for the pricing engine: quotes, catalog from-prices and
//! preset administration.
//!
//! The binary in `main.rs` wires Postgres repositories and the background
//! refresher into [`AppState`]; tests drive [`router`] directly against the
//! in-memory store.

pub mod error;
pub mod handlers;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use printshop_core::defaults::{CORS_MAX_AGE_SECS, MAX_BODY_SIZE_BYTES};

pub use error::ApiError;
pub use state::AppState;

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router with its middleware stack.
pub fn router(state: AppState) -> Router {
    use handlers::{health, presets, pricing, products};

    Router::new()
        .route("/health", get(health::health_check))
        .route("/pricing/calculate", post(pricing::calculate))
        .route("/products/:slug/from-price", get(products::from_price))
        .route(
            "/admin/products/:slug/refresh-min-price",
            post(products::refresh),
        )
        .route("/admin/presets", get(presets::list).post(presets::create))
        .route("/admin/presets/validate", post(presets::validate_config))
        .route(
            "/admin/presets/:key",
            get(presets::get).patch(presets::update),
        )
        .route("/admin/pricing/anomalies", get(pricing::anomalies))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE_BYTES))
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parse_allowed_origins()))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(CORS_MAX_AGE_SECS))
}

/// Parse `CORS_ALLOWED_ORIGINS`, a comma-separated origin list.
///
/// ```text
/// CORS_ALLOWED_ORIGINS=https://shop.example.com,http://localhost:3000
/// ```
///
/// Invalid entries are logged and skipped.
pub fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins = std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default();
    parse_origin_list(&origins)
}

fn parse_origin_list(origins: &str) -> Vec<HeaderValue> {
    if origins.trim().is_empty() {
        return vec![HeaderValue::from_static("http://localhost:3000")];
    }

    origins
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!(
                        subsystem = "api",
                        origin = trimmed,
                        error = %e,
                        "Invalid CORS origin"
                    );
                    None
                }
            }
        })
        .collect()
}
