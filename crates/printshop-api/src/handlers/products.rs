//! Catalog-facing product endpoints.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use printshop_core::FromPriceSource;
use printshop_jobs::refresh_min_price;

use crate::error::ApiError;
use crate::handlers::pricing::active_product;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FromPriceResponse {
    pub slug: String,
    pub from_cents: i64,
    pub source: FromPriceSource,
}

/// `GET /products/:slug/from-price`
pub async fn from_price(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = active_product(&state, &slug).await?;
    let resolved = state.from_price.resolve(&product);

    debug!(
        subsystem = "api",
        component = "products",
        op = "from_price",
        slug = %product.slug,
        source = %resolved.source,
        total_cents = resolved.cents,
        "From-price resolved"
    );
    Ok(Json(FromPriceResponse {
        slug: product.slug,
        from_cents: resolved.cents,
        source: resolved.source,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub slug: String,
    pub min_price_cents: Option<i64>,
    pub computed_at: Option<DateTime<Utc>>,
}

/// `POST /admin/products/:slug/refresh-min-price`
///
/// Synchronous variant of the background refresh, for one product.
pub async fn refresh(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .products
        .get_by_slug(&slug)
        .await?
        .ok_or_else(ApiError::product_not_found)?;
    let cache = refresh_min_price(state.products.as_ref(), &product).await?;

    info!(
        subsystem = "api",
        component = "products",
        op = "refresh",
        slug = %product.slug,
        total_cents = cache.map(|c| c.cents),
        "Min-price cache refreshed"
    );
    Ok(Json(RefreshResponse {
        slug: product.slug,
        min_price_cents: cache.map(|c| c.cents),
        computed_at: cache.map(|c| c.computed_at),
    }))
}
