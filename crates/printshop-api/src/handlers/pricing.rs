//! Quote and anomaly endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use printshop_core::{quote_product, scan, Product, QuoteRequest};

use crate::error::ApiError;
use crate::state::AppState;

/// Load an active product by slug, or 404.
pub(crate) async fn active_product(state: &AppState, slug: &str) -> Result<Product, ApiError> {
    state
        .products
        .get_by_slug(slug)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(ApiError::product_not_found)
}

/// `POST /pricing/calculate`
pub async fn calculate(
    State(state): State<AppState>,
    body: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let product = active_product(&state, &request.slug).await?;
    let quote = quote_product(&product, &request)?;

    info!(
        subsystem = "api",
        component = "pricing",
        op = "quote",
        slug = %product.slug,
        total_cents = quote.total_cents,
        "Quote served"
    );
    Ok(Json(quote))
}

/// `GET /admin/pricing/anomalies`
pub async fn anomalies(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let presets = state.presets.list(false).await?;
    let products = state.products.list_active().await?;
    Ok(Json(scan(&presets, &products)))
}
