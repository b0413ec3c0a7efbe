//! Storage traits the pricing surface depends on.
//!
//! Postgres implementations live in `printshop-db`; [`crate::memory`] holds an
//! in-process implementation for tests and local tooling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// PRESET REPOSITORY
// =============================================================================

/// Request for creating (or idempotently re-creating) a preset by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePresetRequest {
    pub key: String,
    pub name: String,
    pub model: PricingModel,
    pub config: JsonValue,
    /// Defaults to active.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial preset edit. The model is immutable once created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePresetRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Option<JsonValue>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Repository for pricing presets. Every config write is validated first.
#[async_trait]
pub trait PresetRepository: Send + Sync {
    /// Insert or update by `key`. Changing the model of an existing key is a
    /// validation error.
    async fn upsert(&self, req: CreatePresetRequest) -> Result<PricingPreset>;

    /// Get a preset by key.
    async fn get_by_key(&self, key: &str) -> Result<Option<PricingPreset>>;

    /// List presets ordered by key.
    async fn list(&self, active_only: bool) -> Result<Vec<PricingPreset>>;

    /// Apply a partial edit, validating any new config against the stored model.
    async fn update(&self, key: &str, req: UpdatePresetRequest) -> Result<PricingPreset>;
}

// =============================================================================
// PRODUCT REPOSITORY
// =============================================================================

/// Read access to products with their preset attached, plus the one write the
/// pricing layer owns: the `minPrice` cache.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Lookup by slug, including inactive products.
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>>;

    async fn get(&self, id: Uuid) -> Result<Option<Product>>;

    async fn list_active(&self) -> Result<Vec<Product>>;

    /// Active products referencing the given preset.
    async fn list_active_for_preset(&self, preset_id: Uuid) -> Result<Vec<Product>>;

    /// Replace (or clear) the cached from-price.
    async fn set_min_price(&self, id: Uuid, cache: Option<MinPriceCache>) -> Result<()>;
}
