//! In-process implementation of the storage traits.
//!
//! Products are stored without their preset; the current preset is attached on
//! every read, the same way the Postgres repository joins it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{MinPriceCache, PricingPreset, Product};
use crate::pricing::PricingConfig;
use crate::traits::{CreatePresetRequest, PresetRepository, ProductRepository, UpdatePresetRequest};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    presets: RwLock<BTreeMap<String, PricingPreset>>,
    products: RwLock<BTreeMap<Uuid, Product>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a product. An embedded preset is stored alongside it.
    pub async fn insert_product(&self, mut product: Product) {
        if let Some(preset) = product.pricing_preset.take() {
            product.pricing_preset_id = Some(preset.id);
            self.presets.write().await.insert(preset.key.clone(), preset);
        }
        self.products.write().await.insert(product.id, product);
    }

    async fn attach(&self, mut product: Product) -> Product {
        if let Some(preset_id) = product.pricing_preset_id {
            product.pricing_preset = self
                .presets
                .read()
                .await
                .values()
                .find(|p| p.id == preset_id)
                .cloned();
        }
        product
    }

    async fn attach_all(&self, products: Vec<Product>) -> Vec<Product> {
        let mut out = Vec::with_capacity(products.len());
        for product in products {
            out.push(self.attach(product).await);
        }
        out
    }
}

#[async_trait]
impl PresetRepository for InMemoryStore {
    async fn upsert(&self, req: CreatePresetRequest) -> Result<PricingPreset> {
        PricingConfig::parse(req.model, &req.config)?;

        let mut presets = self.presets.write().await;
        let now = Utc::now();
        let preset = match presets.get(&req.key) {
            Some(existing) if existing.model != req.model.as_str() => {
                return Err(Error::validation(
                    "model",
                    format!(
                        "preset '{}' is {}; the model cannot be changed",
                        req.key, existing.model
                    ),
                ));
            }
            Some(existing) => PricingPreset {
                name: req.name,
                config: req.config,
                is_active: req.is_active.unwrap_or(existing.is_active),
                updated_at: now,
                ..existing.clone()
            },
            None => PricingPreset {
                id: Uuid::now_v7(),
                key: req.key,
                name: req.name,
                model: req.model.to_string(),
                config: req.config,
                is_active: req.is_active.unwrap_or(true),
                created_at: now,
                updated_at: now,
            },
        };
        presets.insert(preset.key.clone(), preset.clone());
        Ok(preset)
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<PricingPreset>> {
        Ok(self.presets.read().await.get(key).cloned())
    }

    async fn list(&self, active_only: bool) -> Result<Vec<PricingPreset>> {
        Ok(self
            .presets
            .read()
            .await
            .values()
            .filter(|p| !active_only || p.is_active)
            .cloned()
            .collect())
    }

    async fn update(&self, key: &str, req: UpdatePresetRequest) -> Result<PricingPreset> {
        let mut presets = self.presets.write().await;
        let existing = presets
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("Preset {} not found", key)))?;

        if let Some(config) = &req.config {
            PricingConfig::parse(existing.pricing_model()?, config)?;
        }
        if let Some(name) = req.name {
            existing.name = name;
        }
        if let Some(config) = req.config {
            existing.config = config;
        }
        if let Some(is_active) = req.is_active {
            existing.is_active = is_active;
        }
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let found = self
            .products
            .read()
            .await
            .values()
            .find(|p| p.slug == slug)
            .cloned();
        match found {
            Some(product) => Ok(Some(self.attach(product).await)),
            None => Ok(None),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>> {
        let found = self.products.read().await.get(&id).cloned();
        match found {
            Some(product) => Ok(Some(self.attach(product).await)),
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> Result<Vec<Product>> {
        let products: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        Ok(self.attach_all(products).await)
    }

    async fn list_active_for_preset(&self, preset_id: Uuid) -> Result<Vec<Product>> {
        let products: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.is_active && p.pricing_preset_id == Some(preset_id))
            .cloned()
            .collect();
        Ok(self.attach_all(products).await)
    }

    async fn set_min_price(&self, id: Uuid, cache: Option<MinPriceCache>) -> Result<()> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Product {} not found", id)))?;
        product.min_price = cache;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricingModel;
    use serde_json::json;

    fn create(key: &str, model: PricingModel, config: serde_json::Value) -> CreatePresetRequest {
        CreatePresetRequest {
            key: key.to_string(),
            name: key.to_string(),
            model,
            config,
            is_active: None,
        }
    }

    fn qty_config() -> serde_json::Value {
        json!({ "tiers": [{ "minQty": 50, "unitPrice": 1.2 }] })
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_key() {
        let store = InMemoryStore::new();
        let first = store
            .upsert(create("stickers", PricingModel::QtyTiered, qty_config()))
            .await
            .unwrap();
        let second = store
            .upsert(create("stickers", PricingModel::QtyTiered, qty_config()))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_model_change() {
        let store = InMemoryStore::new();
        store
            .upsert(create("stickers", PricingModel::QtyTiered, qty_config()))
            .await
            .unwrap();
        let err = store
            .upsert(create(
                "stickers",
                PricingModel::AreaTiered,
                json!({ "tiers": [{ "upToSqft": 4, "rate": 2 }] }),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "model"));
    }

    #[tokio::test]
    async fn test_update_validates_against_stored_model() {
        let store = InMemoryStore::new();
        store
            .upsert(create("stickers", PricingModel::QtyTiered, qty_config()))
            .await
            .unwrap();

        // An AREA_TIERED shape is not a valid QTY_TIERED config.
        let err = store
            .update(
                "stickers",
                UpdatePresetRequest {
                    config: Some(json!({ "tiers": [{ "upToSqft": 4, "rate": 2 }] })),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let updated = store
            .update(
                "stickers",
                UpdatePresetRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_active);
        assert!(store.list(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_key() {
        let store = InMemoryStore::new();
        let err = store
            .update("missing", UpdatePresetRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_products_see_current_preset() {
        let store = InMemoryStore::new();
        let preset = store
            .upsert(create("stickers", PricingModel::QtyTiered, qty_config()))
            .await
            .unwrap();
        let mut product = Product::new("decal", 0);
        product.pricing_preset_id = Some(preset.id);
        let id = product.id;
        store.insert_product(product).await;

        store
            .update(
                "stickers",
                UpdatePresetRequest {
                    name: Some("Stickers v2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let loaded = store.get_by_slug("decal").await.unwrap().unwrap();
        assert_eq!(loaded.pricing_preset.unwrap().name, "Stickers v2");
        assert_eq!(store.list_active_for_preset(preset.id).await.unwrap().len(), 1);

        store.set_min_price(id, Some(MinPriceCache::new(720))).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().unwrap().min_price.unwrap().cents, 720);
    }

    #[tokio::test]
    async fn test_saved_preset_with_null_fields_quotes() {
        let store = InMemoryStore::new();
        let preset = store
            .upsert(create(
                "stickers",
                PricingModel::QtyTiered,
                json!({
                    "tiers": [{ "minQty": 1, "unitPrice": 1 }],
                    "fileFee": null,
                    "addons": null
                }),
            ))
            .await
            .unwrap();
        let mut product = Product::new("decal", 0);
        product.pricing_preset_id = Some(preset.id);
        store.insert_product(product).await;

        let loaded = store.get_by_slug("decal").await.unwrap().unwrap();
        let quote =
            crate::pricing::quote_product(&loaded, &crate::models::QuoteRequest::new("decal", 10))
                .unwrap();
        assert_eq!(quote.total_cents, 1000);
    }
}
