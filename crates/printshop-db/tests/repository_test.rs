//! Integration tests for the Postgres repositories.
//!
//! Run with: `DATABASE_URL=postgres://... cargo test -p printshop-db -- --ignored`

use printshop_db::pricing::PricingConfig;
use printshop_db::test_fixtures::TestDatabase;
use printshop_db::{
    CreatePresetRequest, Error, MinPriceCache, PresetRepository, PricingModel, Product,
    ProductRepository, UpdatePresetRequest,
};
use serde_json::json;

fn stickers_request(key: &str) -> CreatePresetRequest {
    CreatePresetRequest {
        key: key.to_string(),
        name: "Stickers".to_string(),
        model: PricingModel::QtyTiered,
        config: json!({ "tiers": [{ "minQty": 50, "unitPrice": 1.2 }], "minimumPrice": 25 }),
        is_active: None,
    }
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_preset_upsert_is_idempotent() {
    let test_db = TestDatabase::new().await;
    let key = test_db.unique_key("stickers");

    let first = test_db.db.presets.upsert(stickers_request(&key)).await.unwrap();
    let second = test_db.db.presets.upsert(stickers_request(&key)).await.unwrap();
    assert_eq!(first.id, second.id);
    assert!(second.is_active);

    let mut changed = stickers_request(&key);
    changed.model = PricingModel::AreaTiered;
    changed.config = json!({ "tiers": [{ "upToSqft": 4, "rate": 2 }] });
    let err = test_db.db.presets.upsert(changed).await.unwrap_err();
    assert!(matches!(err, Error::Validation { ref field, .. } if field == "model"));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_preset_update_validates_against_stored_model() {
    let test_db = TestDatabase::new().await;
    let key = test_db.unique_key("stickers");
    test_db.db.presets.upsert(stickers_request(&key)).await.unwrap();

    let err = test_db
        .db
        .presets
        .update(
            &key,
            UpdatePresetRequest {
                config: Some(json!({ "tiers": [] })),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));

    let updated = test_db
        .db
        .presets
        .update(
            &key,
            UpdatePresetRequest {
                name: Some("Die-cut stickers".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Die-cut stickers");
    assert_eq!(updated.config["minimumPrice"], 25);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_product_joins_preset_and_caches_min_price() {
    let test_db = TestDatabase::new().await;
    let key = test_db.unique_key("stickers");
    let slug = test_db.unique_key("decal");

    let preset = test_db.db.presets.upsert(stickers_request(&key)).await.unwrap();
    let mut product = Product::new(&slug, 0);
    product.pricing_preset_id = Some(preset.id);
    let id = test_db.db.products.upsert(&product).await.unwrap();

    let loaded = test_db.db.products.get_by_slug(&slug).await.unwrap().unwrap();
    assert_eq!(loaded.pricing_preset.as_ref().unwrap().key, key);
    assert!(loaded.min_price.is_none());

    let for_preset = test_db.db.products.list_active_for_preset(preset.id).await.unwrap();
    assert_eq!(for_preset.len(), 1);

    test_db
        .db
        .products
        .set_min_price(id, Some(MinPriceCache::new(2500)))
        .await
        .unwrap();
    let cached = test_db.db.products.get(id).await.unwrap().unwrap();
    assert_eq!(cached.min_price.unwrap().cents, 2500);

    test_db.db.products.set_min_price(id, None).await.unwrap();
    let cleared = test_db.db.products.get(id).await.unwrap().unwrap();
    assert!(cleared.min_price.is_none());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_concurrent_creates_with_different_models() {
    let test_db = TestDatabase::new().await;
    let key = test_db.unique_key("contested");

    let qty = stickers_request(&key);
    let mut area = stickers_request(&key);
    area.model = PricingModel::AreaTiered;
    area.config = json!({ "tiers": [{ "upToSqft": 4, "rate": 2 }] });

    let (a, b) = tokio::join!(
        test_db.db.presets.upsert(qty),
        test_db.db.presets.upsert(area)
    );

    let results = [a, b];
    let saved: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(saved.len(), 1, "exactly one create wins");
    let rejected = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(rejected, Error::Validation { field, .. } if field == "model"));

    // Whatever won, the stored config matches the stored model.
    let stored = test_db.db.presets.get_by_key(&key).await.unwrap().unwrap();
    assert_eq!(stored.model, saved[0].model);
    PricingConfig::from_preset(&stored).unwrap();

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_preset_with_null_fields_round_trips() {
    let test_db = TestDatabase::new().await;
    let key = test_db.unique_key("stickers");

    let mut req = stickers_request(&key);
    req.config = json!({
        "tiers": [{ "minQty": 1, "unitPrice": 1 }],
        "fileFee": null,
        "accessories": null
    });
    let preset = test_db.db.presets.upsert(req).await.unwrap();

    let parsed = PricingConfig::from_preset(&preset).unwrap();
    assert_eq!(parsed.common().file_fee, 0.0);

    test_db.cleanup().await;
}
