//! `AREA_TIERED`: large-format goods priced per square foot.
//!
//! The tier is chosen from the area of a single piece, so a larger piece
//! unlocks a cheaper rate regardless of how many copies are ordered.
//! Material and finishing multipliers scale every tier's rate uniformly
//! before the lookup.

use tracing::debug;

use crate::defaults::SQIN_PER_SQFT;
use crate::error::{Error, Result};
use crate::models::{AppliedTier, Product, TierBasis};
use crate::pricing::config::{AreaTieredConfig, ProductOptions};
use crate::pricing::tiers::{is_selected, select_area_tier, settle};
use crate::pricing::{Calculation, NormalizedRequest};

pub fn calculate(
    config: &AreaTieredConfig,
    product: &Product,
    options: &ProductOptions,
    req: &NormalizedRequest<'_>,
) -> Result<Calculation> {
    let (width_in, height_in) = req.dimensions.ok_or_else(|| {
        Error::validation(
            "widthIn",
            "widthIn and heightIn are required for AREA_TIERED pricing",
        )
    })?;

    if let Some(min) = product.min_width_in.filter(|m| *m > 0.0) {
        if width_in < min {
            return Err(Error::validation(
                "widthIn",
                format!("must be at least {} in for this product", min),
            ));
        }
    }
    if let Some(min) = product.min_height_in.filter(|m| *m > 0.0) {
        if height_in < min {
            return Err(Error::validation(
                "heightIn",
                format!("must be at least {} in for this product", min),
            ));
        }
    }

    let area_sqft = (width_in * height_in) / SQIN_PER_SQFT;

    let (material, material_multiplier) = match req.material {
        Some(alias) if !options.materials.is_empty() => {
            let found = options.material(alias).ok_or_else(|| {
                Error::validation("material", format!("unknown material '{}'", alias))
            })?;
            (Some(found.id.clone()), found.multiplier)
        }
        Some(alias) => (Some(alias.to_string()), 1.0),
        None => (None, 1.0),
    };
    let finishing_multiplier: f64 = options
        .finishings
        .iter()
        .filter(|f| req.options.get(&f.id).is_some_and(is_selected))
        .map(|f| f.multiplier)
        .product();
    let multiplier = material_multiplier * finishing_multiplier;

    let (index, tier) = select_area_tier(&config.tiers, area_sqft)
        .ok_or_else(|| Error::Config("AREA_TIERED preset has no tiers".to_string()))?;
    let rate = tier.rate * multiplier;
    let unit_price = rate * area_sqft;

    debug!(
        subsystem = "pricing",
        component = "area",
        area_sqft,
        tier_index = index,
        rate,
        multiplier,
        "Area tier selected"
    );

    let applied = AppliedTier {
        index,
        basis: TierBasis::AreaSqft,
        threshold: tier.up_to_sqft,
        price: rate,
    };
    let mut calc = settle(unit_price, applied, req, &config.common);
    calc.area_sqft = Some(area_sqft);
    calc.material = material;
    calc.multiplier = multiplier;
    Ok(calc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricingModel;
    use crate::pricing::PricingConfig;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn config() -> AreaTieredConfig {
        let parsed = PricingConfig::parse(
            PricingModel::AreaTiered,
            &json!({
                "tiers": [{ "upToSqft": 4, "rate": 2.5 }, { "upToSqft": 12, "rate": 2.0 }],
                "fileFee": 5,
                "minimumPrice": 25
            }),
        )
        .unwrap();
        match parsed {
            PricingConfig::AreaTiered(cfg) => cfg,
            _ => unreachable!(),
        }
    }

    fn request<'a>(
        options: &'a BTreeMap<String, serde_json::Value>,
        dims: Option<(f64, f64)>,
        quantity: u32,
    ) -> NormalizedRequest<'a> {
        NormalizedRequest {
            quantity,
            dimensions: dims,
            material: None,
            size_label: None,
            options,
            accessories: vec![],
        }
    }

    #[test]
    fn test_single_piece_floored_to_minimum() {
        let options = BTreeMap::new();
        let product = Product::new("banner", 0);
        let calc = calculate(
            &config(),
            &product,
            &ProductOptions::default(),
            &request(&options, Some((24.0, 36.0)), 1),
        )
        .unwrap();

        assert_eq!(calc.area_sqft, Some(6.0));
        assert_eq!(calc.breakdown.tier.index, 1);
        assert!((calc.breakdown.subtotal - 17.0).abs() < 1e-9);
        assert_eq!(calc.total_cents, 2500);
    }

    #[test]
    fn test_tier_uses_per_unit_area_not_total() {
        let options = BTreeMap::new();
        let product = Product::new("banner", 0);
        // 12x12 = 1 sqft per piece; 20 pieces is 20 sqft total but still tier 0.
        let calc = calculate(
            &config(),
            &product,
            &ProductOptions::default(),
            &request(&options, Some((12.0, 12.0)), 20),
        )
        .unwrap();

        assert_eq!(calc.breakdown.tier.index, 0);
        // 2.5 * 1 * 20 + 5
        assert_eq!(calc.total_cents, 5500);
    }

    #[test]
    fn test_missing_dimensions_is_validation_error() {
        let options = BTreeMap::new();
        let product = Product::new("banner", 0);
        let err = calculate(
            &config(),
            &product,
            &ProductOptions::default(),
            &request(&options, None, 1),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "widthIn"));
    }

    #[test]
    fn test_below_product_minimum_rejected() {
        let options = BTreeMap::new();
        let mut product = Product::new("banner", 0);
        product.min_height_in = Some(18.0);
        let err = calculate(
            &config(),
            &product,
            &ProductOptions::default(),
            &request(&options, Some((24.0, 12.0)), 1),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "heightIn"));
    }

    #[test]
    fn test_material_and_finishing_multipliers() {
        let mut options = BTreeMap::new();
        options.insert("uv-coat".to_string(), json!(true));
        let product_options = ProductOptions::from_value(&json!({
            "materials": [{ "id": "vinyl", "multiplier": 1.5 }],
            "finishings": [{ "id": "uv-coat", "multiplier": 1.2 }]
        }))
        .unwrap();
        let product = Product::new("banner", 0);
        let mut req = request(&options, Some((48.0, 36.0)), 2);
        req.material = Some("VINYL");

        let calc = calculate(&config(), &product, &product_options, &req).unwrap();

        // 12 sqft -> rate 2.0 * 1.8 = 3.6; 3.6 * 12 * 2 + 5 = 91.40
        assert!((calc.multiplier - 1.8).abs() < 1e-9);
        assert_eq!(calc.material.as_deref(), Some("vinyl"));
        assert_eq!(calc.total_cents, 9140);
    }

    #[test]
    fn test_unknown_material_rejected_when_product_lists_materials() {
        let options = BTreeMap::new();
        let product_options =
            ProductOptions::from_value(&json!({ "materials": [{ "id": "vinyl" }] })).unwrap();
        let product = Product::new("banner", 0);
        let mut req = request(&options, Some((24.0, 36.0)), 1);
        req.material = Some("mesh");

        let err = calculate(&config(), &product, &product_options, &req).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "material"));
    }
}
