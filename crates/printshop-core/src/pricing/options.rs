//! `QTY_OPTIONS`: a fixed catalog of named sizes, each with its own
//! quantity/price table. No interpolation between sizes.

use tracing::debug;

use crate::error::{Error, Result};
use crate::pricing::config::{ProductOptions, QtyOptionsConfig, SizeEntry};
use crate::pricing::tiers::{quantity_tier, select_quantity_tier, settle};
use crate::pricing::{Calculation, NormalizedRequest};

/// Sizes the product actually offers.
///
/// When the product narrows the list, its order wins and labels the preset
/// does not define are dropped.
pub fn offered_sizes<'c>(config: &'c QtyOptionsConfig, options: &ProductOptions) -> Vec<&'c SizeEntry> {
    if options.sizes.is_empty() {
        return config.sizes.iter().collect();
    }
    options
        .sizes
        .iter()
        .filter_map(|o| config.sizes.iter().find(|s| s.label == o.label()))
        .collect()
}

fn size_dimensions(size: &SizeEntry, options: &ProductOptions) -> Option<(f64, f64)> {
    size.width_in.zip(size.height_in).or_else(|| {
        options
            .sizes
            .iter()
            .find(|o| o.label() == size.label)
            .and_then(|o| o.dimensions())
    })
}

/// Resolve the requested size by exact label, or by exact dimensions when no
/// label is given.
pub fn resolve_size<'c>(
    config: &'c QtyOptionsConfig,
    options: &ProductOptions,
    req: &NormalizedRequest<'_>,
) -> Result<&'c SizeEntry> {
    let offered = offered_sizes(config, options);
    if offered.is_empty() {
        return Err(Error::Config(
            "QTY_OPTIONS preset offers no sizes for this product".to_string(),
        ));
    }

    if let Some(label) = req.size_label {
        return offered
            .into_iter()
            .find(|s| s.label == label)
            .ok_or_else(|| Error::validation("sizeLabel", format!("unknown size '{}'", label)));
    }

    let (width_in, height_in) = req.dimensions.ok_or_else(|| {
        Error::validation(
            "sizeLabel",
            "sizeLabel or widthIn/heightIn is required for QTY_OPTIONS pricing",
        )
    })?;
    offered
        .into_iter()
        .find(|s| size_dimensions(s, options) == Some((width_in, height_in)))
        .ok_or_else(|| {
            Error::validation(
                "widthIn",
                format!("no size matches {}x{} in", width_in, height_in),
            )
        })
}

pub fn calculate(
    config: &QtyOptionsConfig,
    options: &ProductOptions,
    req: &NormalizedRequest<'_>,
) -> Result<Calculation> {
    let size = resolve_size(config, options, req)?;
    let (index, tier) = select_quantity_tier(&size.tiers, req.quantity).ok_or_else(|| {
        Error::Config(format!("QTY_OPTIONS size '{}' has no tiers", size.label))
    })?;

    debug!(
        subsystem = "pricing",
        component = "options",
        size = %size.label,
        quantity = req.quantity,
        tier_index = index,
        unit_price = tier.unit_price,
        "Size tier selected"
    );

    let mut calc = settle(
        tier.unit_price,
        quantity_tier(index, tier),
        req,
        &config.common,
    );
    calc.size_label = Some(size.label.clone());
    Ok(calc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricingModel;
    use crate::pricing::PricingConfig;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn config() -> QtyOptionsConfig {
        match PricingConfig::parse(
            PricingModel::QtyOptions,
            &json!({
                "sizes": [
                    { "label": "3.5x2", "widthIn": 3.5, "heightIn": 2,
                      "tiers": [{ "qty": 250, "unitPrice": 0.12 }, { "qty": 500, "unitPrice": 0.08 }] },
                    { "label": "4x6",
                      "tiers": [{ "qty": 100, "unitPrice": 0.45 }] }
                ],
                "fileFee": 10,
                "accessories": [
                    { "id": "card-box", "type": "flat", "price": 6 },
                    { "id": "sleeve", "type": "per_unit", "price": 0.02 }
                ]
            }),
        )
        .unwrap()
        {
            PricingConfig::QtyOptions(cfg) => cfg,
            _ => unreachable!(),
        }
    }

    fn req<'a>(
        options: &'a BTreeMap<String, serde_json::Value>,
        label: Option<&'a str>,
        dims: Option<(f64, f64)>,
        quantity: u32,
    ) -> NormalizedRequest<'a> {
        NormalizedRequest {
            quantity,
            dimensions: dims,
            material: None,
            size_label: label,
            options,
            accessories: vec![],
        }
    }

    #[test]
    fn test_size_label_lookup() {
        let options = BTreeMap::new();
        let calc = calculate(
            &config(),
            &ProductOptions::default(),
            &req(&options, Some("3.5x2"), None, 500),
        )
        .unwrap();
        // 0.08 * 500 + 10
        assert_eq!(calc.total_cents, 5000);
        assert_eq!(calc.size_label.as_deref(), Some("3.5x2"));
    }

    #[test]
    fn test_unknown_label_is_error_not_default() {
        let options = BTreeMap::new();
        let err = calculate(
            &config(),
            &ProductOptions::default(),
            &req(&options, Some("3.5X2"), None, 500),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "sizeLabel"));
    }

    #[test]
    fn test_dimension_match() {
        let options = BTreeMap::new();
        let calc = calculate(
            &config(),
            &ProductOptions::default(),
            &req(&options, None, Some((3.5, 2.0)), 250),
        )
        .unwrap();
        assert_eq!(calc.size_label.as_deref(), Some("3.5x2"));
        assert_eq!(calc.total_cents, 4000);
    }

    #[test]
    fn test_dimension_mismatch_does_not_interpolate() {
        let options = BTreeMap::new();
        let err = calculate(
            &config(),
            &ProductOptions::default(),
            &req(&options, None, Some((3.5, 2.5)), 250),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "widthIn"));
    }

    #[test]
    fn test_neither_label_nor_dimensions() {
        let options = BTreeMap::new();
        let err = calculate(
            &config(),
            &ProductOptions::default(),
            &req(&options, None, None, 250),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "sizeLabel"));
    }

    #[test]
    fn test_product_narrowing_hides_sizes() {
        let options = BTreeMap::new();
        let product_options = ProductOptions::from_value(&json!({ "sizes": ["4x6"] })).unwrap();
        let cfg = config();

        let offered = offered_sizes(&cfg, &product_options);
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0].label, "4x6");

        let err = calculate(&cfg, &product_options, &req(&options, Some("3.5x2"), None, 500))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_override_dimensions_used_for_matching() {
        let options = BTreeMap::new();
        let product_options = ProductOptions::from_value(&json!({
            "sizes": [{ "label": "4x6", "widthIn": 4, "heightIn": 6 }]
        }))
        .unwrap();
        let calc = calculate(
            &config(),
            &product_options,
            &req(&options, None, Some((4.0, 6.0)), 100),
        )
        .unwrap();
        assert_eq!(calc.size_label.as_deref(), Some("4x6"));
    }

    #[test]
    fn test_accessories_summed_on_top() {
        let options = BTreeMap::new();
        let mut request = req(&options, Some("3.5x2"), None, 500);
        request.accessories = vec![("card-box", 2), ("sleeve", 500), ("lanyard", 3)];

        let calc = calculate(&config(), &ProductOptions::default(), &request).unwrap();

        assert_eq!(calc.breakdown.accessories.len(), 2);
        // 40 + 6 (flat, once) + 10 (0.02 * 500) + 10 file fee
        assert_eq!(calc.total_cents, 6600);
    }
}
