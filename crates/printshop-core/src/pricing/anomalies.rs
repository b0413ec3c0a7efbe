//! Offline sweep for defective presets and unquotable products.
//!
//! Works on the raw stored JSON rather than the typed config, so a preset the
//! parser would reject is still inspected and reported instead of aborting
//! the scan.

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

use crate::models::{PricingModel, PricingPreset, Product};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyKind {
    UnknownModel,
    NoPriceSeries {
        reason: String,
    },
    NonPositivePrice {
        series: String,
        index: usize,
        value: f64,
    },
    /// A higher threshold charges more per unit than a lower one.
    NonMonotonic {
        series: String,
        index: usize,
        previous: f64,
        current: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetAnomaly {
    pub preset_id: Uuid,
    pub preset_key: String,
    pub preset_name: String,
    pub model: String,
    #[serde(flatten)]
    pub kind: AnomalyKind,
}

/// An active product with no preset and no usable legacy price.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnquotableProduct {
    pub product_id: Uuid,
    pub slug: String,
    pub base_price: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    pub presets_scanned: usize,
    pub products_scanned: usize,
    pub preset_anomalies: Vec<PresetAnomaly>,
    pub unquotable_products: Vec<UnquotableProduct>,
}

impl AnomalyReport {
    pub fn is_clean(&self) -> bool {
        self.preset_anomalies.is_empty() && self.unquotable_products.is_empty()
    }

    pub fn total(&self) -> usize {
        self.preset_anomalies.len() + self.unquotable_products.len()
    }
}

/// A named price series ordered by ascending threshold.
struct Series {
    name: String,
    prices: Vec<f64>,
}

fn number(value: &JsonValue, key: &str) -> Option<f64> {
    value.get(key).and_then(JsonValue::as_f64)
}

/// Pull `(threshold, price)` pairs out of a raw tier array, sorted by threshold.
fn tier_series(tiers: Option<&JsonValue>, threshold_key: &str, price_key: &str) -> Vec<f64> {
    let mut points: Vec<(f64, f64)> = tiers
        .and_then(JsonValue::as_array)
        .map(|tiers| {
            tiers
                .iter()
                .filter_map(|t| Some((number(t, threshold_key)?, number(t, price_key)?)))
                .collect()
        })
        .unwrap_or_default();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points.into_iter().map(|(_, price)| price).collect()
}

fn extract_series(model: PricingModel, config: &JsonValue) -> Vec<Series> {
    match model {
        PricingModel::AreaTiered => vec![Series {
            name: "tiers".to_string(),
            prices: tier_series(config.get("tiers"), "upToSqft", "rate"),
        }],
        PricingModel::QtyTiered => vec![Series {
            name: "tiers".to_string(),
            prices: tier_series(config.get("tiers"), "minQty", "unitPrice"),
        }],
        PricingModel::QtyOptions => config
            .get("sizes")
            .and_then(JsonValue::as_array)
            .map(|sizes| {
                sizes
                    .iter()
                    .enumerate()
                    .map(|(i, size)| Series {
                        name: match size.get("label").and_then(JsonValue::as_str) {
                            Some(label) => format!("sizes[{}] ({})", i, label),
                            None => format!("sizes[{}]", i),
                        },
                        prices: tier_series(size.get("tiers"), "qty", "unitPrice"),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn inspect_preset(preset: &PricingPreset) -> Vec<AnomalyKind> {
    let Ok(model) = preset.pricing_model() else {
        return vec![AnomalyKind::UnknownModel];
    };

    let series: Vec<Series> = extract_series(model, &preset.config)
        .into_iter()
        .filter(|s| !s.prices.is_empty())
        .collect();
    if series.is_empty() {
        let reason = match model {
            PricingModel::QtyOptions => "no size has numeric qty/unitPrice tiers",
            PricingModel::QtyTiered => "no tier has numeric minQty/unitPrice",
            PricingModel::AreaTiered => "no tier has numeric upToSqft/rate",
        };
        return vec![AnomalyKind::NoPriceSeries {
            reason: reason.to_string(),
        }];
    }

    let mut found = Vec::new();
    for s in &series {
        for (index, value) in s.prices.iter().enumerate() {
            if *value <= 0.0 {
                found.push(AnomalyKind::NonPositivePrice {
                    series: s.name.clone(),
                    index,
                    value: *value,
                });
            }
        }
        for (index, pair) in s.prices.windows(2).enumerate() {
            if pair[1] > pair[0] {
                found.push(AnomalyKind::NonMonotonic {
                    series: s.name.clone(),
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }
    }
    found
}

/// Scan active presets and products. Read-only; never fails as a whole.
pub fn scan(presets: &[PricingPreset], products: &[Product]) -> AnomalyReport {
    let mut report = AnomalyReport::default();

    for preset in presets.iter().filter(|p| p.is_active) {
        report.presets_scanned += 1;
        for kind in inspect_preset(preset) {
            report.preset_anomalies.push(PresetAnomaly {
                preset_id: preset.id,
                preset_key: preset.key.clone(),
                preset_name: preset.name.clone(),
                model: preset.model.clone(),
                kind,
            });
        }
    }

    for product in products.iter().filter(|p| p.is_active) {
        report.products_scanned += 1;
        let has_preset = product.pricing_preset_id.is_some() || product.pricing_preset.is_some();
        if !has_preset && product.base_price <= 0 {
            report.unquotable_products.push(UnquotableProduct {
                product_id: product.id,
                slug: product.slug.clone(),
                base_price: product.base_price,
            });
        }
    }

    info!(
        subsystem = "pricing",
        component = "anomalies",
        op = "scan",
        presets_scanned = report.presets_scanned,
        products_scanned = report.products_scanned,
        anomaly_count = report.total(),
        "Pricing anomaly scan complete"
    );

    report
}
