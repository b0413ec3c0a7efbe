//! Domain types shared by the pricing engine, the storage layer and the API.
//!
//! Money on stored records is integer cents. Money inside preset configs and
//! quote breakdowns is dollars as `f64`, rounded to cents only once, when a
//! quote total is settled.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{Error, Result};

// =============================================================================
// PRICING PRESET
// =============================================================================

/// The pricing model a preset declares. Determines the shape of its config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingModel {
    /// Large-format goods priced per square foot with area breakpoints.
    AreaTiered,
    /// Fixed-size goods priced per unit with quantity breakpoints.
    QtyTiered,
    /// Named sizes, each with its own quantity/price table.
    QtyOptions,
}

impl PricingModel {
    pub const ALL: [PricingModel; 3] = [Self::AreaTiered, Self::QtyTiered, Self::QtyOptions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AreaTiered => "AREA_TIERED",
            Self::QtyTiered => "QTY_TIERED",
            Self::QtyOptions => "QTY_OPTIONS",
        }
    }
}

impl std::fmt::Display for PricingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PricingModel {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "AREA_TIERED" => Ok(Self::AreaTiered),
            "QTY_TIERED" => Ok(Self::QtyTiered),
            "QTY_OPTIONS" => Ok(Self::QtyOptions),
            _ => Err(format!("Unknown pricing model: {}", s)),
        }
    }
}

/// A named, reusable pricing rule set as stored.
///
/// `model` and `config` are kept raw: they are parsed into a typed
/// [`crate::pricing::PricingConfig`] every time a quote is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPreset {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub model: String,
    pub config: JsonValue,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PricingPreset {
    /// Resolve the model tag, rejecting anything outside the closed set.
    pub fn pricing_model(&self) -> Result<PricingModel> {
        self.model.parse().map_err(|_| {
            Error::Config(format!(
                "preset '{}' has unknown pricing model '{}'",
                self.key, self.model
            ))
        })
    }
}

// =============================================================================
// PRODUCT
// =============================================================================

/// Unit a product's listing price is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingUnit {
    #[default]
    PerPiece,
    PerSqft,
}

impl std::fmt::Display for PricingUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerPiece => write!(f, "per_piece"),
            Self::PerSqft => write!(f, "per_sqft"),
        }
    }
}

impl std::str::FromStr for PricingUnit {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per_piece" => Ok(Self::PerPiece),
            "per_sqft" => Ok(Self::PerSqft),
            _ => Err(format!("Invalid pricing unit: {}", s)),
        }
    }
}

/// Cached "starting from" price, written only by the refresh path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinPriceCache {
    pub cents: i64,
    pub computed_at: DateTime<Utc>,
}

impl MinPriceCache {
    pub fn new(cents: i64) -> Self {
        Self {
            cents,
            computed_at: Utc::now(),
        }
    }
}

/// The pricing-relevant view of a catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub is_active: bool,
    pub pricing_unit: PricingUnit,
    /// Legacy flat price in cents.
    pub base_price: i64,
    /// Admin override for listing pages, in cents.
    pub display_from_price: Option<i64>,
    pub min_price: Option<MinPriceCache>,
    pub min_width_in: Option<f64>,
    pub min_height_in: Option<f64>,
    /// Product-specific overrides layered on the preset (materials, sizes...).
    #[serde(default)]
    pub options_config: JsonValue,
    pub pricing_preset_id: Option<Uuid>,
    pub pricing_preset: Option<PricingPreset>,
}

impl Product {
    /// A bare active product with no preset, used by fixtures and tests.
    pub fn new(slug: impl Into<String>, base_price: i64) -> Self {
        let slug = slug.into();
        Self {
            id: Uuid::now_v7(),
            name: slug.clone(),
            slug,
            is_active: true,
            pricing_unit: PricingUnit::PerPiece,
            base_price,
            display_from_price: None,
            min_price: None,
            min_width_in: None,
            min_height_in: None,
            options_config: JsonValue::Null,
            pricing_preset_id: None,
            pricing_preset: None,
        }
    }

    /// Attach a preset, keeping the id reference in sync.
    pub fn with_preset(mut self, preset: PricingPreset) -> Self {
        self.pricing_preset_id = Some(preset.id);
        self.pricing_preset = Some(preset);
        self
    }

    pub fn with_options_config(mut self, options: JsonValue) -> Self {
        self.options_config = options;
        self
    }
}

// =============================================================================
// QUOTE REQUEST
// =============================================================================

/// A requested accessory line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorySelection {
    pub id: String,
    pub quantity: Option<i64>,
}

/// Body of `POST /pricing/calculate`. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub slug: String,
    pub quantity: i64,
    pub width_in: Option<f64>,
    pub height_in: Option<f64>,
    pub material: Option<String>,
    pub size_label: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub accessories: Vec<AccessorySelection>,
}

impl QuoteRequest {
    pub fn new(slug: impl Into<String>, quantity: i64) -> Self {
        Self {
            slug: slug.into(),
            quantity,
            width_in: None,
            height_in: None,
            material: None,
            size_label: None,
            options: BTreeMap::new(),
            accessories: Vec::new(),
        }
    }

    pub fn with_dimensions(mut self, width_in: f64, height_in: f64) -> Self {
        self.width_in = Some(width_in);
        self.height_in = Some(height_in);
        self
    }

    pub fn with_size_label(mut self, label: impl Into<String>) -> Self {
        self.size_label = Some(label.into());
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn with_accessory(mut self, id: impl Into<String>, quantity: Option<i64>) -> Self {
        self.accessories.push(AccessorySelection {
            id: id.into(),
            quantity,
        });
        self
    }
}

// =============================================================================
// QUOTE
// =============================================================================

/// How an addon or accessory price scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonPricing {
    /// Price multiplied by the billed quantity.
    PerUnit,
    /// Price applied once.
    Flat,
}

/// What a tier threshold measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierBasis {
    Quantity,
    AreaSqft,
}

/// The tier a calculator settled on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedTier {
    /// Position in the threshold-sorted tier list.
    pub index: usize,
    pub basis: TierBasis,
    /// `minQty`/`qty` for quantity tiers, `upToSqft` for area tiers.
    pub threshold: f64,
    /// `unitPrice` for quantity tiers, effective `rate` for area tiers.
    pub price: f64,
}

/// One priced addon or accessory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub label: Option<String>,
    pub pricing: AddonPricing,
    pub unit_price: f64,
    pub quantity: u32,
    pub amount: f64,
}

/// Itemized quote, dollars, unrounded except `total_cents` on [`Quote`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBreakdown {
    pub unit_price: f64,
    pub tier: AppliedTier,
    pub base_subtotal: f64,
    pub addons: Vec<LineItem>,
    pub accessories: Vec<LineItem>,
    pub file_fee: f64,
    pub subtotal: f64,
    pub minimum_price: f64,
    pub minimum_adjustment: f64,
}

/// Resolved request echo for UI display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteMeta {
    pub slug: String,
    pub quantity: u32,
    pub width_in: Option<f64>,
    pub height_in: Option<f64>,
    pub area_sqft: Option<f64>,
    pub material: Option<String>,
    pub size_label: Option<String>,
    pub multiplier: f64,
    pub tier_index: usize,
    pub pricing_unit: PricingUnit,
}

/// Result of a quote computation. `total_cents` is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub total_cents: i64,
    /// Display-only, not necessarily a whole number of cents.
    pub unit_cents: f64,
    pub currency: String,
    pub template: PricingModel,
    pub breakdown: QuoteBreakdown,
    pub meta: QuoteMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pricing_model_round_trips_tags() {
        for model in PricingModel::ALL {
            let parsed: PricingModel = model.to_string().parse().unwrap();
            assert_eq!(parsed, model);
        }
    }

    #[test]
    fn test_pricing_model_rejects_unknown_and_lowercase() {
        assert!("FLAT".parse::<PricingModel>().is_err());
        assert!("qty_tiered".parse::<PricingModel>().is_err());
    }

    #[test]
    fn test_preset_unknown_model_is_config_error() {
        let preset = PricingPreset {
            id: Uuid::nil(),
            key: "legacy".to_string(),
            name: "Legacy".to_string(),
            model: "PER_INCH".to_string(),
            config: json!({}),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        match preset.pricing_model() {
            Err(Error::Config(msg)) => assert!(msg.contains("PER_INCH")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_quote_request_deserializes_camel_case() {
        let req: QuoteRequest = serde_json::from_value(json!({
            "slug": "vinyl-banner",
            "quantity": 2,
            "widthIn": 24,
            "heightIn": 36.5,
            "options": { "grommets": true },
            "accessories": [{ "id": "stand" }]
        }))
        .unwrap();

        assert_eq!(req.quantity, 2);
        assert_eq!(req.width_in, Some(24.0));
        assert_eq!(req.height_in, Some(36.5));
        assert_eq!(req.options.get("grommets"), Some(&json!(true)));
        assert_eq!(req.accessories[0].quantity, None);
        assert!(req.size_label.is_none());
    }

    #[test]
    fn test_pricing_unit_parse() {
        assert_eq!("per_sqft".parse::<PricingUnit>(), Ok(PricingUnit::PerSqft));
        assert!("per_yard".parse::<PricingUnit>().is_err());
    }
}
