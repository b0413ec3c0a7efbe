//! Strongly-typed preset configs and product option overrides.
//!
//! A [`PricingConfig`] can only be built through [`PricingConfig::parse`],
//! which runs the validator first. Tier lists come out sorted ascending by
//! threshold; size order is preserved because "first size" is meaningful.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::defaults::DEFAULT_MULTIPLIER;
use crate::error::{Error, Result};
use crate::models::{AddonPricing, PricingModel, PricingPreset};
use crate::pricing::validator::{self, FieldError, ValidationReport};

/// An addon or accessory a preset offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonDef {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub pricing: AddonPricing,
    pub price: f64,
}

/// Fields every model may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_fee: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub minimum_price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub addons: Vec<AddonDef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub accessories: Vec<AddonDef>,
}

// An explicit `null` reads the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaTier {
    pub up_to_sqft: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QtyTier {
    #[serde(deserialize_with = "whole_number")]
    pub min_qty: u32,
    pub unit_price: f64,
}

// `100.0` is accepted by the validator as a whole number.
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let n = f64::deserialize(deserializer)?;
    if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
        Ok(n as u32)
    } else {
        Err(de::Error::custom(format!("expected a whole number, got {}", n)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeTier {
    pub qty: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeEntry {
    pub label: String,
    #[serde(default)]
    pub width_in: Option<f64>,
    #[serde(default)]
    pub height_in: Option<f64>,
    pub tiers: Vec<SizeTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaTieredConfig {
    pub tiers: Vec<AreaTier>,
    #[serde(flatten)]
    pub common: CommonConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QtyTieredConfig {
    pub tiers: Vec<QtyTier>,
    #[serde(flatten)]
    pub common: CommonConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QtyOptionsConfig {
    pub sizes: Vec<SizeEntry>,
    #[serde(flatten)]
    pub common: CommonConfig,
}

/// A validated preset config, one variant per pricing model.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingConfig {
    AreaTiered(AreaTieredConfig),
    QtyTiered(QtyTieredConfig),
    QtyOptions(QtyOptionsConfig),
}

impl PricingConfig {
    /// Validate `raw` for `model` and build the typed variant.
    ///
    /// Every shape problem yields [`Error::InvalidConfig`]: the validator's
    /// field errors, or a single `config` error when deserialization still
    /// fails. Writes go through here so a stored config always parses.
    pub fn parse(model: PricingModel, raw: &JsonValue) -> Result<Self> {
        validator::ensure_valid(model, raw)?;

        let config = match model {
            PricingModel::AreaTiered => {
                let mut cfg: AreaTieredConfig =
                    serde_json::from_value(raw.clone()).map_err(unparsable)?;
                cfg.tiers.sort_by(|a, b| a.up_to_sqft.total_cmp(&b.up_to_sqft));
                Self::AreaTiered(cfg)
            }
            PricingModel::QtyTiered => {
                let mut cfg: QtyTieredConfig =
                    serde_json::from_value(raw.clone()).map_err(unparsable)?;
                cfg.tiers.sort_by_key(|t| t.min_qty);
                Self::QtyTiered(cfg)
            }
            PricingModel::QtyOptions => {
                let mut cfg: QtyOptionsConfig =
                    serde_json::from_value(raw.clone()).map_err(unparsable)?;
                for size in &mut cfg.sizes {
                    size.tiers.sort_by(|a, b| a.qty.total_cmp(&b.qty));
                }
                Self::QtyOptions(cfg)
            }
        };
        Ok(config)
    }

    /// Parse a stored preset. Any defect is a data problem, reported as
    /// [`Error::Config`] naming the preset.
    pub fn from_preset(preset: &PricingPreset) -> Result<Self> {
        let model = preset.pricing_model()?;
        Self::parse(model, &preset.config).map_err(|e| match e {
            Error::InvalidConfig(report) => {
                let fields: Vec<String> = report
                    .errors
                    .iter()
                    .map(|fe| format!("{} {}", fe.field, fe.message))
                    .collect();
                Error::Config(format!(
                    "preset '{}' has an invalid {} config: {}",
                    preset.key,
                    model,
                    fields.join("; ")
                ))
            }
            other => Error::Config(format!("preset '{}': {}", preset.key, other)),
        })
    }

    pub fn model(&self) -> PricingModel {
        match self {
            Self::AreaTiered(_) => PricingModel::AreaTiered,
            Self::QtyTiered(_) => PricingModel::QtyTiered,
            Self::QtyOptions(_) => PricingModel::QtyOptions,
        }
    }

    pub fn common(&self) -> &CommonConfig {
        match self {
            Self::AreaTiered(cfg) => &cfg.common,
            Self::QtyTiered(cfg) => &cfg.common,
            Self::QtyOptions(cfg) => &cfg.common,
        }
    }
}

fn unparsable(err: serde_json::Error) -> Error {
    Error::InvalidConfig(ValidationReport::from_errors(vec![FieldError::new(
        "config",
        err.to_string(),
    )]))
}

// =============================================================================
// PRODUCT OPTION OVERRIDES
// =============================================================================

/// A material or finishing that scales the area rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateMultiplier {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    DEFAULT_MULTIPLIER
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeDimensions {
    pub label: String,
    #[serde(default)]
    pub width_in: Option<f64>,
    #[serde(default)]
    pub height_in: Option<f64>,
}

/// A product-level size override: either a bare label or a label with dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeOption {
    Label(String),
    Sized(SizeDimensions),
}

impl SizeOption {
    pub fn label(&self) -> &str {
        match self {
            Self::Label(label) => label,
            Self::Sized(size) => &size.label,
        }
    }

    pub fn dimensions(&self) -> Option<(f64, f64)> {
        match self {
            Self::Label(_) => None,
            Self::Sized(size) => size.width_in.zip(size.height_in),
        }
    }
}

/// Typed view of `Product.optionsConfig`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductOptions {
    #[serde(default)]
    pub materials: Vec<RateMultiplier>,
    #[serde(default)]
    pub finishings: Vec<RateMultiplier>,
    #[serde(default)]
    pub sizes: Vec<SizeOption>,
}

impl ProductOptions {
    /// Parse a product's raw options; `null` means no overrides.
    pub fn from_value(raw: &JsonValue) -> Result<Self> {
        if raw.is_null() {
            return Ok(Self::default());
        }
        let options: Self = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Config(format!("product optionsConfig is malformed: {}", e)))?;

        if let Some(bad) = options
            .materials
            .iter()
            .chain(options.finishings.iter())
            .find(|m| !(m.multiplier > 0.0 && m.multiplier.is_finite()))
        {
            return Err(Error::Config(format!(
                "product optionsConfig multiplier for '{}' must be greater than 0",
                bad.id
            )));
        }
        Ok(options)
    }

    /// Find a material by id or label, ignoring case.
    pub fn material(&self, alias: &str) -> Option<&RateMultiplier> {
        self.materials.iter().find(|m| {
            m.id.eq_ignore_ascii_case(alias)
                || m.label.as_deref().is_some_and(|l| l.eq_ignore_ascii_case(alias))
        })
    }
}
