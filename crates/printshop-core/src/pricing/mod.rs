//! The pricing/quote engine.
//!
//! - [`validator`]: collects every shape problem in a raw preset config
//! - [`config`]: typed per-model configs, built only through the validator
//! - [`tiers`]: tier selection, addon pricing and one-shot rounding
//! - [`area`], [`qty`], [`options`]: one calculator per pricing model
//! - [`engine`]: `quote_product`, the single checkout entry point
//! - [`from_price`]: display-only "from $X" resolution for listings
//! - [`anomalies`]: offline sweep for defective presets and unquotable products
//!
//! Everything here is synchronous and pure. Storage and refresh live in
//! other crates.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::models::QuoteBreakdown;

pub mod anomalies;
pub mod area;
pub mod config;
pub mod engine;
pub mod from_price;
pub mod options;
pub mod qty;
pub mod tiers;
pub mod validator;

pub use anomalies::{scan, AnomalyKind, AnomalyReport, PresetAnomaly, UnquotableProduct};
pub use config::{
    AddonDef, AreaTier, AreaTieredConfig, CommonConfig, PricingConfig, ProductOptions,
    QtyOptionsConfig, QtyTier, QtyTieredConfig, RateMultiplier, SizeEntry, SizeOption, SizeTier,
};
pub use engine::quote_product;
pub use from_price::{
    compute_from_price, live_from_price, FromPrice, FromPriceResolver, FromPriceSource,
    FromPriceStrategy,
};
pub use validator::{validate, FieldError, ValidationReport};

/// A quote request after field validation: positive quantity, paired
/// positive dimensions, resolved accessory quantities.
#[derive(Debug, Clone)]
pub struct NormalizedRequest<'a> {
    pub quantity: u32,
    pub dimensions: Option<(f64, f64)>,
    pub material: Option<&'a str>,
    pub size_label: Option<&'a str>,
    pub options: &'a BTreeMap<String, JsonValue>,
    pub accessories: Vec<(&'a str, u32)>,
}

/// What a calculator hands back to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub breakdown: QuoteBreakdown,
    pub total_cents: i64,
    pub area_sqft: Option<f64>,
    pub size_label: Option<String>,
    pub material: Option<String>,
    pub multiplier: f64,
}
