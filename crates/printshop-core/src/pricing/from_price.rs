//! "From $X" resolution for catalog listings.
//!
//! The precedence is an explicit, ordered list of named strategies. The first
//! one that yields a positive value wins. Nothing here writes to the cache;
//! refreshing `minPrice` is the job of the out-of-band refresher, which calls
//! [`live_from_price`] and persists the result.

use std::fmt;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::defaults::{FROM_PRICE_HEIGHT_IN, FROM_PRICE_WIDTH_IN};
use crate::error::{Error, Result};
use crate::models::{Product, QuoteRequest};
use crate::pricing::config::{PricingConfig, ProductOptions};
use crate::pricing::engine::quote_product;
use crate::pricing::options::offered_sizes;

// =============================================================================
// TYPES
// =============================================================================

/// Which step of the chain produced a from-price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FromPriceSource {
    DisplayOverride,
    CachedMinPrice,
    LiveQuote,
    BasePrice,
    /// No step produced a usable value; `cents` is 0.
    None,
}

impl fmt::Display for FromPriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisplayOverride => write!(f, "display_override"),
            Self::CachedMinPrice => write!(f, "cached_min_price"),
            Self::LiveQuote => write!(f, "live_quote"),
            Self::BasePrice => write!(f, "base_price"),
            Self::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromPrice {
    pub cents: i64,
    pub source: FromPriceSource,
}

/// One step of the from-price chain.
///
/// Returning `None` (or a non-positive value) passes to the next strategy.
pub trait FromPriceStrategy: Send + Sync {
    fn source(&self) -> FromPriceSource;
    fn resolve(&self, product: &Product) -> Option<i64>;
}

// =============================================================================
// STRATEGIES
// =============================================================================

/// Admin-curated `displayFromPrice`. Always wins when set.
pub struct DisplayOverride;

impl FromPriceStrategy for DisplayOverride {
    fn source(&self) -> FromPriceSource {
        FromPriceSource::DisplayOverride
    }

    fn resolve(&self, product: &Product) -> Option<i64> {
        product.display_from_price
    }
}

/// The refresher-maintained `minPrice` cache.
pub struct CachedMinPrice {
    /// Entries older than this are skipped. `None` trusts any entry.
    pub max_age: Option<Duration>,
}

impl FromPriceStrategy for CachedMinPrice {
    fn source(&self) -> FromPriceSource {
        FromPriceSource::CachedMinPrice
    }

    fn resolve(&self, product: &Product) -> Option<i64> {
        let cache = product.min_price?;
        if let Some(max_age) = self.max_age {
            if Utc::now() - cache.computed_at > max_age {
                trace!(
                    subsystem = "pricing",
                    component = "from_price",
                    slug = %product.slug,
                    "Cached minPrice is stale, skipping"
                );
                return None;
            }
        }
        Some(cache.cents)
    }
}

/// Quote a minimal configuration through the engine. Failures are absorbed.
pub struct LiveQuote;

impl FromPriceStrategy for LiveQuote {
    fn source(&self) -> FromPriceSource {
        FromPriceSource::LiveQuote
    }

    fn resolve(&self, product: &Product) -> Option<i64> {
        live_from_price(product)
    }
}

/// Legacy flat `basePrice`.
pub struct LegacyBasePrice;

impl FromPriceStrategy for LegacyBasePrice {
    fn source(&self) -> FromPriceSource {
        FromPriceSource::BasePrice
    }

    fn resolve(&self, product: &Product) -> Option<i64> {
        Some(product.base_price)
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

pub struct FromPriceResolver {
    strategies: Vec<Box<dyn FromPriceStrategy>>,
}

impl FromPriceResolver {
    pub fn new(strategies: Vec<Box<dyn FromPriceStrategy>>) -> Self {
        Self { strategies }
    }

    /// Override, cache, live quote, base price.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(DisplayOverride),
            Box::new(CachedMinPrice { max_age: None }),
            Box::new(LiveQuote),
            Box::new(LegacyBasePrice),
        ])
    }

    /// Standard chain, but cache entries older than `max_age` fall through to
    /// the live quote.
    pub fn with_cache_max_age(max_age: Duration) -> Self {
        Self::new(vec![
            Box::new(DisplayOverride),
            Box::new(CachedMinPrice {
                max_age: Some(max_age),
            }),
            Box::new(LiveQuote),
            Box::new(LegacyBasePrice),
        ])
    }

    pub fn sources(&self) -> Vec<FromPriceSource> {
        self.strategies.iter().map(|s| s.source()).collect()
    }

    pub fn resolve(&self, product: &Product) -> FromPrice {
        for strategy in &self.strategies {
            if let Some(cents) = strategy.resolve(product).filter(|c| *c > 0) {
                return FromPrice {
                    cents,
                    source: strategy.source(),
                };
            }
        }
        FromPrice {
            cents: 0,
            source: FromPriceSource::None,
        }
    }
}

impl Default for FromPriceResolver {
    fn default() -> Self {
        Self::standard()
    }
}

/// Representative low-end price for listings, in cents. 0 when nothing applies.
pub fn compute_from_price(product: &Product) -> i64 {
    FromPriceResolver::standard().resolve(product).cents
}

// =============================================================================
// LIVE COMPUTATION
// =============================================================================

/// Build the cheapest realistic request for `product`'s preset.
pub fn minimal_request(product: &Product) -> Result<QuoteRequest> {
    let preset = product.pricing_preset.as_ref().ok_or_else(|| {
        Error::Config(format!("product '{}' has no pricing preset", product.slug))
    })?;
    let config = PricingConfig::from_preset(preset)?;
    let options = ProductOptions::from_value(&product.options_config)?;

    let request = match &config {
        PricingConfig::QtyTiered(cfg) => {
            let first = cfg
                .tiers
                .first()
                .ok_or_else(|| Error::Config("QTY_TIERED preset has no tiers".to_string()))?;
            QuoteRequest::new(&product.slug, i64::from(first.min_qty.max(1)))
        }
        PricingConfig::AreaTiered(_) => {
            let smallest_size = options
                .sizes
                .iter()
                .filter_map(|s| s.dimensions())
                .min_by(|a, b| (a.0 * a.1).total_cmp(&(b.0 * b.1)));
            let (width_in, height_in) = smallest_size.unwrap_or_else(|| {
                (
                    product
                        .min_width_in
                        .filter(|w| *w > 0.0)
                        .unwrap_or(FROM_PRICE_WIDTH_IN),
                    product
                        .min_height_in
                        .filter(|h| *h > 0.0)
                        .unwrap_or(FROM_PRICE_HEIGHT_IN),
                )
            });
            QuoteRequest::new(&product.slug, 1).with_dimensions(width_in, height_in)
        }
        PricingConfig::QtyOptions(cfg) => {
            let size = offered_sizes(cfg, &options).into_iter().next().ok_or_else(|| {
                Error::Config("QTY_OPTIONS preset offers no sizes for this product".to_string())
            })?;
            let smallest = size
                .tiers
                .first()
                .map(|t| t.qty.ceil().max(1.0) as i64)
                .unwrap_or(1);
            QuoteRequest::new(&product.slug, smallest).with_size_label(&size.label)
        }
    };
    Ok(request)
}

/// Quote the minimal configuration. Any failure is logged and yields `None`.
pub fn live_from_price(product: &Product) -> Option<i64> {
    let result = minimal_request(product).and_then(|req| quote_product(product, &req));
    match result {
        Ok(quote) if quote.total_cents > 0 => Some(quote.total_cents),
        Ok(_) => None,
        Err(e) => {
            warn!(
                subsystem = "pricing",
                component = "from_price",
                op = "live_quote",
                slug = %product.slug,
                error = %e,
                "Live from-price computation failed"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MinPriceCache, PricingPreset};
    use serde_json::json;
    use uuid::Uuid;

    fn preset(model: &str, config: serde_json::Value) -> PricingPreset {
        PricingPreset {
            id: Uuid::nil(),
            key: "test".to_string(),
            name: "Test".to_string(),
            model: model.to_string(),
            config,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cheap_qty_preset() -> PricingPreset {
        // Quotes to exactly 100 cents at the first tier.
        preset(
            "QTY_TIERED",
            json!({ "tiers": [{ "minQty": 10, "unitPrice": 0.10 }, { "minQty": 100, "unitPrice": 0.05 }] }),
        )
    }

    #[test]
    fn test_override_beats_cache_and_live() {
        let mut product = Product::new("decal", 300).with_preset(cheap_qty_preset());
        product.display_from_price = Some(1999);
        product.min_price = Some(MinPriceCache::new(500));

        assert_eq!(compute_from_price(&product), 1999);
        assert_eq!(
            FromPriceResolver::standard().resolve(&product).source,
            FromPriceSource::DisplayOverride
        );
    }

    #[test]
    fn test_zero_override_falls_through_to_cache() {
        let mut product = Product::new("decal", 300).with_preset(cheap_qty_preset());
        product.display_from_price = Some(0);
        product.min_price = Some(MinPriceCache::new(500));

        let resolved = FromPriceResolver::standard().resolve(&product);
        assert_eq!(resolved.cents, 500);
        assert_eq!(resolved.source, FromPriceSource::CachedMinPrice);
    }

    #[test]
    fn test_live_quote_when_no_cache() {
        let product = Product::new("decal", 300).with_preset(cheap_qty_preset());
        let resolved = FromPriceResolver::standard().resolve(&product);
        assert_eq!(resolved.cents, 100);
        assert_eq!(resolved.source, FromPriceSource::LiveQuote);
    }

    #[test]
    fn test_stale_cache_skipped_with_max_age() {
        let mut product = Product::new("decal", 300).with_preset(cheap_qty_preset());
        product.min_price = Some(MinPriceCache {
            cents: 500,
            computed_at: Utc::now() - Duration::hours(2),
        });

        let fresh_only = FromPriceResolver::with_cache_max_age(Duration::hours(1));
        assert_eq!(fresh_only.resolve(&product).source, FromPriceSource::LiveQuote);
        assert_eq!(FromPriceResolver::standard().resolve(&product).cents, 500);
    }

    #[test]
    fn test_broken_preset_degrades_to_base_price() {
        let product =
            Product::new("decal", 300).with_preset(preset("QTY_TIERED", json!({ "tiers": [] })));
        let resolved = FromPriceResolver::standard().resolve(&product);
        assert_eq!(resolved.cents, 300);
        assert_eq!(resolved.source, FromPriceSource::BasePrice);
    }

    #[test]
    fn test_nothing_usable_returns_zero() {
        let product = Product::new("decal", 0);
        let resolved = FromPriceResolver::standard().resolve(&product);
        assert_eq!(resolved.cents, 0);
        assert_eq!(resolved.source, FromPriceSource::None);
    }

    #[test]
    fn test_minimal_area_request_defaults_to_poster_size() {
        let product = Product::new("banner", 0).with_preset(preset(
            "AREA_TIERED",
            json!({ "tiers": [{ "upToSqft": 4, "rate": 2.5 }, { "upToSqft": 12, "rate": 2.0 }] }),
        ));
        let req = minimal_request(&product).unwrap();
        assert_eq!(req.quantity, 1);
        assert_eq!((req.width_in, req.height_in), (Some(24.0), Some(36.0)));
        // 6 sqft at 2.00
        assert_eq!(live_from_price(&product), Some(1200));
    }

    #[test]
    fn test_minimal_area_request_prefers_product_minimums() {
        let mut product = Product::new("banner", 0).with_preset(preset(
            "AREA_TIERED",
            json!({ "tiers": [{ "upToSqft": 4, "rate": 2.5 }] }),
        ));
        product.min_width_in = Some(12.0);
        let req = minimal_request(&product).unwrap();
        assert_eq!((req.width_in, req.height_in), (Some(12.0), Some(36.0)));

        let product = product.with_options_config(json!({
            "sizes": [
                { "label": "18x24", "widthIn": 18, "heightIn": 24 },
                { "label": "12x18", "widthIn": 12, "heightIn": 18 }
            ]
        }));
        let req = minimal_request(&product).unwrap();
        assert_eq!((req.width_in, req.height_in), (Some(12.0), Some(18.0)));
    }

    #[test]
    fn test_minimal_options_request_prefers_product_sizes() {
        let product = Product::new("cards", 0)
            .with_preset(preset(
                "QTY_OPTIONS",
                json!({ "sizes": [
                    { "label": "3.5x2", "tiers": [{ "qty": 250, "unitPrice": 0.12 }] },
                    { "label": "4x6", "tiers": [{ "qty": 100, "unitPrice": 0.45 }] }
                ] }),
            ))
            .with_options_config(json!({ "sizes": ["4x6"] }));

        let req = minimal_request(&product).unwrap();
        assert_eq!(req.size_label.as_deref(), Some("4x6"));
        assert_eq!(req.quantity, 100);
        assert_eq!(live_from_price(&product), Some(4500));
    }

    #[test]
    fn test_resolver_order_is_visible() {
        assert_eq!(
            FromPriceResolver::default().sources(),
            vec![
                FromPriceSource::DisplayOverride,
                FromPriceSource::CachedMinPrice,
                FromPriceSource::LiveQuote,
                FromPriceSource::BasePrice,
            ]
        );
    }
}
