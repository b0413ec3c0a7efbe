//! `quote_product`: the single entry point for checkout and configurator quotes.
//!
//! Errors are never swallowed here. A checkout must see a failed quote rather
//! than a wrong or zero price.

use std::time::Instant;

use tracing::debug;

use crate::defaults::CURRENCY;
use crate::error::{Error, Result};
use crate::models::{Product, Quote, QuoteMeta, QuoteRequest};
use crate::pricing::config::{PricingConfig, ProductOptions};
use crate::pricing::{area, options, qty, NormalizedRequest};

/// Check request fields and resolve defaults.
pub fn normalize(request: &QuoteRequest) -> Result<NormalizedRequest<'_>> {
    if request.quantity <= 0 {
        return Err(Error::validation("quantity", "must be greater than 0"));
    }
    let quantity = u32::try_from(request.quantity)
        .map_err(|_| Error::validation("quantity", "is too large"))?;

    let dimensions = match (request.width_in, request.height_in) {
        (None, None) => None,
        (Some(_), None) => {
            return Err(Error::validation(
                "heightIn",
                "is required when widthIn is given",
            ))
        }
        (None, Some(_)) => {
            return Err(Error::validation(
                "widthIn",
                "is required when heightIn is given",
            ))
        }
        (Some(w), Some(h)) => {
            if !(w > 0.0 && w.is_finite()) {
                return Err(Error::validation("widthIn", "must be greater than 0"));
            }
            if !(h > 0.0 && h.is_finite()) {
                return Err(Error::validation("heightIn", "must be greater than 0"));
            }
            Some((w, h))
        }
    };

    let mut accessories = Vec::with_capacity(request.accessories.len());
    for (i, selection) in request.accessories.iter().enumerate() {
        let qty = match selection.quantity {
            None => quantity,
            Some(q) if q > 0 => u32::try_from(q).map_err(|_| {
                Error::validation(format!("accessories[{}].quantity", i), "is too large")
            })?,
            Some(_) => {
                return Err(Error::validation(
                    format!("accessories[{}].quantity", i),
                    "must be greater than 0",
                ))
            }
        };
        accessories.push((selection.id.as_str(), qty));
    }

    Ok(NormalizedRequest {
        quantity,
        dimensions,
        material: request.material.as_deref().filter(|m| !m.trim().is_empty()),
        size_label: request.size_label.as_deref().filter(|s| !s.is_empty()),
        options: &request.options,
        accessories,
    })
}

/// Quote `request` against `product`'s attached preset.
///
/// Returns [`Error::Config`] when the product is not quotable and
/// [`Error::Validation`] for bad input.
pub fn quote_product(product: &Product, request: &QuoteRequest) -> Result<Quote> {
    let start = Instant::now();

    let preset = product.pricing_preset.as_ref().ok_or_else(|| {
        Error::Config(format!("product '{}' has no pricing preset", product.slug))
    })?;
    let config = PricingConfig::from_preset(preset)?;
    let product_options = ProductOptions::from_value(&product.options_config)?;
    let req = normalize(request)?;

    let calc = match &config {
        PricingConfig::AreaTiered(cfg) => area::calculate(cfg, product, &product_options, &req)?,
        PricingConfig::QtyTiered(cfg) => qty::calculate(cfg, &req)?,
        PricingConfig::QtyOptions(cfg) => options::calculate(cfg, &product_options, &req)?,
    };

    let (width_in, height_in) = match req.dimensions {
        Some((w, h)) => (Some(w), Some(h)),
        None => (None, None),
    };
    let quote = Quote {
        total_cents: calc.total_cents,
        unit_cents: calc.total_cents as f64 / req.quantity as f64,
        currency: CURRENCY.to_string(),
        template: config.model(),
        meta: QuoteMeta {
            slug: product.slug.clone(),
            quantity: req.quantity,
            width_in,
            height_in,
            area_sqft: calc.area_sqft,
            material: calc.material,
            size_label: calc.size_label,
            multiplier: calc.multiplier,
            tier_index: calc.breakdown.tier.index,
            pricing_unit: product.pricing_unit,
        },
        breakdown: calc.breakdown,
    };

    debug!(
        subsystem = "pricing",
        component = "engine",
        op = "quote",
        slug = %product.slug,
        preset_key = %preset.key,
        model = %quote.template,
        total_cents = quote.total_cents,
        duration_ms = start.elapsed().as_millis() as u64,
        "Quote computed"
    );

    Ok(quote)
}
