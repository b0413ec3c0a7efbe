//! Shared tier, addon and rounding primitives used by every calculator.
//!
//! Tier lists are expected sorted ascending by threshold, which
//! [`PricingConfig::parse`](super::PricingConfig::parse) guarantees.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use tracing::trace;

use crate::models::{AddonPricing, AppliedTier, LineItem, QuoteBreakdown, TierBasis};
use crate::pricing::config::{AddonDef, AreaTier, CommonConfig, QtyTier, SizeTier};
use crate::pricing::{Calculation, NormalizedRequest};

/// A tier unlocked "starting at" a quantity.
pub trait QuantityTier {
    fn min_quantity(&self) -> f64;
    fn unit_price(&self) -> f64;
}

impl QuantityTier for QtyTier {
    fn min_quantity(&self) -> f64 {
        self.min_qty as f64
    }
    fn unit_price(&self) -> f64 {
        self.unit_price
    }
}

impl QuantityTier for SizeTier {
    fn min_quantity(&self) -> f64 {
        self.qty
    }
    fn unit_price(&self) -> f64 {
        self.unit_price
    }
}

/// Largest threshold `<= quantity`; below the smallest threshold, the smallest tier.
pub fn select_quantity_tier<T: QuantityTier>(tiers: &[T], quantity: u32) -> Option<(usize, &T)> {
    let quantity = quantity as f64;
    let mut chosen = None;
    for (i, tier) in tiers.iter().enumerate() {
        if tier.min_quantity() > quantity {
            break;
        }
        chosen = Some((i, tier));
    }
    chosen.or_else(|| tiers.first().map(|t| (0, t)))
}

/// First tier with `upToSqft >= area`; past every breakpoint, the last tier.
pub fn select_area_tier(tiers: &[AreaTier], area_sqft: f64) -> Option<(usize, &AreaTier)> {
    tiers
        .iter()
        .enumerate()
        .find(|(_, t)| t.up_to_sqft >= area_sqft)
        .or_else(|| tiers.last().map(|t| (tiers.len() - 1, t)))
}

pub fn quantity_tier<T: QuantityTier>(index: usize, tier: &T) -> AppliedTier {
    AppliedTier {
        index,
        basis: TierBasis::Quantity,
        threshold: tier.min_quantity(),
        price: tier.unit_price(),
    }
}

/// Whether a request option value turns an addon on.
pub fn is_selected(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        JsonValue::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            !s.is_empty() && !matches!(s.as_str(), "false" | "none" | "no" | "0")
        }
        _ => false,
    }
}

fn line_item(def: &AddonDef, billed: u32) -> LineItem {
    let (quantity, amount) = match def.pricing {
        AddonPricing::PerUnit => (billed, def.price * billed as f64),
        AddonPricing::Flat => (1, def.price),
    };
    LineItem {
        id: def.id.clone(),
        label: def.label.clone(),
        pricing: def.pricing,
        unit_price: def.price,
        quantity,
        amount,
    }
}

/// Price the addons switched on in `options`. Keys with no matching addon are ignored.
pub fn price_addons(
    defs: &[AddonDef],
    options: &BTreeMap<String, JsonValue>,
    quantity: u32,
) -> Vec<LineItem> {
    defs.iter()
        .filter(|def| options.get(&def.id).is_some_and(is_selected))
        .map(|def| line_item(def, quantity))
        .collect()
}

/// Price requested accessories. Unknown ids are ignored.
pub fn price_accessories(defs: &[AddonDef], selections: &[(&str, u32)]) -> Vec<LineItem> {
    selections
        .iter()
        .filter_map(|(id, qty)| match defs.iter().find(|d| d.id == *id) {
            Some(def) => Some(line_item(def, *qty)),
            None => {
                trace!(accessory = %id, "Ignoring unknown accessory");
                None
            }
        })
        .collect()
}

/// Dollars to whole cents. Non-finite or negative amounts settle at 0.
pub fn to_cents(dollars: f64) -> i64 {
    let cents = (dollars * 100.0).round();
    if cents.is_finite() && cents > 0.0 {
        cents as i64
    } else {
        0
    }
}

/// Add addons, accessories and the file fee to the base, apply the floor,
/// and round once.
pub fn settle(
    unit_price: f64,
    tier: AppliedTier,
    req: &NormalizedRequest<'_>,
    common: &CommonConfig,
) -> Calculation {
    let base_subtotal = unit_price * req.quantity as f64;
    let addons = price_addons(&common.addons, req.options, req.quantity);
    let accessories = price_accessories(&common.accessories, &req.accessories);

    let subtotal = base_subtotal
        + addons.iter().map(|a| a.amount).sum::<f64>()
        + accessories.iter().map(|a| a.amount).sum::<f64>()
        + common.file_fee;
    let floored = subtotal.max(common.minimum_price);

    Calculation {
        total_cents: to_cents(floored),
        breakdown: QuoteBreakdown {
            unit_price,
            tier,
            base_subtotal,
            addons,
            accessories,
            file_fee: common.file_fee,
            subtotal,
            minimum_price: common.minimum_price,
            minimum_adjustment: floored - subtotal,
        },
        area_sqft: None,
        size_label: None,
        material: None,
        multiplier: 1.0,
    }
}
