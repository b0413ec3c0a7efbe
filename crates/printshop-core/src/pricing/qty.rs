//! `QTY_TIERED`: fixed-size goods where the unit price drops with volume.
//! Dimensions are ignored.

use tracing::debug;

use crate::error::{Error, Result};
use crate::pricing::config::QtyTieredConfig;
use crate::pricing::tiers::{quantity_tier, select_quantity_tier, settle};
use crate::pricing::{Calculation, NormalizedRequest};

pub fn calculate(config: &QtyTieredConfig, req: &NormalizedRequest<'_>) -> Result<Calculation> {
    let (index, tier) = select_quantity_tier(&config.tiers, req.quantity)
        .ok_or_else(|| Error::Config("QTY_TIERED preset has no tiers".to_string()))?;

    debug!(
        subsystem = "pricing",
        component = "qty",
        quantity = req.quantity,
        tier_index = index,
        unit_price = tier.unit_price,
        "Quantity tier selected"
    );

    Ok(settle(
        tier.unit_price,
        quantity_tier(index, tier),
        req,
        &config.common,
    ))
}
