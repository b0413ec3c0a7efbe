//! Route handlers, grouped by resource.

pub mod health;
pub mod presets;
pub mod pricing;
pub mod products;
