//! # printshop-core
//!
//! Core types, traits, and the pricing/quote engine for the printshop
//! storefront.
//!
//! The [`pricing`] module is pure and synchronous. Storage backends implement
//! the traits in [`traits`]; the refresher and HTTP surface live in their own
//! crates.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod memory;
pub mod models;
pub mod pricing;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use memory::InMemoryStore;
pub use models::*;
pub use pricing::{
    compute_from_price, quote_product, scan, validate, AnomalyReport, FieldError, FromPrice,
    FromPriceResolver, FromPriceSource, PricingConfig, ProductOptions, ValidationReport,
};
pub use traits::*;
