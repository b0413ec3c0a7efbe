//! # printshop-jobs
//!
//! Background refresh of the cached "from" price.
//!
//! This crate provides:
//! - A queue of refresh requests (per preset or per product)
//! - Isolated per-product tasks with bounded retries
//! - Notifications via a broadcast channel
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use printshop_jobs::{MinPriceRefresher, RefresherConfig};
//!
//! let refresher = MinPriceRefresher::new(products, RefresherConfig::from_env());
//! let handle = refresher.start();
//!
//! // After an admin preset edit
//! handle.enqueue_preset(preset.id)?;
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod refresher;

// Re-export core types
pub use printshop_core::*;

pub use refresher::{
    refresh_min_price, MinPriceRefresher, RefreshEvent, RefreshHandle, RefreshRequest,
    RefresherConfig,
};
