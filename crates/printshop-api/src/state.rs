//! Shared application state.

use std::sync::Arc;

use printshop_core::{FromPriceResolver, PresetRepository, ProductRepository};
use printshop_jobs::RefreshHandle;

#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductRepository>,
    pub presets: Arc<dyn PresetRepository>,
    /// `None` when the background refresher is disabled.
    pub refresher: Option<RefreshHandle>,
    pub from_price: Arc<FromPriceResolver>,
}

impl AppState {
    pub fn new(products: Arc<dyn ProductRepository>, presets: Arc<dyn PresetRepository>) -> Self {
        Self {
            products,
            presets,
            refresher: None,
            from_price: Arc::new(FromPriceResolver::standard()),
        }
    }

    pub fn with_refresher(mut self, refresher: RefreshHandle) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn with_from_price(mut self, resolver: FromPriceResolver) -> Self {
        self.from_price = Arc::new(resolver);
        self
    }
}
