//! Out-of-band refresh of the `minPrice` cache.
//!
//! Requests arrive on a queue after admin preset edits. Each product refresh
//! runs as its own task with bounded retries, so one failing product neither
//! blocks the preset save nor the other products.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use printshop_core::defaults::{
    EVENT_BUS_CAPACITY, REFRESH_MAX_CONCURRENT, REFRESH_MAX_RETRIES, REFRESH_QUEUE_CAPACITY,
    REFRESH_RETRY_DELAY_MS,
};
use printshop_core::pricing::live_from_price;
use printshop_core::{Error, MinPriceCache, Product, ProductRepository, Result};

/// Configuration for the refresh worker.
#[derive(Debug, Clone)]
pub struct RefresherConfig {
    pub max_concurrent: usize,
    /// Attempts per product, including the first.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub enabled: bool,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            max_concurrent: REFRESH_MAX_CONCURRENT,
            max_retries: REFRESH_MAX_RETRIES,
            retry_delay_ms: REFRESH_RETRY_DELAY_MS,
            enabled: true,
        }
    }
}

impl RefresherConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `REFRESH_WORKER_ENABLED` | `true` | Enable/disable background refresh |
    /// | `REFRESH_MAX_CONCURRENT` | `4` | Concurrent product refreshes |
    /// | `REFRESH_MAX_RETRIES` | `3` | Attempts per product |
    /// | `REFRESH_RETRY_DELAY_MS` | `250` | Delay between attempts |
    pub fn from_env() -> Self {
        let enabled = std::env::var("REFRESH_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent = std::env::var("REFRESH_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(REFRESH_MAX_CONCURRENT)
            .max(1);

        let max_retries = std::env::var("REFRESH_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(REFRESH_MAX_RETRIES)
            .max(1);

        let retry_delay_ms = std::env::var("REFRESH_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(REFRESH_RETRY_DELAY_MS);

        Self {
            max_concurrent,
            max_retries,
            retry_delay_ms,
            enabled,
        }
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn with_retry_delay(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// What to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    /// Every active product referencing the preset.
    Preset(Uuid),
    Product(Uuid),
}

/// Event emitted by the refresh worker.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshEvent {
    WorkerStarted,
    /// Cache written. `cents` is `None` when the live quote failed and the
    /// entry was cleared.
    RefreshCompleted {
        product_id: Uuid,
        cents: Option<i64>,
        attempts: u32,
    },
    RefreshFailed {
        product_id: Uuid,
        error: String,
        attempts: u32,
    },
    WorkerStopped,
}

/// Recompute a product's from-price and persist it.
///
/// A live quote that yields nothing clears the entry, so listings fall
/// through to the live or legacy strategies instead of a stale value.
pub async fn refresh_min_price(
    products: &dyn ProductRepository,
    product: &Product,
) -> Result<Option<MinPriceCache>> {
    let cache = live_from_price(product).map(MinPriceCache::new);
    products.set_min_price(product.id, cache).await?;
    Ok(cache)
}

/// Handle for controlling a running refresher.
pub struct RefreshHandle {
    request_tx: mpsc::Sender<RefreshRequest>,
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<RefreshEvent>,
}

impl Clone for RefreshHandle {
    fn clone(&self) -> Self {
        Self {
            request_tx: self.request_tx.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
            event_rx: self.event_rx.resubscribe(),
        }
    }
}

impl RefreshHandle {
    /// Queue a refresh of every active product using the preset. Never waits.
    pub fn enqueue_preset(&self, preset_id: Uuid) -> Result<()> {
        self.enqueue(RefreshRequest::Preset(preset_id))
    }

    /// Queue a refresh of one product. Never waits.
    pub fn enqueue_product(&self, product_id: Uuid) -> Result<()> {
        self.enqueue(RefreshRequest::Product(product_id))
    }

    fn enqueue(&self, request: RefreshRequest) -> Result<()> {
        self.request_tx.try_send(request).map_err(|e| {
            Error::Internal(format!("Failed to queue min-price refresh {:?}: {}", request, e))
        })
    }

    /// Signal the worker to finish in-flight refreshes and stop.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<RefreshEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that drains refresh requests.
pub struct MinPriceRefresher {
    products: Arc<dyn ProductRepository>,
    config: RefresherConfig,
    event_tx: broadcast::Sender<RefreshEvent>,
}

impl MinPriceRefresher {
    pub fn new(products: Arc<dyn ProductRepository>, config: RefresherConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            products,
            config,
            event_tx,
        }
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> RefreshHandle {
        let (request_tx, request_rx) = mpsc::channel(REFRESH_QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(request_rx, shutdown_rx).await;
        });

        RefreshHandle {
            request_tx,
            shutdown_tx,
            event_rx,
        }
    }

    async fn run(
        self,
        mut request_rx: mpsc::Receiver<RefreshRequest>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        if !self.config.enabled {
            info!(
                subsystem = "jobs",
                component = "refresher",
                "Min-price refresher is disabled, not starting"
            );
            return;
        }

        info!(
            subsystem = "jobs",
            component = "refresher",
            max_concurrent = self.config.max_concurrent,
            max_retries = self.config.max_retries,
            "Min-price refresher started"
        );
        let _ = self.event_tx.send(RefreshEvent::WorkerStarted);

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(subsystem = "jobs", component = "refresher", "Refresher received shutdown signal");
                    break;
                }
                request = request_rx.recv() => {
                    let Some(request) = request else { break };
                    for product_id in self.expand(request).await {
                        let task = self.task_for(product_id, permits.clone());
                        tasks.spawn(task.execute());
                    }
                }
            }

            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    error!(subsystem = "jobs", component = "refresher", error = ?e, "Refresh task panicked");
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(subsystem = "jobs", component = "refresher", error = ?e, "Refresh task panicked");
            }
        }

        let _ = self.event_tx.send(RefreshEvent::WorkerStopped);
        info!(subsystem = "jobs", component = "refresher", "Min-price refresher stopped");
    }

    /// Resolve a request to product ids. A lookup failure drops the request.
    async fn expand(&self, request: RefreshRequest) -> Vec<Uuid> {
        match request {
            RefreshRequest::Product(id) => vec![id],
            RefreshRequest::Preset(preset_id) => {
                match self.products.list_active_for_preset(preset_id).await {
                    Ok(products) => {
                        debug!(
                            subsystem = "jobs",
                            component = "refresher",
                            %preset_id,
                            product_count = products.len(),
                            "Fanning out preset refresh"
                        );
                        products.into_iter().map(|p| p.id).collect()
                    }
                    Err(e) => {
                        warn!(
                            subsystem = "jobs",
                            component = "refresher",
                            %preset_id,
                            error = %e,
                            "Failed to list products for preset refresh"
                        );
                        Vec::new()
                    }
                }
            }
        }
    }

    fn task_for(&self, product_id: Uuid, permits: Arc<Semaphore>) -> RefreshTask {
        RefreshTask {
            product_id,
            products: self.products.clone(),
            event_tx: self.event_tx.clone(),
            permits,
            max_retries: self.config.max_retries,
            retry_delay: Duration::from_millis(self.config.retry_delay_ms),
        }
    }
}

/// One isolated product refresh.
struct RefreshTask {
    product_id: Uuid,
    products: Arc<dyn ProductRepository>,
    event_tx: broadcast::Sender<RefreshEvent>,
    permits: Arc<Semaphore>,
    max_retries: u32,
    retry_delay: Duration,
}

impl RefreshTask {
    async fn execute(self) {
        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            return;
        };
        let start = Instant::now();
        let product_id = self.product_id;

        let mut attempts = 0;
        let outcome = loop {
            attempts += 1;
            match self.attempt().await {
                Ok(cache) => break Ok(cache),
                Err(e @ Error::NotFound(_)) => break Err(e),
                Err(e) if attempts < self.max_retries => {
                    warn!(
                        subsystem = "jobs",
                        component = "refresher",
                        %product_id,
                        attempt = attempts,
                        error = %e,
                        "Min-price refresh attempt failed, retrying"
                    );
                    sleep(self.retry_delay).await;
                }
                Err(e) => break Err(e),
            }
        };

        match outcome {
            Ok(cache) => {
                info!(
                    subsystem = "jobs",
                    component = "refresher",
                    op = "refresh",
                    %product_id,
                    total_cents = cache.map(|c| c.cents),
                    attempts,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Min-price cache refreshed"
                );
                let _ = self.event_tx.send(RefreshEvent::RefreshCompleted {
                    product_id,
                    cents: cache.map(|c| c.cents),
                    attempts,
                });
            }
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    component = "refresher",
                    op = "refresh",
                    %product_id,
                    attempts,
                    error = %e,
                    "Min-price refresh gave up"
                );
                let _ = self.event_tx.send(RefreshEvent::RefreshFailed {
                    product_id,
                    error: e.to_string(),
                    attempts,
                });
            }
        }
    }

    async fn attempt(&self) -> Result<Option<MinPriceCache>> {
        let product = self
            .products
            .get(self.product_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Product {} not found", self.product_id)))?;
        refresh_min_price(self.products.as_ref(), &product).await
    }
}
