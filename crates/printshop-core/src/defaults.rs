//! Centralized default constants for printshop.
//!
//! Shared defaults live here so the engine, the refresh worker and the
//! server agree on the same values.

// =============================================================================
// PRICING
// =============================================================================

/// Currency of every quote. Conversion is out of scope.
pub const CURRENCY: &str = "CAD";

/// Square inches per square foot.
pub const SQIN_PER_SQFT: f64 = 144.0;

/// Width used for an area-priced from-price quote when the product has no minimum.
pub const FROM_PRICE_WIDTH_IN: f64 = 24.0;

/// Height used for an area-priced from-price quote when the product has no minimum.
pub const FROM_PRICE_HEIGHT_IN: f64 = 36.0;

/// Multiplier applied when a product lists no material or finishing.
pub const DEFAULT_MULTIPLIER: f64 = 1.0;

// =============================================================================
// MIN-PRICE REFRESH
// =============================================================================

/// Maximum concurrent product refreshes.
pub const REFRESH_MAX_CONCURRENT: usize = 4;

/// Attempts per product before a refresh is given up.
pub const REFRESH_MAX_RETRIES: u32 = 3;

/// Delay between attempts for a single product, in milliseconds.
pub const REFRESH_RETRY_DELAY_MS: u64 = 250;

/// Capacity of the refresh request queue.
pub const REFRESH_QUEUE_CAPACITY: usize = 1024;

/// Broadcast capacity for worker events.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Maximum request body size in bytes. Quote and preset payloads are small.
pub const MAX_BODY_SIZE_BYTES: usize = 1024 * 1024;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Interval between connection pool health log lines.
pub const POOL_METRICS_INTERVAL_SECS: u64 = 300;
