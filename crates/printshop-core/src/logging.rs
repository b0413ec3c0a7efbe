//! Structured logging field name constants for printshop.
//!
//! All crates use these names so quote, refresh and admin events can be
//! queried by the same keys.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), admin writes |
//! | DEBUG | Decision points (tier selected, from-price strategy) |
//! | TRACE | Per-item iteration (addons, anomaly checks) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the HTTP request.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "pricing", "db", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "engine", "from_price", "anomalies", "pool", "refresher"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "quote", "resolve", "scan", "refresh"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Product slug.
pub const SLUG: &str = "slug";

/// Product UUID.
pub const PRODUCT_ID: &str = "product_id";

/// Pricing preset key.
pub const PRESET_KEY: &str = "preset_key";

/// Pricing model tag.
pub const MODEL: &str = "model";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Quote total in cents.
pub const TOTAL_CENTS: &str = "total_cents";

/// Number of anomalies found by a scan.
pub const ANOMALY_COUNT: &str = "anomaly_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// From-price strategy that produced the value.
pub const SOURCE: &str = "source";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
