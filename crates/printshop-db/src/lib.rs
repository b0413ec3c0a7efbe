//! # printshop-db
//!
//! PostgreSQL database layer for printshop pricing.
//!
//! This crate provides:
//! - Connection pool management
//! - `PgPresetRepository`, validating every preset write
//! - `PgProductRepository`, joining each product's current preset
//!
//! ## Example
//!
//! ```rust,ignore
//! use printshop_db::{Database, ProductRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/printshop").await?;
//!     let product = db.products.get_by_slug("vinyl-banner").await?;
//!     println!("{:?}", product.map(|p| p.base_price));
//!     Ok(())
//! }
//! ```

pub mod pool;
pub mod presets;
pub mod products;

// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use printshop_core::*;

pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use presets::PgPresetRepository;
pub use products::PgProductRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Product reads and min-price cache writes.
    pub products: PgProductRepository,
    /// Pricing preset CRUD.
    pub presets: PgPresetRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            products: PgProductRepository::new(pool.clone()),
            presets: PgPresetRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
