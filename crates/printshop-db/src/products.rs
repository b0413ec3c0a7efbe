//! Product repository implementation.
//!
//! Every read joins the product's current preset so the quote engine always
//! sees one consistent config snapshot per request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use printshop_core::{
    Error, MinPriceCache, PricingPreset, PricingUnit, Product, ProductRepository, Result,
};

const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id, p.slug, p.name, p.is_active, p.pricing_unit,
        p.base_price_cents, p.display_from_price_cents,
        p.min_price_cents, p.min_price_computed_at,
        p.min_width_in, p.min_height_in, p.options_config, p.pricing_preset_id,
        pp.key AS preset_key, pp.name AS preset_name, pp.model AS preset_model,
        pp.config AS preset_config, pp.is_active AS preset_is_active,
        pp.created_at AS preset_created_at, pp.updated_at AS preset_updated_at
    FROM product p
    LEFT JOIN pricing_preset pp ON pp.id = p.pricing_preset_id
"#;

fn row_to_product(row: &PgRow) -> Result<Product> {
    let pricing_unit: String = row.get("pricing_unit");
    let pricing_unit: PricingUnit = pricing_unit.parse().map_err(Error::Internal)?;

    let min_price = match (
        row.get::<Option<i64>, _>("min_price_cents"),
        row.get::<Option<DateTime<Utc>>, _>("min_price_computed_at"),
    ) {
        (Some(cents), Some(computed_at)) => Some(MinPriceCache { cents, computed_at }),
        _ => None,
    };

    let pricing_preset_id: Option<Uuid> = row.get("pricing_preset_id");
    let pricing_preset = match (pricing_preset_id, row.get::<Option<String>, _>("preset_key")) {
        (Some(id), Some(key)) => Some(PricingPreset {
            id,
            key,
            name: row.get("preset_name"),
            model: row.get("preset_model"),
            config: row.get("preset_config"),
            is_active: row.get("preset_is_active"),
            created_at: row.get("preset_created_at"),
            updated_at: row.get("preset_updated_at"),
        }),
        _ => None,
    };

    Ok(Product {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        is_active: row.get("is_active"),
        pricing_unit,
        base_price: row.get("base_price_cents"),
        display_from_price: row.get("display_from_price_cents"),
        min_price,
        min_width_in: row.get("min_width_in"),
        min_height_in: row.get("min_height_in"),
        options_config: row.get("options_config"),
        pricing_preset_id,
        pricing_preset,
    })
}

/// PostgreSQL implementation of ProductRepository.
pub struct PgProductRepository {
    pool: Pool<Postgres>,
}

impl PgProductRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert or replace a product by slug. Used by seeding and tests; the
    /// catalog itself is owned elsewhere.
    pub async fn upsert(&self, product: &Product) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO product (
                id, slug, name, is_active, pricing_unit, base_price_cents,
                display_from_price_cents, min_price_cents, min_price_computed_at,
                min_width_in, min_height_in, options_config, pricing_preset_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                is_active = EXCLUDED.is_active,
                pricing_unit = EXCLUDED.pricing_unit,
                base_price_cents = EXCLUDED.base_price_cents,
                display_from_price_cents = EXCLUDED.display_from_price_cents,
                min_width_in = EXCLUDED.min_width_in,
                min_height_in = EXCLUDED.min_height_in,
                options_config = EXCLUDED.options_config,
                pricing_preset_id = EXCLUDED.pricing_preset_id,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(product.id)
        .bind(&product.slug)
        .bind(&product.name)
        .bind(product.is_active)
        .bind(product.pricing_unit.to_string())
        .bind(product.base_price)
        .bind(product.display_from_price)
        .bind(product.min_price.map(|c| c.cents))
        .bind(product.min_price.map(|c| c.computed_at))
        .bind(product.min_width_in)
        .bind(product.min_height_in)
        .bind(&product.options_config)
        .bind(product.pricing_preset_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("{} WHERE p.slug = $1", PRODUCT_SELECT))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("{} WHERE p.id = $1", PRODUCT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!("{} WHERE p.is_active ORDER BY p.slug", PRODUCT_SELECT))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(row_to_product).collect()
    }

    async fn list_active_for_preset(&self, preset_id: Uuid) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "{} WHERE p.is_active AND p.pricing_preset_id = $1 ORDER BY p.slug",
            PRODUCT_SELECT
        ))
        .bind(preset_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(row_to_product).collect()
    }

    async fn set_min_price(&self, id: Uuid, cache: Option<MinPriceCache>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE product
            SET min_price_cents = $2, min_price_computed_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(cache.map(|c| c.cents))
        .bind(cache.map(|c| c.computed_at))
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Product {} not found", id)));
        }

        debug!(
            subsystem = "db",
            component = "products",
            op = "set_min_price",
            product_id = %id,
            cleared = cache.is_none(),
            "Min-price cache written"
        );
        Ok(())
    }
}
