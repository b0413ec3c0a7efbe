//! Pricing preset repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use printshop_core::pricing::PricingConfig;
use printshop_core::{
    CreatePresetRequest, Error, PresetRepository, PricingPreset, Result, UpdatePresetRequest,
};

const PRESET_COLUMNS: &str = "id, key, name, model, config, is_active, created_at, updated_at";

pub(crate) fn row_to_preset(row: &PgRow) -> PricingPreset {
    PricingPreset {
        id: row.get("id"),
        key: row.get("key"),
        name: row.get("name"),
        model: row.get("model"),
        config: row.get("config"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn model_change_error(key: &str, stored_model: &str) -> Error {
    Error::validation(
        "model",
        format!(
            "preset '{}' is {}; the model cannot be changed",
            key, stored_model
        ),
    )
}

/// PostgreSQL implementation of PresetRepository.
pub struct PgPresetRepository {
    pool: Pool<Postgres>,
}

impl PgPresetRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PresetRepository for PgPresetRepository {
    async fn upsert(&self, req: CreatePresetRequest) -> Result<PricingPreset> {
        PricingConfig::parse(req.model, &req.config)?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT model FROM pricing_preset WHERE key = $1 FOR UPDATE")
                .bind(&req.key)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if let Some(model) = existing {
            if model != req.model.as_str() {
                return Err(model_change_error(&req.key, &model));
            }
        }

        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO pricing_preset (id, key, name, model, config, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, TRUE), $7, $7)
            ON CONFLICT (key) DO UPDATE SET
                name = EXCLUDED.name,
                config = EXCLUDED.config,
                is_active = COALESCE($6, pricing_preset.is_active),
                updated_at = EXCLUDED.updated_at
            WHERE pricing_preset.model = EXCLUDED.model
            RETURNING {}
            "#,
            PRESET_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(&req.key)
        .bind(&req.name)
        .bind(req.model.as_str())
        .bind(&req.config)
        .bind(req.is_active)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        // No row: a concurrent create claimed the key with another model
        // after the check above, and the conflict guard skipped the update.
        let Some(row) = row else {
            let model: String =
                sqlx::query_scalar("SELECT model FROM pricing_preset WHERE key = $1")
                    .bind(&req.key)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(Error::Database)?;
            return Err(model_change_error(&req.key, &model));
        };

        tx.commit().await.map_err(Error::Database)?;

        let preset = row_to_preset(&row);
        info!(
            subsystem = "db",
            component = "presets",
            op = "upsert",
            preset_key = %preset.key,
            model = %preset.model,
            "Pricing preset saved"
        );
        Ok(preset)
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<PricingPreset>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pricing_preset WHERE key = $1",
            PRESET_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(row_to_preset))
    }

    async fn list(&self, active_only: bool) -> Result<Vec<PricingPreset>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pricing_preset WHERE ($1 = FALSE OR is_active) ORDER BY key",
            PRESET_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_preset).collect())
    }

    async fn update(&self, key: &str, req: UpdatePresetRequest) -> Result<PricingPreset> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM pricing_preset WHERE key = $1 FOR UPDATE",
            PRESET_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Preset {} not found", key)))?;
        let existing = row_to_preset(&row);

        if let Some(config) = &req.config {
            PricingConfig::parse(existing.pricing_model()?, config)?;
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE pricing_preset SET
                name = COALESCE($2, name),
                config = COALESCE($3, config),
                is_active = COALESCE($4, is_active),
                updated_at = $5
            WHERE key = $1
            RETURNING {}
            "#,
            PRESET_COLUMNS
        ))
        .bind(key)
        .bind(&req.name)
        .bind(&req.config)
        .bind(req.is_active)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        let preset = row_to_preset(&row);
        info!(
            subsystem = "db",
            component = "presets",
            op = "update",
            preset_key = %preset.key,
            config_changed = req.config.is_some(),
            "Pricing preset updated"
        );
        Ok(preset)
    }
}
