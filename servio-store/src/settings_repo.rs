//! Tenant settings live as key/value rows and are folded into the typed
//! struct on load, with safe-default coercion for unparseable values.

use sqlx::PgPool;
use uuid::Uuid;

use servio_domain::settings::{coerce_flag, coerce_number, ShopSettings};

use crate::{require_tenant, StoreResult};

pub struct SettingsRepository;

#[derive(sqlx::FromRow)]
struct SettingRow {
    key: String,
    value: String,
}

const KEYS: [&str; 6] = [
    "manager_percent",
    "masters_percent",
    "owner_percent",
    "kaspi_tax_percent",
    "charity_percent",
    "round_charity_to_nearest_1000",
];

impl SettingsRepository {
    pub async fn fetch(pool: &PgPool, service_id: Uuid) -> StoreResult<ShopSettings> {
        require_tenant(service_id);

        let rows: Vec<SettingRow> =
            sqlx::query_as("SELECT key, value FROM settings WHERE service_id = $1")
                .bind(service_id)
                .fetch_all(pool)
                .await?;

        let mut settings = ShopSettings::default();
        for row in rows {
            match row.key.as_str() {
                "manager_percent" => settings.manager_percent = coerce_number(&row.value),
                "masters_percent" => settings.masters_percent = coerce_number(&row.value),
                "owner_percent" => settings.owner_percent = coerce_number(&row.value),
                "kaspi_tax_percent" => settings.kaspi_tax_percent = coerce_number(&row.value),
                "charity_percent" => settings.charity_percent = coerce_number(&row.value),
                "round_charity_to_nearest_1000" => {
                    settings.round_charity_to_nearest_1000 = coerce_flag(&row.value)
                }
                _ => {}
            }
        }

        Ok(settings)
    }

    /// Persists a validated settings struct. The masters+owner invariant is
    /// checked here, at the write boundary, not by consumers.
    pub async fn save(pool: &PgPool, service_id: Uuid, settings: &ShopSettings) -> StoreResult<()> {
        require_tenant(service_id);
        settings
            .validate()
            .map_err(servio_core::CoreError::from)?;

        let values = [
            settings.manager_percent.to_string(),
            settings.masters_percent.to_string(),
            settings.owner_percent.to_string(),
            settings.kaspi_tax_percent.to_string(),
            settings.charity_percent.to_string(),
            settings.round_charity_to_nearest_1000.to_string(),
        ];

        let mut tx = pool.begin().await?;
        for (key, value) in KEYS.iter().zip(values.iter()) {
            sqlx::query(
                r#"
                INSERT INTO settings (service_id, key, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (service_id, key) DO UPDATE SET value = EXCLUDED.value
                "#,
            )
            .bind(service_id)
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }
}
