//! Database schema management for `pems-sensorflow`.
//!
//! Ensures the house, alert and annual-summary tables exist before serving
//! requests. Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the database schema if it is missing (idempotent).
///
/// Threshold columns are free-form text because operators enter them by
/// hand; they are parsed leniently when a house is loaded.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS houses (
            id              UUID PRIMARY KEY,
            branch_name     TEXT     NOT NULL,
            name            TEXT     NOT NULL,
            channel_id      TEXT,
            read_api_key    TEXT,
            ammonia_field   SMALLINT,
            temp_field      SMALLINT,
            ammonia_high    TEXT,
            temp_high       TEXT,
            temp_low        TEXT
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Message and timestamp are nullable; rows without them are skipped on load
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id               UUID PRIMARY KEY,
            house_id         UUID        NOT NULL REFERENCES houses (id) ON DELETE CASCADE,
            branch_name      TEXT        NOT NULL,
            alert_type       TEXT        NOT NULL,
            message          TEXT,
            timestamp        TIMESTAMPTZ,
            is_acknowledged  BOOLEAN     NOT NULL DEFAULT FALSE,
            actions_taken    TEXT[]      NOT NULL DEFAULT '{}'
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS annual_summary (
            house_id     UUID     NOT NULL REFERENCES houses (id) ON DELETE CASCADE,
            year         INTEGER  NOT NULL,
            month        SMALLINT NOT NULL CHECK (month BETWEEN 1 AND 12),
            month_name   TEXT     NOT NULL,
            ammonia_max  TEXT     NOT NULL,
            ammonia_min  TEXT     NOT NULL,
            ammonia_avg  TEXT     NOT NULL,
            temp_max     TEXT     NOT NULL,
            temp_min     TEXT     NOT NULL,
            temp_avg     TEXT     NOT NULL,
            PRIMARY KEY (house_id, year, month)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_alerts_house_timestamp
            ON alerts (house_id, timestamp DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_houses_branch
            ON houses (branch_name);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
