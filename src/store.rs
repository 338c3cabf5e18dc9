//! Postgres-backed document store: houses, alerts and the annual summary cache.
//!
//! Rows are read with `sqlx::FromRow` and converted into the library's model
//! types at this boundary. Loosely typed columns (threshold strings, nullable
//! alert fields) are cleaned up here so the analytics core only ever sees
//! well-formed values.

use chrono::{DateTime, Utc};
use pems_sensorflow::{month_name, Alert, AlertType, MonthSummary, Thresholds};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::feed::Channel;

// ---

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("house {0} not found")]
    HouseNotFound(Uuid),
    #[error("branch {0} not found")]
    BranchNotFound(String),
    #[error("alert {0} not found")]
    AlertNotFound(Uuid),
    #[error("alert {0} is already acknowledged")]
    AlreadyAcknowledged(Uuid),
    #[error("alert {id} is malformed: {reason}")]
    MalformedAlert { id: Uuid, reason: &'static str },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// A poultry house and how to reach its sensor channel.
#[derive(Debug, Clone, PartialEq)]
pub struct House {
    // ---
    pub id: Uuid,
    pub branch_name: String,
    pub name: String,
    /// `None` when the house has no complete channel configuration.
    pub channel: Option<Channel>,
    pub thresholds: Thresholds,
}

#[derive(Debug, FromRow)]
struct HouseRow {
    id: Uuid,
    branch_name: String,
    name: String,
    channel_id: Option<String>,
    read_api_key: Option<String>,
    ammonia_field: Option<i16>,
    temp_field: Option<i16>,
    ammonia_high: Option<String>,
    temp_high: Option<String>,
    temp_low: Option<String>,
}

impl From<HouseRow> for House {
    fn from(row: HouseRow) -> Self {
        // ---
        let field = |n: Option<i16>| n.and_then(|n| u8::try_from(n).ok()).filter(|n| *n > 0);
        let channel = match (
            row.channel_id,
            row.read_api_key,
            field(row.ammonia_field),
            field(row.temp_field),
        ) {
            (Some(channel_id), Some(read_key), Some(ammonia_field), Some(temp_field))
                if !channel_id.trim().is_empty() =>
            {
                Some(Channel {
                    channel_id,
                    read_key,
                    ammonia_field,
                    temp_field,
                })
            }
            _ => None,
        };

        House {
            id: row.id,
            branch_name: row.branch_name,
            name: row.name,
            channel,
            thresholds: Thresholds::parse(
                row.ammonia_high.as_deref(),
                row.temp_high.as_deref(),
                row.temp_low.as_deref(),
            ),
        }
    }
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    house_id: Uuid,
    branch_name: String,
    alert_type: String,
    message: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    is_acknowledged: bool,
    actions_taken: Vec<String>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        // ---
        let malformed = |reason| StoreError::MalformedAlert { id: row.id, reason };
        let message = row
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| malformed("missing message"))?;
        let timestamp = row.timestamp.ok_or_else(|| malformed("missing timestamp"))?;

        Ok(Alert {
            id: row.id,
            house_id: row.house_id,
            branch_name: row.branch_name,
            alert_type: AlertType::parse(&row.alert_type),
            message,
            timestamp,
            is_acknowledged: row.is_acknowledged,
            actions_taken: row.actions_taken,
        })
    }
}

/// Convert alert rows, skipping (and logging) malformed ones.
fn usable_alerts(rows: Vec<AlertRow>) -> Vec<Alert> {
    // ---
    rows.into_iter()
        .filter_map(|row| match Alert::try_from(row) {
            Ok(alert) => Some(alert),
            Err(e) => {
                tracing::warn!("Skipping alert: {}", e);
                None
            }
        })
        .collect()
}

#[derive(Debug, FromRow)]
struct AnnualRow {
    month: i16,
    month_name: String,
    ammonia_max: String,
    ammonia_min: String,
    ammonia_avg: String,
    temp_max: String,
    temp_min: String,
    temp_avg: String,
}

/// Place cached rows into 12 month slots; unknown months are ignored.
fn annual_slots(rows: Vec<AnnualRow>) -> Vec<Option<MonthSummary>> {
    // ---
    let mut slots: Vec<Option<MonthSummary>> = vec![None; 12];
    for row in rows {
        let Some(slot) = usize::try_from(row.month)
            .ok()
            .and_then(|m| m.checked_sub(1))
            .and_then(|i| slots.get_mut(i))
        else {
            continue;
        };
        *slot = Some(MonthSummary {
            month: row.month_name,
            ammonia_max: row.ammonia_max,
            ammonia_min: row.ammonia_min,
            ammonia_avg: row.ammonia_avg,
            temp_max: row.temp_max,
            temp_min: row.temp_min,
            temp_avg: row.temp_avg,
        });
    }
    slots
}

// ---

pub async fn get_house(pool: &PgPool, id: Uuid) -> Result<House, StoreError> {
    // ---
    let row: Option<HouseRow> = sqlx::query_as(
        r#"
        SELECT id, branch_name, name, channel_id, read_api_key,
               ammonia_field, temp_field, ammonia_high, temp_high, temp_low
        FROM houses
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(House::from).ok_or(StoreError::HouseNotFound(id))
}

pub async fn list_branch_houses(pool: &PgPool, branch_name: &str) -> Result<Vec<House>, StoreError> {
    // ---
    let rows: Vec<HouseRow> = sqlx::query_as(
        r#"
        SELECT id, branch_name, name, channel_id, read_api_key,
               ammonia_field, temp_field, ammonia_high, temp_high, temp_low
        FROM houses
        WHERE branch_name = $1
        ORDER BY name
        "#,
    )
    .bind(branch_name)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(House::from).collect())
}

/// All usable alerts for a house, newest first.
pub async fn list_house_alerts(pool: &PgPool, house_id: Uuid) -> Result<Vec<Alert>, StoreError> {
    // ---
    let rows: Vec<AlertRow> = sqlx::query_as(
        r#"
        SELECT id, house_id, branch_name, alert_type, message, timestamp,
               is_acknowledged, actions_taken
        FROM alerts
        WHERE house_id = $1
        ORDER BY timestamp DESC NULLS LAST
        "#,
    )
    .bind(house_id)
    .fetch_all(pool)
    .await?;

    Ok(usable_alerts(rows))
}

pub async fn get_alert(pool: &PgPool, id: Uuid) -> Result<Alert, StoreError> {
    // ---
    let row: Option<AlertRow> = sqlx::query_as(
        r#"
        SELECT id, house_id, branch_name, alert_type, message, timestamp,
               is_acknowledged, actions_taken
        FROM alerts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(StoreError::AlertNotFound(id))?.try_into()
}

/// Decide whether a locked alert row may be acknowledged.
///
/// Unknown, already acknowledged and malformed alerts are rejected before
/// anything is written.
fn acknowledgeable(id: Uuid, row: Option<AlertRow>) -> Result<Alert, StoreError> {
    // ---
    let row = row.ok_or(StoreError::AlertNotFound(id))?;
    if row.is_acknowledged {
        return Err(StoreError::AlreadyAcknowledged(id));
    }
    Alert::try_from(row)
}

/// Mark an alert acknowledged and record the actions taken.
///
/// Acknowledgement happens once: a second attempt is rejected and the stored
/// actions are left untouched. The row is locked and validated first, so a
/// rejected request never changes it.
pub async fn acknowledge_alert(
    pool: &PgPool,
    id: Uuid,
    actions_taken: &[String],
) -> Result<Alert, StoreError> {
    // ---
    let mut tx = pool.begin().await?;

    let row: Option<AlertRow> = sqlx::query_as(
        r#"
        SELECT id, house_id, branch_name, alert_type, message, timestamp,
               is_acknowledged, actions_taken
        FROM alerts
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    // Dropping `tx` on the error path rolls back and releases the lock.
    let mut alert = acknowledgeable(id, row)?;

    sqlx::query(
        r#"
        UPDATE alerts
        SET is_acknowledged = TRUE, actions_taken = $2
        WHERE id = $1 AND is_acknowledged = FALSE
          AND message IS NOT NULL AND timestamp IS NOT NULL
        "#,
    )
    .bind(id)
    .bind(actions_taken)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    alert.is_acknowledged = true;
    alert.actions_taken = actions_taken.to_vec();
    Ok(alert)
}

/// Cached month summaries for a house and year, indexed by `month - 1`.
pub async fn load_annual(
    pool: &PgPool,
    house_id: Uuid,
    year: i32,
) -> Result<Vec<Option<MonthSummary>>, StoreError> {
    // ---
    let rows: Vec<AnnualRow> = sqlx::query_as(
        r#"
        SELECT month, month_name, ammonia_max, ammonia_min, ammonia_avg,
               temp_max, temp_min, temp_avg
        FROM annual_summary
        WHERE house_id = $1 AND year = $2
        "#,
    )
    .bind(house_id)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(annual_slots(rows))
}

/// Insert or replace one month of the annual summary cache.
pub async fn save_month(
    pool: &PgPool,
    house_id: Uuid,
    year: i32,
    month: u32,
    summary: &MonthSummary,
) -> Result<(), StoreError> {
    // ---
    let month_no = i16::try_from(month).unwrap_or(0);
    let name = if summary.month.is_empty() {
        month_name(month).to_string()
    } else {
        summary.month.clone()
    };

    sqlx::query(
        r#"
        INSERT INTO annual_summary (
            house_id, year, month, month_name,
            ammonia_max, ammonia_min, ammonia_avg,
            temp_max, temp_min, temp_avg
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (house_id, year, month) DO UPDATE SET
            month_name  = EXCLUDED.month_name,
            ammonia_max = EXCLUDED.ammonia_max,
            ammonia_min = EXCLUDED.ammonia_min,
            ammonia_avg = EXCLUDED.ammonia_avg,
            temp_max    = EXCLUDED.temp_max,
            temp_min    = EXCLUDED.temp_min,
            temp_avg    = EXCLUDED.temp_avg
        "#,
    )
    .bind(house_id)
    .bind(year)
    .bind(month_no)
    .bind(name)
    .bind(&summary.ammonia_max)
    .bind(&summary.ammonia_min)
    .bind(&summary.ammonia_avg)
    .bind(&summary.temp_max)
    .bind(&summary.temp_min)
    .bind(&summary.temp_avg)
    .execute(pool)
    .await?;

    Ok(())
}
