//! 遥测存储 - PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::{Result, ServerError};
use crate::model::TelemetryRecord;
use crate::repository::TelemetryStore;

/// 遥测存储 (PostgreSQL 实现)
#[derive(Clone)]
pub struct PgTelemetryStore {
    pool: Arc<PgPool>,
}

impl PgTelemetryStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TelemetryRow {
    device_id: String,
    user_id: String,
    data: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl From<TelemetryRow> for TelemetryRecord {
    fn from(r: TelemetryRow) -> Self {
        TelemetryRecord {
            device_id: r.device_id,
            user_id: r.user_id,
            data: r.data,
            timestamp: r.timestamp,
        }
    }
}

#[async_trait]
impl TelemetryStore for PgTelemetryStore {
    async fn insert(&self, record: &TelemetryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO iotgate_device_data (device_id, user_id, data, timestamp)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.device_id)
        .bind(&record.user_id)
        .bind(&record.data)
        .bind(record.timestamp)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| ServerError::Database(format!("Failed to insert telemetry: {}", e)))?;

        Ok(())
    }

    async fn find_range(
        &self,
        device_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TelemetryRecord>> {
        let rows = sqlx::query_as::<_, TelemetryRow>(
            r#"
            SELECT device_id, user_id, data, timestamp
            FROM iotgate_device_data
            WHERE device_id = $1 AND timestamp >= $2 AND timestamp <= $3
            ORDER BY timestamp ASC
            "#,
        )
        .bind(device_id)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(|e| ServerError::Database(format!("Failed to query telemetry: {}", e)))?;

        Ok(rows.into_iter().map(TelemetryRecord::from).collect())
    }
}
