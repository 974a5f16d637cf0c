use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use amlbot_core::domain::{CheckId, CheckRecord, UserId};

use super::{decode_error, CheckRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCheckRepository {
    pool: DbPool,
}

impl SqlCheckRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<CheckRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let user_id: i64 = row.try_get("user_id").map_err(decode_error)?;
    let address: String = row.try_get("address").map_err(decode_error)?;
    let score: String = row.try_get("score").map_err(decode_error)?;
    let network_type: String = row.try_get("network_type").map_err(decode_error)?;
    let asset_code: String = row.try_get("asset_code").map_err(decode_error)?;
    let payment_token_name: String = row.try_get("payment_token_name").map_err(decode_error)?;
    let fee: String = row.try_get("fee").map_err(decode_error)?;
    let checked_at: String = row.try_get("checked_at").map_err(decode_error)?;

    Ok(CheckRecord {
        id: CheckId(id),
        user_id: UserId(user_id),
        address,
        score: Decimal::from_str(&score).map_err(decode_error)?,
        network_type,
        asset_code,
        payment_token_name,
        fee: Decimal::from_str(&fee).map_err(decode_error)?,
        checked_at: DateTime::parse_from_rfc3339(&checked_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(decode_error)?,
    })
}

#[async_trait::async_trait]
impl CheckRepository for SqlCheckRepository {
    async fn record(&self, record: CheckRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO aml_check (id, user_id, address, score, network_type, asset_code,
                                    payment_token_name, fee, checked_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(record.user_id.0)
        .bind(&record.address)
        .bind(record.score.to_string())
        .bind(&record.network_type)
        .bind(&record.asset_code)
        .bind(&record.payment_token_name)
        .bind(record.fee.to_string())
        .bind(record.checked_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CheckRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, address, score, network_type, asset_code,
                    payment_token_name, fee, checked_at
             FROM aml_check WHERE user_id = ? ORDER BY checked_at DESC",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}
