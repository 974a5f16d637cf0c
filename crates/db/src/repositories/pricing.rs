use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;

use amlbot_core::domain::Commission;

use super::{decode_error, PricingRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPricingRepository {
    pool: DbPool,
}

impl SqlPricingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PricingRepository for SqlPricingRepository {
    async fn fee_for(&self, token_name: &str) -> Result<Option<Decimal>, RepositoryError> {
        let row = sqlx::query("SELECT aml_check FROM commission WHERE token_name = ?")
            .bind(token_name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("aml_check").map_err(decode_error)?;
                Decimal::from_str(&raw).map(Some).map_err(decode_error)
            }
            None => Ok(None),
        }
    }

    async fn list_payment_tokens(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT c.token_name AS token_name
             FROM commission c
             JOIN token t ON t.name = c.token_name
             ORDER BY t.priority_level, t.name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut names: Vec<String> = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("token_name").map_err(decode_error)?;
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    async fn save_commission(&self, commission: Commission) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO commission (token_name, aml_check) VALUES (?, ?)
             ON CONFLICT(token_name) DO UPDATE SET aml_check = excluded.aml_check",
        )
        .bind(&commission.token_name)
        .bind(commission.aml_check.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
