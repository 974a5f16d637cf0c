use std::collections::BTreeMap;

use sqlx::Row;

use amlbot_core::domain::{CatalogToken, TokenNetwork};

use super::{decode_error, CatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn networks_by_token(
        &self,
        token_name: Option<&str>,
    ) -> Result<BTreeMap<String, Vec<TokenNetwork>>, RepositoryError> {
        let rows = match token_name {
            Some(name) => {
                sqlx::query(
                    "SELECT token_name, network_type, network_name
                     FROM token_network WHERE token_name = ? ORDER BY network_type",
                )
                .bind(name)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT token_name, network_type, network_name
                     FROM token_network ORDER BY token_name, network_type",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut grouped: BTreeMap<String, Vec<TokenNetwork>> = BTreeMap::new();
        for row in &rows {
            let token_name: String = row.try_get("token_name").map_err(decode_error)?;
            grouped.entry(token_name).or_default().push(TokenNetwork {
                network_type: row.try_get("network_type").map_err(decode_error)?,
                network_name: row.try_get("network_name").map_err(decode_error)?,
            });
        }
        Ok(grouped)
    }
}

fn row_to_token(
    row: &sqlx::sqlite::SqliteRow,
    networks: &mut BTreeMap<String, Vec<TokenNetwork>>,
) -> Result<CatalogToken, RepositoryError> {
    let name: String = row.try_get("name").map_err(decode_error)?;
    let priority_level: i32 = row.try_get("priority_level").map_err(decode_error)?;
    let networks = networks.remove(&name).unwrap_or_default();
    Ok(CatalogToken { name, priority_level, networks })
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list_tokens(&self) -> Result<Vec<CatalogToken>, RepositoryError> {
        let rows = sqlx::query("SELECT name, priority_level FROM token ORDER BY priority_level, name")
            .fetch_all(&self.pool)
            .await?;
        let mut networks = self.networks_by_token(None).await?;

        rows.iter().map(|row| row_to_token(row, &mut networks)).collect()
    }

    async fn find_token(&self, name: &str) -> Result<Option<CatalogToken>, RepositoryError> {
        let row = sqlx::query("SELECT name, priority_level FROM token WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => {
                let mut networks = self.networks_by_token(Some(name)).await?;
                Ok(Some(row_to_token(row, &mut networks)?))
            }
            None => Ok(None),
        }
    }

    async fn save_token(&self, token: CatalogToken) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO token (name, priority_level) VALUES (?, ?)
             ON CONFLICT(name) DO UPDATE SET priority_level = excluded.priority_level",
        )
        .bind(&token.name)
        .bind(token.priority_level)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM token_network WHERE token_name = ?")
            .bind(&token.name)
            .execute(&mut *tx)
            .await?;

        for network in &token.networks {
            sqlx::query(
                "INSERT INTO token_network (token_name, network_type, network_name) VALUES (?, ?, ?)",
            )
            .bind(&token.name)
            .bind(&network.network_type)
            .bind(&network.network_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use amlbot_core::domain::{CatalogToken, TokenNetwork};

    use super::SqlCatalogRepository;
    use crate::repositories::CatalogRepository;
    use crate::{connect_with_settings, migrations};

    fn token(name: &str, priority_level: i32, networks: &[(&str, &str)]) -> CatalogToken {
        CatalogToken {
            name: name.to_owned(),
            priority_level,
            networks: networks
                .iter()
                .map(|(network_type, network_name)| TokenNetwork {
                    network_type: (*network_type).to_owned(),
                    network_name: (*network_name).to_owned(),
                })
                .collect(),
        }
    }

    async fn setup() -> SqlCatalogRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlCatalogRepository::new(pool)
    }

    #[tokio::test]
    async fn tokens_list_in_priority_order_with_networks() {
        let repo = setup().await;
        repo.save_token(token("BTC", 2, &[("btc", "Bitcoin")])).await.expect("save btc");
        repo.save_token(token("USDT", 1, &[("trc20", "Tron (TRC20)"), ("erc20", "Ethereum (ERC20)")]))
            .await
            .expect("save usdt");

        let tokens = repo.list_tokens().await.expect("list");

        assert_eq!(tokens.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["USDT", "BTC"]);
        assert_eq!(tokens[0].networks.len(), 2);
        assert_eq!(tokens[1].networks[0].network_type, "btc");
    }

    #[tokio::test]
    async fn saving_again_replaces_networks() {
        let repo = setup().await;
        repo.save_token(token("LTC", 3, &[("ltc", "Litecoin"), ("bsc", "BNB Chain")]))
            .await
            .expect("first save");
        repo.save_token(token("LTC", 4, &[("ltc", "Litecoin")])).await.expect("second save");

        let found = repo.find_token("LTC").await.expect("find").expect("token exists");
        assert_eq!(found.priority_level, 4);
        assert_eq!(found.networks.len(), 1);
        assert!(repo.find_token("DOGE").await.expect("find missing").is_none());
    }
}
