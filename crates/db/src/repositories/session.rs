use chrono::Utc;
use sqlx::Row;

use amlbot_core::domain::UserId;

use super::{decode_error, RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn load_step(&self, user_id: UserId) -> Result<String, RepositoryError> {
        let row = sqlx::query("SELECT step FROM session_step WHERE user_id = ?")
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.try_get::<String, _>("step").map_err(decode_error),
            None => Ok(String::new()),
        }
    }

    async fn save_step(&self, user_id: UserId, step: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO session_step (user_id, step, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 step = excluded.step,
                 updated_at = excluded.updated_at",
        )
        .bind(user_id.0)
        .bind(step)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use amlbot_core::domain::UserId;

    use super::SqlSessionRepository;
    use crate::repositories::SessionRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlSessionRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlSessionRepository::new(pool)
    }

    #[tokio::test]
    async fn unknown_user_starts_at_root() {
        let repo = setup().await;
        assert_eq!(repo.load_step(UserId(7)).await.expect("load"), "");
    }

    #[tokio::test]
    async fn save_overwrites_previous_step() {
        let repo = setup().await;
        let user = UserId(42);

        repo.save_step(user, "AML_USDT_trc20").await.expect("save");
        repo.save_step(user, "AML_USDT_trc20_TRX_ADDR").await.expect("overwrite");

        assert_eq!(repo.load_step(user).await.expect("load"), "AML_USDT_trc20_TRX_ADDR");
        assert_eq!(repo.load_step(UserId(43)).await.expect("load other"), "");
    }
}
