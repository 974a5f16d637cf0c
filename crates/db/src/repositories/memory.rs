use std::collections::HashMap;

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use amlbot_core::domain::{CatalogToken, CheckRecord, Commission, UserId};

use super::{
    CatalogRepository, CheckRepository, PricingRepository, RepositoryError, SessionRepository,
};

#[derive(Default)]
pub struct InMemorySessionRepository {
    steps: RwLock<HashMap<UserId, String>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load_step(&self, user_id: UserId) -> Result<String, RepositoryError> {
        let steps = self.steps.read().await;
        Ok(steps.get(&user_id).cloned().unwrap_or_default())
    }

    async fn save_step(&self, user_id: UserId, step: &str) -> Result<(), RepositoryError> {
        let mut steps = self.steps.write().await;
        steps.insert(user_id, step.to_owned());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    tokens: RwLock<HashMap<String, CatalogToken>>,
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_tokens(&self) -> Result<Vec<CatalogToken>, RepositoryError> {
        let tokens = self.tokens.read().await;
        let mut listed: Vec<CatalogToken> = tokens.values().cloned().collect();
        listed.sort_by(|a, b| (a.priority_level, &a.name).cmp(&(b.priority_level, &b.name)));
        Ok(listed)
    }

    async fn find_token(&self, name: &str) -> Result<Option<CatalogToken>, RepositoryError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(name).cloned())
    }

    async fn save_token(&self, token: CatalogToken) -> Result<(), RepositoryError> {
        let mut tokens = self.tokens.write().await;
        tokens.insert(token.name.clone(), token);
        Ok(())
    }
}

/// Commissions keyed by payment token; ordering follows the priorities given to
/// [`InMemoryPricingRepository::with_priorities`], unknown tokens last.
#[derive(Default)]
pub struct InMemoryPricingRepository {
    commissions: RwLock<HashMap<String, Decimal>>,
    priorities: HashMap<String, i32>,
}

impl InMemoryPricingRepository {
    pub fn with_priorities(priorities: impl IntoIterator<Item = (String, i32)>) -> Self {
        Self { commissions: RwLock::default(), priorities: priorities.into_iter().collect() }
    }
}

#[async_trait::async_trait]
impl PricingRepository for InMemoryPricingRepository {
    async fn fee_for(&self, token_name: &str) -> Result<Option<Decimal>, RepositoryError> {
        let commissions = self.commissions.read().await;
        Ok(commissions.get(token_name).copied())
    }

    async fn list_payment_tokens(&self) -> Result<Vec<String>, RepositoryError> {
        let commissions = self.commissions.read().await;
        let mut names: Vec<String> = commissions.keys().cloned().collect();
        names.sort_by_key(|name| (self.priorities.get(name).copied().unwrap_or(i32::MAX), name.clone()));
        Ok(names)
    }

    async fn save_commission(&self, commission: Commission) -> Result<(), RepositoryError> {
        let mut commissions = self.commissions.write().await;
        commissions.insert(commission.token_name, commission.aml_check);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCheckRepository {
    records: RwLock<Vec<CheckRecord>>,
}

impl InMemoryCheckRepository {
    pub async fn all(&self) -> Vec<CheckRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait::async_trait]
impl CheckRepository for InMemoryCheckRepository {
    async fn record(&self, record: CheckRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CheckRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut listed: Vec<CheckRecord> =
            records.iter().filter(|record| record.user_id == user_id).cloned().collect();
        listed.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use amlbot_core::domain::{CatalogToken, Commission, UserId};
    use rust_decimal::Decimal;

    use crate::repositories::{
        CatalogRepository, InMemoryCatalogRepository, InMemoryPricingRepository,
        InMemorySessionRepository, PricingRepository, SessionRepository,
    };

    #[tokio::test]
    async fn in_memory_session_defaults_to_root() {
        let repo = InMemorySessionRepository::default();
        assert_eq!(repo.load_step(UserId(1)).await.expect("load"), "");

        repo.save_step(UserId(1), "AML_BTC_btc").await.expect("save");
        assert_eq!(repo.load_step(UserId(1)).await.expect("load"), "AML_BTC_btc");
    }

    #[tokio::test]
    async fn in_memory_catalog_orders_by_priority() {
        let repo = InMemoryCatalogRepository::default();
        for (name, priority_level) in [("LTC", 3), ("USDT", 1), ("BTC", 2)] {
            repo.save_token(CatalogToken { name: name.to_owned(), priority_level, networks: vec![] })
                .await
                .expect("save");
        }

        let names: Vec<String> =
            repo.list_tokens().await.expect("list").into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["USDT", "BTC", "LTC"]);
    }

    #[tokio::test]
    async fn in_memory_pricing_orders_by_configured_priority() {
        let repo = InMemoryPricingRepository::with_priorities([
            ("USDT".to_owned(), 1),
            ("TRX".to_owned(), 2),
        ]);
        for token_name in ["TRX", "BTC", "USDT"] {
            repo.save_commission(Commission { token_name: token_name.to_owned(), aml_check: Decimal::ONE })
                .await
                .expect("save");
        }

        assert_eq!(
            repo.list_payment_tokens().await.expect("list"),
            vec!["USDT".to_owned(), "TRX".to_owned(), "BTC".to_owned()]
        );
    }
}
