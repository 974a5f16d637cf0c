use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use amlbot_core::domain::{CatalogToken, CheckRecord, Commission, UserId};

pub mod catalog;
pub mod check;
pub mod memory;
pub mod pricing;
pub mod session;

pub use catalog::SqlCatalogRepository;
pub use check::SqlCheckRepository;
pub use memory::{
    InMemoryCatalogRepository, InMemoryCheckRepository, InMemoryPricingRepository,
    InMemorySessionRepository,
};
pub use pricing::SqlPricingRepository;
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Persisted step token per user. A user without a row is at the root menu.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load_step(&self, user_id: UserId) -> Result<String, RepositoryError>;
    async fn save_step(&self, user_id: UserId, step: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Checkable tokens ordered by priority level, then name.
    async fn list_tokens(&self) -> Result<Vec<CatalogToken>, RepositoryError>;
    async fn find_token(&self, name: &str) -> Result<Option<CatalogToken>, RepositoryError>;
    async fn save_token(&self, token: CatalogToken) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PricingRepository: Send + Sync {
    async fn fee_for(&self, token_name: &str) -> Result<Option<Decimal>, RepositoryError>;
    /// Tokens a check can be paid in, ordered by the token's priority level.
    async fn list_payment_tokens(&self) -> Result<Vec<String>, RepositoryError>;
    async fn save_commission(&self, commission: Commission) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CheckRepository: Send + Sync {
    async fn record(&self, record: CheckRecord) -> Result<(), RepositoryError>;
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CheckRecord>, RepositoryError>;
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
