use std::sync::Arc;

use amlbot_core::aml::{EnglishLabels, EscalationNotifier};
use amlbot_core::config::{AppConfig, ConfigError, LoadOptions};
use amlbot_db::repositories::{
    SqlCatalogRepository, SqlCheckRepository, SqlPricingRepository, SqlSessionRepository,
};
use amlbot_db::{connect_with_settings, migrations, DbPool};
use amlbot_telegram::{
    conversation_dispatcher, AmlConversation, ConversationServices, PollingRunner,
    ReconnectPolicy,
};
use thiserror::Error;
use tracing::info;

use crate::backend::{BackendClient, ClientError};
use crate::telegram::BotApiClient;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runner: PollingRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.validate()?;

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let bot = Arc::new(BotApiClient::new(&config.telegram)?);
    let backend = Arc::new(BackendClient::new(&config.backend)?);
    let notifier = EscalationNotifier::new(config.escalation.recipients.clone(), bot.clone());

    let conversation = AmlConversation::new(
        ConversationServices {
            sessions: Arc::new(SqlSessionRepository::new(db_pool.clone())),
            catalog: Arc::new(SqlCatalogRepository::new(db_pool.clone())),
            pricing: Arc::new(SqlPricingRepository::new(db_pool.clone())),
            checks: Arc::new(SqlCheckRepository::new(db_pool.clone())),
            provider: backend.clone(),
            ledger: backend,
            notifier,
        },
        Arc::new(EnglishLabels),
    );
    let runner = PollingRunner::new(
        bot,
        conversation_dispatcher(Arc::new(conversation)),
        ReconnectPolicy::default(),
    );
    info!(
        event_name = "system.bootstrap.completed",
        correlation_id = "bootstrap",
        escalation_recipients = config.escalation.recipients.len(),
        "conversation wired to telegram transport"
    );

    Ok(Application { config, db_pool, runner })
}
