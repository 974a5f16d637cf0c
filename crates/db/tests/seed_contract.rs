use amlbot_core::domain::UserId;
use amlbot_db::repositories::{
    CatalogRepository, PricingRepository, SessionRepository, SqlCatalogRepository,
    SqlPricingRepository, SqlSessionRepository,
};
use amlbot_db::{connect_with_settings, migrations, DemoCatalog};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

async fn seeded_pool() -> SeedContractTestResult<amlbot_db::DbPool> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    DemoCatalog::load(&pool).await.map_err(|error| format!("seed: {error}"))?;
    Ok(pool)
}

#[tokio::test]
async fn seeded_catalog_covers_every_mapped_network() -> SeedContractTestResult {
    let pool = seeded_pool().await?;
    let catalog = SqlCatalogRepository::new(pool);

    let tokens = catalog.list_tokens().await.map_err(|error| error.to_string())?;
    let network_types: Vec<&str> = tokens
        .iter()
        .flat_map(|token| token.networks.iter().map(|network| network.network_type.as_str()))
        .collect();

    for expected in ["trc20", "erc20", "bsc", "btc", "ltc"] {
        require!(network_types.contains(&expected), "seed is missing network `{expected}`");
    }
    require!(tokens.first().map(|token| token.name.as_str()) == Some("USDT"));
    Ok(())
}

#[tokio::test]
async fn every_seeded_payment_token_has_a_positive_fee() -> SeedContractTestResult {
    let pool = seeded_pool().await?;
    let pricing = SqlPricingRepository::new(pool);

    let payment_tokens = pricing.list_payment_tokens().await.map_err(|error| error.to_string())?;
    require!(payment_tokens.len() == 3, "expected 3 payment tokens, got {payment_tokens:?}");

    for token_name in &payment_tokens {
        let fee = pricing.fee_for(token_name).await.map_err(|error| error.to_string())?;
        require!(
            fee.is_some_and(|fee| fee > rust_decimal::Decimal::ZERO),
            "fee for `{token_name}` should be positive, got {fee:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn seeding_leaves_sessions_untouched() -> SeedContractTestResult {
    let pool = seeded_pool().await?;
    let sessions = SqlSessionRepository::new(pool.clone());
    sessions
        .save_step(UserId(9), "AML_BTC_btc")
        .await
        .map_err(|error| error.to_string())?;

    DemoCatalog::load(&pool).await.map_err(|error| format!("reseed: {error}"))?;

    let step = sessions.load_step(UserId(9)).await.map_err(|error| error.to_string())?;
    require!(step == "AML_BTC_btc", "reseed should not reset sessions, got `{step}`");
    Ok(())
}
