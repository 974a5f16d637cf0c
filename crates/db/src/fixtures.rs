use rust_decimal::Decimal;

use amlbot_core::domain::{CatalogToken, Commission, TokenNetwork};

use crate::connection::DbPool;
use crate::repositories::{
    CatalogRepository, PricingRepository, RepositoryError, SqlCatalogRepository,
    SqlPricingRepository,
};

struct DemoToken {
    name: &'static str,
    priority_level: i32,
    networks: &'static [(&'static str, &'static str)],
    /// AML check price when paying in this token, as a decimal literal.
    aml_check: &'static str,
}

const DEMO_TOKENS: &[DemoToken] = &[
    DemoToken {
        name: "USDT",
        priority_level: 1,
        networks: &[
            ("trc20", "Tron (TRC20)"),
            ("erc20", "Ethereum (ERC20)"),
            ("bsc", "BNB Smart Chain (BEP20)"),
        ],
        aml_check: "2",
    },
    DemoToken { name: "BTC", priority_level: 2, networks: &[("btc", "Bitcoin")], aml_check: "0.00003" },
    DemoToken { name: "LTC", priority_level: 3, networks: &[("ltc", "Litecoin")], aml_check: "0.03" },
];

/// Demo catalog for local runs: USDT on three networks, BTC and LTC on their own
/// chains, each with a commission. Loading is idempotent.
pub struct DemoCatalog;

impl DemoCatalog {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let catalog = SqlCatalogRepository::new(pool.clone());
        let pricing = SqlPricingRepository::new(pool.clone());
        let mut networks_seeded = 0;

        for demo in DEMO_TOKENS {
            catalog.save_token(demo.catalog_token()).await?;
            pricing
                .save_commission(Commission {
                    token_name: demo.name.to_string(),
                    aml_check: demo.fee()?,
                })
                .await?;
            networks_seeded += demo.networks.len();
        }

        Ok(SeedResult {
            tokens_seeded: DEMO_TOKENS.iter().map(|demo| demo.name).collect(),
            networks_seeded,
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let catalog = SqlCatalogRepository::new(pool.clone());
        let pricing = SqlPricingRepository::new(pool.clone());
        let mut checks = Vec::new();

        for demo in DEMO_TOKENS {
            let token_ok = catalog
                .find_token(demo.name)
                .await?
                .is_some_and(|token| token.networks.len() == demo.networks.len());
            let fee_ok = pricing.fee_for(demo.name).await? == Some(demo.fee()?);
            checks.push((demo.name, token_ok && fee_ok));
        }

        Ok(VerificationResult { all_present: checks.iter().all(|(_, ok)| *ok), checks })
    }
}

impl DemoToken {
    fn catalog_token(&self) -> CatalogToken {
        CatalogToken {
            name: self.name.to_string(),
            priority_level: self.priority_level,
            networks: self
                .networks
                .iter()
                .map(|(network_type, network_name)| TokenNetwork {
                    network_type: network_type.to_string(),
                    network_name: network_name.to_string(),
                })
                .collect(),
        }
    }

    fn fee(&self) -> Result<Decimal, RepositoryError> {
        self.aml_check
            .parse()
            .map_err(|error| RepositoryError::Decode(format!("demo fee for {}: {error}", self.name)))
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub tokens_seeded: Vec<&'static str>,
    pub networks_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn demo_catalog_loads_idempotently() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = DemoCatalog::load(&pool).await.expect("first load");
        let second = DemoCatalog::load(&pool).await.expect("second load");
        assert_eq!(first.tokens_seeded, second.tokens_seeded);
        assert_eq!(first.networks_seeded, 5);

        let verification = DemoCatalog::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "{:?}", verification.checks);

        let tokens = SqlCatalogRepository::new(pool.clone()).list_tokens().await.expect("list");
        assert_eq!(tokens.len(), 3);
    }

    #[tokio::test]
    async fn verify_reports_missing_catalog() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");

        let verification = DemoCatalog::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        assert_eq!(verification.checks.len(), 3);
    }
}
