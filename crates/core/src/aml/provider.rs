use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use crate::domain::UserId;

/// Field that marks a provider response as a completed check.
pub const OVERALL_SCORE_FIELD: &str = "lowestScore";
/// Field holding the risk payload the report is built from.
pub const REPORT_PAYLOAD_FIELD: &str = "AML";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider transport failure: {0}")]
    Transport(String),
    #[error("provider responded with status {0}")]
    Status(u16),
    #[error("provider response could not be decoded: {0}")]
    Malformed(String),
}

/// Outcome of one provider check.
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderCheck {
    /// No overall score: the address is unknown or the provider lacks data.
    NotFound,
    Scored { overall_score: Decimal, report_payload: Value },
}

impl ProviderCheck {
    pub fn from_body(body: &Value) -> Self {
        let Some(score) = body.get(OVERALL_SCORE_FIELD) else {
            return Self::NotFound;
        };
        let overall_score = match score {
            Value::Number(number) => Decimal::from_str(&number.to_string())
                .or_else(|_| Decimal::from_scientific(&number.to_string()))
                .ok(),
            Value::String(raw) => Decimal::from_str(raw.trim()).ok(),
            _ => None,
        };
        match overall_score {
            Some(overall_score) => Self::Scored {
                overall_score,
                report_payload: body.get(REPORT_PAYLOAD_FIELD).cloned().unwrap_or(Value::Null),
            },
            None => Self::NotFound,
        }
    }
}

#[async_trait]
pub trait AmlProvider: Send + Sync {
    async fn check(&self, address: &str, asset_code: &str) -> Result<ProviderCheck, ProviderError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger transport failure: {0}")]
    Transport(String),
    #[error("ledger responded with status {0}")]
    Status(u16),
    #[error("no `{token_name}` balance for user {user_id}")]
    MissingBalance { user_id: UserId, token_name: String },
    #[error("ledger response could not be decoded: {0}")]
    Malformed(String),
}

/// Per-user token balances held by the backend.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    async fn balance(&self, user_id: UserId, token_name: &str) -> Result<Decimal, LedgerError>;

    async fn set_balance(
        &self,
        user_id: UserId,
        token_name: &str,
        amount: Decimal,
    ) -> Result<(), LedgerError>;
}
