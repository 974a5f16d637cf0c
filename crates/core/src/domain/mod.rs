use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Telegram user id; also the chat id of the user's private chat with the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenNetwork {
    /// Short code used in step tokens and callbacks, e.g. `trc20`.
    pub network_type: String,
    /// Display name, e.g. `Tron (TRC20)`.
    pub network_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogToken {
    pub name: String,
    pub priority_level: i32,
    pub networks: Vec<TokenNetwork>,
}

impl CatalogToken {
    pub fn network(&self, network_type: &str) -> Option<&TokenNetwork> {
        self.networks.iter().find(|network| network.network_type == network_type)
    }
}

/// Price of one AML check when paid in `token_name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    pub token_name: String,
    pub aml_check: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckId(pub String);

impl CheckId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// One completed provider check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: CheckId,
    pub user_id: UserId,
    pub address: String,
    pub score: Decimal,
    pub network_type: String,
    pub asset_code: String,
    pub payment_token_name: String,
    pub fee: Decimal,
    pub checked_at: DateTime<Utc>,
}

/// Plain positional rendering of an amount: trailing zeros dropped, never scientific.
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}
