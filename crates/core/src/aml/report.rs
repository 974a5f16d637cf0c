use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use serde_json::Value;

/// Layout of upstream timestamps such as `2024-03-07 13:45:02`.
pub const UPSTREAM_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Long human form used in reports, e.g. `07 March 2024 13:45`.
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%d %B %Y %H:%M";

const DEFAULT_RISK_FRACTION: Decimal = Decimal::from_parts(50, 0, 0, false, 2);

/// Percentage in `[0, 100]` with exactly one fractional digit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Percentage(Decimal);

impl Percentage {
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, 1));

    /// Scales a `[0, 1]` fraction to a percentage. Out-of-range input is clamped.
    pub fn from_fraction(fraction: Decimal) -> Self {
        let clamped = fraction.clamp(Decimal::ZERO, Decimal::ONE);
        Self::from_percent(clamped * Decimal::ONE_HUNDRED)
    }

    pub fn from_percent(percent: Decimal) -> Self {
        let mut value = percent.round_dp_with_strategy(1, RoundingStrategy::MidpointNearestEven);
        value.rescale(1);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    const MEDIUM_FLOOR: Decimal = Decimal::from_parts(40, 0, 0, false, 0);
    const HIGH_FLOOR: Decimal = Decimal::from_parts(65, 0, 0, false, 0);

    /// `< 40` low, `[40, 65)` medium, `>= 65` high.
    pub fn classify(score: Percentage) -> Self {
        let value = score.value();
        if value < Self::MEDIUM_FLOOR {
            Self::Low
        } else if value < Self::HIGH_FLOOR {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// A named sub-component of the overall risk score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Other,
    Payment,
    Wallet,
    Exchange,
    LiquidityPools,
    ExchangeHighRisk,
    P2pExchangeHighRisk,
    Gambling,
    Sanctions,
    StolenCoins,
}

impl Signal {
    /// Report order: low-risk signals, then medium, then high.
    pub const ALL: [Signal; 10] = [
        Signal::Other,
        Signal::Payment,
        Signal::Wallet,
        Signal::Exchange,
        Signal::LiquidityPools,
        Signal::ExchangeHighRisk,
        Signal::P2pExchangeHighRisk,
        Signal::Gambling,
        Signal::Sanctions,
        Signal::StolenCoins,
    ];

    pub fn payload_key(self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Payment => "payment",
            Self::Wallet => "wallet",
            Self::Exchange => "exchange",
            Self::LiquidityPools => "liquidity_pools",
            Self::ExchangeHighRisk => "exchange_mlrisk_high",
            Self::P2pExchangeHighRisk => "p2p_exchange_mlrisk_high",
            Self::Gambling => "gambling",
            Self::Sanctions => "sanctions",
            Self::StolenCoins => "stolen_coins",
        }
    }

    pub fn tier(self) -> RiskTier {
        match self {
            Self::Other | Self::Payment | Self::Wallet | Self::Exchange => RiskTier::Low,
            Self::LiquidityPools | Self::ExchangeHighRisk | Self::P2pExchangeHighRisk => {
                RiskTier::Medium
            }
            Self::Gambling | Self::Sanctions | Self::StolenCoins => RiskTier::High,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Other => 0,
            Self::Payment => 1,
            Self::Wallet => 2,
            Self::Exchange => 3,
            Self::LiquidityPools => 4,
            Self::ExchangeHighRisk => 5,
            Self::P2pExchangeHighRisk => 6,
            Self::Gambling => 7,
            Self::Sanctions => 8,
            Self::StolenCoins => 9,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AddressDetails {
    pub transaction_count: Option<u64>,
    pub created_at: Option<NaiveDateTime>,
}

/// Typed view of one provider risk payload. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RiskReport {
    network: String,
    address: String,
    risk_score: Percentage,
    signals: [Percentage; 10],
    address_details: Option<AddressDetails>,
    flow_mode: String,
    checked_at: NaiveDateTime,
}

impl RiskReport {
    /// Builds a report from the provider's `AML` object, using the current time when the
    /// payload carries no usable timestamp.
    pub fn from_payload(payload: &Value) -> Self {
        Self::from_payload_at(payload, Utc::now().naive_utc())
    }

    /// Builds a report from the provider's `AML` object. Missing or malformed fields fall
    /// back to defaults; this never fails.
    pub fn from_payload_at(payload: &Value, now: NaiveDateTime) -> Self {
        let data = payload.get("data").unwrap_or(&Value::Null);

        let risk_score = Percentage::from_fraction(
            data.get("riskscore").and_then(decimal_from_json).unwrap_or(DEFAULT_RISK_FRACTION),
        );

        let signals_payload = data.get("signals").unwrap_or(&Value::Null);
        let signals = Signal::ALL.map(|signal| {
            signals_payload
                .get(signal.payload_key())
                .and_then(decimal_from_json)
                .map(Percentage::from_fraction)
                .unwrap_or(Percentage::ZERO)
        });

        let address_details = data
            .get("addressDetailsData")
            .filter(|details| is_present(details))
            .map(|details| AddressDetails {
                transaction_count: details.get("n_txs").and_then(count_from_json),
                created_at: details.get("created").and_then(timestamp_from_json),
            });

        let checked_at = data.get("timestamp").and_then(timestamp_from_json).unwrap_or(now);

        Self {
            network: string_field(data, "network"),
            address: string_field(data, "address"),
            risk_score,
            signals,
            address_details,
            flow_mode: capitalize(payload.get("amlFlow").and_then(Value::as_str).unwrap_or("")),
            checked_at,
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn risk_score(&self) -> Percentage {
        self.risk_score
    }

    pub fn tier(&self) -> RiskTier {
        RiskTier::classify(self.risk_score)
    }

    pub fn signal(&self, signal: Signal) -> Percentage {
        self.signals[signal.index()]
    }

    /// Signals of one tier section, in report order.
    pub fn signals_in(&self, tier: RiskTier) -> impl Iterator<Item = (Signal, Percentage)> + '_ {
        Signal::ALL
            .into_iter()
            .filter(move |signal| signal.tier() == tier)
            .map(|signal| (signal, self.signal(signal)))
    }

    pub fn address_details(&self) -> Option<&AddressDetails> {
        self.address_details.as_ref()
    }

    pub fn flow_mode(&self) -> &str {
        &self.flow_mode
    }

    pub fn checked_at(&self) -> NaiveDateTime {
        self.checked_at
    }
}

pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(DISPLAY_TIMESTAMP_FORMAT).to_string()
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn string_field(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        _ => String::new(),
    }
}

fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => {
            let raw = number.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()
                .or_else(|| number.as_f64().and_then(Decimal::from_f64))
        }
        Value::String(raw) => Decimal::from_str(raw.trim()).ok(),
        _ => None,
    }
}

fn count_from_json(value: &Value) -> Option<u64> {
    let count = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }?;
    (count > 0).then_some(count)
}

fn timestamp_from_json(value: &Value) -> Option<NaiveDateTime> {
    value
        .as_str()
        .and_then(|raw| NaiveDateTime::parse_from_str(raw.trim(), UPSTREAM_TIMESTAMP_FORMAT).ok())
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{format_timestamp, Percentage, RiskReport, RiskTier, Signal};

    fn fixed_now() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 2)
            .and_then(|date| date.and_hms_opt(3, 4, 5))
            .expect("valid timestamp")
    }

    fn percent(raw: &str) -> Percentage {
        Percentage::from_percent(raw.parse::<Decimal>().expect("decimal literal"))
    }

    #[test]
    fn fraction_scales_to_one_decimal_percentage() {
        let value = Percentage::from_fraction("0.654321".parse().expect("decimal"));
        assert_eq!(value.to_string(), "65.4");
        assert_eq!(Percentage::from_fraction(Decimal::ONE).to_string(), "100.0");
        assert_eq!(Percentage::from_fraction("1.7".parse().expect("decimal")).to_string(), "100.0");
        assert_eq!(Percentage::ZERO.to_string(), "0.0");
    }

    #[test]
    fn tier_boundaries_are_inclusive_exclusive() {
        let tiers = ["39.9", "40.0", "64.9", "65.0", "65.1"]
            .map(|raw| RiskTier::classify(percent(raw)));
        assert_eq!(
            tiers,
            [RiskTier::Low, RiskTier::Medium, RiskTier::Medium, RiskTier::High, RiskTier::High]
        );
    }

    #[test]
    fn missing_signals_default_to_zero() {
        let report = RiskReport::from_payload_at(&json!({ "data": { "riskscore": 0.3 } }), fixed_now());
        for signal in Signal::ALL {
            assert_eq!(report.signal(signal).to_string(), "0.0", "{signal:?}");
        }
    }

    #[test]
    fn absent_risk_score_defaults_to_half() {
        let report = RiskReport::from_payload_at(&json!({}), fixed_now());
        assert_eq!(report.risk_score().to_string(), "50.0");
        assert_eq!(report.tier(), RiskTier::Medium);
        assert_eq!(report.checked_at(), fixed_now());
        assert_eq!(report.network(), "");
        assert!(report.address_details().is_none());
    }

    #[test]
    fn payload_fields_map_onto_report() {
        let payload = json!({
            "amlFlow": "manual",
            "data": {
                "network": "TRX",
                "address": "TXyz",
                "riskscore": 0.7,
                "signals": { "sanctions": 0.9, "exchange_mlrisk_high": 0.125 },
                "addressDetailsData": { "n_txs": 42, "created": "2021-06-01 08:00:00" },
                "timestamp": "2024-03-07 13:45:02"
            }
        });

        let report = RiskReport::from_payload_at(&payload, fixed_now());

        assert_eq!(report.network(), "TRX");
        assert_eq!(report.address(), "TXyz");
        assert_eq!(report.risk_score().to_string(), "70.0");
        assert_eq!(report.signal(Signal::Sanctions).to_string(), "90.0");
        assert_eq!(report.signal(Signal::ExchangeHighRisk).to_string(), "12.5");
        assert_eq!(report.flow_mode(), "Manual");
        assert_eq!(format_timestamp(report.checked_at()), "07 March 2024 13:45");

        let details = report.address_details().expect("details present");
        assert_eq!(details.transaction_count, Some(42));
        assert_eq!(details.created_at.map(format_timestamp).as_deref(), Some("01 June 2021 08:00"));
    }

    #[test]
    fn signal_sections_keep_fixed_order() {
        let report = RiskReport::from_payload_at(&json!({}), fixed_now());
        let medium: Vec<Signal> = report.signals_in(RiskTier::Medium).map(|(s, _)| s).collect();
        assert_eq!(
            medium,
            vec![Signal::LiquidityPools, Signal::ExchangeHighRisk, Signal::P2pExchangeHighRisk]
        );
    }

    #[test]
    fn malformed_details_degrade_instead_of_failing() {
        let payload = json!({
            "data": {
                "riskscore": "0.41",
                "addressDetailsData": { "n_txs": 0, "created": "yesterday" },
                "timestamp": 1700000000
            }
        });

        let report = RiskReport::from_payload_at(&payload, fixed_now());

        assert_eq!(report.risk_score().to_string(), "41.0");
        let details = report.address_details().expect("details object present");
        assert_eq!(details.transaction_count, None);
        assert_eq!(details.created_at, None);
        assert_eq!(report.checked_at(), fixed_now());
    }
}
