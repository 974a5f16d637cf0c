use serde::{Deserialize, Serialize};

/// Fixed user-visible phrases. Dynamic values (names, amounts, scores) are appended by
/// the caller, never embedded in a label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKey {
    // Report
    Address,
    LowRiskAddress,
    MediumRiskAddress,
    HighRiskAddress,
    RiskScore,
    DetailedAnalysis,
    LowRiskSection,
    MediumRiskSection,
    HighRiskSection,
    SignalOther,
    SignalPayment,
    SignalWallet,
    SignalExchange,
    SignalLiquidityPools,
    SignalExchangeHighRisk,
    SignalP2pExchangeHighRisk,
    SignalGambling,
    SignalSanctions,
    SignalStolenCoins,
    Transactions,
    WasCreated,
    Mode,
    Checked,
    // Menus
    AccountId,
    SelectedAml,
    Selected,
    SelectChain,
    SelectPaymentCurrency,
    PaymentToken,
    AvailableBalance,
    Fee,
    InsufficientFunds,
    EnterAddress,
    AddressNotFound,
    ServiceUnavailable,
    Back,
}

/// Label lookup; implementations back onto whatever translation catalog the deployment
/// uses.
pub trait Localizer: Send + Sync {
    fn label(&self, key: LabelKey) -> &str;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EnglishLabels;

impl Localizer for EnglishLabels {
    fn label(&self, key: LabelKey) -> &str {
        match key {
            LabelKey::Address => "address",
            LabelKey::LowRiskAddress => "Low risk address",
            LabelKey::MediumRiskAddress => "Medium risk address",
            LabelKey::HighRiskAddress => "High risk address",
            LabelKey::RiskScore => "Risk score: ",
            LabelKey::DetailedAnalysis => "Detailed analysis:",
            LabelKey::LowRiskSection => "Low risk",
            LabelKey::MediumRiskSection => "Medium risk",
            LabelKey::HighRiskSection => "High risk",
            LabelKey::SignalOther => "Other",
            LabelKey::SignalPayment => "Payment management",
            LabelKey::SignalWallet => "Wallet",
            LabelKey::SignalExchange => "Exchange",
            LabelKey::SignalLiquidityPools => "Liquidity pools",
            LabelKey::SignalExchangeHighRisk => "Exchange with high ML risk",
            LabelKey::SignalP2pExchangeHighRisk => "P2P exchange with high ML risk",
            LabelKey::SignalGambling => "Gambling",
            LabelKey::SignalSanctions => "Sanctions",
            LabelKey::SignalStolenCoins => "Stolen coins",
            LabelKey::Transactions => "Transactions:",
            LabelKey::WasCreated => "Created:",
            LabelKey::Mode => "mode",
            LabelKey::Checked => "Checked",
            LabelKey::AccountId => "Account ID: ",
            LabelKey::SelectedAml => "Select the token of the address you want to check.",
            LabelKey::Selected => "Selected",
            LabelKey::SelectChain => "Network",
            LabelKey::SelectPaymentCurrency => "Select the currency to pay for the check.",
            LabelKey::PaymentToken => "will be used for payment.",
            LabelKey::AvailableBalance => "Available balance:",
            LabelKey::Fee => "Fee:",
            LabelKey::InsufficientFunds => "Insufficient funds. Top up your balance or pick another currency.",
            LabelKey::EnterAddress => "Send the address you want to check.",
            LabelKey::AddressNotFound => {
                "Incorrect address or we don't have info about your wallet."
            }
            LabelKey::ServiceUnavailable => {
                "The check service is temporarily unavailable. Please retry shortly."
            }
            LabelKey::Back => "Back",
        }
    }
}
