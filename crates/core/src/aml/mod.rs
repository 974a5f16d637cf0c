pub mod asset;
pub mod escalation;
pub mod format;
pub mod labels;
pub mod provider;
pub mod report;

pub use asset::asset_code;
pub use escalation::{
    alert_text, should_escalate, EscalationChannel, EscalationError, EscalationFailure,
    EscalationNotifier, EscalationReport, ESCALATION_THRESHOLD,
};
pub use format::{escape_html, format_report};
pub use labels::{EnglishLabels, LabelKey, Localizer};
pub use provider::{AmlProvider, BalanceLedger, LedgerError, ProviderCheck, ProviderError};
pub use report::{AddressDetails, Percentage, RiskReport, RiskTier, Signal};
