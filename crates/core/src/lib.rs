pub mod aml;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use aml::{
    EnglishLabels, EscalationChannel, EscalationNotifier, EscalationReport, LabelKey, Localizer,
    RiskReport, RiskTier,
};
pub use domain::{CatalogToken, CheckRecord, Commission, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{FlowAction, FlowEngine, FlowEvent, StepToken};
