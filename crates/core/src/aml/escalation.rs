use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::aml::report::{format_timestamp, RiskReport};

/// Scores strictly above this value are escalated to operators.
///
/// Note the high-risk banner starts at `65.0` inclusive while escalation needs more
/// than `65.0`.
pub const ESCALATION_THRESHOLD: Decimal = Decimal::from_parts(650, 0, 0, false, 1);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EscalationError {
    #[error("escalation delivery failed: {0}")]
    Delivery(String),
}

/// Out-of-band channel used to reach one operator.
#[async_trait]
pub trait EscalationChannel: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), EscalationError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EscalationFailure {
    pub recipient: String,
    pub reason: String,
}

/// Aggregated outcome of one fan-out. Never turned back into an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EscalationReport {
    pub triggered: bool,
    pub delivered: Vec<String>,
    pub failed: Vec<EscalationFailure>,
}

pub fn should_escalate(report: &RiskReport) -> bool {
    report.risk_score().value() > ESCALATION_THRESHOLD
}

pub fn alert_text(report: &RiskReport) -> String {
    format!(
        "AML Alert:\nUser: {} - {}\nRisk Score: {}%\nChecked Time: {}\n",
        report.network(),
        report.address(),
        report.risk_score(),
        format_timestamp(report.checked_at())
    )
}

#[derive(Clone)]
pub struct EscalationNotifier {
    recipients: Vec<String>,
    channel: Arc<dyn EscalationChannel>,
}

impl EscalationNotifier {
    pub fn new(recipients: Vec<String>, channel: Arc<dyn EscalationChannel>) -> Self {
        Self { recipients, channel }
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Alerts every recipient when the report crosses the threshold. Recipients are
    /// tried in order; one failure does not stop the rest.
    pub async fn notify(&self, report: &RiskReport, correlation_id: &str) -> EscalationReport {
        if !should_escalate(report) {
            return EscalationReport::default();
        }

        let text = alert_text(report);
        let mut outcome = EscalationReport { triggered: true, ..EscalationReport::default() };

        for recipient in &self.recipients {
            match self.channel.send(recipient, &text).await {
                Ok(()) => outcome.delivered.push(recipient.clone()),
                Err(error) => {
                    warn!(
                        event_name = "aml.escalation.delivery_failed",
                        correlation_id = %correlation_id,
                        recipient = %recipient,
                        error = %error,
                        "failed to deliver escalation alert"
                    );
                    outcome
                        .failed
                        .push(EscalationFailure { recipient: recipient.clone(), reason: error.to_string() });
                }
            }
        }

        info!(
            event_name = "aml.escalation.completed",
            correlation_id = %correlation_id,
            risk_score = %report.risk_score(),
            delivered = outcome.delivered.len(),
            failed = outcome.failed.len(),
            "escalation fan-out completed"
        );

        outcome
    }
}
