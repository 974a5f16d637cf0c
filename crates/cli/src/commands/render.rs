use std::fs;
use std::path::Path;

use amlbot_core::aml::provider::REPORT_PAYLOAD_FIELD;
use amlbot_core::aml::{
    format_report, should_escalate, EnglishLabels, ProviderCheck, RiskReport, RiskTier,
};
use serde_json::Value;

use crate::commands::CommandResult;

/// Offline rendering of a saved provider response. Nothing is sent and nothing is charged.
///
/// Accepts either a full provider response (`lowestScore` plus the report payload) or a
/// bare report payload.
pub fn run(path: &Path) -> CommandResult {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "render",
                "payload_read",
                format!("could not read `{}`: {error}", path.display()),
                2,
            );
        }
    };
    let body: Value = match serde_json::from_str(&raw) {
        Ok(body) => body,
        Err(error) => {
            return CommandResult::failure(
                "render",
                "payload_parse",
                format!("`{}` is not valid JSON: {error}", path.display()),
                3,
            );
        }
    };

    match render(&body) {
        Some(rendered) => CommandResult::success("render", rendered),
        None => CommandResult::success(
            "render",
            "provider response has no overall score; the bot would answer that the address was not found",
        ),
    }
}

fn render(body: &Value) -> Option<String> {
    let payload = if body.get(REPORT_PAYLOAD_FIELD).is_some() {
        match ProviderCheck::from_body(body) {
            ProviderCheck::Scored { report_payload, .. } => report_payload,
            ProviderCheck::NotFound => return None,
        }
    } else {
        body.clone()
    };

    let report = RiskReport::from_payload(&payload);
    let escalation = if should_escalate(&report) { "would fire" } else { "would not fire" };

    Some(format!(
        "tier: {}\nrisk score: {}%\nescalation: {escalation}\n\n{}",
        tier_name(report.tier()),
        report.risk_score(),
        format_report(&report, &EnglishLabels)
    ))
}

fn tier_name(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Low => "low",
        RiskTier::Medium => "medium",
        RiskTier::High => "high",
    }
}
