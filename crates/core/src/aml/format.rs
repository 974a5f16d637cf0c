//! Telegram-HTML rendering of a [`RiskReport`].

use std::fmt::Write;

use crate::aml::labels::{LabelKey, Localizer};
use crate::aml::report::{format_timestamp, RiskReport, RiskTier, Signal};

pub fn format_report(report: &RiskReport, labels: &dyn Localizer) -> String {
    let mut message = String::new();

    let _ = write!(
        message,
        "<b>{}</b> {}\n{}\n\n",
        escape_html(report.network()),
        labels.label(LabelKey::Address),
        escape_html(report.address())
    );
    let _ = writeln!(message, "<b>{}</b>", labels.label(tier_banner(report.tier())));
    let _ = write!(message, "{}<b>{}%</b>\n\n", labels.label(LabelKey::RiskScore), report.risk_score());
    let _ = write!(message, "{}\n\n", labels.label(LabelKey::DetailedAnalysis));

    for tier in [RiskTier::Low, RiskTier::Medium, RiskTier::High] {
        let _ = writeln!(message, "{}", labels.label(section_heading(tier)));
        for (signal, value) in report.signals_in(tier) {
            let _ = writeln!(message, "{} - <b>{value}%</b>", labels.label(signal_label(signal)));
        }
        message.push('\n');
    }

    if let Some(details) = report.address_details() {
        if let Some(count) = details.transaction_count {
            let _ = writeln!(message, "{} {count}", labels.label(LabelKey::Transactions));
        }
        if let Some(created_at) = details.created_at {
            let _ = writeln!(
                message,
                "{} {}",
                labels.label(LabelKey::WasCreated),
                format_timestamp(created_at)
            );
        }
    }

    let _ = write!(
        message,
        "\n{} {}. {} {}",
        escape_html(report.flow_mode()),
        labels.label(LabelKey::Mode),
        labels.label(LabelKey::Checked),
        format_timestamp(report.checked_at())
    );

    message
}

pub fn tier_banner(tier: RiskTier) -> LabelKey {
    match tier {
        RiskTier::Low => LabelKey::LowRiskAddress,
        RiskTier::Medium => LabelKey::MediumRiskAddress,
        RiskTier::High => LabelKey::HighRiskAddress,
    }
}

fn section_heading(tier: RiskTier) -> LabelKey {
    match tier {
        RiskTier::Low => LabelKey::LowRiskSection,
        RiskTier::Medium => LabelKey::MediumRiskSection,
        RiskTier::High => LabelKey::HighRiskSection,
    }
}

fn signal_label(signal: Signal) -> LabelKey {
    match signal {
        Signal::Other => LabelKey::SignalOther,
        Signal::Payment => LabelKey::SignalPayment,
        Signal::Wallet => LabelKey::SignalWallet,
        Signal::Exchange => LabelKey::SignalExchange,
        Signal::LiquidityPools => LabelKey::SignalLiquidityPools,
        Signal::ExchangeHighRisk => LabelKey::SignalExchangeHighRisk,
        Signal::P2pExchangeHighRisk => LabelKey::SignalP2pExchangeHighRisk,
        Signal::Gambling => LabelKey::SignalGambling,
        Signal::Sanctions => LabelKey::SignalSanctions,
        Signal::StolenCoins => LabelKey::SignalStolenCoins,
    }
}

/// Escapes text interpolated into Telegram HTML messages.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
