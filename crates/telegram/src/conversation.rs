use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use amlbot_core::aml::{
    asset_code, format_report, AmlProvider, BalanceLedger, EscalationNotifier, LedgerError,
    Localizer, ProviderCheck, RiskReport,
};
use amlbot_core::domain::{CheckId, CheckRecord, UserId};
use amlbot_core::errors::{ApplicationError, DomainError};
use amlbot_core::flows::{
    decode_callback, encode_step, CallbackDecodeError, FlowAction, FlowEngine, FlowEvent,
    NetworkSelection, PaymentSelection, StepToken,
};
use amlbot_db::repositories::{
    CatalogRepository, CheckRepository, PricingRepository, RepositoryError, SessionRepository,
};

use crate::keyboards::{render, MessageTemplate, Screen};

/// Idle per-user locks are pruned once the table grows past this size.
const LOCK_TABLE_PRUNE_THRESHOLD: usize = 1_024;

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<ConversationError> for ApplicationError {
    fn from(value: ConversationError) -> Self {
        match value {
            ConversationError::Repository(error) => Self::Persistence(error.to_string()),
            ConversationError::Ledger(error) => Self::Integration(error.to_string()),
        }
    }
}

/// Collaborators the conversation reads from and writes to.
#[derive(Clone)]
pub struct ConversationServices {
    pub sessions: Arc<dyn SessionRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub pricing: Arc<dyn PricingRepository>,
    pub checks: Arc<dyn CheckRepository>,
    pub provider: Arc<dyn AmlProvider>,
    pub ledger: Arc<dyn BalanceLedger>,
    pub notifier: EscalationNotifier,
}

/// Drives the address-check conversation for every user.
///
/// Each event runs load step → plan → side effects → save step while holding that
/// user's lock, so two events from one user never interleave.
pub struct AmlConversation {
    services: ConversationServices,
    labels: Arc<dyn Localizer>,
    engine: FlowEngine,
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl AmlConversation {
    pub fn new(services: ConversationServices, labels: Arc<dyn Localizer>) -> Self {
        Self { services, labels, engine: FlowEngine::new(), locks: Mutex::default() }
    }

    /// Handles a callback payload. Payloads owned by other bot features yield `None`.
    pub async fn handle_callback(
        &self,
        user_id: UserId,
        payload: &str,
        correlation_id: &str,
    ) -> Option<MessageTemplate> {
        let event = match decode_callback(payload) {
            Ok(event) => FlowEvent::Callback(event),
            Err(CallbackDecodeError::Foreign) => return None,
            Err(error) => {
                warn!(
                    event_name = "aml.callback.decode_failed",
                    correlation_id = %correlation_id,
                    user_id = %user_id,
                    error = %error,
                    "malformed callback payload; returning to root menu"
                );
                return self.respond(user_id, correlation_id, self.reset_to_root(user_id)).await;
            }
        };
        self.handle_event(user_id, event, correlation_id).await
    }

    pub async fn handle_text(
        &self,
        user_id: UserId,
        text: &str,
        correlation_id: &str,
    ) -> Option<MessageTemplate> {
        self.handle_event(user_id, FlowEvent::TextSubmitted(text.to_owned()), correlation_id).await
    }

    pub async fn handle_event(
        &self,
        user_id: UserId,
        event: FlowEvent,
        correlation_id: &str,
    ) -> Option<MessageTemplate> {
        self.respond(user_id, correlation_id, self.advance(user_id, &event, correlation_id)).await
    }

    async fn respond(
        &self,
        user_id: UserId,
        correlation_id: &str,
        step: impl std::future::Future<Output = Result<Option<Screen>, ConversationError>>,
    ) -> Option<MessageTemplate> {
        let _guard = self.lock_user(user_id).await;
        let screen = match step.await {
            Ok(screen) => screen?,
            Err(failure) => {
                let interface = ApplicationError::from(failure).into_interface(correlation_id);
                warn!(
                    event_name = "aml.conversation.failed",
                    correlation_id = %correlation_id,
                    user_id = %user_id,
                    error = %interface,
                    "conversation step failed; showing error screen"
                );
                Screen::ServiceError { correlation_id: interface.correlation_id().to_owned() }
            }
        };
        debug!(
            event_name = "aml.conversation.screen_selected",
            correlation_id = %correlation_id,
            user_id = %user_id,
            screen = screen.name(),
            "conversation screen selected"
        );
        Some(render(&screen, self.labels.as_ref()))
    }

    async fn lock_user(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() > LOCK_TABLE_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(user_id).or_default())
        };
        lock.lock_owned().await
    }

    async fn advance(
        &self,
        user_id: UserId,
        event: &FlowEvent,
        correlation_id: &str,
    ) -> Result<Option<Screen>, ConversationError> {
        let persisted = self.services.sessions.load_step(user_id).await?;
        let outcome = self.engine.plan(&persisted, event);
        if outcome.recovered {
            warn!(
                event_name = "aml.step.recovered",
                correlation_id = %correlation_id,
                user_id = %user_id,
                persisted = %persisted,
                "step token could not serve the event; recovering"
            );
        }

        match outcome.action {
            FlowAction::Ignore => Ok(None),
            FlowAction::ShowRootMenu => self.reset_to_root(user_id).await,
            FlowAction::ResolveToken { token_name } => {
                self.resolve_token(user_id, token_name, correlation_id).await
            }
            FlowAction::SelectNetwork { selection } => {
                self.select_network(user_id, selection, correlation_id).await
            }
            FlowAction::QuotePayment { selection } => {
                self.quote_payment(user_id, selection, correlation_id).await
            }
            FlowAction::CheckAddress { selection, address } => {
                self.check_address(user_id, selection, &address, correlation_id).await
            }
        }
    }

    async fn reset_to_root(&self, user_id: UserId) -> Result<Option<Screen>, ConversationError> {
        self.services.sessions.save_step(user_id, &encode_step(&StepToken::Root)).await?;
        let tokens = self.services.catalog.list_tokens().await?;
        Ok(Some(Screen::RootMenu {
            user_id,
            tokens: tokens.into_iter().map(|token| token.name).collect(),
        }))
    }

    async fn recover(
        &self,
        user_id: UserId,
        reason: DomainError,
        correlation_id: &str,
    ) -> Result<Option<Screen>, ConversationError> {
        warn!(
            event_name = "aml.step.recovered",
            correlation_id = %correlation_id,
            user_id = %user_id,
            error = %reason,
            "lookup failed; returning to root menu"
        );
        self.reset_to_root(user_id).await
    }

    async fn resolve_token(
        &self,
        user_id: UserId,
        token_name: String,
        correlation_id: &str,
    ) -> Result<Option<Screen>, ConversationError> {
        let Some(token) = self.services.catalog.find_token(&token_name).await? else {
            return self.recover(user_id, DomainError::UnknownToken { token_name }, correlation_id).await;
        };

        match token.networks.as_slice() {
            [] => self.recover(user_id, DomainError::UnknownToken { token_name }, correlation_id).await,
            [only] => match NetworkSelection::new(token.name.as_str(), only.network_type.as_str()) {
                Ok(selection) => self.select_network(user_id, selection, correlation_id).await,
                Err(error) => self.recover(user_id, error.into(), correlation_id).await,
            },
            _ => Ok(Some(Screen::NetworkMenu { token_name: token.name, networks: token.networks })),
        }
    }

    async fn select_network(
        &self,
        user_id: UserId,
        selection: NetworkSelection,
        correlation_id: &str,
    ) -> Result<Option<Screen>, ConversationError> {
        let token = self.services.catalog.find_token(selection.token_name()).await?;
        let Some(network_name) = token
            .as_ref()
            .and_then(|token| token.network(selection.network_type()))
            .map(|network| network.network_name.clone())
        else {
            let token_name = selection.token_name().to_owned();
            return self.recover(user_id, DomainError::UnknownToken { token_name }, correlation_id).await;
        };

        let step = encode_step(&StepToken::TokenSelected(selection.clone()));
        self.services.sessions.save_step(user_id, &step).await?;
        let payment_tokens = self.services.pricing.list_payment_tokens().await?;

        Ok(Some(Screen::PaymentMenu {
            token_name: selection.token_name().to_owned(),
            network_name,
            payment_tokens,
        }))
    }

    async fn quote_payment(
        &self,
        user_id: UserId,
        selection: PaymentSelection,
        correlation_id: &str,
    ) -> Result<Option<Screen>, ConversationError> {
        let payment_token_name = selection.payment_token_name().to_owned();
        let Some(fee) = self.services.pricing.fee_for(&payment_token_name).await? else {
            let reason = DomainError::MissingCommission { token_name: payment_token_name };
            return self.recover(user_id, reason, correlation_id).await;
        };

        let balance = match self.services.ledger.balance(user_id, &payment_token_name).await {
            Ok(balance) => balance,
            Err(LedgerError::MissingBalance { .. }) => Decimal::ZERO,
            Err(error) => return Err(error.into()),
        };

        let sufficient = balance > fee;
        if sufficient {
            let step = encode_step(&StepToken::PaymentSelected(selection));
            self.services.sessions.save_step(user_id, &step).await?;
        }
        info!(
            event_name = "aml.payment.quoted",
            correlation_id = %correlation_id,
            user_id = %user_id,
            payment_token = %payment_token_name,
            %balance,
            %fee,
            sufficient,
            "payment currency quoted"
        );

        Ok(Some(Screen::PaymentQuote { payment_token_name, balance, fee, sufficient }))
    }

    async fn check_address(
        &self,
        user_id: UserId,
        selection: PaymentSelection,
        address: &str,
        correlation_id: &str,
    ) -> Result<Option<Screen>, ConversationError> {
        let payment_token_name = selection.payment_token_name();
        let Some(fee) = self.services.pricing.fee_for(payment_token_name).await? else {
            let reason = DomainError::MissingCommission { token_name: payment_token_name.to_owned() };
            return self.recover(user_id, reason, correlation_id).await;
        };

        let asset = asset_code(selection.network_type()).unwrap_or_else(|| {
            warn!(
                event_name = "aml.check.asset_unmapped",
                correlation_id = %correlation_id,
                network_type = %selection.network_type(),
                "no provider asset code for network; checking without one"
            );
            ""
        });

        let (overall_score, report_payload) =
            match self.services.provider.check(address, asset).await {
                Ok(ProviderCheck::Scored { overall_score, report_payload }) => {
                    (overall_score, report_payload)
                }
                Ok(ProviderCheck::NotFound) => {
                    info!(
                        event_name = "aml.check.not_found",
                        correlation_id = %correlation_id,
                        user_id = %user_id,
                        "provider has no score for address"
                    );
                    return Ok(Some(Screen::AddressNotFound));
                }
                Err(error) => {
                    warn!(
                        event_name = "aml.check.provider_failed",
                        correlation_id = %correlation_id,
                        user_id = %user_id,
                        error = %error,
                        "provider check failed"
                    );
                    return Ok(Some(Screen::AddressNotFound));
                }
            };

        let record = CheckRecord {
            id: CheckId::generate(),
            user_id,
            address: address.to_owned(),
            score: overall_score,
            network_type: selection.network_type().to_owned(),
            asset_code: asset.to_owned(),
            payment_token_name: payment_token_name.to_owned(),
            fee,
            checked_at: Utc::now(),
        };
        if let Err(error) = self.services.checks.record(record).await {
            warn!(
                event_name = "aml.check.record_failed",
                correlation_id = %correlation_id,
                user_id = %user_id,
                error = %error,
                "failed to record completed check"
            );
        }

        let report = RiskReport::from_payload(&report_payload);
        let text = format_report(&report, self.labels.as_ref());
        let escalation = self.services.notifier.notify(&report, correlation_id).await;

        // Not atomic with the check: the report is already produced when this runs.
        if let Err(error) = self.deduct_fee(user_id, payment_token_name, fee).await {
            error!(
                event_name = "aml.check.fee_deduction_failed",
                correlation_id = %correlation_id,
                user_id = %user_id,
                payment_token = %payment_token_name,
                %fee,
                error = %error,
                "fee deduction failed after completed check"
            );
        }

        // The user has been charged by now, so a failed reset must not withhold the report.
        if let Err(error) =
            self.services.sessions.save_step(user_id, &encode_step(&StepToken::Root)).await
        {
            error!(
                event_name = "aml.step.reset_failed",
                correlation_id = %correlation_id,
                user_id = %user_id,
                error = %error,
                "failed to reset step after completed check"
            );
        }
        info!(
            event_name = "aml.check.completed",
            correlation_id = %correlation_id,
            user_id = %user_id,
            risk_score = %report.risk_score(),
            escalated = escalation.triggered,
            "address check completed"
        );

        Ok(Some(Screen::Report { text }))
    }

    async fn deduct_fee(
        &self,
        user_id: UserId,
        payment_token_name: &str,
        fee: Decimal,
    ) -> Result<(), LedgerError> {
        let balance = self.services.ledger.balance(user_id, payment_token_name).await?;
        self.services.ledger.set_balance(user_id, payment_token_name, balance - fee).await
    }
}
