use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{
    DispatchError, EventContext, EventDispatcher, HandlerResult, TelegramEvent, TelegramUpdate,
};
use crate::keyboards::MessageTemplate;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("update poll failed: {0}")]
    Receive(String),
    #[error("callback answer failed: {0}")]
    Acknowledge(String),
    #[error("message send failed: {0}")]
    Send(String),
}

#[derive(Debug, Error)]
pub enum PollingError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Exponential backoff while retries remain, then the cap.
    fn delay_after(&self, failures: u32) -> Duration {
        if failures >= self.max_retries {
            Duration::from_millis(self.max_delay_ms)
        } else {
            self.backoff(failures)
        }
    }
}

#[async_trait]
pub trait UpdateTransport: Send + Sync {
    /// Long-polls for updates at or after `offset`. `Ok(None)` means the stream closed.
    async fn next_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<Option<Vec<TelegramUpdate>>, TransportError>;
    async fn answer_callback(&self, callback_id: &str) -> Result<(), TransportError>;
    async fn send_message(
        &self,
        chat_id: i64,
        message: &MessageTemplate,
    ) -> Result<(), TransportError>;
}

pub struct PollingRunner {
    transport: Arc<dyn UpdateTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl PollingRunner {
    pub fn new(
        transport: Arc<dyn UpdateTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    /// Polls until the stream closes. Transport failures never end the loop: past
    /// `max_retries` consecutive failures it keeps polling at `max_delay_ms`.
    pub async fn start(&self) -> Result<()> {
        let mut offset = None;
        let mut failures = 0_u32;

        info!(event_name = "ingress.telegram.polling_started", "starting update polling");
        loop {
            match self.transport.next_updates(offset).await {
                Ok(Some(updates)) => {
                    if failures >= self.reconnect_policy.max_retries {
                        info!(
                            event_name = "ingress.telegram.polling_recovered",
                            failures,
                            "update polling recovered"
                        );
                    }
                    failures = 0;
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.process(update).await;
                    }
                }
                Ok(None) => {
                    info!(event_name = "ingress.telegram.polling_stopped", "update stream closed");
                    return Ok(());
                }
                Err(transport_error) => {
                    warn!(
                        attempt = failures,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "update polling failed"
                    );

                    if failures == self.reconnect_policy.max_retries {
                        warn!(
                            event_name = "ingress.telegram.polling_degraded",
                            max_retries = self.reconnect_policy.max_retries,
                            max_delay_ms = self.reconnect_policy.max_delay_ms,
                            "update polling retries exhausted; polling at capped delay"
                        );
                    }

                    let delay = self.reconnect_policy.delay_after(failures);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    failures = failures.saturating_add(1);
                }
            }
        }
    }

    async fn process(&self, update: TelegramUpdate) {
        let correlation_id = format!("update-{}", update.update_id);
        let user_id = update.event.user_id().map(|user_id| user_id.to_string());

        info!(
            event_name = "ingress.telegram.update_received",
            update_id = update.update_id,
            event_type = ?update.event.event_type(),
            correlation_id = %correlation_id,
            user_id = user_id.as_deref().unwrap_or("unknown"),
            "received telegram update"
        );

        if let TelegramEvent::CallbackQuery(event) = &update.event {
            if let Err(error) = self.transport.answer_callback(&event.callback_id).await {
                warn!(
                    event_name = "ingress.telegram.callback_answered",
                    correlation_id = %correlation_id,
                    error = %error,
                    "failed to answer callback query"
                );
            } else {
                debug!(
                    event_name = "ingress.telegram.callback_answered",
                    correlation_id = %correlation_id,
                    "answered callback query"
                );
            }
        }

        if let Err(error) = self.deliver(&update, &correlation_id).await {
            warn!(
                correlation_id = %correlation_id,
                user_id = user_id.as_deref().unwrap_or("unknown"),
                error = %error,
                "update handling failed; continuing polling loop"
            );
        }
    }

    async fn deliver(&self, update: &TelegramUpdate, correlation_id: &str) -> Result<(), PollingError> {
        let context = EventContext { correlation_id: correlation_id.to_owned() };
        let HandlerResult::Responded(message) = self.dispatcher.dispatch(update, &context).await?
        else {
            debug!(correlation_id = %correlation_id, "update ignored");
            return Ok(());
        };
        let Some(chat_id) = update.event.chat_id() else {
            return Ok(());
        };

        self.transport.send_message(chat_id, &message).await?;
        debug!(
            event_name = "egress.telegram.message_sent",
            correlation_id = %correlation_id,
            chat_id,
            "sent reply"
        );
        Ok(())
    }
}
