use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use amlbot_core::aml::{EscalationChannel, EscalationError};
use amlbot_core::config::TelegramConfig;
use amlbot_core::domain::UserId;
use amlbot_telegram::events::{CallbackQueryEvent, TextMessageEvent};
use amlbot_telegram::{MessageTemplate, TelegramEvent, TelegramUpdate, TransportError, UpdateTransport};

use crate::backend::ClientError;

/// Headroom on top of the long-poll timeout before the HTTP client gives up.
const POLL_GRACE_SECS: u64 = 10;

/// Bot API client: update source, reply sink and escalation channel.
pub struct BotApiClient {
    http: Client,
    endpoint: String,
    poll_timeout_secs: u64,
}

impl BotApiClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + POLL_GRACE_SECS))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/bot{}",
                config.api_base_url.trim_end_matches('/'),
                config.bot_token.expose_secret()
            ),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    async fn call<T: Serialize + ?Sized>(&self, method: &str, body: &T) -> Result<Value, String> {
        let response = self
            .http
            .post(format!("{}/{method}", self.endpoint))
            .json(body)
            .send()
            .await
            // reqwest errors embed the URL, which carries the bot token.
            .map_err(|error| format!("{method} request failed: {}", error.without_url()))?;

        let status = response.status();
        let envelope: ApiEnvelope = response
            .json()
            .await
            .map_err(|error| format!("{method} returned unreadable body ({status}): {}", error.without_url()))?;
        if !envelope.ok {
            return Err(format!(
                "{method} rejected ({status}): {}",
                envelope.description.unwrap_or_default()
            ));
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    result: Option<Value>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    update_id: i64,
    message: Option<RawMessage>,
    callback_query: Option<RawCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    chat: RawChat,
    from: Option<RawUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCallbackQuery {
    id: String,
    from: RawUser,
    message: Option<RawMessage>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: i64,
}

impl From<RawUpdate> for TelegramUpdate {
    fn from(raw: RawUpdate) -> Self {
        let event = match (raw.callback_query, raw.message) {
            (Some(query), _) => match query.data {
                Some(data) => TelegramEvent::CallbackQuery(CallbackQueryEvent {
                    callback_id: query.id,
                    user_id: UserId(query.from.id),
                    chat_id: query.message.map_or(query.from.id, |message| message.chat.id),
                    data,
                }),
                None => TelegramEvent::Unsupported { kind: "callback_query_without_data".to_owned() },
            },
            (None, Some(RawMessage { chat, from: Some(from), text: Some(text) })) => {
                TelegramEvent::TextMessage(TextMessageEvent {
                    user_id: UserId(from.id),
                    chat_id: chat.id,
                    text,
                })
            }
            (None, Some(_)) => TelegramEvent::Unsupported { kind: "non_text_message".to_owned() },
            (None, None) => TelegramEvent::Unsupported { kind: "unknown".to_owned() },
        };
        Self { update_id: raw.update_id, event }
    }
}

fn parse_updates(result: Value) -> Result<Vec<TelegramUpdate>, String> {
    let raw: Vec<RawUpdate> =
        serde_json::from_value(result).map_err(|error| format!("unreadable updates: {error}"))?;
    Ok(raw.into_iter().map(TelegramUpdate::from).collect())
}

fn send_message_body(chat_id: &str, message: &MessageTemplate) -> Value {
    let mut body = serde_json::json!({
        "chat_id": chat_id,
        "text": message.text,
        "parse_mode": "HTML",
    });
    if !message.keyboard.is_empty() {
        body["reply_markup"] = serde_json::json!({ "inline_keyboard": message.keyboard });
    }
    body
}

#[async_trait]
impl UpdateTransport for BotApiClient {
    async fn next_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<Option<Vec<TelegramUpdate>>, TransportError> {
        let mut body = serde_json::json!({
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = offset.into();
        }
        let result = self.call("getUpdates", &body).await.map_err(TransportError::Receive)?;
        parse_updates(result).map(Some).map_err(TransportError::Receive)
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), TransportError> {
        self.call("answerCallbackQuery", &serde_json::json!({ "callback_query_id": callback_id }))
            .await
            .map(|_| ())
            .map_err(TransportError::Acknowledge)
    }

    async fn send_message(
        &self,
        chat_id: i64,
        message: &MessageTemplate,
    ) -> Result<(), TransportError> {
        self.call("sendMessage", &send_message_body(&chat_id.to_string(), message))
            .await
            .map(|_| ())
            .map_err(TransportError::Send)
    }
}

#[async_trait]
impl EscalationChannel for BotApiClient {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), EscalationError> {
        self.call("sendMessage", &serde_json::json!({ "chat_id": recipient, "text": text }))
            .await
            .map_err(EscalationError::Delivery)?;
        debug!(event_name = "egress.telegram.escalation_sent", recipient, "escalation delivered");
        Ok(())
    }
}
