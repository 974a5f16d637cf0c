use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use amlbot_core::domain::UserId;

use crate::{conversation::AmlConversation, keyboards::MessageTemplate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub event: TelegramEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelegramEvent {
    CallbackQuery(CallbackQueryEvent),
    TextMessage(TextMessageEvent),
    Unsupported { kind: String },
}

impl TelegramEvent {
    pub fn event_type(&self) -> TelegramEventType {
        match self {
            Self::CallbackQuery(_) => TelegramEventType::CallbackQuery,
            Self::TextMessage(_) => TelegramEventType::TextMessage,
            Self::Unsupported { .. } => TelegramEventType::Unsupported,
        }
    }

    /// Chat the reply goes to, when the update has one.
    pub fn chat_id(&self) -> Option<i64> {
        match self {
            Self::CallbackQuery(event) => Some(event.chat_id),
            Self::TextMessage(event) => Some(event.chat_id),
            Self::Unsupported { .. } => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::CallbackQuery(event) => Some(event.user_id),
            Self::TextMessage(event) => Some(event.user_id),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TelegramEventType {
    CallbackQuery,
    TextMessage,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackQueryEvent {
    pub callback_id: String,
    pub user_id: UserId,
    pub chat_id: i64,
    pub data: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessageEvent {
    pub user_id: UserId,
    pub chat_id: i64,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("handler for {expected:?} received {actual:?}")]
    UnexpectedEvent { expected: TelegramEventType, actual: TelegramEventType },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> TelegramEventType;
    async fn handle(
        &self,
        update: &TelegramUpdate,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<TelegramEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        update: &TelegramUpdate,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&update.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(update, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher wired to the address-check conversation for buttons and free text.
pub fn conversation_dispatcher(conversation: Arc<AmlConversation>) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(CallbackQueryHandler::new(Arc::clone(&conversation)));
    dispatcher.register(TextMessageHandler::new(conversation));
    dispatcher
}

fn reply(message: Option<MessageTemplate>) -> HandlerResult {
    message.map_or(HandlerResult::Ignored, HandlerResult::Responded)
}

pub struct CallbackQueryHandler {
    conversation: Arc<AmlConversation>,
}

impl CallbackQueryHandler {
    pub fn new(conversation: Arc<AmlConversation>) -> Self {
        Self { conversation }
    }
}

#[async_trait]
impl EventHandler for CallbackQueryHandler {
    fn event_type(&self) -> TelegramEventType {
        TelegramEventType::CallbackQuery
    }

    async fn handle(
        &self,
        update: &TelegramUpdate,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let TelegramEvent::CallbackQuery(event) = &update.event else {
            return Err(EventHandlerError::UnexpectedEvent {
                expected: self.event_type(),
                actual: update.event.event_type(),
            });
        };

        Ok(reply(
            self.conversation.handle_callback(event.user_id, &event.data, &ctx.correlation_id).await,
        ))
    }
}

pub struct TextMessageHandler {
    conversation: Arc<AmlConversation>,
}

impl TextMessageHandler {
    pub fn new(conversation: Arc<AmlConversation>) -> Self {
        Self { conversation }
    }
}

#[async_trait]
impl EventHandler for TextMessageHandler {
    fn event_type(&self) -> TelegramEventType {
        TelegramEventType::TextMessage
    }

    async fn handle(
        &self,
        update: &TelegramUpdate,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let TelegramEvent::TextMessage(event) = &update.event else {
            return Err(EventHandlerError::UnexpectedEvent {
                expected: self.event_type(),
                actual: update.event.event_type(),
            });
        };

        Ok(reply(self.conversation.handle_text(event.user_id, &event.text, &ctx.correlation_id).await))
    }
}
