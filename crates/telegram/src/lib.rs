//! Telegram surface of the AML check bot.
//!
//! - **Polling** (`polling`) - long-polls the Bot API and pushes updates through the dispatcher
//! - **Events** (`events`) - inbound update model and handler routing
//! - **Conversation** (`conversation`) - the address-check flow, one step per update
//! - **Keyboards** (`keyboards`) - screens rendered as HTML text plus inline keyboards
//!
//! ```text
//! Bot API → PollingRunner → EventDispatcher → AmlConversation → FlowEngine
//!                                                   ↓
//!                               MessageTemplate ← render(Screen)
//! ```

pub mod conversation;
pub mod events;
pub mod keyboards;
pub mod polling;

pub use conversation::{AmlConversation, ConversationError, ConversationServices};
pub use events::{conversation_dispatcher, EventDispatcher, TelegramEvent, TelegramUpdate};
pub use keyboards::{render, InlineButton, MessageTemplate, Screen};
pub use polling::{PollingRunner, ReconnectPolicy, TransportError, UpdateTransport};
