use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between step token and callback payload segments.
pub const SEGMENT_SEPARATOR: char = '_';

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("step segment `{field}` must not be empty")]
    EmptySegment { field: &'static str },
    #[error("step segment `{field}` must not contain `_`: `{value}`")]
    ReservedSeparator { field: &'static str, value: String },
}

fn segment(field: &'static str, value: impl Into<String>) -> Result<String, StepError> {
    let value = value.into();
    if value.is_empty() {
        return Err(StepError::EmptySegment { field });
    }
    if value.contains(SEGMENT_SEPARATOR) {
        return Err(StepError::ReservedSeparator { field, value });
    }
    Ok(value)
}

/// Token and network picked by the user; the payment currency is still open.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct NetworkSelection {
    token_name: String,
    network_type: String,
}

impl NetworkSelection {
    pub fn new(
        token_name: impl Into<String>,
        network_type: impl Into<String>,
    ) -> Result<Self, StepError> {
        Ok(Self {
            token_name: segment("token_name", token_name)?,
            network_type: segment("network_type", network_type)?,
        })
    }

    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    pub fn network_type(&self) -> &str {
        &self.network_type
    }

    pub fn with_payment(
        &self,
        payment_token_name: impl Into<String>,
    ) -> Result<PaymentSelection, StepError> {
        Ok(PaymentSelection {
            network: self.clone(),
            payment_token_name: segment("payment_token_name", payment_token_name)?,
        })
    }
}

/// Full selection; the conversation waits for the address to check.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PaymentSelection {
    network: NetworkSelection,
    payment_token_name: String,
}

impl PaymentSelection {
    pub fn token_name(&self) -> &str {
        self.network.token_name()
    }

    pub fn network_type(&self) -> &str {
        self.network.network_type()
    }

    pub fn payment_token_name(&self) -> &str {
        &self.payment_token_name
    }

    pub fn network(&self) -> &NetworkSelection {
        &self.network
    }
}

/// Decoded conversation position of a single user.
///
/// Later-stage fields only exist inside later-stage variants, so a partially filled
/// token cannot be represented.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum StepToken {
    #[default]
    Root,
    TokenSelected(NetworkSelection),
    PaymentSelected(PaymentSelection),
}

impl StepToken {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Root => StepKind::Root,
            Self::TokenSelected(_) => StepKind::TokenSelected,
            Self::PaymentSelected(_) => StepKind::PaymentSelected,
        }
    }

    pub fn is_awaiting_address(&self) -> bool {
        matches!(self, Self::PaymentSelected(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    Root,
    TokenSelected,
    PaymentSelected,
}

/// One user action carried by an inline-keyboard callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackEvent {
    RootRequested,
    TokenChosen { token_name: String },
    NetworkChosen { token_name: String, network_type: String },
    PaymentChosen { payment_token_name: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    Callback(CallbackEvent),
    TextSubmitted(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum FlowAction {
    /// Reset the persisted step and show the token list.
    ShowRootMenu,
    /// Look up the token's networks; a single network resolves to `SelectNetwork`.
    ResolveToken { token_name: String },
    /// Persist the token/network pair and show payment currencies.
    SelectNetwork { selection: NetworkSelection },
    /// Compare balance against fee before asking for the address.
    QuotePayment { selection: PaymentSelection },
    /// Run the provider check for the submitted address.
    CheckAddress { selection: PaymentSelection, address: String },
    /// Event does not belong to the current stage.
    Ignore,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub from: StepKind,
    pub event: FlowEvent,
    pub action: FlowAction,
    pub recovered: bool,
}
