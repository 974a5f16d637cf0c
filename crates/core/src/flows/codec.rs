//! Wire format for the persisted step token and for inline-keyboard callbacks.
//!
//! Persisted tokens (`_`-joined, case-sensitive):
//!
//! ```text
//! Root              ""
//! TokenSelected     AML_<token>_<network>
//! PaymentSelected   AML_<token>_<network>_<payment>_ADDR
//! ```
//!
//! Existing encoded tokens must keep decoding; a version marker has to be introduced
//! before this grammar changes.
//!
//! Callback payloads describe a single action rather than accumulated state:
//!
//! ```text
//! aml | aml_aml                  RootRequested
//! aml_<token>_token              TokenChosen
//! aml_<token>_<network>_network  NetworkChosen
//! aml_<payment>_payment          PaymentChosen
//! ```

use thiserror::Error;

use crate::flows::states::{
    CallbackEvent, NetworkSelection, StepError, StepToken, SEGMENT_SEPARATOR,
};

pub const STEP_PREFIX: &str = "AML";
pub const ADDRESS_MARKER: &str = "ADDR";
pub const CALLBACK_MARKER: &str = "aml";
pub const ROOT_CALLBACK: &str = "aml_aml";

const TOKEN_SUFFIX: &str = "token";
const NETWORK_SUFFIX: &str = "network";
const PAYMENT_SUFFIX: &str = "payment";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StepDecodeError {
    #[error("step token does not start with `AML`")]
    MissingPrefix,
    #[error("step token has {0} segments, expected 3 or 5")]
    SegmentCount(usize),
    #[error("step token does not end with `ADDR`")]
    MissingAddressMarker,
    #[error(transparent)]
    InvalidSegment(#[from] StepError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CallbackDecodeError {
    #[error("callback payload does not belong to the aml flow")]
    Foreign,
    #[error("malformed aml callback payload `{0}`")]
    Malformed(String),
}

pub fn encode_step(step: &StepToken) -> String {
    match step {
        StepToken::Root => String::new(),
        StepToken::TokenSelected(selection) => {
            join(&[STEP_PREFIX, selection.token_name(), selection.network_type()])
        }
        StepToken::PaymentSelected(selection) => join(&[
            STEP_PREFIX,
            selection.token_name(),
            selection.network_type(),
            selection.payment_token_name(),
            ADDRESS_MARKER,
        ]),
    }
}

/// Total inverse of [`encode_step`]. Never panics; callers recover to the root menu on `Err`.
pub fn decode_step(raw: &str) -> Result<StepToken, StepDecodeError> {
    if raw.is_empty() {
        return Ok(StepToken::Root);
    }

    let segments = raw.split(SEGMENT_SEPARATOR).collect::<Vec<_>>();
    if segments[0] != STEP_PREFIX {
        return Err(StepDecodeError::MissingPrefix);
    }

    match segments.as_slice() {
        [_, token_name, network_type] => {
            Ok(StepToken::TokenSelected(NetworkSelection::new(*token_name, *network_type)?))
        }
        [_, token_name, network_type, payment_token_name, marker] => {
            if *marker != ADDRESS_MARKER {
                return Err(StepDecodeError::MissingAddressMarker);
            }
            let selection = NetworkSelection::new(*token_name, *network_type)?
                .with_payment(*payment_token_name)?;
            Ok(StepToken::PaymentSelected(selection))
        }
        other => Err(StepDecodeError::SegmentCount(other.len())),
    }
}

pub fn encode_callback(event: &CallbackEvent) -> String {
    match event {
        CallbackEvent::RootRequested => ROOT_CALLBACK.to_owned(),
        CallbackEvent::TokenChosen { token_name } => {
            join(&[CALLBACK_MARKER, token_name.as_str(), TOKEN_SUFFIX])
        }
        CallbackEvent::NetworkChosen { token_name, network_type } => {
            join(&[CALLBACK_MARKER, token_name.as_str(), network_type.as_str(), NETWORK_SUFFIX])
        }
        CallbackEvent::PaymentChosen { payment_token_name } => {
            join(&[CALLBACK_MARKER, payment_token_name.as_str(), PAYMENT_SUFFIX])
        }
    }
}

pub fn decode_callback(raw: &str) -> Result<CallbackEvent, CallbackDecodeError> {
    let payload = raw.trim();
    if payload == CALLBACK_MARKER || payload == ROOT_CALLBACK {
        return Ok(CallbackEvent::RootRequested);
    }

    let Some(rest) = payload
        .strip_prefix(CALLBACK_MARKER)
        .and_then(|rest| rest.strip_prefix(SEGMENT_SEPARATOR))
    else {
        return Err(CallbackDecodeError::Foreign);
    };

    let malformed = || CallbackDecodeError::Malformed(payload.to_owned());
    let segments = rest.split(SEGMENT_SEPARATOR).collect::<Vec<_>>();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(malformed());
    }

    match segments.as_slice() {
        [token_name, TOKEN_SUFFIX] => {
            Ok(CallbackEvent::TokenChosen { token_name: (*token_name).to_owned() })
        }
        [token_name, network_type, NETWORK_SUFFIX] => Ok(CallbackEvent::NetworkChosen {
            token_name: (*token_name).to_owned(),
            network_type: (*network_type).to_owned(),
        }),
        [payment_token_name, PAYMENT_SUFFIX] => Ok(CallbackEvent::PaymentChosen {
            payment_token_name: (*payment_token_name).to_owned(),
        }),
        _ => Err(malformed()),
    }
}

fn join(segments: &[&str]) -> String {
    segments.join(&SEGMENT_SEPARATOR.to_string())
}
