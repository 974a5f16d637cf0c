pub mod codec;
pub mod engine;
pub mod states;

pub use codec::{
    decode_callback, decode_step, encode_callback, encode_step, CallbackDecodeError,
    StepDecodeError, ROOT_CALLBACK,
};
pub use engine::FlowEngine;
pub use states::{
    CallbackEvent, FlowAction, FlowEvent, NetworkSelection, PaymentSelection, StepError,
    StepKind, StepToken, TransitionOutcome,
};
