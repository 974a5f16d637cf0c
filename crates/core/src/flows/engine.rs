use crate::flows::codec::{decode_step, StepDecodeError};
use crate::flows::states::{
    CallbackEvent, FlowAction, FlowEvent, NetworkSelection, StepKind, StepToken,
    TransitionOutcome,
};

/// Pure transition table of the address-check conversation.
///
/// The engine only decides what should happen next; lookups, balance checks and
/// persistence of the resulting step belong to the caller.
#[derive(Clone, Debug, Default)]
pub struct FlowEngine;

impl FlowEngine {
    pub fn new() -> Self {
        Self
    }

    /// Decodes the persisted token and plans the action for `event`.
    ///
    /// A corrupted `AML` token is treated as a lost session and the user is sent back
    /// to the root menu. A step owned by another bot feature counts as root for our
    /// callbacks, and free text typed under it is ignored.
    pub fn plan(&self, persisted: &str, event: &FlowEvent) -> TransitionOutcome {
        match decode_step(persisted) {
            Ok(current) => self.apply(&current, event),
            Err(StepDecodeError::MissingPrefix) => match event {
                FlowEvent::TextSubmitted(_) => TransitionOutcome {
                    from: StepKind::Root,
                    event: event.clone(),
                    action: FlowAction::Ignore,
                    recovered: false,
                },
                FlowEvent::Callback(_) => self.apply(&StepToken::Root, event),
            },
            Err(_) => TransitionOutcome {
                from: StepKind::Root,
                event: event.clone(),
                action: FlowAction::ShowRootMenu,
                recovered: true,
            },
        }
    }

    pub fn apply(&self, current: &StepToken, event: &FlowEvent) -> TransitionOutcome {
        let (action, recovered) = transition(current, event);
        TransitionOutcome { from: current.kind(), event: event.clone(), action, recovered }
    }
}

fn transition(current: &StepToken, event: &FlowEvent) -> (FlowAction, bool) {
    use CallbackEvent::{NetworkChosen, PaymentChosen, RootRequested, TokenChosen};

    match (current, event) {
        (_, FlowEvent::Callback(RootRequested)) => (FlowAction::ShowRootMenu, false),
        // Buttons on earlier menus stay live; picking a token or network restarts
        // selection from that point.
        (_, FlowEvent::Callback(TokenChosen { token_name })) => {
            (FlowAction::ResolveToken { token_name: token_name.clone() }, false)
        }
        (_, FlowEvent::Callback(NetworkChosen { token_name, network_type })) => {
            match NetworkSelection::new(token_name.as_str(), network_type.as_str()) {
                Ok(selection) => (FlowAction::SelectNetwork { selection }, false),
                Err(_) => (FlowAction::ShowRootMenu, true),
            }
        }
        (StepToken::TokenSelected(network), FlowEvent::Callback(PaymentChosen { payment_token_name })) => {
            quote_payment(network, payment_token_name)
        }
        (
            StepToken::PaymentSelected(selection),
            FlowEvent::Callback(PaymentChosen { payment_token_name }),
        ) => quote_payment(selection.network(), payment_token_name),
        (StepToken::Root, FlowEvent::Callback(PaymentChosen { .. })) => {
            (FlowAction::ShowRootMenu, true)
        }
        (StepToken::PaymentSelected(selection), FlowEvent::TextSubmitted(text)) => {
            let address = text.trim();
            if address.is_empty() {
                (FlowAction::Ignore, false)
            } else {
                (
                    FlowAction::CheckAddress {
                        selection: selection.clone(),
                        address: address.to_owned(),
                    },
                    false,
                )
            }
        }
        (_, FlowEvent::TextSubmitted(_)) => (FlowAction::Ignore, false),
    }
}

fn quote_payment(network: &NetworkSelection, payment_token_name: &str) -> (FlowAction, bool) {
    match network.with_payment(payment_token_name) {
        Ok(selection) => (FlowAction::QuotePayment { selection }, false),
        Err(_) => (FlowAction::ShowRootMenu, true),
    }
}

#[cfg(test)]
mod tests {
    use super::FlowEngine;
    use crate::flows::codec::encode_step;
    use crate::flows::states::{
        CallbackEvent, FlowAction, FlowEvent, NetworkSelection, StepKind, StepToken,
    };

    fn callback(event: CallbackEvent) -> FlowEvent {
        FlowEvent::Callback(event)
    }

    fn token_selected() -> StepToken {
        StepToken::TokenSelected(NetworkSelection::new("USDT", "trc20").expect("selection"))
    }

    fn payment_selected() -> StepToken {
        StepToken::PaymentSelected(
            NetworkSelection::new("USDT", "trc20")
                .and_then(|selection| selection.with_payment("TRX"))
                .expect("selection"),
        )
    }

    #[test]
    fn root_request_resets_from_every_state() {
        let engine = FlowEngine::new();
        for step in [StepToken::Root, token_selected(), payment_selected()] {
            let outcome = engine.apply(&step, &callback(CallbackEvent::RootRequested));
            assert_eq!(outcome.action, FlowAction::ShowRootMenu);
            assert!(!outcome.recovered);
        }
    }

    #[test]
    fn happy_path_walks_token_network_payment_address() {
        let engine = FlowEngine::new();

        let resolve = engine.apply(
            &StepToken::Root,
            &callback(CallbackEvent::TokenChosen { token_name: "USDT".to_owned() }),
        );
        assert_eq!(resolve.action, FlowAction::ResolveToken { token_name: "USDT".to_owned() });

        let select = engine.apply(
            &StepToken::Root,
            &callback(CallbackEvent::NetworkChosen {
                token_name: "USDT".to_owned(),
                network_type: "trc20".to_owned(),
            }),
        );
        assert!(matches!(select.action, FlowAction::SelectNetwork { .. }));

        let quote = engine.apply(
            &token_selected(),
            &callback(CallbackEvent::PaymentChosen { payment_token_name: "TRX".to_owned() }),
        );
        let FlowAction::QuotePayment { selection } = quote.action else {
            panic!("expected payment quote, got {:?}", quote.action);
        };
        assert_eq!(selection.payment_token_name(), "TRX");
        assert_eq!(selection.network_type(), "trc20");

        let check = engine
            .apply(&payment_selected(), &FlowEvent::TextSubmitted("  TXyz123  ".to_owned()));
        assert_eq!(check.from, StepKind::PaymentSelected);
        assert!(matches!(
            check.action,
            FlowAction::CheckAddress { ref address, .. } if address == "TXyz123"
        ));
    }

    #[test]
    fn payment_choice_without_network_recovers_to_root() {
        let outcome = FlowEngine::new().apply(
            &StepToken::Root,
            &callback(CallbackEvent::PaymentChosen { payment_token_name: "TRX".to_owned() }),
        );
        assert_eq!(outcome.action, FlowAction::ShowRootMenu);
        assert!(outcome.recovered);
    }

    #[test]
    fn repeated_payment_choice_replaces_previous_currency() {
        let outcome = FlowEngine::new().apply(
            &payment_selected(),
            &callback(CallbackEvent::PaymentChosen { payment_token_name: "USDT".to_owned() }),
        );
        let FlowAction::QuotePayment { selection } = outcome.action else {
            panic!("expected payment quote");
        };
        assert_eq!(encode_step(&StepToken::PaymentSelected(selection)), "AML_USDT_trc20_USDT_ADDR");
    }

    #[test]
    fn text_outside_address_stage_is_ignored() {
        let engine = FlowEngine::new();
        for step in [StepToken::Root, token_selected()] {
            let outcome = engine.apply(&step, &FlowEvent::TextSubmitted("hello".to_owned()));
            assert_eq!(outcome.action, FlowAction::Ignore);
        }
        let blank = engine.apply(&payment_selected(), &FlowEvent::TextSubmitted("   ".to_owned()));
        assert_eq!(blank.action, FlowAction::Ignore);
    }

    #[test]
    fn corrupted_persisted_token_recovers_to_root_menu() {
        let engine = FlowEngine::new();
        let outcome = engine.plan(
            "AML_USDT_trc20_TRX",
            &callback(CallbackEvent::PaymentChosen { payment_token_name: "TRX".to_owned() }),
        );
        assert_eq!(outcome.action, FlowAction::ShowRootMenu);
        assert!(outcome.recovered);

        let foreign = engine.plan("WALLET_withdraw", &FlowEvent::TextSubmitted("TXyz".to_owned()));
        assert_eq!(foreign.action, FlowAction::Ignore);

        let truncated =
            engine.plan("AML_USDT_trc20_TRX", &FlowEvent::TextSubmitted("TXyz".to_owned()));
        assert_eq!(truncated.action, FlowAction::ShowRootMenu);
        assert!(truncated.recovered);
    }

    #[test]
    fn selections_under_a_foreign_step_start_from_root() {
        let engine = FlowEngine::new();

        let resolve = engine.plan(
            "WALLET_withdraw",
            &callback(CallbackEvent::TokenChosen { token_name: "USDT".to_owned() }),
        );
        assert_eq!(resolve.action, FlowAction::ResolveToken { token_name: "USDT".to_owned() });
        assert!(!resolve.recovered);

        let select = engine.plan(
            "WALLET_withdraw",
            &callback(CallbackEvent::NetworkChosen {
                token_name: "USDT".to_owned(),
                network_type: "trc20".to_owned(),
            }),
        );
        assert!(matches!(select.action, FlowAction::SelectNetwork { .. }));

        let payment = engine.plan(
            "WALLET_withdraw",
            &callback(CallbackEvent::PaymentChosen { payment_token_name: "TRX".to_owned() }),
        );
        assert_eq!(payment.action, FlowAction::ShowRootMenu);
    }

    #[test]
    fn invalid_callback_segments_recover_instead_of_persisting() {
        let outcome = FlowEngine::new().apply(
            &StepToken::Root,
            &callback(CallbackEvent::NetworkChosen {
                token_name: "USDT".to_owned(),
                network_type: String::new(),
            }),
        );
        assert_eq!(outcome.action, FlowAction::ShowRootMenu);
        assert!(outcome.recovered);
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let engine = FlowEngine::default();
        let events = [
            callback(CallbackEvent::TokenChosen { token_name: "BTC".to_owned() }),
            callback(CallbackEvent::PaymentChosen { payment_token_name: "USDT".to_owned() }),
            FlowEvent::TextSubmitted("bc1qexample".to_owned()),
        ];

        let run = || {
            events
                .iter()
                .map(|event| engine.plan("AML_BTC_btc_USDT_ADDR", event).action)
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }
}
