use rust_decimal::Decimal;
use serde::Serialize;

use amlbot_core::aml::{escape_html, LabelKey, Localizer};
use amlbot_core::domain::{format_amount, TokenNetwork, UserId};
use amlbot_core::flows::{encode_callback, CallbackEvent, ROOT_CALLBACK};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self { text: text.into(), callback_data: callback_data.into() }
    }

    pub fn callback(text: impl Into<String>, event: &CallbackEvent) -> Self {
        Self::new(text, encode_callback(event))
    }
}

/// HTML-formatted message text plus inline keyboard rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub text: String,
    pub keyboard: Vec<Vec<InlineButton>>,
}

impl MessageTemplate {
    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.keyboard.iter().flatten()
    }
}

pub struct MessageBuilder {
    lines: Vec<String>,
    keyboard: Vec<Vec<InlineButton>>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self { lines: Vec::new(), keyboard: Vec::new() }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn blank(self) -> Self {
        self.line(String::new())
    }

    pub fn row<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut RowBuilder),
    {
        let mut builder = RowBuilder::default();
        build(&mut builder);
        if !builder.buttons.is_empty() {
            self.keyboard.push(builder.buttons);
        }
        self
    }

    /// Closes the keyboard with the button that returns to the token list.
    pub fn back(mut self, labels: &dyn Localizer) -> Self {
        self.keyboard.push(vec![InlineButton::new(labels.label(LabelKey::Back), ROOT_CALLBACK)]);
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { text: self.lines.join("\n"), keyboard: self.keyboard }
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct RowBuilder {
    buttons: Vec<InlineButton>,
}

impl RowBuilder {
    pub fn button(&mut self, button: InlineButton) -> &mut Self {
        self.buttons.push(button);
        self
    }
}

/// Every screen the conversation can show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    RootMenu { user_id: UserId, tokens: Vec<String> },
    NetworkMenu { token_name: String, networks: Vec<TokenNetwork> },
    PaymentMenu { token_name: String, network_name: String, payment_tokens: Vec<String> },
    PaymentQuote { payment_token_name: String, balance: Decimal, fee: Decimal, sufficient: bool },
    Report { text: String },
    AddressNotFound,
    ServiceError { correlation_id: String },
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RootMenu { .. } => "root_menu",
            Self::NetworkMenu { .. } => "network_menu",
            Self::PaymentMenu { .. } => "payment_menu",
            Self::PaymentQuote { .. } => "payment_quote",
            Self::Report { .. } => "report",
            Self::AddressNotFound => "address_not_found",
            Self::ServiceError { .. } => "service_error",
        }
    }
}

pub fn render(screen: &Screen, labels: &dyn Localizer) -> MessageTemplate {
    let label = |key| labels.label(key);

    match screen {
        Screen::RootMenu { user_id, tokens } => tokens
            .iter()
            .fold(
                MessageBuilder::new()
                    .line(format!("{}<b>{user_id}</b>", label(LabelKey::AccountId)))
                    .line(label(LabelKey::SelectedAml)),
                |builder, token_name| {
                    builder.row(|row| {
                        row.button(InlineButton::callback(
                            token_name.as_str(),
                            &CallbackEvent::TokenChosen { token_name: token_name.clone() },
                        ));
                    })
                },
            )
            .back(labels)
            .build(),
        Screen::NetworkMenu { token_name, networks } => networks
            .iter()
            .fold(
                MessageBuilder::new()
                    .line(format!("{} <b>{}</b>", label(LabelKey::Selected), escape_html(token_name)))
                    .line(label(LabelKey::SelectChain)),
                |builder, network| {
                    builder.row(|row| {
                        row.button(InlineButton::callback(
                            network.network_name.as_str(),
                            &CallbackEvent::NetworkChosen {
                                token_name: token_name.clone(),
                                network_type: network.network_type.clone(),
                            },
                        ));
                    })
                },
            )
            .back(labels)
            .build(),
        Screen::PaymentMenu { token_name, network_name, payment_tokens } => payment_tokens
            .iter()
            .fold(
                MessageBuilder::new()
                    .line(format!("{} <b>{}</b>", label(LabelKey::Selected), escape_html(token_name)))
                    .blank()
                    .line(format!(
                        "{} <b>{}</b>",
                        label(LabelKey::SelectChain),
                        escape_html(network_name)
                    ))
                    .line(label(LabelKey::SelectPaymentCurrency)),
                |builder, payment_token_name| {
                    builder.row(|row| {
                        row.button(InlineButton::callback(
                            payment_token_name.as_str(),
                            &CallbackEvent::PaymentChosen {
                                payment_token_name: payment_token_name.clone(),
                            },
                        ));
                    })
                },
            )
            .back(labels)
            .build(),
        Screen::PaymentQuote { payment_token_name, balance, fee, sufficient } => {
            let payment = escape_html(payment_token_name);
            MessageBuilder::new()
                .line(format!("<b>{payment}</b> {}", label(LabelKey::PaymentToken)))
                .line(format!(
                    "{} <b>{} {payment}</b>",
                    label(LabelKey::AvailableBalance),
                    format_amount(*balance)
                ))
                .line(format!("{} <b>{} {payment}</b>", label(LabelKey::Fee), format_amount(*fee)))
                .line(if *sufficient {
                    label(LabelKey::EnterAddress)
                } else {
                    label(LabelKey::InsufficientFunds)
                })
                .back(labels)
                .build()
        }
        Screen::Report { text } => MessageBuilder::new().line(text.as_str()).back(labels).build(),
        Screen::AddressNotFound => {
            MessageBuilder::new().line(label(LabelKey::AddressNotFound)).back(labels).build()
        }
        Screen::ServiceError { correlation_id } => MessageBuilder::new()
            .line(label(LabelKey::ServiceUnavailable))
            .line(format!("<code>{}</code>", escape_html(correlation_id)))
            .back(labels)
            .build(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use amlbot_core::aml::EnglishLabels;
    use amlbot_core::domain::{TokenNetwork, UserId};

    use super::{render, Screen};

    #[test]
    fn root_menu_lists_tokens_and_ends_with_back() {
        let message = render(
            &Screen::RootMenu { user_id: UserId(42), tokens: vec!["USDT".into(), "BTC".into()] },
            &EnglishLabels,
        );

        assert!(message.text.starts_with("Account ID: <b>42</b>\n"));
        let payloads: Vec<&str> =
            message.buttons().map(|button| button.callback_data.as_str()).collect();
        assert_eq!(payloads, vec!["aml_USDT_token", "aml_BTC_token", "aml_aml"]);
    }

    #[test]
    fn network_menu_labels_buttons_with_network_names() {
        let message = render(
            &Screen::NetworkMenu {
                token_name: "USDT".to_owned(),
                networks: vec![
                    TokenNetwork {
                        network_type: "trc20".to_owned(),
                        network_name: "Tron (TRC20)".to_owned(),
                    },
                    TokenNetwork {
                        network_type: "erc20".to_owned(),
                        network_name: "Ethereum (ERC20)".to_owned(),
                    },
                ],
            },
            &EnglishLabels,
        );

        assert_eq!(message.keyboard[0][0].text, "Tron (TRC20)");
        assert_eq!(message.keyboard[0][0].callback_data, "aml_USDT_trc20_network");
        assert_eq!(message.keyboard[1][0].callback_data, "aml_USDT_erc20_network");
        assert_eq!(message.keyboard.len(), 3);
    }

    #[test]
    fn payment_menu_names_selected_network() {
        let message = render(
            &Screen::PaymentMenu {
                token_name: "BTC".to_owned(),
                network_name: "Bitcoin".to_owned(),
                payment_tokens: vec!["USDT".to_owned(), "BTC".to_owned()],
            },
            &EnglishLabels,
        );

        assert!(message.text.contains("Selected <b>BTC</b>\n\nNetwork <b>Bitcoin</b>"));
        assert_eq!(message.keyboard[0][0].callback_data, "aml_USDT_payment");
        assert_eq!(message.keyboard[1][0].callback_data, "aml_BTC_payment");
    }

    #[test]
    fn payment_quote_shows_plain_amounts_and_outcome_line() {
        let insufficient = render(
            &Screen::PaymentQuote {
                payment_token_name: "BTC".to_owned(),
                balance: Decimal::new(5, 0),
                fee: Decimal::new(1, 5),
                sufficient: false,
            },
            &EnglishLabels,
        );
        assert!(insufficient.text.contains("Available balance: <b>5 BTC</b>"));
        assert!(insufficient.text.contains("Fee: <b>0.00001 BTC</b>"));
        assert!(insufficient.text.ends_with("Insufficient funds. Top up your balance or pick another currency."));

        let sufficient = render(
            &Screen::PaymentQuote {
                payment_token_name: "BTC".to_owned(),
                balance: Decimal::new(5, 0),
                fee: Decimal::new(1, 5),
                sufficient: true,
            },
            &EnglishLabels,
        );
        assert!(sufficient.text.ends_with("Send the address you want to check."));
    }

    #[test]
    fn every_screen_ends_with_back_button() {
        let screens = [
            Screen::Report { text: "report".to_owned() },
            Screen::AddressNotFound,
            Screen::ServiceError { correlation_id: "update-9".to_owned() },
        ];
        for screen in screens {
            let message = render(&screen, &EnglishLabels);
            let last = message.buttons().last().map(|button| button.callback_data.as_str());
            assert_eq!(last, Some("aml_aml"), "{}", screen.name());
        }
    }
}
