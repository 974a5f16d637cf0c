use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use amlbot_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

/// One reported setting: dotted key, rendered value, and the env vars that can set it.
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file = ConfigFile::detect();
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        fields(&config)
            .into_iter()
            .map(|field| format!("- {} = {} (source: {})", field.key, field.value, file.source_of(&field))),
    );
    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let recipients = if config.escalation.recipients.is_empty() {
        "<none>".to_string()
    } else {
        config.escalation.recipients.join(",")
    };

    vec![
        Field::new("database.url", &config.database.url, &["AMLBOT_DATABASE_URL"]),
        Field::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["AMLBOT_DATABASE_MAX_CONNECTIONS"],
        ),
        Field::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["AMLBOT_DATABASE_TIMEOUT_SECS"],
        ),
        Field::new(
            "telegram.bot_token",
            redact_bot_token(config.telegram.bot_token.expose_secret()),
            &["AMLBOT_TELEGRAM_BOT_TOKEN"],
        ),
        Field::new(
            "telegram.api_base_url",
            &config.telegram.api_base_url,
            &["AMLBOT_TELEGRAM_API_BASE_URL"],
        ),
        Field::new(
            "telegram.poll_timeout_secs",
            config.telegram.poll_timeout_secs.to_string(),
            &["AMLBOT_TELEGRAM_POLL_TIMEOUT_SECS"],
        ),
        Field::new("backend.base_url", &config.backend.base_url, &["AMLBOT_BACKEND_BASE_URL"]),
        Field::new(
            "backend.auth_token",
            redact_auth_token(config.backend.auth_token.expose_secret()),
            &["AMLBOT_BACKEND_AUTH_TOKEN"],
        ),
        Field::new(
            "backend.timeout_secs",
            config.backend.timeout_secs.to_string(),
            &["AMLBOT_BACKEND_TIMEOUT_SECS"],
        ),
        Field::new(
            "backend.read_retries",
            config.backend.read_retries.to_string(),
            &["AMLBOT_BACKEND_READ_RETRIES"],
        ),
        Field::new("escalation.recipients", recipients, &["AMLBOT_ESCALATION_RECIPIENTS"]),
        Field::new(
            "server.bind_address",
            &config.server.bind_address,
            &["AMLBOT_SERVER_BIND_ADDRESS"],
        ),
        Field::new(
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["AMLBOT_SERVER_HEALTH_CHECK_PORT"],
        ),
        Field::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["AMLBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Field::new(
            "logging.level",
            &config.logging.level,
            &["AMLBOT_LOGGING_LEVEL", "AMLBOT_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["AMLBOT_LOGGING_FORMAT", "AMLBOT_LOG_FORMAT"],
        ),
    ]
}

struct ConfigFile {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl ConfigFile {
    fn detect() -> Self {
        let path = resolve_config_path(None);
        let doc = path.as_deref().and_then(load_doc);
        Self { path, doc }
    }

    fn source_of(&self, field: &Field) -> String {
        if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        match (&self.doc, &self.path) {
            (Some(doc), Some(path)) if contains_path(doc, field.key) => {
                format!("file ({})", path.display())
            }
            _ => "default".to_string(),
        }
    }
}

fn load_doc(path: &Path) -> Option<Value> {
    fs::read_to_string(path).ok()?.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    key_path.split('.').try_fold(root, |current, key| current.get(key)).is_some()
}

/// Keeps the numeric bot id, hides the secret half.
fn redact_bot_token(token: &str) -> String {
    match token.trim().split_once(':') {
        _ if token.trim().is_empty() => "<empty>".to_string(),
        Some((bot_id, _)) => format!("{bot_id}:***"),
        None => "<redacted>".to_string(),
    }
}

/// Keeps the authorization scheme (`Token`, `Bearer`), hides the credential.
fn redact_auth_token(token: &str) -> String {
    match token.trim().split_once(' ') {
        _ if token.trim().is_empty() => "<empty>".to_string(),
        Some((scheme, _)) => format!("{scheme} ***"),
        None => "<redacted>".to_string(),
    }
}
