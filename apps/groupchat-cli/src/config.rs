//! Environment-backed runtime configuration for `groupchat-cli`.

use std::{env, error::Error, fmt, time::Duration};

use groupchat_core::RuntimeConfig;
use url::Url;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_MESSAGE_POLL_MS: u64 = 2_000;
const DEFAULT_CHAT_POLL_MS: u64 = 3_000;
const DEFAULT_SEND_TIMEOUT_MS: u64 = 25_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_PANE_MAX_ITEMS: usize = 1_000;

/// Runtime configuration used by the terminal client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Base URL of the group chat server.
    pub server_url: Url,
    /// Passcode joined automatically at startup.
    pub passcode: Option<String>,
    pub message_poll_ms: u64,
    pub chat_poll_ms: u64,
    /// How long the UI waits for a reply before showing a timeout.
    pub send_timeout_ms: u64,
    /// Transport timeout applied to every HTTP request.
    pub request_timeout_ms: u64,
    /// Pane retention cap, shared by runtime and view state.
    pub pane_max_items: usize,
}

impl CliConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let server_url = parse_server_url(
            "GROUPCHAT_SERVER_URL",
            optional_trimmed_env("GROUPCHAT_SERVER_URL", &mut lookup)
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_owned()),
        )?;
        let passcode = optional_trimmed_env("GROUPCHAT_PASSCODE", &mut lookup);

        let message_poll_ms =
            parse_positive_u64("GROUPCHAT_MESSAGE_POLL_MS", DEFAULT_MESSAGE_POLL_MS, &mut lookup)?;
        let chat_poll_ms =
            parse_positive_u64("GROUPCHAT_CHAT_POLL_MS", DEFAULT_CHAT_POLL_MS, &mut lookup)?;
        let send_timeout_ms =
            parse_positive_u64("GROUPCHAT_SEND_TIMEOUT_MS", DEFAULT_SEND_TIMEOUT_MS, &mut lookup)?;
        let request_timeout_ms = parse_positive_u64(
            "GROUPCHAT_REQUEST_TIMEOUT_MS",
            DEFAULT_REQUEST_TIMEOUT_MS,
            &mut lookup,
        )?;
        let pane_max_items = parse_optional_usize(
            "GROUPCHAT_PANE_MAX_ITEMS",
            DEFAULT_PANE_MAX_ITEMS,
            &mut lookup,
        )?;

        if pane_max_items == 0 {
            return Err(ConfigError::InvalidValue {
                key: "GROUPCHAT_PANE_MAX_ITEMS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        Ok(Self {
            server_url,
            passcode,
            message_poll_ms,
            chat_poll_ms,
            send_timeout_ms,
            request_timeout_ms,
            pane_max_items,
        })
    }

    /// Subset forwarded to the client runtime.
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            message_poll_interval_ms: self.message_poll_ms,
            chat_poll_interval_ms: self.chat_poll_ms,
            send_timeout_ms: self.send_timeout_ms,
            pane_max_items: self.pane_max_items,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_server_url(key: &'static str, value: String) -> Result<Url, ConfigError> {
    let url = Url::parse(&value).map_err(|err| ConfigError::InvalidValue {
        key,
        value: value.clone(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "scheme must be http or https".to_owned(),
        });
    }
    Ok(url)
}

fn parse_positive_u64<F>(
    key: &'static str,
    default: u64,
    lookup: &mut F,
) -> Result<u64, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    let parsed = value
        .trim()
        .parse::<u64>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value: value.clone(),
            reason: err.to_string(),
        })?;
    if parsed == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "must be at least 1".to_owned(),
        });
    }
    Ok(parsed)
}

fn parse_optional_usize<F>(
    key: &'static str,
    default: usize,
    lookup: &mut F,
) -> Result<usize, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    value
        .trim()
        .parse::<usize>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}
