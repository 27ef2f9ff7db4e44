//! Environment-driven bot configuration.
//!
//! # Design
//! `BotConfig` holds the settings that make sense outside of code (key,
//! host, concurrency mode, timeout) and turns into a `BotBuilder`, where the
//! code-only options (custom transport or codec) can still be layered on.
//! The webhook URL wins over a bare key when both are set, because it also
//! carries the host.

use std::time::Duration;

use crate::bot::{split_webhook_url, BotBuilder, DEFAULT_BASE_URL};
use crate::error::BotError;
use crate::http::UreqTransport;
use crate::scratch::ConcurrencyMode;

pub const ENV_WEBHOOK_URL: &str = "WECOM_BOT_WEBHOOK_URL";
pub const ENV_KEY: &str = "WECOM_BOT_KEY";
pub const ENV_BASE_URL: &str = "WECOM_BOT_BASE_URL";
pub const ENV_CONCURRENCY: &str = "WECOM_BOT_CONCURRENCY";
pub const ENV_TIMEOUT_SECS: &str = "WECOM_BOT_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub key: String,
    pub base_url: String,
    pub concurrency: ConcurrencyMode,
    pub timeout: Option<Duration>,
}

impl BotConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            concurrency: ConcurrencyMode::default(),
            timeout: None,
        }
    }

    pub fn from_env() -> Result<Self, BotError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BotError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut config = match (get(ENV_WEBHOOK_URL), get(ENV_KEY)) {
            (Some(webhook_url), _) => {
                let (key, base_url) = split_webhook_url(&webhook_url)?;
                Self {
                    key,
                    base_url,
                    ..Self::new("")
                }
            }
            (None, Some(key)) => Self::new(key),
            (None, None) => {
                return Err(BotError::Config(format!(
                    "either {ENV_WEBHOOK_URL} or {ENV_KEY} must be set"
                )))
            }
        };

        if let Some(base_url) = get(ENV_BASE_URL) {
            config.base_url = base_url;
        }

        if let Some(mode) = get(ENV_CONCURRENCY) {
            config.concurrency = match mode.trim().to_ascii_lowercase().as_str() {
                "exclusive" => ConcurrencyMode::Exclusive,
                "shared" => ConcurrencyMode::Shared,
                other => {
                    return Err(BotError::Config(format!(
                        "{ENV_CONCURRENCY} must be \"exclusive\" or \"shared\", got {other:?}"
                    )))
                }
            };
        }

        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                BotError::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds"))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// A builder preloaded with these settings and a `UreqTransport`.
    pub fn into_builder(self) -> BotBuilder {
        BotBuilder::new(self.key)
            .base_url(self.base_url)
            .concurrency(self.concurrency)
            .transport(UreqTransport::with_timeout(self.timeout))
    }
}
