use std::env;
use std::time::Duration;

use eyre::{Result, WrapErr, eyre};
use url::Url;

use crate::chat_client::DEFAULT_TIMEOUT;
use crate::cli::chat::widget::{LateReplyPolicy, WidgetConfig};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const API_URL_VAR: &str = "CHAT_API_URL";
const TIMEOUT_VAR: &str = "CHAT_TIMEOUT_SECS";
const TRACK_CONVERSATION_VAR: &str = "CHAT_TRACK_CONVERSATION";
const LATE_REPLY_VAR: &str = "CHAT_LATE_REPLY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: Url,
    pub timeout: Duration,
    pub widget: WidgetConfig,
}

/// Values given on the command line. They take precedence over the
/// environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub no_conversation_id: bool,
    pub late_reply: Option<LateReplyPolicy>,
}

impl Config {
    /// Reads the process environment. Call `dotenv()` first to pick up a
    /// `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self {
            api_url: parse_url(&url).wrap_err_with(|| format!("invalid {}", API_URL_VAR))?,
            timeout: DEFAULT_TIMEOUT,
            widget: WidgetConfig::default(),
        };

        if let Some(secs) = lookup(TIMEOUT_VAR) {
            let secs: u64 = secs
                .trim()
                .parse()
                .wrap_err_with(|| format!("invalid {}: {}", TIMEOUT_VAR, secs))?;
            config.timeout = timeout_from_secs(secs)?;
        }
        if let Some(track) = lookup(TRACK_CONVERSATION_VAR) {
            config.widget.track_conversation = parse_bool(&track)
                .ok_or_else(|| eyre!("invalid {}: {}", TRACK_CONVERSATION_VAR, track))?;
        }
        if let Some(policy) = lookup(LATE_REPLY_VAR) {
            config.widget.late_reply = policy.parse()?;
        }

        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) -> Result<()> {
        if let Some(url) = &overrides.api_url {
            self.api_url = parse_url(url)?;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout = timeout_from_secs(secs)?;
        }
        if overrides.no_conversation_id {
            self.widget.track_conversation = false;
        }
        if let Some(policy) = overrides.late_reply {
            self.widget.late_reply = policy;
        }
        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).wrap_err_with(|| format!("not a URL: {}", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(eyre!("unsupported URL scheme '{}' in {}", other, raw)),
    }
}

fn timeout_from_secs(secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(eyre!("timeout must be at least one second"));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
