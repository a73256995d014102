use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_RECONNECT_MS: u64 = 3_000;
const DEFAULT_OUTBOUND_QUEUE_CAP: usize = 256;

const SERVER_URL_VAR: &str = "LED_PANEL_SERVER_URL";
const POLL_INTERVAL_VAR: &str = "LED_PANEL_POLL_INTERVAL_MS";
const RECONNECT_VAR: &str = "LED_PANEL_RECONNECT_MS";
const OUTBOUND_QUEUE_CAP_VAR: &str = "LED_PANEL_OUTBOUND_QUEUE_CAP";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server_url: Url,
    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
    pub outbound_queue_cap: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid LED_PANEL_SERVER_URL {raw:?}: {reason}")]
    InvalidServerUrl { raw: String, reason: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup(SERVER_URL_VAR).unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let server_url = parse_server_url(&raw_url)?;

        Ok(Self {
            server_url,
            poll_interval: Duration::from_millis(
                parse_positive(lookup(POLL_INTERVAL_VAR)).unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            reconnect_delay: Duration::from_millis(
                parse_positive(lookup(RECONNECT_VAR)).unwrap_or(DEFAULT_RECONNECT_MS),
            ),
            outbound_queue_cap: parse_positive(lookup(OUTBOUND_QUEUE_CAP_VAR))
                .unwrap_or(DEFAULT_OUTBOUND_QUEUE_CAP),
        })
    }
}

fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidServerUrl {
        raw: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

fn parse_positive<N>(raw: Option<String>) -> Option<N>
where
    N: std::str::FromStr + Default + PartialOrd,
{
    raw.and_then(|value| value.trim().parse::<N>().ok())
        .filter(|value| *value > N::default())
}
