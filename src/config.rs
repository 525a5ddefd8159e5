//! Runtime configuration, read from the environment.

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::Env;
use fundu::DurationParser;
use serde::{Deserialize, Deserializer, de::Error as _};
use std::time::Duration;
use url::Url;

const DEFAULT_PORTAL_URL: &str = "https://sep.ucas.ac.cn";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36 Edg/113.0.1774.50";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base level for this crate's logs when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Login entry page of the portal.
    #[serde(default = "default_portal_url", deserialize_with = "deserialize_url")]
    pub portal_url: Url,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
    #[serde(
        default = "default_poll_interval_min",
        deserialize_with = "deserialize_duration"
    )]
    pub poll_interval_min: Duration,
    #[serde(
        default = "default_poll_interval_max",
        deserialize_with = "deserialize_duration"
    )]
    pub poll_interval_max: Duration,
    /// Stop polling after this many cycles; unset polls forever.
    #[serde(default)]
    pub poll_max_cycles: Option<u64>,
}

impl Config {
    /// Load from process environment variables.
    pub fn load() -> Result<Self> {
        Self::from_figment(Figment::new().merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().context("Failed to load config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            bail!("REQUEST_TIMEOUT must be greater than zero");
        }
        if self.poll_interval_min > self.poll_interval_max {
            bail!(
                "POLL_INTERVAL_MIN ({:?}) exceeds POLL_INTERVAL_MAX ({:?})",
                self.poll_interval_min,
                self.poll_interval_max
            );
        }
        if self.poll_max_cycles == Some(0) {
            bail!("POLL_MAX_CYCLES must be at least 1 when set");
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_portal_url() -> Url {
    Url::parse(DEFAULT_PORTAL_URL).expect("default portal URL is valid")
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval_min() -> Duration {
    Duration::from_secs(120)
}

fn default_poll_interval_max() -> Duration {
    Duration::from_secs(180)
}

fn deserialize_url<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Url, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Url::parse(raw.trim()).map_err(|e| D::Error::custom(format!("invalid URL {raw:?}: {e}")))
}

/// Integers are seconds; strings go through `fundu` (`"90s"`, `"2m"`, `"1.5h"`).
fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DurationValue {
        Seconds(u64),
        Text(String),
    }

    match DurationValue::deserialize(deserializer)? {
        DurationValue::Seconds(secs) => Ok(Duration::from_secs(secs)),
        DurationValue::Text(text) => {
            let parsed = DurationParser::with_all_time_units()
                .parse(text.trim())
                .map_err(|e| D::Error::custom(format!("invalid duration {text:?}: {e}")))?;
            Duration::try_from(parsed)
                .map_err(|e| D::Error::custom(format!("invalid duration {text:?}: {e}")))
        }
    }
}
