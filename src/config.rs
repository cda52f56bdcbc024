use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{EtlError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ads_api_url: Option<String>,
    pub crm_api_url: Option<String>,
    pub sink_url: Option<String>,
    pub sink_secret: Option<String>,
    pub port: u16,
    pub log_level: String,
    /// Accepts `30`, `30s`, `1m` or `500ms` in TOML and in `HTTP_TIMEOUT`
    #[serde(deserialize_with = "deserialize_duration")]
    pub http_timeout: Duration,
    pub retry_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ads_api_url: None,
            crm_api_url: None,
            sink_url: None,
            sink_secret: None,
            port: 8080,
            log_level: "info".to_string(),
            http_timeout: Duration::from_secs(30),
            retry_attempts: 3,
        }
    }
}

impl Config {
    /// Load `.env`, then the TOML file named by `ETL_CONFIG` (default `config.toml`)
    /// if it exists, then apply environment overrides.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let path = std::env::var("ETL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            debug!(path = %path, "no config file, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Overlay values from `lookup` (normally the process environment). Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ADS_API_URL") {
            self.ads_api_url = Some(v);
        }
        if let Some(v) = get("CRM_API_URL") {
            self.crm_api_url = Some(v);
        }
        if let Some(v) = get("SINK_URL") {
            self.sink_url = Some(v);
        }
        if let Some(v) = get("SINK_SECRET") {
            self.sink_secret = Some(v);
        }
        if let Some(v) = get("PORT") {
            self.port = v
                .trim()
                .parse()
                .map_err(|_| EtlError::Config(format!("PORT must be a port number, got '{}'", v)))?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = get("HTTP_TIMEOUT") {
            self.http_timeout = parse_duration(&v)
                .ok_or_else(|| EtlError::Config(format!("HTTP_TIMEOUT is not a duration: '{}'", v)))?;
        }
        if let Some(v) = get("RETRY_ATTEMPTS") {
            self.retry_attempts = v
                .trim()
                .parse()
                .map_err(|_| EtlError::Config(format!("RETRY_ATTEMPTS must be a count, got '{}'", v)))?;
        }
        Ok(())
    }

    /// Both upstream URLs, or a configuration error naming the missing one
    pub fn source_urls(&self) -> Result<(&str, &str)> {
        let ads = self
            .ads_api_url
            .as_deref()
            .ok_or_else(|| EtlError::Config("ADS_API_URL is not set".to_string()))?;
        let crm = self
            .crm_api_url
            .as_deref()
            .ok_or_else(|| EtlError::Config("CRM_API_URL is not set".to_string()))?;
        Ok((ads, crm))
    }
}

/// Parse `30`, `30s`, `2m` or `250ms`
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => raw.split_at(i),
        None => (raw, "s"),
    };
    let value: u64 = digits.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        _ => None,
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(s) => Ok(Duration::from_secs(s)),
        Raw::Text(t) => parse_duration(&t)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{}'", t))),
    }
}
