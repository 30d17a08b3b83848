//! Environment-driven application configuration

use crate::LogFormat;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_URL: &str = "sqlite://data/journal.db";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_BASE_CURRENCY: &str = "USD";
const DEFAULT_KPI_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was present but could not be parsed
    #[error("Invalid value for {key}: {detail}")]
    InvalidValue { key: String, detail: String },

    /// The assembled configuration is inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which LLM backend serves completions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI or any OpenAI-compatible endpoint
    #[default]
    OpenAI,
}

impl FromStr for LlmProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            other => Err(format!("unknown LLM provider: {other}")),
        }
    }
}

/// Application configuration
///
/// Every field maps to one environment variable; see [`AppConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to (`FIN_BIND_ADDR`)
    pub bind_addr: String,
    /// SQLite URL for the trading journal (`FIN_DATABASE_URL`)
    pub database_url: String,
    /// LLM backend (`FIN_LLM_PROVIDER`)
    pub llm_provider: LlmProviderKind,
    /// Model identifier (`FIN_LLM_MODEL`)
    pub llm_model: String,
    /// Currency trades are normalized into (`FIN_BASE_CURRENCY`)
    pub base_currency: String,
    /// KPI cache lifetime in seconds (`FIN_KPI_CACHE_TTL`)
    pub kpi_cache_ttl_secs: u64,
    /// Search API key for report research (`TAVILY_API_KEY`)
    pub tavily_api_key: Option<String>,
    /// Fundamentals provider key (`ALPHA_VANTAGE_API_KEY`)
    pub alpha_vantage_api_key: Option<String>,
    /// Headless render service used as scraping fallback (`FIN_RENDER_SERVICE_URL`)
    pub render_service_url: Option<String>,
    /// Log output format (`FIN_LOG_FORMAT`)
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            llm_provider: LlmProviderKind::OpenAI,
            llm_model: DEFAULT_OPENAI_MODEL.to_string(),
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            kpi_cache_ttl_secs: DEFAULT_KPI_CACHE_TTL_SECS,
            tavily_api_key: None,
            alpha_vantage_api_key: None,
            render_service_url: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let llm_provider = match get("FIN_LLM_PROVIDER") {
            Some(raw) => raw.parse().map_err(|detail| ConfigError::InvalidValue {
                key: "FIN_LLM_PROVIDER".to_string(),
                detail,
            })?,
            None => defaults.llm_provider,
        };

        let llm_model = get("FIN_LLM_MODEL").unwrap_or_else(|| match llm_provider {
            LlmProviderKind::Anthropic => DEFAULT_ANTHROPIC_MODEL.to_string(),
            LlmProviderKind::OpenAI => DEFAULT_OPENAI_MODEL.to_string(),
        });

        let kpi_cache_ttl_secs = match get("FIN_KPI_CACHE_TTL") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                    key: "FIN_KPI_CACHE_TTL".to_string(),
                    detail: e.to_string(),
                })?,
            None => defaults.kpi_cache_ttl_secs,
        };

        let log_format = match get("FIN_LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|detail| ConfigError::InvalidValue {
                key: "FIN_LOG_FORMAT".to_string(),
                detail,
            })?,
            None => defaults.log_format,
        };

        let config = Self {
            bind_addr: get("FIN_BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: get("FIN_DATABASE_URL").unwrap_or(defaults.database_url),
            llm_provider,
            llm_model,
            base_currency: get("FIN_BASE_CURRENCY")
                .map(|c| c.trim().to_ascii_uppercase())
                .unwrap_or(defaults.base_currency),
            kpi_cache_ttl_secs,
            tavily_api_key: get("TAVILY_API_KEY"),
            alpha_vantage_api_key: get("ALPHA_VANTAGE_API_KEY"),
            render_service_url: get("FIN_RENDER_SERVICE_URL"),
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_model.trim().is_empty() {
            return Err(ConfigError::Invalid("LLM model must not be empty".to_string()));
        }

        if self.base_currency.len() != 3
            || !self.base_currency.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(ConfigError::Invalid(format!(
                "base currency must be a 3-letter ISO code, got '{}'",
                self.base_currency
            )));
        }

        if self.kpi_cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "KPI cache TTL must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// KPI cache lifetime as a [`Duration`]
    pub fn kpi_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.kpi_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.llm_provider, LlmProviderKind::OpenAI);
        assert_eq!(config.llm_model, "gpt-4o-mini");
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.kpi_cache_ttl(), Duration::from_secs(300));
        assert!(config.tavily_api_key.is_none());
    }

    #[test]
    fn test_anthropic_default_model() {
        let config = AppConfig::from_lookup(lookup(&[("FIN_LLM_PROVIDER", "anthropic")])).unwrap();
        assert_eq!(config.llm_provider, LlmProviderKind::Anthropic);
        assert_eq!(config.llm_model, "claude-sonnet-4-5-20250929");
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FIN_BASE_CURRENCY", "eur"),
            ("FIN_KPI_CACHE_TTL", "60"),
            ("FIN_LOG_FORMAT", "json"),
            ("TAVILY_API_KEY", "tvly-123"),
            ("FIN_RENDER_SERVICE_URL", "   "),
        ]))
        .unwrap();

        assert_eq!(config.base_currency, "EUR");
        assert_eq!(config.kpi_cache_ttl_secs, 60);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.tavily_api_key.as_deref(), Some("tvly-123"));
        // Blank values count as unset
        assert!(config.render_service_url.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[("FIN_LLM_PROVIDER", "cohere")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = AppConfig::from_lookup(lookup(&[("FIN_KPI_CACHE_TTL", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AppConfig::from_lookup(lookup(&[("FIN_BASE_CURRENCY", "EURO")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
