//! Runtime configuration
//!
//! Read from the process environment (after `.env` is loaded by the
//! binaries). Anything unparseable is a fatal `ConfigError`.

use crate::error::OrchestrationError;
use crate::extract::KNOWN_CURRENCIES;
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DIRECTORY_PATH: &str = "data/clients.json";
pub const DEFAULT_EXCHANGE_RATE_API_URL: &str = "https://api.exchangerate-api.com/v4/latest";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarratorBackend {
    Scripted,
    Gemini,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateBackend {
    Http,
    Fixed,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client_directory_path: PathBuf,
    pub narrator: NarratorBackend,
    pub gemini_api_key: Option<String>,
    pub rate_provider: RateBackend,
    pub exchange_rate_api_url: String,
    pub rate_timeout: Duration,
    pub local_currency: String,
    pub base_currency: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let narrator = match get("NARRATOR_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("scripted") => NarratorBackend::Scripted,
            Some("gemini") => NarratorBackend::Gemini,
            Some(other) => {
                return Err(OrchestrationError::ConfigError(format!(
                    "NARRATOR_BACKEND must be 'scripted' or 'gemini', got '{}'",
                    other
                )))
            }
        };

        let gemini_api_key = get("GEMINI_API_KEY");
        if narrator == NarratorBackend::Gemini && gemini_api_key.is_none() {
            return Err(OrchestrationError::ConfigError(
                "NARRATOR_BACKEND=gemini requires GEMINI_API_KEY".to_string(),
            ));
        }

        let rate_provider = match get("RATE_PROVIDER").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("http") => RateBackend::Http,
            Some("fixed") => RateBackend::Fixed,
            Some(other) => {
                return Err(OrchestrationError::ConfigError(format!(
                    "RATE_PROVIDER must be 'http' or 'fixed', got '{}'",
                    other
                )))
            }
        };

        let rate_timeout_secs: u64 = match get("RATE_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                OrchestrationError::ConfigError(format!("RATE_TIMEOUT_SECS is not a number: '{}'", raw))
            })?,
            None => 5,
        };

        let port: u16 = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => raw
                .parse()
                .map_err(|_| OrchestrationError::ConfigError(format!("invalid port: '{}'", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            client_directory_path: get("CLIENT_DIRECTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DIRECTORY_PATH)),
            narrator,
            gemini_api_key,
            rate_provider,
            exchange_rate_api_url: get("EXCHANGE_RATE_API_URL")
                .unwrap_or_else(|| DEFAULT_EXCHANGE_RATE_API_URL.to_string()),
            rate_timeout: Duration::from_secs(rate_timeout_secs),
            local_currency: currency_code("LOCAL_CURRENCY", get("LOCAL_CURRENCY"), "BRL")?,
            base_currency: currency_code("BASE_CURRENCY", get("BASE_CURRENCY"), "USD")?,
            port,
        })
    }
}

fn currency_code(key: &str, value: Option<String>, default: &str) -> Result<String> {
    let code = value.unwrap_or_else(|| default.to_string()).to_uppercase();
    if KNOWN_CURRENCIES.contains(&code.as_str()) {
        Ok(code)
    } else {
        Err(OrchestrationError::ConfigError(format!(
            "{} must be one of {}, got '{}'",
            key,
            KNOWN_CURRENCIES.join(", "),
            code
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.client_directory_path, PathBuf::from("data/clients.json"));
        assert_eq!(config.narrator, NarratorBackend::Scripted);
        assert_eq!(config.rate_provider, RateBackend::Http);
        assert_eq!(config.rate_timeout, Duration::from_secs(5));
        assert_eq!(config.local_currency, "BRL");
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_gemini_without_key_is_fatal() {
        let err = config_from(&[("NARRATOR_BACKEND", "gemini")]).unwrap_err();
        assert!(matches!(err, OrchestrationError::ConfigError(_)));

        let ok = config_from(&[("NARRATOR_BACKEND", "Gemini"), ("GEMINI_API_KEY", "k")]).unwrap();
        assert_eq!(ok.narrator, NarratorBackend::Gemini);
    }

    #[test]
    fn test_overrides_and_validation() {
        let config = config_from(&[
            ("RATE_PROVIDER", "fixed"),
            ("LOCAL_CURRENCY", "eur"),
            ("API_PORT", "9000"),
            ("RATE_TIMEOUT_SECS", "2"),
        ])
        .unwrap();
        assert_eq!(config.rate_provider, RateBackend::Fixed);
        assert_eq!(config.local_currency, "EUR");
        assert_eq!(config.port, 9000);
        assert_eq!(config.rate_timeout, Duration::from_secs(2));

        assert!(config_from(&[("LOCAL_CURRENCY", "XYZ")]).is_err());
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("RATE_PROVIDER", "carrier-pigeon")]).is_err());
    }
}
