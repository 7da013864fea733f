//! Process configuration
//!
//! Values come from the environment, optionally seeded from a `.env` file.

use crate::llm::GenerationConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set (or set LLM_GATEWAY to use a gateway)")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Configuration for the LLM provider
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// Gateway base URL; when set the gateway supplies credentials
    pub gateway: Option<String>,
    pub http_timeout: Duration,
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub llm: LlmConfig,
    pub generation: GenerationConfig,
    /// Upper bound for one generation round trip
    pub request_timeout: Duration,
    pub port: u16,
}

impl ChatConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when a variable is present but unparseable, or when neither an
    /// API key nor a gateway is configured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ChatConfig::from_env`] but with an explicit variable source.
    ///
    /// # Errors
    ///
    /// See [`ChatConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty());
        let gateway = lookup("LLM_GATEWAY").filter(|g| !g.trim().is_empty());
        if api_key.is_none() && gateway.is_none() {
            return Err(ConfigError::Missing {
                var: "GEMINI_API_KEY",
            });
        }

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            temperature: parse_or(&lookup, "CHAT_TEMPERATURE", defaults.temperature)?,
            top_p: parse_or(&lookup, "CHAT_TOP_P", defaults.top_p)?,
            top_k: parse_or(&lookup, "CHAT_TOP_K", defaults.top_k)?,
            max_output_tokens: parse_or(
                &lookup,
                "CHAT_MAX_OUTPUT_TOKENS",
                defaults.max_output_tokens,
            )?,
            response_mime_type: defaults.response_mime_type,
        };

        let request_timeout = Duration::from_secs(parse_or(
            &lookup,
            "CHAT_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        if request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "CHAT_REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            llm: LlmConfig {
                api_key,
                model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                gateway,
                // Leave headroom so the orchestrator's own deadline fires first
                http_timeout: request_timeout + Duration::from_secs(5),
            },
            generation,
            request_timeout,
            port: parse_or(&lookup, "CHAT_PORT", DEFAULT_PORT)?,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
