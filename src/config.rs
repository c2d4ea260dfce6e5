use crate::client::ClientError;
use crate::xml_mapper::truthy;
use std::env;

pub const DEFAULT_BASE_URL: &str = "http://api.careerbuilder.com/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const API_KEY_VAR: &str = "CAREER_BUILDER_API_KEY";
pub const TEST_MODE_VAR: &str = "CAREER_BUILDER_TEST_MODE";
pub const BASE_URL_VAR: &str = "CAREER_BUILDER_BASE_URL";
pub const TIMEOUT_MS_VAR: &str = "CAREER_BUILDER_TIMEOUT_MS";

// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Test flag used for submissions that do not set one.
    pub test_mode: bool,
    pub timeout_ms: u64,
    pub zipcode: Option<String>,
    pub radius: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            test_mode: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            zipcode: None,
            radius: None,
        }
    }
}

impl ClientConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Load from the process environment, reading a `.env` file first if
    /// there is one.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_ms = match var(TIMEOUT_MS_VAR) {
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                ClientError::ConfigError(format!(
                    "{} must be a number of milliseconds",
                    TIMEOUT_MS_VAR
                ))
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let config = Self {
            base_url: var(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: var(API_KEY_VAR),
            test_mode: truthy(var(TEST_MODE_VAR).as_deref()),
            timeout_ms,
            zipcode: None,
            radius: None,
        };
        config.api_key()?;
        Ok(config)
    }

    /// The developer key, rejecting a missing or blank one.
    pub fn api_key(&self) -> Result<&str, ClientError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ClientError::ConfigError(format!(
                "API key not found (set {})",
                API_KEY_VAR
            ))),
        }
    }
}
