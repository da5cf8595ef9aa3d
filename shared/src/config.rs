use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_GEOCODER_CLIENT_HEADER: &str = "User-Agent";
pub const DEFAULT_GEOCODER_CLIENT_ID: &str = "RoadDamageReporter/1.0";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Configuration is not valid JSON: {0}")]
    Malformed(String),
    #[error("{field} is not a valid http(s) URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Endpoints the core talks to. Missing JSON fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub geocoder_url: String,
    pub geocoder_client_header: String,
    pub geocoder_client_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            geocoder_url: DEFAULT_GEOCODER_URL.into(),
            geocoder_client_header: DEFAULT_GEOCODER_CLIENT_HEADER.into(),
            geocoder_client_id: DEFAULT_GEOCODER_CLIENT_ID.into(),
        }
    }
}

impl Config {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the document is malformed or a field fails
    /// validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns the first field that is empty or not an http(s) URL with a host.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("api_base_url", &self.api_base_url)?;
        validate_url("geocoder_url", &self.geocoder_url)?;
        if self.geocoder_client_header.trim().is_empty() {
            return Err(ConfigError::Empty {
                field: "geocoder_client_header",
            });
        }
        if self.geocoder_client_id.trim().is_empty() {
            return Err(ConfigError::Empty {
                field: "geocoder_client_id",
            });
        }
        Ok(())
    }

    /// Joins an endpoint path onto the API base URL.
    #[must_use]
    pub fn api_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty { field });
    }
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            field,
            reason: "missing host".into(),
        });
    }
    Ok(())
}
