// lib.rs - Road damage reporting wizard core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod api;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod model;
pub mod multipart;
pub mod submission;
pub mod transcript;
pub mod view;
pub mod widgets;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::Config;
pub use crux_core::App as CruxApp;
pub use event::Event;
pub use model::{
    ConversationStep, EmailStage, Location, Model, PendingOp, ReportDraft, SessionId,
    SessionPhase, SubmissionResult,
};
pub use view::ViewModel;

pub const NO_REMARKS_PLACEHOLDER: &str = "No additional remarks";
pub const ANALYZE_IMAGE_PATH: &str = "/api/analyze-image";
pub const CHAT_RELAY_PATH: &str = "/chat";
pub const SUBMIT_REPORT_PATH: &str = "/api/reports/submit";
pub const NOTIFICATION_EVENT_TYPE: &str = "cc_notification";
pub const DEFAULT_NOTIFICATION_WEBHOOK_URL: &str =
    "https://hook.relay.app/api/v1/playbook/cmjzjlqwd00f60pkq0v7peeha/trigger/Cxg6-JhnsGxOXIyySUyXYw";
pub const COORDINATE_LABEL_PRECISION: usize = 6;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MAX_LONGITUDE: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Validation,
    NotFound,
    Server,
    Serialization,
    Deserialization,
    Location,
    LocationPermissionDenied,
    InvalidState,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Server => "SERVER_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Location => "LOCATION_ERROR",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::InvalidState => "INVALID_STATE",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Text shown in the transcript when the failure surfaces to the user.
    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Location => {
                "I couldn't determine your current location. Please enter the coordinates manually."
                    .into()
            }
            ErrorKind::LocationPermissionDenied => {
                "Location access was denied. Please enter the coordinates manually.".into()
            }
            ErrorKind::Validation
            | ErrorKind::NotFound
            | ErrorKind::Server
            | ErrorKind::Serialization
            | ErrorKind::Deserialization
            | ErrorKind::InvalidState
            | ErrorKind::Unknown => self.message.clone(),
        }
    }

    /// Builds an error from a non-success response, preferring the server's
    /// `detail` (or `message`) over a generic status line.
    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            404 => ErrorKind::NotFound,
            408 | 504 => ErrorKind::Timeout,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        };

        let message = body
            .and_then(|b| serde_json::from_slice::<api::ApiErrorResponse>(b).ok())
            .and_then(api::ApiErrorResponse::into_message)
            .unwrap_or_else(|| format!("Request failed with status code {status}"));

        Self::new(kind, message).with_context("http_status", status.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

/// The shell could not complete the exchange at all.
impl From<&crux_http::Error> for AppError {
    fn from(e: &crux_http::Error) -> Self {
        Self::new(ErrorKind::Network, e.to_string())
    }
}

impl From<&capabilities::RequestError> for AppError {
    fn from(e: &capabilities::RequestError) -> Self {
        let kind = match e {
            capabilities::RequestError::Serialization { .. } => ErrorKind::Serialization,
            capabilities::RequestError::InvalidUrl { .. }
            | capabilities::RequestError::InvalidHeader { .. }
            | capabilities::RequestError::TooManyHeaders { .. }
            | capabilities::RequestError::BodyTooLarge { .. }
            | capabilities::RequestError::InvalidRequest { .. } => ErrorKind::InvalidState,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<&capabilities::GeolocationError> for AppError {
    fn from(e: &capabilities::GeolocationError) -> Self {
        let kind = match e {
            capabilities::GeolocationError::PermissionDenied => ErrorKind::LocationPermissionDenied,
            capabilities::GeolocationError::PositionUnavailable { .. }
            | capabilities::GeolocationError::Timeout
            | capabilities::GeolocationError::Unsupported => ErrorKind::Location,
        };
        Self::new(kind, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
    #[error("'{0}' is not a number")]
    NotANumber(String),
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

#[must_use]
pub fn get_current_time_ms() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Explicit timestamp unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(get_current_time_ms())
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl Default for UnixTimeMs {
    fn default() -> Self {
        Self::now()
    }
}
