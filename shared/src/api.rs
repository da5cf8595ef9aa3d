use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::capabilities::{
    response_body, response_status, ApiRequest, HttpResult, RequestError, ValidatedUrl,
};
use crate::config::Config;
use crate::model::{ConversationStep, DraftSummary};
use crate::multipart::MultipartForm;
use crate::widgets::{Coordinates, ImageBlob};
use crate::{AppError, ErrorKind, ANALYZE_IMAGE_PATH, CHAT_RELAY_PATH};

/// Error body. FastAPI puts the reason in `detail`, which is either a string
/// or a list of validation problems.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorResponse {
    #[must_use]
    pub fn into_message(self) -> Option<String> {
        self.detail
            .as_ref()
            .and_then(detail_text)
            .or(self.message.filter(|m| !m.trim().is_empty()))
    }
}

/// Flattens a `detail` value into readable text.
#[must_use]
pub fn detail_text(detail: &serde_json::Value) -> Option<String> {
    use serde_json::Value;

    match detail {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .map(|item| match item.get("msg").and_then(Value::as_str) {
                    Some(msg) => msg.to_string(),
                    None => item.to_string(),
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeImageResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRelayRequest<'a> {
    pub message: &'a str,
    pub step: ConversationStep,
    #[serde(rename = "reportData")]
    pub report_data: DraftSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRelayResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub next_step: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubmitReportResponse {
    #[serde(default)]
    pub report_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub authority_notified: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReverseGeocodeResponse {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// # Errors
///
/// Fails when the configured base URL cannot form a valid endpoint.
pub fn endpoint(config: &Config, path: &str) -> Result<ValidatedUrl, RequestError> {
    ValidatedUrl::new(config.api_endpoint(path))
}

/// Multipart upload of the photo for analysis, keeping its file name.
///
/// # Errors
///
/// Fails when the endpoint is invalid or the image exceeds the body limit.
pub fn analyze_image_request(config: &Config, image: &ImageBlob) -> Result<ApiRequest, RequestError> {
    let form = MultipartForm::new().file(
        "image",
        image.file_name.as_str(),
        image.mime_type.as_str(),
        image.bytes.clone(),
    );
    ApiRequest::post(endpoint(config, ANALYZE_IMAGE_PATH)?.as_str())?.with_multipart(form)
}

/// # Errors
///
/// Fails when the endpoint is invalid or the body cannot be serialized.
pub fn chat_relay_request(
    config: &Config,
    message: &str,
    step: ConversationStep,
    report_data: DraftSummary,
) -> Result<ApiRequest, RequestError> {
    let body = ChatRelayRequest {
        message,
        step,
        report_data,
    };
    ApiRequest::post(endpoint(config, CHAT_RELAY_PATH)?.as_str())?.with_json(&body)
}

/// # Errors
///
/// Fails when the geocoder URL or client header is invalid.
pub fn reverse_geocode_request(
    config: &Config,
    coordinates: Coordinates,
) -> Result<ApiRequest, RequestError> {
    let lat = coordinates.lat().to_string();
    let lon = coordinates.lng().to_string();
    let url = ValidatedUrl::new(config.geocoder_url.as_str())?.with_query([
        ("format", "json"),
        ("lat", lat.as_str()),
        ("lon", lon.as_str()),
    ])?;
    ApiRequest::get(url.as_str())?.with_header(
        config.geocoder_client_header.as_str(),
        config.geocoder_client_id.as_str(),
    )
}

/// Decodes a 2xx JSON body; everything else becomes an `AppError`.
///
/// # Errors
///
/// Transport failures, non-success statuses and malformed bodies.
pub fn decode<T: DeserializeOwned>(result: &HttpResult) -> Result<T, AppError> {
    let response = result.as_ref().map_err(AppError::from)?;
    if !response.status().is_success() {
        return Err(AppError::from_http_status(
            response_status(response),
            Some(response_body(response)),
        ));
    }
    serde_json::from_slice::<T>(response_body(response)).map_err(|e| {
        AppError::new(ErrorKind::Deserialization, "Unexpected response from server")
            .with_internal(e.to_string())
    })
}

/// Address from a reverse-geocoding answer, if it carried one.
///
/// # Errors
///
/// Same as [`decode`], plus a `NotFound` when no `display_name` came back.
pub fn interpret_reverse_geocode(result: &HttpResult) -> Result<String, AppError> {
    decode::<ReverseGeocodeResponse>(result)?
        .display_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::new(ErrorKind::NotFound, "No address for these coordinates"))
}
