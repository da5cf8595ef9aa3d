use serde::Serialize;
use thiserror::Error;

use crate::api::{detail_text, SubmitReportResponse};
use crate::capabilities::{
    response_body, response_status, ApiRequest, HttpResult, NotificationPayload, RequestError,
};
use crate::config::Config;
use crate::model::{ReportDraft, SubmissionResult};
use crate::multipart::MultipartForm;
use crate::widgets::Choice;
use crate::{AppError, NOTIFICATION_EVENT_TYPE, NO_REMARKS_PLACEHOLDER, SUBMIT_REPORT_PATH};

pub const AUTHORITY_NOTIFIED: &str = "The responsible authority has been notified.";
pub const AUTHORITY_NOT_NOTIFIED: &str =
    "Note: Webhook notification was not sent (check backend configuration).";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("report is missing {field}")]
    IncompleteDraft { field: &'static str },
    #[error(transparent)]
    Request(#[from] RequestError),
}

#[derive(Serialize)]
struct LocationField<'a> {
    lat: f64,
    lng: f64,
    address: &'a str,
}

/// Packages the draft as the multipart form the report endpoint expects.
///
/// # Errors
///
/// `IncompleteDraft` when location, damage type or severity is missing;
/// `Request` when the request itself cannot be built.
pub fn submit_request(config: &Config, draft: &ReportDraft) -> Result<ApiRequest, SubmissionError> {
    if let Some(field) = draft.missing_field() {
        return Err(SubmissionError::IncompleteDraft { field });
    }
    let (Some(location), Some(damage_type), Some(severity)) =
        (&draft.location, draft.damage_type, draft.severity)
    else {
        return Err(SubmissionError::IncompleteDraft { field: "location" });
    };

    let location_json = serde_json::to_string(&LocationField {
        lat: location.lat,
        lng: location.lng,
        address: &location.address,
    })
    .map_err(|e| RequestError::Serialization {
        message: e.to_string(),
    })?;

    let mut form = MultipartForm::new();
    if let Some(image) = &draft.image {
        form = form.file(
            "image",
            image.file_name.as_str(),
            image.mime_type.as_str(),
            image.bytes.clone(),
        );
    }
    let form = form
        .text("location", location_json)
        .text("damage_type", damage_type.id())
        .text("severity", severity.id())
        .text(
            "remarks",
            draft.remarks.as_deref().unwrap_or(NO_REMARKS_PLACEHOLDER),
        );

    Ok(ApiRequest::post(config.api_endpoint(SUBMIT_REPORT_PATH))?.with_multipart(form)?)
}

/// How the backend answered a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted(SubmissionResult),
    /// 2xx without a report id.
    Rejected { message: Option<String> },
    /// Transport failure or error status.
    Failed { detail: String },
}

impl SubmissionOutcome {
    #[must_use]
    pub fn interpret(result: &HttpResult) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                return Self::Failed {
                    detail: AppError::from(e).message,
                }
            }
        };

        if !response.status().is_success() {
            return Self::Failed {
                detail: AppError::from_http_status(
                    response_status(response),
                    Some(response_body(response)),
                )
                .message,
            };
        }

        let Ok(body) = serde_json::from_slice::<SubmitReportResponse>(response_body(response))
        else {
            return Self::Rejected { message: None };
        };

        match body.report_id.filter(|id| !id.trim().is_empty()) {
            Some(report_id) => Self::Accepted(SubmissionResult {
                report_id,
                image_url: body.image_url.unwrap_or_default(),
                authority_notified: body.authority_notified.unwrap_or(false),
            }),
            None => Self::Rejected {
                message: body
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .or_else(|| body.detail.as_ref().and_then(detail_text)),
            },
        }
    }

    #[must_use]
    pub fn transcript_message(&self) -> String {
        match self {
            Self::Accepted(result) => format!(
                "✅ Report submitted successfully! Your reference ID is: {}. {}",
                result.report_id,
                if result.authority_notified {
                    AUTHORITY_NOTIFIED
                } else {
                    AUTHORITY_NOT_NOTIFIED
                }
            ),
            Self::Rejected { message } => format!(
                "There was an issue submitting your report: {}. Please try again.",
                message.as_deref().unwrap_or("Unknown error")
            ),
            Self::Failed { detail } => format!(
                "An error occurred while submitting your report: {detail}. Please try again."
            ),
        }
    }
}

/// Flattened copy of the submitted report addressed to `email`.
#[must_use]
pub fn notification_payload(
    result: &SubmissionResult,
    draft: &ReportDraft,
    email: &str,
) -> NotificationPayload {
    let (location, lat, lng, address) = match &draft.location {
        Some(l) => (l.summary(), l.lat, l.lng, l.address.clone()),
        None => ("0, 0".to_string(), 0.0, 0.0, String::new()),
    };
    NotificationPayload {
        report_id: result.report_id.clone(),
        location,
        location_lat: lat,
        location_lng: lng,
        location_address: address,
        damage_type: draft
            .damage_type
            .map(|d| d.id().to_string())
            .unwrap_or_default(),
        severity: draft.severity.map(|s| s.id().to_string()).unwrap_or_default(),
        remarks: draft.remarks.clone().unwrap_or_default(),
        image_url: result.image_url.clone(),
        user_email: email.to_string(),
        cc: email.to_string(),
        event_type: NOTIFICATION_EVENT_TYPE.to_string(),
    }
}
