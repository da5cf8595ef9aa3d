use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::http::{ApiRequest, RequestError};

/// Outbound report notification. The shell decides where it goes; the
/// default destination is a workflow-automation webhook.
pub struct Notify<Ev> {
    context: CapabilityContext<NotifyOperation, Ev>,
}

impl<Ev> Capability<Ev> for Notify<Ev> {
    type Operation = NotifyOperation;
    type MappedSelf<MappedEv> = Notify<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Notify::new(self.context.map_event(f))
    }
}

impl<Ev> Notify<Ev>
where
    Ev: 'static,
{
    #[must_use]
    pub fn new(context: CapabilityContext<NotifyOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn deliver<F>(&self, payload: NotificationPayload, make_event: F)
    where
        F: FnOnce(NotifyResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context
                .request_from_shell(NotifyOperation::Deliver(payload))
                .await;
            context.update_app(make_event(result));
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NotifyOperation {
    Deliver(NotificationPayload),
}

impl Operation for NotifyOperation {
    type Output = NotifyResult;
}

/// Flat report copy sent to the user. Field names are what the webhook's
/// automation reads, so they stay snake_case and top-level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPayload {
    pub report_id: String,
    pub location: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub location_address: String,
    pub damage_type: String,
    pub severity: String,
    pub remarks: String,
    pub image_url: String,
    pub user_email: String,
    pub cc: String,
    pub event_type: String,
}

impl NotificationPayload {
    /// Builds the JSON POST a shell sends when it delivers to a webhook.
    ///
    /// # Errors
    ///
    /// Fails when `url` is not a valid http(s) URL.
    pub fn webhook_request(&self, url: &str) -> Result<ApiRequest, RequestError> {
        ApiRequest::post(url)?.with_json(self)
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification rejected with status {status}")]
    Rejected { status: u16 },

    #[error("notification transport failed: {message}")]
    Transport { message: String },
}

pub type NotifyResult = Result<(), NotifyError>;
