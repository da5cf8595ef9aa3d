use serde::{Deserialize, Serialize};

use crate::capabilities::{GeolocationResult, HttpResult, NotifyResult};
use crate::config::Config;
use crate::model::{ConversationStep, SessionId};
use crate::widgets::{Coordinates, ImageCandidate};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Event {
    Noop,

    // --- Session ---
    AppStarted(Box<Config>),
    NewReportRequested,
    AlertDismissed,

    // --- Image step ---
    ImageDragStateChanged {
        active: bool,
    },
    ImageSelected(Box<ImageCandidate>),

    // --- Location step ---
    UseCurrentLocationRequested,
    ManualLocationRequested,
    ManualLatitudeChanged(String),
    ManualLongitudeChanged(String),
    ManualAddressChanged(String),
    ManualLocationSubmitted,
    LocationChangeRequested,
    LocationConfirmed,

    // --- Choices and free text ---
    DamageTypeSelected {
        id: String,
    },
    SeveritySelected {
        id: String,
    },
    RemarksSubmitted {
        remarks: String,
    },
    MessageSent {
        text: String,
    },
    EmailSubmitted {
        email: String,
    },

    // --- Capability results ---
    #[serde(skip)]
    ImageAnalyzed {
        session: SessionId,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    GeolocationResolved {
        session: SessionId,
        result: Box<GeolocationResult>,
    },
    #[serde(skip)]
    AddressResolved {
        session: SessionId,
        coordinates: Coordinates,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    ChatRelayed {
        session: SessionId,
        step: ConversationStep,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    ReportSubmitted {
        session: SessionId,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    EmailNotified {
        session: SessionId,
        email: String,
        result: Box<NotifyResult>,
    },
}

impl Event {
    /// Stable name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted(_) => "app_started",
            Self::NewReportRequested => "new_report_requested",
            Self::AlertDismissed => "alert_dismissed",
            Self::ImageDragStateChanged { .. } => "image_drag_state_changed",
            Self::ImageSelected(_) => "image_selected",
            Self::UseCurrentLocationRequested => "use_current_location_requested",
            Self::ManualLocationRequested => "manual_location_requested",
            Self::ManualLatitudeChanged(_) => "manual_latitude_changed",
            Self::ManualLongitudeChanged(_) => "manual_longitude_changed",
            Self::ManualAddressChanged(_) => "manual_address_changed",
            Self::ManualLocationSubmitted => "manual_location_submitted",
            Self::LocationChangeRequested => "location_change_requested",
            Self::LocationConfirmed => "location_confirmed",
            Self::DamageTypeSelected { .. } => "damage_type_selected",
            Self::SeveritySelected { .. } => "severity_selected",
            Self::RemarksSubmitted { .. } => "remarks_submitted",
            Self::MessageSent { .. } => "message_sent",
            Self::EmailSubmitted { .. } => "email_submitted",
            Self::ImageAnalyzed { .. } => "image_analyzed",
            Self::GeolocationResolved { .. } => "geolocation_resolved",
            Self::AddressResolved { .. } => "address_resolved",
            Self::ChatRelayed { .. } => "chat_relayed",
            Self::ReportSubmitted { .. } => "report_submitted",
            Self::EmailNotified { .. } => "email_notified",
        }
    }

    /// Events that come from the person using the app, as opposed to
    /// capability results.
    #[must_use]
    pub const fn is_user_input(&self) -> bool {
        !matches!(
            self,
            Self::Noop
                | Self::AppStarted(_)
                | Self::AlertDismissed
                | Self::ImageAnalyzed { .. }
                | Self::GeolocationResolved { .. }
                | Self::AddressResolved { .. }
                | Self::ChatRelayed { .. }
                | Self::ReportSubmitted { .. }
                | Self::EmailNotified { .. }
        )
    }
}
