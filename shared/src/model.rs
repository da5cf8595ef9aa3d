use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::config::Config;
use crate::transcript::{EntryId, Resolution, Transcript};
use crate::widgets::{Choice, DamageType, ImageBlob, ImagePicker, LocationPicker, Severity};
use crate::{COORDINATE_LABEL_PRECISION, NO_REMARKS_PLACEHOLDER};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wizard steps in the order they are completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversationStep {
    #[default]
    Greeting,
    Image,
    Location,
    DamageType,
    Severity,
    Remarks,
}

impl ConversationStep {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Image => "image",
            Self::Location => "location",
            Self::DamageType => "damageType",
            Self::Severity => "severity",
            Self::Remarks => "remarks",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::Greeting,
            Self::Image,
            Self::Location,
            Self::DamageType,
            Self::Severity,
            Self::Remarks,
        ]
        .into_iter()
        .find(|s| s.as_str() == value)
    }

    /// Position in the sequence. Greeting and image share the photo slot.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Greeting | Self::Image => 0,
            Self::Location => 1,
            Self::DamageType => 2,
            Self::Severity => 3,
            Self::Remarks => 4,
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Greeting | Self::Image => Some(Self::Location),
            Self::Location => Some(Self::DamageType),
            Self::DamageType => Some(Self::Severity),
            Self::Severity => Some(Self::Remarks),
            Self::Remarks => None,
        }
    }

    #[must_use]
    pub const fn accepts_image(self) -> bool {
        matches!(self, Self::Greeting | Self::Image)
    }
}

impl fmt::Display for ConversationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl Location {
    /// Address when known, otherwise the raw coordinate pair.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.address.trim().is_empty() {
            format!("{}, {}", self.lat, self.lng)
        } else {
            self.address.clone()
        }
    }

    #[must_use]
    pub fn coordinate_label(&self) -> String {
        format!(
            "{:.prec$}, {:.prec$}",
            self.lat,
            self.lng,
            prec = COORDINATE_LABEL_PRECISION
        )
    }
}

/// Fields collected so far. Each is written once, in step order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub image: Option<ImageBlob>,
    pub location: Option<Location>,
    pub damage_type: Option<DamageType>,
    pub severity: Option<Severity>,
    pub remarks: Option<String>,
}

impl ReportDraft {
    pub fn record_image(&mut self, image: ImageBlob) {
        self.image = Some(image);
    }

    pub fn record_location(&mut self, location: Location) {
        self.location = Some(location);
    }

    pub fn record_damage_type(&mut self, damage_type: DamageType) {
        self.damage_type = Some(damage_type);
    }

    pub fn record_severity(&mut self, severity: Severity) {
        self.severity = Some(severity);
    }

    /// Stores trimmed remarks, or the placeholder when nothing was typed.
    pub fn record_remarks(&mut self, raw: &str) -> &str {
        let trimmed = raw.trim();
        let remarks = if trimmed.is_empty() {
            NO_REMARKS_PLACEHOLDER
        } else {
            trimmed
        };
        self.remarks.insert(remarks.to_string())
    }

    /// First field a submission still needs, if any. The image is optional.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.location.is_none() {
            Some("location")
        } else if self.damage_type.is_none() {
            Some("damage_type")
        } else if self.severity.is_none() {
            Some("severity")
        } else {
            None
        }
    }

    /// Count of populated fields, for monotonicity checks.
    #[must_use]
    pub fn filled_fields(&self) -> usize {
        [
            self.image.is_some(),
            self.location.is_some(),
            self.damage_type.is_some(),
            self.severity.is_some(),
            self.remarks.is_some(),
        ]
        .into_iter()
        .filter(|f| *f)
        .count()
    }

    #[must_use]
    pub fn summary(&self) -> DraftSummary {
        DraftSummary {
            image: self.image.as_ref().map(|i| i.file_name.clone()),
            location: self.location.clone(),
            damage_type: self.damage_type.map(|d| d.id().to_string()),
            severity: self.severity.map(|s| s.id().to_string()),
            remarks: self.remarks.clone(),
        }
    }
}

/// Draft without the image bytes, as sent to the chat relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSummary {
    pub image: Option<String>,
    pub location: Option<Location>,
    pub damage_type: Option<String>,
    pub severity: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub report_id: String,
    pub image_url: String,
    pub authority_notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum EmailStage {
    Awaiting,
    Sent { address: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    Collecting {
        step: ConversationStep,
    },
    Submitted {
        result: SubmissionResult,
        email: EmailStage,
    },
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Collecting {
            step: ConversationStep::Greeting,
        }
    }
}

/// How a failed operation is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Logged; the flow carries on with a degraded message.
    Advisory,
    /// Falls back to another input path.
    Blocking,
    /// Reported in the transcript; the step can be retried.
    TerminalStep,
    /// Logged only.
    SideChannel,
}

/// Kinds of outstanding work. At most one of each kind is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingOp {
    ImageAnalysis,
    Geolocation,
    ReverseGeocode,
    ChatRelay,
    Submission,
    EmailNotification,
}

impl PendingOp {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ImageAnalysis => "image_analysis",
            Self::Geolocation => "geolocation",
            Self::ReverseGeocode => "reverse_geocode",
            Self::ChatRelay => "chat_relay",
            Self::Submission => "submission",
            Self::EmailNotification => "email_notification",
        }
    }

    #[must_use]
    pub const fn failure_policy(self) -> FailurePolicy {
        match self {
            Self::ImageAnalysis | Self::ReverseGeocode | Self::ChatRelay => {
                FailurePolicy::Advisory
            }
            Self::Geolocation => FailurePolicy::Blocking,
            Self::Submission => FailurePolicy::TerminalStep,
            Self::EmailNotification => FailurePolicy::SideChannel,
        }
    }

    /// Whether user input waits for this operation.
    #[must_use]
    pub const fn blocks_input(self) -> bool {
        matches!(
            self,
            Self::Submission | Self::ChatRelay | Self::EmailNotification
        )
    }
}

/// Pending transcript entry for each outstanding operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlight(BTreeMap<PendingOp, EntryId>);

impl InFlight {
    #[must_use]
    pub fn contains(&self, op: PendingOp) -> bool {
        self.0.contains_key(&op)
    }

    #[must_use]
    pub fn get(&self, op: PendingOp) -> Option<EntryId> {
        self.0.get(&op).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ops(&self) -> impl Iterator<Item = PendingOp> + '_ {
        self.0.keys().copied()
    }

    fn insert(&mut self, op: PendingOp, entry: EntryId) {
        self.0.insert(op, entry);
    }

    fn take(&mut self, op: PendingOp) -> Option<EntryId> {
        self.0.remove(&op)
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    pub config: Config,
    pub started: bool,
    pub session: SessionId,
    pub phase: SessionPhase,
    pub draft: ReportDraft,
    pub transcript: Transcript,
    pub in_flight: InFlight,
    pub image_picker: ImagePicker,
    pub location_picker: LocationPicker,
    /// Blocking message; user input is ignored until it is dismissed.
    pub alert: Option<String>,
}

impl Model {
    #[must_use]
    pub fn current_step(&self) -> Option<ConversationStep> {
        match self.phase {
            SessionPhase::Collecting { step } => Some(step),
            SessionPhase::Submitted { .. } => None,
        }
    }

    #[must_use]
    pub fn is_collecting(&self, step: ConversationStep) -> bool {
        self.current_step() == Some(step)
    }

    #[must_use]
    pub fn submission(&self) -> Option<&SubmissionResult> {
        match &self.phase {
            SessionPhase::Submitted { result, .. } => Some(result),
            SessionPhase::Collecting { .. } => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.ops().any(PendingOp::blocks_input)
    }

    /// Moves to the step after the current one. Returns the new step.
    pub fn advance(&mut self) -> Option<ConversationStep> {
        let next = self.current_step()?.next()?;
        self.phase = SessionPhase::Collecting { step: next };
        Some(next)
    }

    /// Registers `op` with a pending transcript entry. Returns `None` when an
    /// operation of the same kind is already outstanding.
    pub fn begin(&mut self, op: PendingOp, placeholder: impl Into<String>) -> Option<EntryId> {
        if self.in_flight.contains(op) {
            debug!(op = op.name(), "operation already in flight");
            return None;
        }
        let entry = self.transcript.push_pending(placeholder);
        self.in_flight.insert(op, entry);
        Some(entry)
    }

    /// Settles the pending entry registered for `op`.
    pub fn finish(&mut self, op: PendingOp, resolution: Resolution) {
        let Some(entry) = self.in_flight.take(op) else {
            debug!(op = op.name(), "no pending entry to settle");
            return;
        };
        if let Err(e) = self.transcript.resolve(entry, resolution) {
            warn!(op = op.name(), error = %e, "pending entry could not be settled");
        }
    }

    /// Starts a fresh session. Configuration survives; results still in
    /// flight for the old session will be discarded on arrival.
    pub fn reset_session(&mut self) {
        self.session = self.session.next();
        self.phase = SessionPhase::default();
        self.draft = ReportDraft::default();
        self.transcript.clear();
        self.in_flight.clear();
        self.image_picker = ImagePicker::default();
        self.location_picker = LocationPicker::default();
        self.alert = None;
    }
}
