use tracing::{debug, error, info, warn};

use crate::api::{self, AnalyzeImageResponse, ChatRelayResponse};
use crate::capabilities::{Capabilities, GeolocationResult, HttpResult, NotifyResult};
use crate::config::Config;
use crate::event::Event;
use crate::model::{
    ConversationStep, EmailStage, FailurePolicy, Location, Model, PendingOp, SessionId,
    SessionPhase,
};
use crate::submission::{self, SubmissionOutcome};
use crate::transcript::Resolution;
use crate::view::{self, ViewModel};
use crate::widgets::{
    Choice, ChoicePicker, Coordinates, DamageType, ImageBlob, ImageInput, LocationInput, Outcome,
    Severity, Widget, WidgetRequest,
};
use crate::{AppError, ErrorKind};

pub const GREETING: &str = "Hello! I'm your AI assistant for reporting road damage. I'll guide you through the process step by step. Let's start by uploading a photo of the road damage.";
pub const IMAGE_UPLOADED: &str = "Image uploaded";
pub const ANALYZING_IMAGE: &str = "Great! I'm analyzing the image...";
pub const IMAGE_ANALYZED: &str =
    "Image analyzed successfully. Now, please provide the location of this damage.";
pub const IMAGE_ANALYSIS_DEGRADED: &str =
    "I had trouble analyzing the image, but your photo is saved. Let's continue with the location.";
pub const IMAGE_ANALYSIS_FAILED: &str =
    "There was an error analyzing the image. Let's continue with the location.";
pub const LOCATING: &str = "Finding your current location...";
pub const POSITION_FOUND: &str = "I found your current position. Please confirm the location.";
pub const LOOKING_UP_ADDRESS: &str = "Looking up the address...";
pub const ASK_DAMAGE_TYPE: &str = "Perfect! Now, what type of damage is this?";
pub const ASK_SEVERITY: &str = "Good! How severe is this damage?";
pub const ASK_REMARKS: &str =
    "Almost done! Would you like to add any additional remarks or details?";
pub const SUBMITTING: &str =
    "Thank you! I'm validating your report and submitting it to the authorities...";
pub const THINKING: &str = "AI is thinking...";
pub const RELAY_FAILED: &str = "I apologize, but I encountered an error. Please try again.";

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), session = %model.session, "processing event");

        if model.alert.is_some() && event.is_user_input() {
            debug!(event = event.name(), "input ignored while an alert is showing");
            return;
        }

        match event {
            Event::Noop => return,
            Event::AppStarted(config) => Self::start(*config, model),
            Event::NewReportRequested => Self::new_report(model),
            Event::AlertDismissed => model.alert = None,

            Event::ImageDragStateChanged { active } => {
                if Self::accepts_image(model) && !model.is_loading() {
                    model
                        .image_picker
                        .handle(ImageInput::DragState { active });
                }
            }
            Event::ImageSelected(candidate) => {
                if !Self::accepts_image(model) {
                    debug!("image ignored outside the photo step");
                } else if model.is_loading() {
                    debug!("image ignored while a request is in flight");
                } else if let Outcome::Emit(image) =
                    model.image_picker.handle(ImageInput::Selected(*candidate))
                {
                    self.image_accepted(image, model, caps);
                }
            }

            Event::UseCurrentLocationRequested => {
                self.location_input(LocationInput::UseCurrentLocation, model, caps);
            }
            Event::ManualLocationRequested => {
                self.location_input(LocationInput::EnterManually, model, caps);
            }
            Event::ManualLatitudeChanged(value) => {
                self.location_input(LocationInput::LatitudeChanged(value), model, caps);
            }
            Event::ManualLongitudeChanged(value) => {
                self.location_input(LocationInput::LongitudeChanged(value), model, caps);
            }
            Event::ManualAddressChanged(value) => {
                self.location_input(LocationInput::AddressChanged(value), model, caps);
            }
            Event::ManualLocationSubmitted => {
                self.location_input(LocationInput::SubmitManual, model, caps);
            }
            Event::LocationChangeRequested => {
                self.location_input(LocationInput::Change, model, caps);
            }
            Event::LocationConfirmed => {
                self.location_input(LocationInput::Confirm, model, caps);
            }

            Event::DamageTypeSelected { id } => Self::damage_type_selected(id, model),
            Event::SeveritySelected { id } => Self::severity_selected(id, model),
            Event::RemarksSubmitted { remarks } => Self::remarks_submitted(&remarks, model, caps),
            Event::MessageSent { text } => Self::message_sent(&text, model, caps),
            Event::EmailSubmitted { email } => Self::email_submitted(&email, model, caps),

            Event::ImageAnalyzed { session, result } => {
                if Self::is_current(session, model) {
                    Self::image_analyzed(api::decode(&result), model);
                }
            }
            Event::GeolocationResolved { session, result } => {
                if Self::is_current(session, model) {
                    self.geolocation_resolved(*result, model, caps);
                }
            }
            Event::AddressResolved {
                session,
                coordinates,
                result,
            } => {
                if Self::is_current(session, model) {
                    let address = api::interpret_reverse_geocode(&result);
                    self.address_resolved(coordinates, address, model, caps);
                }
            }
            Event::ChatRelayed {
                session,
                step,
                result,
            } => {
                if Self::is_current(session, model) {
                    Self::chat_relayed(step, api::decode(&result), model);
                }
            }
            Event::ReportSubmitted { session, result } => {
                if Self::is_current(session, model) {
                    Self::report_submitted(&result, model);
                }
            }
            Event::EmailNotified {
                session,
                email,
                result,
            } => {
                if Self::is_current(session, model) {
                    Self::email_notified(email, &result, model);
                }
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::build(model)
    }
}

impl App {
    fn is_current(session: SessionId, model: &Model) -> bool {
        if session == model.session {
            true
        } else {
            debug!(
                stale = %session,
                current = %model.session,
                "dropping result from a previous session"
            );
            false
        }
    }

    fn accepts_image(model: &Model) -> bool {
        model
            .current_step()
            .is_some_and(ConversationStep::accepts_image)
    }

    fn log_failure(op: PendingOp, error: &AppError) {
        match op.failure_policy() {
            FailurePolicy::Advisory | FailurePolicy::SideChannel => warn!(
                op = op.name(),
                code = error.code(),
                error = %error,
                "operation failed; continuing"
            ),
            FailurePolicy::Blocking => info!(
                op = op.name(),
                code = error.code(),
                error = %error,
                "operation failed; falling back"
            ),
            FailurePolicy::TerminalStep => error!(
                op = op.name(),
                code = error.code(),
                error = %error,
                "operation failed; step can be retried"
            ),
        }
    }

    fn advance(model: &mut Model) {
        let from = model.current_step();
        if let Some(to) = model.advance() {
            info!(
                session = %model.session,
                from = from.map(ConversationStep::as_str),
                to = to.as_str(),
                "step advanced"
            );
        }
    }

    // --- Session ---

    fn start(config: Config, model: &mut Model) {
        if model.started {
            debug!("session already started");
            return;
        }
        model.config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "invalid configuration; using defaults");
                Config::default()
            }
        };
        model.started = true;
        model.transcript.push_assistant(GREETING);
        info!(session = %model.session, api = %model.config.api_base_url, "session started");
    }

    fn new_report(model: &mut Model) {
        if model.submission().is_none() {
            debug!("new report requested before submission; ignoring");
            return;
        }
        model.reset_session();
        model.transcript.push_assistant(GREETING);
        info!(session = %model.session, "new report session");
    }

    // --- Image step ---

    fn image_accepted(
        &self,
        image: ImageBlob,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        info!(
            file_name = %image.file_name,
            mime_type = %image.mime_type,
            size_bytes = image.bytes.len(),
            "image accepted"
        );
        model
            .transcript
            .push_user_image(IMAGE_UPLOADED, image.reference());
        let request = api::analyze_image_request(&model.config, &image);
        model.draft.record_image(image);
        let started = model.begin(PendingOp::ImageAnalysis, ANALYZING_IMAGE);

        Self::advance(model);
        self.drive_location(LocationInput::Open, model, caps);

        if started.is_none() {
            return;
        }
        let session = model.session;
        match request {
            Ok(request) => request.send(&caps.http, move |result| Event::ImageAnalyzed {
                session,
                result: Box::new(result),
            }),
            Err(e) => Self::image_analyzed(Err(AppError::from(&e)), model),
        }
    }

    fn image_analyzed(analysis: Result<AnalyzeImageResponse, AppError>, model: &mut Model) {
        let message = match analysis {
            Ok(response) if response.success => response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| IMAGE_ANALYZED.to_string()),
            Ok(response) => {
                warn!(message = ?response.message, "image analysis reported no success");
                IMAGE_ANALYSIS_DEGRADED.to_string()
            }
            Err(e) => {
                Self::log_failure(PendingOp::ImageAnalysis, &e);
                IMAGE_ANALYSIS_FAILED.to_string()
            }
        };
        model.finish(PendingOp::ImageAnalysis, Resolution::Replace(message));
    }

    // --- Location step ---

    fn location_input(&self, input: LocationInput, model: &mut Model, caps: &Capabilities) {
        if model.is_loading() {
            debug!("location input ignored while a request is in flight");
            return;
        }
        self.drive_location(input, model, caps);
    }

    fn drive_location(&self, input: LocationInput, model: &mut Model, caps: &Capabilities) {
        if !model.is_collecting(ConversationStep::Location) {
            debug!("location input ignored outside the location step");
            return;
        }
        match model.location_picker.handle(input) {
            Outcome::Idle => {}
            Outcome::Alert(message) => model.alert = Some(message),
            Outcome::Request(WidgetRequest::CurrentPosition) => {
                Self::request_position(model, caps);
            }
            Outcome::Request(WidgetRequest::ReverseGeocode(coordinates)) => {
                self.request_address(coordinates, model, caps);
            }
            Outcome::Emit(location) => Self::location_confirmed(location, model),
        }
    }

    fn request_position(model: &mut Model, caps: &Capabilities) {
        if model.begin(PendingOp::Geolocation, LOCATING).is_none() {
            return;
        }
        let session = model.session;
        caps.geolocation
            .current_position(move |result| Event::GeolocationResolved {
                session,
                result: Box::new(result),
            });
    }

    fn geolocation_resolved(
        &self,
        result: GeolocationResult,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        let resolution = match &result {
            Ok(position) => {
                debug!(accuracy_m = ?position.accuracy_m, "position fix received");
                Resolution::Replace(POSITION_FOUND.to_string())
            }
            Err(e) => {
                let error = AppError::from(e);
                Self::log_failure(PendingOp::Geolocation, &error);
                Resolution::Replace(error.user_facing_message())
            }
        };
        model.finish(PendingOp::Geolocation, resolution);
        self.drive_location(LocationInput::Positioned(result), model, caps);
    }

    fn request_address(&self, coordinates: Coordinates, model: &mut Model, caps: &Capabilities) {
        let request = api::reverse_geocode_request(&model.config, coordinates);
        if model
            .begin(PendingOp::ReverseGeocode, LOOKING_UP_ADDRESS)
            .is_none()
        {
            // Keep the coordinate label rather than wait on a lookup for
            // other coordinates.
            self.drive_location(
                LocationInput::AddressResolved {
                    coordinates,
                    address: None,
                },
                model,
                caps,
            );
            return;
        }
        let session = model.session;
        match request {
            Ok(request) => request.send(&caps.http, move |result| Event::AddressResolved {
                session,
                coordinates,
                result: Box::new(result),
            }),
            Err(e) => self.address_resolved(coordinates, Err(AppError::from(&e)), model, caps),
        }
    }

    fn address_resolved(
        &self,
        coordinates: Coordinates,
        lookup: Result<String, AppError>,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        if !model.in_flight.contains(PendingOp::ReverseGeocode) {
            debug!("address arrived after the location was settled");
            return;
        }
        let address = match lookup {
            Ok(address) => Some(address),
            Err(e) => {
                Self::log_failure(PendingOp::ReverseGeocode, &e);
                None
            }
        };
        let resolution = match &address {
            Some(address) if model.location_picker.awaits_address(coordinates) => {
                Resolution::Replace(format!("Address found: {address}"))
            }
            _ => Resolution::Dismiss,
        };
        model.finish(PendingOp::ReverseGeocode, resolution);
        self.drive_location(
            LocationInput::AddressResolved {
                coordinates,
                address,
            },
            model,
            caps,
        );
    }

    fn location_confirmed(location: Location, model: &mut Model) {
        // The draft keeps the label shown at confirmation; a later lookup must
        // not announce a different address.
        model.finish(PendingOp::ReverseGeocode, Resolution::Dismiss);
        model
            .transcript
            .push_user(format!("Location: {}", location.summary()));
        model.draft.record_location(location);
        model.transcript.push_assistant(ASK_DAMAGE_TYPE);
        Self::advance(model);
    }

    // --- Choice steps ---

    fn damage_type_selected(id: String, model: &mut Model) {
        if !model.is_collecting(ConversationStep::DamageType) || model.is_loading() {
            return;
        }
        let Outcome::Emit(damage_type) = ChoicePicker::<DamageType>::new().handle(id) else {
            return;
        };
        model
            .transcript
            .push_user(format!("Damage type: {}", damage_type.label()));
        model.draft.record_damage_type(damage_type);
        model.transcript.push_assistant(ASK_SEVERITY);
        Self::advance(model);
    }

    fn severity_selected(id: String, model: &mut Model) {
        if !model.is_collecting(ConversationStep::Severity) || model.is_loading() {
            return;
        }
        let Outcome::Emit(severity) = ChoicePicker::<Severity>::new().handle(id) else {
            return;
        };
        model
            .transcript
            .push_user(format!("Severity: {}", severity.label()));
        model.draft.record_severity(severity);
        model.transcript.push_assistant(ASK_REMARKS);
        Self::advance(model);
    }

    // --- Remarks and submission ---

    fn remarks_submitted(raw: &str, model: &mut Model, caps: &Capabilities) {
        if !model.is_collecting(ConversationStep::Remarks) {
            return;
        }
        if model.is_loading() {
            debug!("submission already in progress");
            return;
        }
        let typed = raw.trim();
        if !typed.is_empty() {
            model.transcript.push_user(format!("Remarks: {typed}"));
        }
        model.draft.record_remarks(raw);
        Self::submit(model, caps);
    }

    fn submit(model: &mut Model, caps: &Capabilities) {
        let request = submission::submit_request(&model.config, &model.draft);
        if model.begin(PendingOp::Submission, SUBMITTING).is_none() {
            return;
        }
        info!(session = %model.session, "submitting report");
        let session = model.session;
        match request {
            Ok(request) => request.send(&caps.http, move |result| Event::ReportSubmitted {
                session,
                result: Box::new(result),
            }),
            Err(e) => {
                let error = AppError::new(ErrorKind::InvalidState, e.to_string());
                Self::log_failure(PendingOp::Submission, &error);
                let outcome = SubmissionOutcome::Failed {
                    detail: e.to_string(),
                };
                model.finish(
                    PendingOp::Submission,
                    Resolution::Replace(outcome.transcript_message()),
                );
            }
        }
    }

    fn report_submitted(result: &HttpResult, model: &mut Model) {
        if !model.in_flight.contains(PendingOp::Submission)
            || !model.is_collecting(ConversationStep::Remarks)
        {
            warn!("unexpected submission result");
            return;
        }
        let outcome = SubmissionOutcome::interpret(result);
        model.finish(
            PendingOp::Submission,
            Resolution::Replace(outcome.transcript_message()),
        );
        match outcome {
            SubmissionOutcome::Accepted(result) => {
                info!(
                    report_id = %result.report_id,
                    authority_notified = result.authority_notified,
                    "report submitted"
                );
                model.phase = SessionPhase::Submitted {
                    result,
                    email: EmailStage::Awaiting,
                };
            }
            SubmissionOutcome::Rejected { message } => {
                let error = AppError::new(
                    ErrorKind::Server,
                    message.unwrap_or_else(|| "response carried no report id".to_string()),
                );
                Self::log_failure(PendingOp::Submission, &error);
            }
            SubmissionOutcome::Failed { detail } => {
                let error = AppError::new(ErrorKind::Server, detail);
                Self::log_failure(PendingOp::Submission, &error);
            }
        }
    }

    // --- Free text ---

    fn message_sent(text: &str, model: &mut Model, caps: &Capabilities) {
        let text = text.trim();
        if text.is_empty() || model.is_loading() {
            return;
        }
        let Some(step) = model.current_step() else {
            debug!("free text ignored after submission");
            return;
        };
        if step == ConversationStep::Remarks {
            Self::remarks_submitted(text, model, caps);
            return;
        }

        model.transcript.push_user(text);
        let request = api::chat_relay_request(&model.config, text, step, model.draft.summary());
        if model.begin(PendingOp::ChatRelay, THINKING).is_none() {
            return;
        }
        let session = model.session;
        match request {
            Ok(request) => request.send(&caps.http, move |result| Event::ChatRelayed {
                session,
                step,
                result: Box::new(result),
            }),
            Err(e) => Self::chat_relayed(step, Err(AppError::from(&e)), model),
        }
    }

    fn chat_relayed(
        step: ConversationStep,
        reply: Result<ChatRelayResponse, AppError>,
        model: &mut Model,
    ) {
        let resolution = match reply {
            Ok(response) => {
                if let Some(suggested) = response.next_step.as_deref() {
                    debug!(
                        asked_at = step.as_str(),
                        suggested,
                        known = ConversationStep::parse(suggested).is_some(),
                        "relay suggested a step; widgets drive transitions"
                    );
                }
                match response.message.filter(|m| !m.trim().is_empty()) {
                    Some(message) => Resolution::Replace(message),
                    None => Resolution::Dismiss,
                }
            }
            Err(e) => {
                Self::log_failure(PendingOp::ChatRelay, &e);
                Resolution::Replace(RELAY_FAILED.to_string())
            }
        };
        model.finish(PendingOp::ChatRelay, resolution);
    }

    // --- Email copy ---

    fn email_submitted(email: &str, model: &mut Model, caps: &Capabilities) {
        let SessionPhase::Submitted {
            result,
            email: EmailStage::Awaiting,
        } = &model.phase
        else {
            debug!("email ignored outside the post-submission view");
            return;
        };
        let address = email.trim();
        if address.is_empty() {
            return;
        }
        let payload = submission::notification_payload(result, &model.draft, address);
        if model
            .begin(
                PendingOp::EmailNotification,
                format!("Sending a copy of the report to {address}..."),
            )
            .is_none()
        {
            return;
        }
        let session = model.session;
        let address = address.to_string();
        caps.notify.deliver(payload, move |result| Event::EmailNotified {
            session,
            email: address,
            result: Box::new(result),
        });
    }

    fn email_notified(email: String, result: &NotifyResult, model: &mut Model) {
        if !model.in_flight.contains(PendingOp::EmailNotification) {
            warn!("unexpected notification result");
            return;
        }
        match result {
            Ok(()) => {
                model.finish(
                    PendingOp::EmailNotification,
                    Resolution::Replace(format!("A copy of your report has been sent to {email}.")),
                );
                if let SessionPhase::Submitted { email: stage, .. } = &mut model.phase {
                    *stage = EmailStage::Sent { address: email };
                }
                info!(session = %model.session, "report copy delivered");
            }
            Err(e) => {
                let error = AppError::new(ErrorKind::Network, e.to_string());
                Self::log_failure(PendingOp::EmailNotification, &error);
                model.finish(PendingOp::EmailNotification, Resolution::Dismiss);
            }
        }
    }
}
