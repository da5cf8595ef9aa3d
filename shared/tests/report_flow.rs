use assert_matches::assert_matches;
use crux_core::testing::AppTester;
use crux_http::http::StatusCode;
use crux_http::protocol::HttpRequest;
use crux_http::testing::ResponseBuilder;
use shared::app::{
    ASK_DAMAGE_TYPE, IMAGE_ANALYSIS_DEGRADED, IMAGE_ANALYSIS_FAILED, IMAGE_ANALYZED,
    RELAY_FAILED,
};
use shared::capabilities::{
    GeolocationError, HttpResult, NotificationPayload, NotifyError, NotifyOperation, Position,
};
use shared::model::{ConversationStep, EmailStage, PendingOp, SessionId, SessionPhase};
use shared::transcript::Role;
use shared::view::Screen;
use shared::widgets::location::INVALID_COORDINATES_ALERT;
use shared::widgets::{Coordinates, ImageCandidate, LocationPicker};
use shared::{App, Effect, Event, Model};

type Tester = AppTester<App, Effect>;

fn http_requests(effects: &[Effect]) -> Vec<HttpRequest> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

fn notifications(effects: &[Effect]) -> Vec<NotificationPayload> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Notify(request) => {
                let NotifyOperation::Deliver(payload) = &request.operation;
                Some(payload.clone())
            }
            _ => None,
        })
        .collect()
}

fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

fn ok(status: u16, body: &str) -> Box<HttpResult> {
    let status = StatusCode::try_from(status).unwrap();
    Box::new(Ok(ResponseBuilder::with_status(status)
        .body(body.as_bytes().to_vec())
        .build()))
}

fn photo() -> Box<ImageCandidate> {
    Box::new(ImageCandidate {
        file_name: "pothole.jpg".into(),
        mime_type: "image/jpeg".into(),
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
    })
}

fn contents(model: &Model) -> Vec<&str> {
    model
        .transcript
        .entries()
        .iter()
        .map(|e| e.content.as_str())
        .collect()
}

fn started() -> (Tester, Model) {
    let app = Tester::default();
    let mut model = Model::default();
    app.update(Event::AppStarted(Box::default()), &mut model);
    (app, model)
}

/// Uploads a photo and lets the analysis succeed. Leaves the picker locating.
fn at_location_step() -> (Tester, Model) {
    let (app, mut model) = started();
    app.update(Event::ImageSelected(photo()), &mut model);
    app.update(
        Event::ImageAnalyzed {
            session: model.session,
            result: ok(200, r#"{"success": true}"#),
        },
        &mut model,
    );
    (app, model)
}

/// Drives the flow up to the remarks step with a manually typed location.
fn at_remarks_step() -> (Tester, Model) {
    let (app, mut model) = at_location_step();
    app.update(Event::ManualLocationRequested, &mut model);
    app.update(Event::ManualLatitudeChanged("40.7".into()), &mut model);
    app.update(Event::ManualLongitudeChanged("-74.0".into()), &mut model);
    app.update(Event::ManualAddressChanged("X St".into()), &mut model);
    app.update(Event::ManualLocationSubmitted, &mut model);
    app.update(Event::LocationConfirmed, &mut model);
    app.update(
        Event::DamageTypeSelected {
            id: "pothole".into(),
        },
        &mut model,
    );
    app.update(Event::SeveritySelected { id: "high".into() }, &mut model);
    assert_eq!(model.current_step(), Some(ConversationStep::Remarks));
    (app, model)
}

#[test]
fn full_report_with_device_location_and_email_copy() {
    let (app, mut model) = started();
    assert_eq!(model.transcript.entries()[0].role, Role::Assistant);

    // Photo: analysis request plus a device fix, and the step moves on.
    let update = app.update(Event::ImageSelected(photo()), &mut model);
    let requests = http_requests(&update.effects);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].url, "http://localhost:8000/api/analyze-image");
    assert!(header(&requests[0], "Content-Type")
        .unwrap()
        .starts_with("multipart/form-data; boundary="));
    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Geolocation(_))));
    assert_eq!(model.current_step(), Some(ConversationStep::Location));
    assert_eq!(model.transcript.entries()[1].content, "Image uploaded");
    assert!(model.transcript.entries()[1].image.is_some());

    app.update(
        Event::ImageAnalyzed {
            session: model.session,
            result: ok(200, r#"{"success": true, "message": "Pothole spotted."}"#),
        },
        &mut model,
    );
    assert!(contents(&model).contains(&"Pothole spotted."));

    // Device fix, then the address lookup.
    let update = app.update(
        Event::GeolocationResolved {
            session: model.session,
            result: Box::new(Ok(Position {
                latitude: 40.7,
                longitude: -74.0,
                accuracy_m: Some(8.0),
            })),
        },
        &mut model,
    );
    let lookup = http_requests(&update.effects);
    assert_eq!(lookup.len(), 1);
    assert_eq!(lookup[0].method, "GET");
    assert!(lookup[0]
        .url
        .starts_with("https://nominatim.openstreetmap.org/reverse?format=json&lat=40.7"));
    assert_eq!(header(&lookup[0], "User-Agent"), Some("RoadDamageReporter/1.0"));
    assert!(lookup[0].body.is_empty());

    app.update(
        Event::AddressResolved {
            session: model.session,
            coordinates: Coordinates::new(40.7, -74.0).unwrap(),
            result: ok(200, r#"{"display_name": "X St, New York"}"#),
        },
        &mut model,
    );
    app.update(Event::LocationConfirmed, &mut model);
    assert_eq!(model.current_step(), Some(ConversationStep::DamageType));
    assert!(contents(&model).contains(&"Location: X St, New York"));
    assert_eq!(model.transcript.last().unwrap().content, ASK_DAMAGE_TYPE);

    app.update(
        Event::DamageTypeSelected {
            id: "pothole".into(),
        },
        &mut model,
    );
    app.update(Event::SeveritySelected { id: "high".into() }, &mut model);
    assert!(contents(&model).contains(&"Damage type: Pothole"));

    // Blank remarks submit with the placeholder.
    let update = app.update(
        Event::RemarksSubmitted {
            remarks: "  ".into(),
        },
        &mut model,
    );
    let submit = http_requests(&update.effects);
    assert_eq!(submit.len(), 1);
    assert_eq!(submit[0].url, "http://localhost:8000/api/reports/submit");
    let body = String::from_utf8_lossy(&submit[0].body).into_owned();
    assert!(body.contains("name=\"remarks\"\r\n\r\nNo additional remarks\r\n"));
    assert!(body.contains("name=\"image\"; filename=\"pothole.jpg\""));
    assert!(app.view(&model).is_loading);

    app.update(
        Event::ReportSubmitted {
            session: model.session,
            result: ok(
                200,
                r#"{"report_id": "R123", "image_url": "https://cdn.example.org/R123.jpg", "authority_notified": true}"#,
            ),
        },
        &mut model,
    );
    assert_eq!(model.submission().unwrap().report_id, "R123");
    assert_eq!(
        model.transcript.last().unwrap().content,
        "✅ Report submitted successfully! Your reference ID is: R123. The responsible authority has been notified."
    );
    assert_matches!(
        app.view(&model).screen,
        Screen::Submitted { ref report_id, authority_notified: true, is_sending_email: false, .. }
            if report_id == "R123"
    );

    // Email copy.
    let update = app.update(
        Event::EmailSubmitted {
            email: " ada@example.org ".into(),
        },
        &mut model,
    );
    let payloads = notifications(&update.effects);
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].report_id, "R123");
    assert_eq!(payloads[0].cc, "ada@example.org");
    assert_eq!(payloads[0].remarks, "No additional remarks");

    app.update(
        Event::EmailNotified {
            session: model.session,
            email: "ada@example.org".into(),
            result: Box::new(Ok(())),
        },
        &mut model,
    );
    assert_eq!(
        app.view(&model).screen,
        Screen::AllSet {
            report_id: "R123".into(),
            email: "ada@example.org".into()
        }
    );

    // New report starts over.
    app.update(Event::NewReportRequested, &mut model);
    assert_eq!(model.session, SessionId(1));
    assert_eq!(model.current_step(), Some(ConversationStep::Greeting));
    assert_eq!(model.transcript.len(), 1);
    assert!(model.draft.image.is_none());
}

#[test]
fn analysis_failure_does_not_stop_the_flow() {
    let (app, mut model) = started();
    app.update(Event::ImageSelected(photo()), &mut model);
    app.update(
        Event::ImageAnalyzed {
            session: model.session,
            result: ok(500, r#"{"detail": "model offline"}"#),
        },
        &mut model,
    );
    assert!(contents(&model).contains(&IMAGE_ANALYSIS_FAILED));
    assert_eq!(model.current_step(), Some(ConversationStep::Location));
    assert!(model.draft.image.is_some());
}

#[test]
fn unsuccessful_analysis_keeps_the_photo_and_moves_on() {
    let (app, mut model) = started();
    app.update(Event::ImageSelected(photo()), &mut model);
    app.update(
        Event::ImageAnalyzed {
            session: model.session,
            result: ok(200, r#"{"success": false}"#),
        },
        &mut model,
    );
    let transcript = contents(&model);
    assert!(transcript.contains(&IMAGE_ANALYSIS_DEGRADED));
    assert!(!transcript.contains(&IMAGE_ANALYZED));
    assert!(!transcript.contains(&IMAGE_ANALYSIS_FAILED));
    assert_eq!(model.current_step(), Some(ConversationStep::Location));
    assert_eq!(
        model.draft.image.as_ref().map(|i| i.file_name.as_str()),
        Some("pothole.jpg")
    );
    assert!(!model.in_flight.contains(PendingOp::ImageAnalysis));
}

#[test]
fn image_with_a_forged_mime_type_is_refused() {
    let (app, mut model) = started();
    let update = app.update(
        Event::ImageSelected(Box::new(ImageCandidate {
            file_name: "pothole.jpg".into(),
            mime_type: "image/jpeg\r\nX-Injected: 1".into(),
            bytes: vec![0xFF, 0xD8],
        })),
        &mut model,
    );
    assert!(http_requests(&update.effects).is_empty());
    assert_eq!(model.current_step(), Some(ConversationStep::Greeting));
    assert!(model.draft.image.is_none());
}

#[test]
fn image_and_location_input_waits_for_the_relay() {
    let (app, mut model) = started();
    app.update(
        Event::MessageSent {
            text: "which photo works best?".into(),
        },
        &mut model,
    );
    assert!(model.is_loading());

    let update = app.update(Event::ImageSelected(photo()), &mut model);
    assert!(http_requests(&update.effects).is_empty());
    assert_eq!(model.current_step(), Some(ConversationStep::Greeting));
    assert!(model.draft.image.is_none());

    app.update(
        Event::ChatRelayed {
            session: model.session,
            step: ConversationStep::Greeting,
            result: ok(200, r#"{"message": "A close, well lit one."}"#),
        },
        &mut model,
    );
    app.update(Event::ImageSelected(photo()), &mut model);
    assert_eq!(model.current_step(), Some(ConversationStep::Location));

    app.update(
        Event::MessageSent {
            text: "do I need exact coordinates?".into(),
        },
        &mut model,
    );
    app.update(Event::ManualLocationRequested, &mut model);
    assert_matches!(model.location_picker, LocationPicker::Locating);
}

#[test]
fn confirming_before_the_address_arrives_keeps_the_coordinate_label() {
    let (app, mut model) = at_location_step();
    let here = Coordinates::new(40.7, -74.0).unwrap();
    app.update(
        Event::GeolocationResolved {
            session: model.session,
            result: Box::new(Ok(Position {
                latitude: 40.7,
                longitude: -74.0,
                accuracy_m: None,
            })),
        },
        &mut model,
    );
    assert!(model.in_flight.contains(PendingOp::ReverseGeocode));

    app.update(Event::LocationConfirmed, &mut model);
    assert_eq!(model.current_step(), Some(ConversationStep::DamageType));
    assert_eq!(model.draft.location.as_ref().unwrap().address, here.label());
    assert!(model.in_flight.is_empty());
    assert_eq!(model.transcript.pending_count(), 0);
    assert!(!contents(&model).contains(&"Looking up the address..."));

    let before = model.transcript.clone();
    app.update(
        Event::AddressResolved {
            session: model.session,
            coordinates: here,
            result: ok(200, r#"{"display_name": "X St, New York"}"#),
        },
        &mut model,
    );
    assert_eq!(model.transcript, before);
    assert!(contents(&model).iter().all(|c| !c.starts_with("Address found")));
    assert_eq!(model.draft.location.as_ref().unwrap().address, here.label());
}

#[test]
fn denied_location_falls_back_to_manual_entry() {
    let (app, mut model) = at_location_step();
    app.update(
        Event::GeolocationResolved {
            session: model.session,
            result: Box::new(Err(GeolocationError::PermissionDenied)),
        },
        &mut model,
    );
    assert!(contents(&model)
        .contains(&"Location access was denied. Please enter the coordinates manually."));
    assert_matches!(model.location_picker, LocationPicker::Manual { .. });
}

#[test]
fn invalid_coordinates_raise_an_alert_that_blocks_input() {
    let (app, mut model) = at_location_step();
    app.update(Event::ManualLocationRequested, &mut model);
    app.update(Event::ManualLatitudeChanged("12abc".into()), &mut model);
    app.update(Event::ManualLongitudeChanged("3".into()), &mut model);
    let update = app.update(Event::ManualLocationSubmitted, &mut model);

    assert_eq!(model.alert.as_deref(), Some(INVALID_COORDINATES_ALERT));
    assert!(http_requests(&update.effects).is_empty());
    assert!(model.draft.location.is_none());

    // Typing is ignored until the alert goes away.
    app.update(Event::ManualLatitudeChanged("40.7".into()), &mut model);
    app.update(Event::ManualLocationSubmitted, &mut model);
    assert!(model.draft.location.is_none());

    app.update(Event::AlertDismissed, &mut model);
    app.update(Event::ManualLatitudeChanged("40.7".into()), &mut model);
    let update = app.update(Event::ManualLocationSubmitted, &mut model);
    assert!(model.alert.is_none());
    // No typed address, so a lookup goes out.
    assert_eq!(http_requests(&update.effects).len(), 1);

    app.update(Event::LocationConfirmed, &mut model);
    let location = model.draft.location.as_ref().unwrap();
    assert_eq!((location.lat, location.lng), (40.7, 3.0));
    assert_eq!(model.current_step(), Some(ConversationStep::DamageType));
}

#[test]
fn unknown_choice_ids_are_ignored() {
    let (app, mut model) = at_remarks_step();
    app.update(
        Event::DamageTypeSelected {
            id: "sinkhole".into(),
        },
        &mut model,
    );
    assert_eq!(model.current_step(), Some(ConversationStep::Remarks));
    assert_eq!(
        model.draft.damage_type.map(|d| d.to_string()).as_deref(),
        Some("pothole")
    );
}

#[test]
fn submission_without_report_id_stays_on_remarks() {
    let (app, mut model) = at_remarks_step();
    app.update(
        Event::RemarksSubmitted {
            remarks: "deep".into(),
        },
        &mut model,
    );
    app.update(
        Event::ReportSubmitted {
            session: model.session,
            result: ok(200, r#"{"message": "Database unavailable"}"#),
        },
        &mut model,
    );
    assert_eq!(model.current_step(), Some(ConversationStep::Remarks));
    assert!(!model.is_loading());
    assert_eq!(
        model.transcript.last().unwrap().content,
        "There was an issue submitting your report: Database unavailable. Please try again."
    );

    // A retry goes out again.
    let update = app.update(
        Event::RemarksSubmitted {
            remarks: "deep".into(),
        },
        &mut model,
    );
    assert_eq!(http_requests(&update.effects).len(), 1);
}

#[test]
fn error_status_reports_server_detail() {
    let (app, mut model) = at_remarks_step();
    app.update(
        Event::RemarksSubmitted {
            remarks: String::new(),
        },
        &mut model,
    );
    app.update(
        Event::ReportSubmitted {
            session: model.session,
            result: ok(400, r#"{"detail": "Invalid damage type or severity"}"#),
        },
        &mut model,
    );
    assert_eq!(
        model.transcript.last().unwrap().content,
        "An error occurred while submitting your report: Invalid damage type or severity. Please try again."
    );
    assert_eq!(model.current_step(), Some(ConversationStep::Remarks));
}

#[test]
fn duplicate_submission_is_ignored_while_in_flight() {
    let (app, mut model) = at_remarks_step();
    let pending = model.transcript.pending_count();
    let first = app.update(
        Event::RemarksSubmitted {
            remarks: String::new(),
        },
        &mut model,
    );
    let second = app.update(
        Event::RemarksSubmitted {
            remarks: String::new(),
        },
        &mut model,
    );
    assert_eq!(http_requests(&first.effects).len(), 1);
    assert!(http_requests(&second.effects).is_empty());
    assert_eq!(model.transcript.pending_count(), pending + 1);
}

#[test]
fn free_text_goes_to_the_relay_without_changing_step() {
    let (app, mut model) = at_remarks_step();
    // Rewind to a choice step to ask a question there.
    model.phase = SessionPhase::Collecting {
        step: ConversationStep::DamageType,
    };

    let update = app.update(
        Event::MessageSent {
            text: "what counts as a crack?".into(),
        },
        &mut model,
    );
    let requests = http_requests(&update.effects);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "http://localhost:8000/chat");
    assert_eq!(header(&requests[0], "Content-Type"), Some("application/json"));
    assert!(model.is_loading());

    app.update(
        Event::ChatRelayed {
            session: model.session,
            step: ConversationStep::DamageType,
            result: ok(
                200,
                r#"{"message": "A crack is a linear split.", "next_step": "severity"}"#,
            ),
        },
        &mut model,
    );
    assert_eq!(model.current_step(), Some(ConversationStep::DamageType));
    assert_eq!(
        model.transcript.last().unwrap().content,
        "A crack is a linear split."
    );

    app.update(
        Event::MessageSent {
            text: "and potholes?".into(),
        },
        &mut model,
    );
    app.update(
        Event::ChatRelayed {
            session: model.session,
            step: ConversationStep::DamageType,
            result: ok(502, "Bad Gateway"),
        },
        &mut model,
    );
    assert_eq!(model.transcript.last().unwrap().content, RELAY_FAILED);
}

#[test]
fn email_failure_keeps_the_offer_open() {
    let (app, mut model) = at_remarks_step();
    app.update(
        Event::RemarksSubmitted {
            remarks: String::new(),
        },
        &mut model,
    );
    app.update(
        Event::ReportSubmitted {
            session: model.session,
            result: ok(200, r#"{"report_id": "R9"}"#),
        },
        &mut model,
    );
    let entries_before = model.transcript.len();

    app.update(
        Event::EmailSubmitted {
            email: "ada@example.org".into(),
        },
        &mut model,
    );
    assert_matches!(
        app.view(&model).screen,
        Screen::Submitted {
            is_sending_email: true,
            authority_notified: false,
            ..
        }
    );

    app.update(
        Event::EmailNotified {
            session: model.session,
            email: "ada@example.org".into(),
            result: Box::new(Err(NotifyError::Rejected { status: 500 })),
        },
        &mut model,
    );
    assert_eq!(model.transcript.len(), entries_before);
    assert_matches!(
        model.phase,
        SessionPhase::Submitted {
            email: EmailStage::Awaiting,
            ..
        }
    );
}

#[test]
fn results_from_an_abandoned_session_are_dropped() {
    let (app, mut model) = at_remarks_step();
    app.update(
        Event::RemarksSubmitted {
            remarks: String::new(),
        },
        &mut model,
    );
    app.update(
        Event::ReportSubmitted {
            session: model.session,
            result: ok(200, r#"{"report_id": "R1"}"#),
        },
        &mut model,
    );
    app.update(
        Event::EmailSubmitted {
            email: "ada@example.org".into(),
        },
        &mut model,
    );
    let old = model.session;
    app.update(Event::NewReportRequested, &mut model);

    app.update(
        Event::EmailNotified {
            session: old,
            email: "ada@example.org".into(),
            result: Box::new(Ok(())),
        },
        &mut model,
    );
    assert_eq!(model.transcript.len(), 1);
    assert!(model.submission().is_none());
    assert!(model.in_flight.is_empty());
}
