use serde::{Deserialize, Serialize};

use crate::model::{ConversationStep, EmailStage, Model, SessionPhase};
use crate::transcript::{ImageRef, Role, TranscriptEntry};
use crate::widgets::{Choice, DamageType, ImagePreview, LocationPicker, Severity};

pub const REMARKS_PLACEHOLDER: &str = "Add any additional details or remarks...";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub screen: Screen,
    pub transcript: Vec<MessageView>,
    pub is_loading: bool,
    pub alert: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Screen {
    Chat {
        step: ConversationStep,
        widget: WidgetView,
        /// The free-text box is only offered where typed text is the answer.
        text_input_enabled: bool,
    },
    /// Report accepted; offering the email copy.
    Submitted {
        report_id: String,
        image_url: String,
        authority_notified: bool,
        is_sending_email: bool,
    },
    AllSet {
        report_id: String,
        email: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetView {
    ImageUpload {
        drag_active: bool,
        preview: Option<ImagePreview>,
        disabled: bool,
    },
    LocationPicker {
        picker: LocationPickerView,
        disabled: bool,
    },
    DamageTypes {
        options: Vec<ChoiceView>,
        disabled: bool,
    },
    Severities {
        options: Vec<ChoiceView>,
        disabled: bool,
    },
    Remarks {
        placeholder: String,
        disabled: bool,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LocationPickerView {
    Choosing,
    Locating,
    Located {
        address: String,
        coordinates_label: String,
        resolving_address: bool,
    },
    Manual {
        latitude: String,
        longitude: String,
        address: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChoiceView {
    pub id: String,
    pub label: String,
    pub description: String,
    pub badge: String,
}

impl ChoiceView {
    fn options<T: Choice>() -> Vec<Self> {
        T::ALL
            .iter()
            .map(|c| Self {
                id: c.id().to_string(),
                label: c.label().to_string(),
                description: c.description().to_string(),
                badge: c.badge().to_string(),
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MessageView {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub timestamp_ms: u64,
    pub image: Option<ImageRef>,
    pub pending: bool,
}

impl From<&TranscriptEntry> for MessageView {
    fn from(entry: &TranscriptEntry) -> Self {
        Self {
            id: entry.id.0,
            role: entry.role,
            content: entry.content.clone(),
            timestamp_ms: entry.timestamp.as_millis(),
            image: entry.image.clone(),
            pending: entry.pending,
        }
    }
}

impl From<&LocationPicker> for LocationPickerView {
    fn from(picker: &LocationPicker) -> Self {
        match picker {
            LocationPicker::Choosing => Self::Choosing,
            LocationPicker::Locating => Self::Locating,
            LocationPicker::Located {
                coordinates,
                address,
                resolving_address,
            } => Self::Located {
                address: address.clone(),
                coordinates_label: coordinates.label(),
                resolving_address: *resolving_address,
            },
            LocationPicker::Manual {
                latitude,
                longitude,
                address,
            } => Self::Manual {
                latitude: latitude.clone(),
                longitude: longitude.clone(),
                address: address.clone(),
            },
        }
    }
}

fn widget_for(step: ConversationStep, model: &Model, disabled: bool) -> WidgetView {
    match step {
        ConversationStep::Greeting | ConversationStep::Image => WidgetView::ImageUpload {
            drag_active: model.image_picker.drag_active,
            preview: model.image_picker.preview.clone(),
            disabled,
        },
        ConversationStep::Location => WidgetView::LocationPicker {
            picker: (&model.location_picker).into(),
            disabled,
        },
        ConversationStep::DamageType => WidgetView::DamageTypes {
            options: ChoiceView::options::<DamageType>(),
            disabled,
        },
        ConversationStep::Severity => WidgetView::Severities {
            options: ChoiceView::options::<Severity>(),
            disabled,
        },
        ConversationStep::Remarks => WidgetView::Remarks {
            placeholder: REMARKS_PLACEHOLDER.to_string(),
            disabled,
        },
    }
}

#[must_use]
pub fn build(model: &Model) -> ViewModel {
    let is_loading = model.is_loading();
    let screen = match &model.phase {
        SessionPhase::Collecting { step } => Screen::Chat {
            step: *step,
            widget: widget_for(*step, model, is_loading),
            text_input_enabled: *step == ConversationStep::Remarks && !is_loading,
        },
        SessionPhase::Submitted {
            result,
            email: EmailStage::Awaiting,
        } => Screen::Submitted {
            report_id: result.report_id.clone(),
            image_url: result.image_url.clone(),
            authority_notified: result.authority_notified,
            is_sending_email: is_loading,
        },
        SessionPhase::Submitted {
            result,
            email: EmailStage::Sent { address },
        } => Screen::AllSet {
            report_id: result.report_id.clone(),
            email: address.clone(),
        },
    };

    ViewModel {
        screen,
        transcript: model.transcript.entries().iter().map(MessageView::from).collect(),
        is_loading,
        alert: model.alert.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PendingOp, SubmissionResult};
    use assert_matches::assert_matches;

    #[test]
    fn greeting_shows_image_upload() {
        let mut model = Model::default();
        model.transcript.push_assistant("Hello!");
        let view = build(&model);
        assert_matches!(
            view.screen,
            Screen::Chat {
                step: ConversationStep::Greeting,
                widget: WidgetView::ImageUpload { disabled: false, .. },
                text_input_enabled: false,
            }
        );
        assert_eq!(view.transcript.len(), 1);
        assert_eq!(view.transcript[0].role, Role::Assistant);
    }

    #[test]
    fn choice_steps_list_every_option() {
        let model = Model {
            phase: SessionPhase::Collecting {
                step: ConversationStep::Severity,
            },
            ..Model::default()
        };
        let view = build(&model);
        assert_matches!(
            view.screen,
            Screen::Chat { widget: WidgetView::Severities { ref options, .. }, .. }
                if options.iter().map(|o| o.badge.as_str()).collect::<Vec<_>>() == ["green", "yellow", "red"]
        );
    }

    #[test]
    fn submission_in_flight_disables_remarks() {
        let mut model = Model {
            phase: SessionPhase::Collecting {
                step: ConversationStep::Remarks,
            },
            ..Model::default()
        };
        model.begin(PendingOp::Submission, "Submitting...");
        let view = build(&model);
        assert!(view.is_loading);
        assert_matches!(
            view.screen,
            Screen::Chat {
                widget: WidgetView::Remarks { disabled: true, .. },
                text_input_enabled: false,
                ..
            }
        );
        assert!(view.transcript[0].pending);
    }

    #[test]
    fn submitted_phases_map_to_summary_screens() {
        let result = SubmissionResult {
            report_id: "R123".into(),
            image_url: String::new(),
            authority_notified: true,
        };
        let mut model = Model {
            phase: SessionPhase::Submitted {
                result: result.clone(),
                email: EmailStage::Awaiting,
            },
            ..Model::default()
        };
        assert_matches!(
            build(&model).screen,
            Screen::Submitted { ref report_id, is_sending_email: false, .. } if report_id == "R123"
        );

        model.phase = SessionPhase::Submitted {
            result,
            email: EmailStage::Sent {
                address: "ada@example.org".into(),
            },
        };
        assert_eq!(
            build(&model).screen,
            Screen::AllSet {
                report_id: "R123".into(),
                email: "ada@example.org".into()
            }
        );
    }
}
