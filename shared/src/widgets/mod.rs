//! Step input widgets.
//!
//! Each widget is a small state machine that turns raw shell interactions
//! into at most one validated value for its draft field. Widgets never touch
//! the draft or the transcript; the app decides what an emitted value means.

pub mod choice;
pub mod image;
pub mod location;

pub use choice::{Choice, ChoicePicker, DamageType, Severity};
pub use image::{ImageBlob, ImageCandidate, ImageInput, ImagePicker, ImagePreview};
pub use location::{Coordinates, LocationInput, LocationPicker};

/// What the widget asks the app to do after an interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// State may have changed; nothing to emit.
    Idle,
    Emit(T),
    Request(WidgetRequest),
    /// Blocking message the user has to dismiss.
    Alert(String),
}

/// Device or network work a widget needs but cannot start itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidgetRequest {
    CurrentPosition,
    ReverseGeocode(Coordinates),
}

pub trait Widget {
    type Input;
    type Value;

    fn handle(&mut self, input: Self::Input) -> Outcome<Self::Value>;
}
