use std::io::Cursor;

use image::ImageReader;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Outcome, Widget};
use crate::transcript::ImageRef;

/// A file the user dropped or picked, exactly as the shell read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    pub file_name: String,
    pub mime_type: String,
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
}

/// An accepted photo held by the draft until submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlob {
    pub file_name: String,
    pub mime_type: String,
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
}

impl ImageBlob {
    #[must_use]
    pub fn reference(&self) -> ImageRef {
        ImageRef {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.bytes.len(),
        }
    }
}

impl From<ImageCandidate> for ImageBlob {
    fn from(candidate: ImageCandidate) -> Self {
        Self {
            file_name: candidate.file_name,
            mime_type: candidate.mime_type,
            bytes: candidate.bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePreview {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    /// Present only when the header could be read.
    pub dimensions: Option<Dimensions>,
    /// MIME type guessed from the content, which may disagree with the
    /// declared one.
    pub detected_mime_type: Option<String>,
}

impl ImagePreview {
    fn inspect(candidate: &ImageCandidate) -> Self {
        let reader = ImageReader::new(Cursor::new(candidate.bytes.as_slice()))
            .with_guessed_format()
            .ok();
        let detected_mime_type = reader
            .as_ref()
            .and_then(|r| r.format())
            .map(|f| f.to_mime_type().to_string());
        let dimensions = reader
            .filter(|r| r.format().is_some())
            .and_then(|r| r.into_dimensions().ok())
            .map(|(width, height)| Dimensions { width, height });

        Self {
            file_name: candidate.file_name.clone(),
            mime_type: candidate.mime_type.clone(),
            size_bytes: candidate.bytes.len(),
            dimensions,
            detected_mime_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageInput {
    DragState { active: bool },
    Selected(ImageCandidate),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePicker {
    pub drag_active: bool,
    pub preview: Option<ImagePreview>,
}

impl ImagePicker {
    /// `image/*` only. The type is copied into the upload's part headers, so
    /// control characters disqualify it.
    #[must_use]
    pub fn accepts(mime_type: &str) -> bool {
        !mime_type.chars().any(char::is_control)
            && mime_type.trim().to_ascii_lowercase().starts_with("image/")
    }
}

impl Widget for ImagePicker {
    type Input = ImageInput;
    type Value = ImageBlob;

    fn handle(&mut self, input: ImageInput) -> Outcome<ImageBlob> {
        match input {
            ImageInput::DragState { active } => {
                self.drag_active = active;
                Outcome::Idle
            }
            ImageInput::Selected(candidate) => {
                self.drag_active = false;
                if !Self::accepts(&candidate.mime_type) {
                    debug!(
                        file_name = %candidate.file_name,
                        mime_type = %candidate.mime_type,
                        "rejecting non-image file"
                    );
                    return Outcome::Idle;
                }
                self.preview = Some(ImagePreview::inspect(&candidate));
                Outcome::Emit(candidate.into())
            }
        }
    }
}
