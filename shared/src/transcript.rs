use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::UnixTimeMs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Attachment shown next to a user entry. The bytes stay in the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: EntryId,
    pub role: Role,
    pub content: String,
    pub timestamp: UnixTimeMs,
    pub image: Option<ImageRef>,
    pub pending: bool,
}

/// How a pending entry is settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Replace(String),
    Dismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("no transcript entry {0}")]
    UnknownEntry(EntryId),
    #[error("transcript entry {0} is not pending")]
    NotPending(EntryId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_id: u64,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> EntryId {
        self.push(Role::Assistant, content.into(), None, false)
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> EntryId {
        self.push(Role::User, content.into(), None, false)
    }

    pub fn push_user_image(&mut self, content: impl Into<String>, image: ImageRef) -> EntryId {
        self.push(Role::User, content.into(), Some(image), false)
    }

    /// Appends an assistant placeholder for work that has not finished yet.
    pub fn push_pending(&mut self, content: impl Into<String>) -> EntryId {
        self.push(Role::Assistant, content.into(), None, true)
    }

    /// Settles a pending entry. A replacement takes the same slot under a
    /// fresh id, so the old id can never be resolved twice.
    ///
    /// # Errors
    ///
    /// `UnknownEntry` if `id` is not in the transcript, `NotPending` if it
    /// refers to a settled entry.
    pub fn resolve(
        &mut self,
        id: EntryId,
        resolution: Resolution,
    ) -> Result<Option<EntryId>, TranscriptError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(TranscriptError::UnknownEntry(id))?;
        if !self.entries[index].pending {
            return Err(TranscriptError::NotPending(id));
        }

        match resolution {
            Resolution::Replace(content) => {
                let new_id = self.allocate();
                self.entries[index] = TranscriptEntry {
                    id: new_id,
                    role: Role::Assistant,
                    content,
                    timestamp: UnixTimeMs::now(),
                    image: None,
                    pending: false,
                };
                Ok(Some(new_id))
            }
            Resolution::Dismiss => {
                self.entries.remove(index);
                Ok(None)
            }
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&TranscriptEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.pending).count()
    }

    /// Drops every entry. Ids keep counting up so none is reused.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(
        &mut self,
        role: Role,
        content: String,
        image: Option<ImageRef>,
        pending: bool,
    ) -> EntryId {
        let id = self.allocate();
        self.entries.push(TranscriptEntry {
            id,
            role,
            content,
            timestamp: UnixTimeMs::now(),
            image,
            pending,
        });
        id
    }

    fn allocate(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }
}
