use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

use super::{Outcome, Widget};

/// A closed set of options rendered as buttons.
pub trait Choice: Copy + Sized + 'static {
    const ALL: &'static [Self];

    /// Wire identifier, also what the backend stores.
    fn id(self) -> &'static str;
    fn label(self) -> &'static str;
    fn description(self) -> &'static str;
    /// Icon name or color token, depending on the picker.
    fn badge(self) -> &'static str;

    #[must_use]
    fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Pothole,
    Crack,
    SurfaceDamage,
    Other,
}

impl Choice for DamageType {
    const ALL: &'static [Self] = &[
        Self::Pothole,
        Self::Crack,
        Self::SurfaceDamage,
        Self::Other,
    ];

    fn id(self) -> &'static str {
        match self {
            Self::Pothole => "pothole",
            Self::Crack => "crack",
            Self::SurfaceDamage => "surface_damage",
            Self::Other => "other",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Pothole => "Pothole",
            Self::Crack => "Crack",
            Self::SurfaceDamage => "Surface Damage",
            Self::Other => "Other",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Pothole => "Hole or depression in the road surface",
            Self::Crack => "Fracture or fissure in the road",
            Self::SurfaceDamage => "General surface deterioration or wear",
            Self::Other => "Other type of road damage",
        }
    }

    fn badge(self) -> &'static str {
        match self {
            Self::Pothole | Self::Other => "alert-triangle",
            Self::Crack => "split",
            Self::SurfaceDamage => "wrench",
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Choice for Severity {
    const ALL: &'static [Self] = &[Self::Low, Self::Medium, Self::High];

    fn id(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Low => "Minor damage, not immediately dangerous",
            Self::Medium => "Moderate damage, may cause inconvenience",
            Self::High => "Severe damage, potentially dangerous",
        }
    }

    fn badge(self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Medium => "yellow",
            Self::High => "red",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Emits as soon as a known option id is picked. Unknown ids emit nothing.
#[derive(Debug, Clone, Copy)]
pub struct ChoicePicker<T> {
    _choice: PhantomData<T>,
}

impl<T: Choice> ChoicePicker<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _choice: PhantomData,
        }
    }
}

impl<T: Choice> Widget for ChoicePicker<T> {
    type Input = String;
    type Value = T;

    fn handle(&mut self, input: String) -> Outcome<T> {
        match T::from_id(input.trim()) {
            Some(choice) => Outcome::Emit(choice),
            None => {
                tracing::debug!(id = %input, "ignoring unknown choice");
                Outcome::Idle
            }
        }
    }
}
