use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Outcome, Widget, WidgetRequest};
use crate::capabilities::GeolocationResult;
use crate::model::Location;
use crate::{CoordinateError, COORDINATE_LABEL_PRECISION, MAX_LATITUDE, MAX_LONGITUDE};

pub const INVALID_COORDINATES_ALERT: &str = "Please enter valid coordinates";

/// WGS84 point that has passed range validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

impl Coordinates {
    /// # Errors
    ///
    /// Rejects non-finite values and values outside ±90 / ±180.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-MAX_LATITUDE..=MAX_LATITUDE).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&lng) {
            return Err(CoordinateError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Parses typed text. The whole field must be a number.
    ///
    /// # Errors
    ///
    /// `NotANumber` for unparseable text, otherwise whatever `new` rejects.
    pub fn parse(lat: &str, lng: &str) -> Result<Self, CoordinateError> {
        let parse = |raw: &str| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| CoordinateError::NotANumber(raw.to_string()))
        };
        Self::new(parse(lat)?, parse(lng)?)
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Fixed-precision label used as the address until geocoding answers.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{:.prec$}, {:.prec$}",
            self.lat,
            self.lng,
            prec = COORDINATE_LABEL_PRECISION
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationInput {
    /// The location step became active.
    Open,
    UseCurrentLocation,
    EnterManually,
    LatitudeChanged(String),
    LongitudeChanged(String),
    AddressChanged(String),
    SubmitManual,
    Change,
    Confirm,
    Positioned(GeolocationResult),
    AddressResolved {
        coordinates: Coordinates,
        address: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LocationPicker {
    #[default]
    Choosing,
    Locating,
    Located {
        coordinates: Coordinates,
        address: String,
        resolving_address: bool,
    },
    Manual {
        latitude: String,
        longitude: String,
        address: String,
    },
}

impl LocationPicker {
    fn manual() -> Self {
        Self::Manual {
            latitude: String::new(),
            longitude: String::new(),
            address: String::new(),
        }
    }

    fn locate(&mut self) -> Outcome<Location> {
        *self = Self::Locating;
        Outcome::Request(WidgetRequest::CurrentPosition)
    }

    fn submit_manual(&mut self) -> Outcome<Location> {
        let Self::Manual {
            latitude,
            longitude,
            address,
        } = self
        else {
            return Outcome::Idle;
        };

        let coordinates = match Coordinates::parse(latitude, longitude) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "manual coordinates rejected");
                return Outcome::Alert(INVALID_COORDINATES_ALERT.to_string());
            }
        };

        let typed = address.trim().to_string();
        if typed.is_empty() {
            *self = Self::Located {
                coordinates,
                address: format!("{}, {}", coordinates.lat, coordinates.lng),
                resolving_address: true,
            };
            Outcome::Request(WidgetRequest::ReverseGeocode(coordinates))
        } else {
            *self = Self::Located {
                coordinates,
                address: typed,
                resolving_address: false,
            };
            Outcome::Idle
        }
    }

    fn positioned(&mut self, result: GeolocationResult) -> Outcome<Location> {
        if *self != Self::Locating {
            debug!("position arrived after the picker moved on");
            return Outcome::Idle;
        }
        match result.map_err(|e| e.to_string()).and_then(|p| {
            Coordinates::new(p.latitude, p.longitude).map_err(|e| e.to_string())
        }) {
            Ok(coordinates) => {
                *self = Self::Located {
                    coordinates,
                    address: coordinates.label(),
                    resolving_address: true,
                };
                Outcome::Request(WidgetRequest::ReverseGeocode(coordinates))
            }
            Err(reason) => {
                debug!(%reason, "falling back to manual entry");
                *self = Self::manual();
                Outcome::Idle
            }
        }
    }

    /// Whether a reverse-geocoding answer for `coordinates` would still be used.
    #[must_use]
    pub fn awaits_address(&self, coordinates: Coordinates) -> bool {
        matches!(
            self,
            Self::Located {
                coordinates: awaited,
                resolving_address: true,
                ..
            } if *awaited == coordinates
        )
    }

    fn address_resolved(&mut self, resolved_for: Coordinates, name: Option<String>) {
        if let Self::Located {
            coordinates,
            address,
            resolving_address,
        } = self
        {
            if *coordinates != resolved_for || !*resolving_address {
                return;
            }
            *resolving_address = false;
            if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
                *address = name;
            }
        }
    }
}

impl Widget for LocationPicker {
    type Input = LocationInput;
    type Value = Location;

    fn handle(&mut self, input: LocationInput) -> Outcome<Location> {
        match input {
            LocationInput::Open => self.locate(),
            LocationInput::UseCurrentLocation => match self {
                Self::Choosing | Self::Manual { .. } => self.locate(),
                Self::Locating | Self::Located { .. } => Outcome::Idle,
            },
            LocationInput::EnterManually => {
                if matches!(self, Self::Choosing | Self::Locating) {
                    *self = Self::manual();
                }
                Outcome::Idle
            }
            LocationInput::LatitudeChanged(value) => {
                if let Self::Manual { latitude, .. } = self {
                    *latitude = value;
                }
                Outcome::Idle
            }
            LocationInput::LongitudeChanged(value) => {
                if let Self::Manual { longitude, .. } = self {
                    *longitude = value;
                }
                Outcome::Idle
            }
            LocationInput::AddressChanged(value) => {
                if let Self::Manual { address, .. } = self {
                    *address = value;
                }
                Outcome::Idle
            }
            LocationInput::SubmitManual => self.submit_manual(),
            LocationInput::Change => {
                if matches!(self, Self::Located { .. }) {
                    *self = Self::Choosing;
                }
                Outcome::Idle
            }
            LocationInput::Confirm => match self {
                Self::Located {
                    coordinates,
                    address,
                    ..
                } => Outcome::Emit(Location {
                    lat: coordinates.lat,
                    lng: coordinates.lng,
                    address: address.clone(),
                }),
                _ => Outcome::Idle,
            },
            LocationInput::Positioned(result) => self.positioned(result),
            LocationInput::AddressResolved {
                coordinates,
                address,
            } => {
                self.address_resolved(coordinates, address);
                Outcome::Idle
            }
        }
    }
}
