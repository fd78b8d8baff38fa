// Location & ResolutionResult Domain Model

use super::error::{DomainError, Result};
use super::identifier::{Identifier, Locatable};
use serde::{Deserialize, Serialize};

/// Resolved geographic position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
    /// Time of the fix (epoch ms)
    pub time: i64,
}

impl Location {
    /// Create a validated location
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, time: i64) -> Result<Self> {
        let location = Self {
            latitude,
            longitude,
            accuracy,
            time,
        };
        location.validate()?;
        Ok(location)
    }

    /// Check the coordinate ranges
    ///
    /// Fields are public, so values built by hand (providers, deserialized
    /// data) must pass this before they are stored.
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(DomainError::InvalidLocation(format!(
                "latitude {} out of range",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(DomainError::InvalidLocation(format!(
                "longitude {} out of range",
                self.longitude
            )));
        }
        if !self.accuracy.is_finite() || self.accuracy < 0.0 {
            return Err(DomainError::InvalidLocation(format!(
                "accuracy {} must be finite and non-negative",
                self.accuracy
            )));
        }
        Ok(())
    }
}

/// Outcome of resolving one identifier
///
/// `location: None` is a persisted "confirmed unresolvable" state. It is not
/// the same as a missing cache entry, which means "never attempted".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult<T = Identifier> {
    pub identifier: T,
    pub location: Option<Location>,
}

impl<T> ResolutionResult<T> {
    pub fn resolved(identifier: T, location: Location) -> Self {
        Self {
            identifier,
            location: Some(location),
        }
    }

    pub fn unresolved(identifier: T) -> Self {
        Self {
            identifier,
            location: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.location.is_some()
    }
}

impl<T: Locatable> ResolutionResult<T> {
    /// Convert a typed result into the form stored by the cache
    pub fn into_untyped(self) -> ResolutionResult {
        ResolutionResult {
            identifier: self.identifier.into(),
            location: self.location,
        }
    }
}
