//! Geolocation helper
//!
//! Device coordinates arrive from a single-shot [`LocationSource`] with a
//! bounded timeout. A successful fix is written into the read-only
//! coordinate fields as six-decimal strings; failure leaves them blank and
//! tells the respondent to enter them manually or retry.

use std::time::Duration;

use crate::notify::Notifier;
use crate::schema;
use crate::state::FormController;

/// Timeout for one position request.
pub const LOCATE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LocateError {
    #[error("location lookup is not supported in this environment")]
    Unsupported,

    #[error("no position fix within {0:?}")]
    TimedOut(Duration),

    #[error("unable to determine position: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

/// One-shot provider of the device position.
pub trait LocationSource {
    fn current_position(&self, timeout: Duration) -> Result<GeoPosition, LocateError>;
}

/// Reads a fixed position from environment variables. Stands in for a real
/// positioning device on deployments that configure their site up front.
#[derive(Debug, Clone)]
pub struct EnvLocationSource {
    lat_var: String,
    lon_var: String,
}

impl EnvLocationSource {
    pub fn new() -> Self {
        Self::with_vars("CENTRE_LAT", "CENTRE_LON")
    }

    pub fn with_vars(lat_var: impl Into<String>, lon_var: impl Into<String>) -> Self {
        Self {
            lat_var: lat_var.into(),
            lon_var: lon_var.into(),
        }
    }
}

impl Default for EnvLocationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationSource for EnvLocationSource {
    fn current_position(&self, _timeout: Duration) -> Result<GeoPosition, LocateError> {
        let read = |var: &str| -> Result<f64, LocateError> {
            std::env::var(var)
                .map_err(|_| LocateError::Unavailable(format!("{var} is not set")))?
                .parse::<f64>()
                .map_err(|_| LocateError::Unavailable(format!("{var} is not a number")))
        };
        Ok(GeoPosition {
            latitude: read(&self.lat_var)?,
            longitude: read(&self.lon_var)?,
        })
    }
}

/// Source for environments with no positioning capability at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedLocationSource;

impl LocationSource for UnsupportedLocationSource {
    fn current_position(&self, _timeout: Duration) -> Result<GeoPosition, LocateError> {
        Err(LocateError::Unsupported)
    }
}

/// Six-decimal coordinate string, matching what the coordinate fields
/// display.
pub fn format_coordinate(value: f64) -> String {
    format!("{value:.6}")
}

/// Request the position once and write it into the coordinate fields.
///
/// Called at form mount and again by the manual "locate me" action. On any
/// failure the fields are left untouched and the respondent is told to
/// enter coordinates manually or retry; the outcome is the return value.
pub fn locate_into(
    form: &mut FormController,
    source: &dyn LocationSource,
    notifier: &dyn Notifier,
) -> bool {
    match source.current_position(LOCATE_TIMEOUT) {
        Ok(position) => {
            let wrote = form
                .seed_text(schema::LATITUDE, format_coordinate(position.latitude))
                .and_then(|_| {
                    form.seed_text(schema::LONGITUDE, format_coordinate(position.longitude))
                });
            match wrote {
                Ok(()) => true,
                Err(e) => {
                    // Schema without coordinate fields: nothing to fill in.
                    tracing::warn!("could not store coordinates: {e}");
                    false
                }
            }
        }
        Err(LocateError::Unsupported) => {
            notifier.warning("Location lookup is not supported in this environment.");
            false
        }
        Err(e) => {
            tracing::warn!("geolocation failed: {e}");
            notifier.warning("Unable to retrieve your location. Please enter manually.");
            false
        }
    }
}
