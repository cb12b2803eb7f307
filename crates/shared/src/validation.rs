//! Common validation utilities.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// A local part, one `@`, a dotted domain.
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^@\s]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9-]+)+$")
            .unwrap();
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Lower-cases and trims an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns true if `email` is syntactically an address.
pub fn is_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Returns true if the (normalized) email belongs to the institution domain.
///
/// The domain is compared on the part after the last `@`, so
/// `a@depauw.edu.evil.com` and `depauw.edu@gmail.com` do not qualify.
pub fn is_institutional_email(email: &str, domain: &str) -> bool {
    let email = normalize_email(email);
    if !is_email(&email) {
        return false;
    }
    match email.rsplit_once('@') {
        Some((local, host)) => !local.is_empty() && host == domain.trim().to_lowercase(),
        None => false,
    }
}

/// Validates the start/end window of an event. End must be strictly after
/// start; there is no upper bound on duration.
pub fn validate_event_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if end <= start {
        let mut err = ValidationError::new("event_window");
        err.message = Some("End time must be after start time".into());
        return Err(err);
    }

    Ok(())
}
