#![forbid(unsafe_code)]

//! Typed parsing for loosely typed boundary input.
//!
//! Environment variables and host bridges hand over strings and unchecked
//! floats. These functions are the only place such values are converted; the
//! rest of the crate works with validated types.

use perch_core::{FlingPreset, InputError, Point};

/// Parse a preset name. Surrounding whitespace and case are ignored.
pub fn parse_preset(raw: &str) -> Result<FlingPreset, InputError> {
    let trimmed = raw.trim();
    FlingPreset::ALL
        .into_iter()
        .find(|p| p.name().eq_ignore_ascii_case(trimmed))
        .ok_or_else(|| InputError::Unparseable {
            field: "preset",
            value: raw.to_string(),
        })
}

/// Parse a boolean switch such as `1`, `true`, `yes`, `on` (or their negatives).
pub fn parse_bool_flag(field: &'static str, raw: &str) -> Result<bool, InputError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(InputError::Unparseable {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Parse a finite float.
pub fn parse_finite(field: &'static str, raw: &str) -> Result<f64, InputError> {
    let value: f64 = raw.trim().parse().map_err(|_| InputError::Unparseable {
        field,
        value: raw.to_string(),
    })?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InputError::NonFinite { field })
    }
}

/// Check a pointer coordinate pair.
pub fn finite_point(field: &'static str, x: f64, y: f64) -> Result<Point, InputError> {
    let p = Point::new(x, y);
    if p.is_finite() {
        Ok(p)
    } else {
        Err(InputError::NonFinite { field })
    }
}
