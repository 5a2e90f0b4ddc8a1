#![forbid(unsafe_code)]

//! Boundary input validation errors.
//!
//! Values arriving from the window collaborator or from loosely typed
//! configuration are checked once where they enter; rejected values are logged
//! and dropped, never propagated into motion state.

/// Rejected external input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// A coordinate or dimension was NaN or infinite.
    NonFinite { field: &'static str },
    /// Width or height was zero or negative.
    NonPositiveSize { width: f64, height: f64 },
    /// The window size was not available to interpret window-local bounds.
    NoWindowSize,
    /// A string value could not be parsed into the expected type.
    Unparseable { field: &'static str, value: String },
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite { field } => write!(f, "{field} is not finite"),
            Self::NonPositiveSize { width, height } => {
                write!(f, "size must be positive, got {width}x{height}")
            }
            Self::NoWindowSize => write!(f, "window size unavailable"),
            Self::Unparseable { field, value } => {
                write!(f, "cannot parse {field} from {value:?}")
            }
        }
    }
}

impl std::error::Error for InputError {}
