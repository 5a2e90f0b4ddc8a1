#![forbid(unsafe_code)]

//! Subscriber setup for hosts that do not install their own.
//!
//! Libraries normally leave subscriber installation to the application. Small
//! hosts (demo shells, the headless harness) can call [`init_logging`] once at
//! startup instead.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive string.
pub const LOG_ENV: &str = "PERCH_LOG";

/// Install a global fmt subscriber.
///
/// `PERCH_LOG` overrides `default_filter` when set and valid. Returns `false`
/// if a global subscriber was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
