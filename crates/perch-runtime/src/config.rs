#![forbid(unsafe_code)]

//! Startup configuration for the motion controller.
//!
//! [`MotionConfig`] gathers every tunable value in one place. It is read once
//! at startup from JSON or (with the `motion-config` feature) TOML, optionally
//! patched from the environment, validated, and then handed to the controller.
//! There is no hot reload; the fling preset can still be switched at runtime
//! through [`MotionController::set_preset`](crate::MotionController::set_preset).
//!
//! ```toml
//! # perch.toml
//! preset = "floaty"
//! use_work_area = true
//! hysteresis_px = 2.0
//!
//! [hit_bounds]
//! stale_after_ms = 250
//! fallback_fraction = 0.8
//!
//! [events]
//! enabled = true
//! file = "/tmp/perch-motion.jsonl"
//! ```
//!
//! Every section uses `serde(default)`, so partial files keep defaults for the
//! fields they omit.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use perch_core::fling::MAX_STEP_DT_MS;
use perch_core::hit_bounds::DEFAULT_STALE_AFTER_MS;
use perch_core::hysteresis::DEFAULT_HYSTERESIS_PX;
use perch_core::samples::{DEFAULT_MAX_SAMPLES, DEFAULT_SAMPLE_WINDOW_MS};
use perch_core::{
    FallbackHitBox, FlingPreset, FlingSimulator, HitBoundsTracker, HysteresisClamp, InputError,
    PositionSampleBuffer,
};

use crate::event_sink::{EventSinkConfig, EventSinkDestination};
use crate::parse::{parse_bool_flag, parse_finite, parse_preset};
use crate::snapshot::{
    DEFAULT_POSITION_EPSILON_PX, DEFAULT_VELOCITY_EPSILON_PX_S, EmitThresholds, SnapshotGate,
};

/// Environment variable overriding [`MotionConfig::preset`].
pub const ENV_FLING_PRESET: &str = "PERCH_FLING_PRESET";
/// Environment variable overriding [`MotionConfig::use_work_area`].
pub const ENV_USE_WORK_AREA: &str = "PERCH_USE_WORK_AREA";
/// Environment variable overriding [`MotionConfig::hysteresis_px`].
pub const ENV_HYSTERESIS_PX: &str = "PERCH_HYSTERESIS_PX";

// ---------------------------------------------------------------------------
// Top-level MotionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Fling physics preset. Default: `default`.
    #[serde(
        serialize_with = "serialize_preset",
        deserialize_with = "deserialize_preset"
    )]
    pub preset: FlingPreset,

    /// Clamp against the OS work area instead of full display bounds.
    /// Default: true.
    pub use_work_area: bool,

    /// Distance a latched axis must re-enter before unlatching. Default: 2.
    pub hysteresis_px: f64,

    /// Age window of drag samples kept for the release estimate. Default: 120.
    pub sample_window_ms: u64,

    /// Maximum retained drag samples. Default: 12.
    pub max_samples: usize,

    pub hit_bounds: HitBoundsConfig,

    pub emit: EmitConfig,

    pub events: EventsConfig,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            preset: FlingPreset::Default,
            use_work_area: true,
            hysteresis_px: DEFAULT_HYSTERESIS_PX,
            sample_window_ms: DEFAULT_SAMPLE_WINDOW_MS,
            max_samples: DEFAULT_MAX_SAMPLES,
            hit_bounds: HitBoundsConfig::default(),
            emit: EmitConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl MotionConfig {
    /// Parse a TOML string without validating.
    #[cfg(feature = "motion-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    #[cfg(feature = "motion-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Parse a JSON string without validating.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Parse, apply process environment overrides, and validate.
    #[cfg(feature = "motion-config")]
    pub fn load_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)?.finish_load(|key| std::env::var(key).ok())
    }

    /// Parse, apply process environment overrides, and validate.
    pub fn load_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_file(path)?.finish_load(|key| std::env::var(key).ok())
    }

    /// Defaults with process environment overrides, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().finish_load(|key| std::env::var(key).ok())
    }

    fn finish_load(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        self.apply_env_overrides(lookup)?;
        self.into_validated()
    }

    /// Validate and return `self`, or every violation at once.
    pub fn into_validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Apply overrides read through `lookup` (normally `std::env::var`).
    ///
    /// Unset variables are skipped; a set but malformed variable is an error.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(ENV_FLING_PRESET) {
            self.preset = parse_preset(&raw)?;
        }
        if let Some(raw) = lookup(ENV_USE_WORK_AREA) {
            self.use_work_area = parse_bool_flag("use_work_area", &raw)?;
        }
        if let Some(raw) = lookup(ENV_HYSTERESIS_PX) {
            self.hysteresis_px = parse_finite("hysteresis_px", &raw)?;
        }
        Ok(())
    }

    /// Validate all parameters.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.hysteresis_px.is_finite() || self.hysteresis_px < 0.0 {
            errors.push(format!(
                "hysteresis_px must be finite and >= 0, got {}",
                self.hysteresis_px
            ));
        }
        if self.sample_window_ms == 0 {
            errors.push("sample_window_ms must be > 0".into());
        }
        if self.max_samples < 2 {
            errors.push(format!("max_samples must be >= 2, got {}", self.max_samples));
        }

        let fraction = self.hit_bounds.fallback_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            errors.push(format!(
                "hit_bounds.fallback_fraction must be in (0, 1], got {fraction}"
            ));
        }

        if !self.emit.position_epsilon_px.is_finite() || self.emit.position_epsilon_px < 0.0 {
            errors.push(format!(
                "emit.position_epsilon_px must be finite and >= 0, got {}",
                self.emit.position_epsilon_px
            ));
        }
        if !self.emit.velocity_epsilon_px_s.is_finite() || self.emit.velocity_epsilon_px_s < 0.0 {
            errors.push(format!(
                "emit.velocity_epsilon_px_s must be finite and >= 0, got {}",
                self.emit.velocity_epsilon_px_s
            ));
        }

        errors.extend(
            self.preset
                .config()
                .validate()
                .into_iter()
                .map(|e| format!("preset.{e}")),
        );

        errors
    }

    #[must_use]
    pub fn sample_buffer(&self) -> PositionSampleBuffer {
        PositionSampleBuffer::new(self.sample_window_ms, self.max_samples)
    }

    #[must_use]
    pub fn hysteresis_clamp(&self) -> HysteresisClamp {
        HysteresisClamp::new(self.hysteresis_px)
    }

    #[must_use]
    pub fn hit_bounds_tracker(&self) -> HitBoundsTracker {
        HitBoundsTracker::new(
            self.hit_bounds.stale_after_ms,
            FallbackHitBox {
                fraction: self.hit_bounds.fallback_fraction,
            },
        )
    }

    #[must_use]
    pub fn fling_simulator(&self) -> FlingSimulator {
        FlingSimulator::new(self.preset)
    }

    #[must_use]
    pub fn snapshot_gate(&self) -> SnapshotGate {
        SnapshotGate::new(EmitThresholds {
            position_epsilon_px: self.emit.position_epsilon_px,
            velocity_epsilon_px_s: self.emit.velocity_epsilon_px_s,
        })
    }

    /// Tick interval for the active preset, never above the step clamp.
    #[must_use]
    pub fn tick_interval_ms(&self) -> u64 {
        self.preset.config().step_ms.clamp(1, MAX_STEP_DT_MS)
    }

    #[must_use]
    pub fn to_event_sink_config(&self) -> EventSinkConfig {
        EventSinkConfig {
            enabled: self.events.enabled,
            destination: match &self.events.file {
                Some(path) => EventSinkDestination::File(path.into()),
                None => EventSinkDestination::Stdout,
            },
            flush_on_write: self.events.flush_on_write,
            include_snapshots: self.events.include_snapshots,
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Hit-bounds freshness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitBoundsConfig {
    /// Age after which reported bounds are not trusted while moving.
    /// Default: 250.
    pub stale_after_ms: u64,
    /// Fallback box size as a fraction of the window. Default: 1.0.
    pub fallback_fraction: f64,
}

impl Default for HitBoundsConfig {
    fn default() -> Self {
        Self {
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
            fallback_fraction: FallbackHitBox::default().fraction,
        }
    }
}

/// Snapshot suppression thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitConfig {
    pub position_epsilon_px: f64,
    pub velocity_epsilon_px_s: f64,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            position_epsilon_px: DEFAULT_POSITION_EPSILON_PX,
            velocity_epsilon_px_s: DEFAULT_VELOCITY_EPSILON_PX_S,
        }
    }
}

/// JSONL event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Default: false.
    pub enabled: bool,
    /// File path; `None` writes to stdout.
    pub file: Option<String>,
    pub flush_on_write: bool,
    pub include_snapshots: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file: None,
            flush_on_write: true,
            include_snapshots: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a motion configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    #[cfg(feature = "motion-config")]
    Toml(toml::de::Error),
    Json(serde_json::Error),
    /// Every violated constraint, in check order.
    Validation(Vec<String>),
    /// A malformed override value.
    Input(InputError),
}

impl From<InputError> for ConfigError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "motion-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
            Self::Input(e) => write!(f, "invalid override: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "motion-config")]
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
            Self::Input(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for FlingPreset
// ---------------------------------------------------------------------------

fn serialize_preset<S: Serializer>(preset: &FlingPreset, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(preset.name())
}

fn deserialize_preset<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FlingPreset, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_preset(&s).map_err(|_| {
        serde::de::Error::custom(format!(
            "unknown fling preset: {s} (expected default, floaty, heavy or off)"
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_matches_component_defaults() {
        let config = MotionConfig::default();
        assert_eq!(config.preset, FlingPreset::Default);
        assert!(config.use_work_area);
        assert_eq!(config.hysteresis_clamp().hysteresis_px(), 2.0);
        assert_eq!(config.sample_window_ms, 120);
        assert_eq!(config.max_samples, 12);
        assert_eq!(config.hit_bounds.stale_after_ms, 250);
        assert_eq!(config.emit.position_epsilon_px, 0.25);
        assert_eq!(config.emit.velocity_epsilon_px_s, 0.5);
        assert_eq!(config.tick_interval_ms(), 8);
    }

    #[test]
    fn default_validates_clean() {
        let errors = MotionConfig::default().validate();
        assert!(errors.is_empty(), "default should validate: {errors:?}");
    }

    #[test]
    fn multiple_validation_errors_collected() {
        let config = MotionConfig {
            hysteresis_px: -1.0,
            max_samples: 1,
            hit_bounds: HitBoundsConfig {
                fallback_fraction: 0.0,
                ..HitBoundsConfig::default()
            },
            ..MotionConfig::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("hysteresis_px")));
        assert!(errors.iter().any(|e| e.contains("max_samples")));
        assert!(errors.iter().any(|e| e.contains("fallback_fraction")));
        assert!(matches!(
            config.into_validated(),
            Err(ConfigError::Validation(v)) if v.len() == 3
        ));
    }

    #[test]
    fn json_partial_override_preserves_defaults() {
        let config =
            MotionConfig::from_json_str(r#"{"preset":"Heavy","hit_bounds":{"stale_after_ms":90}}"#)
                .unwrap();
        assert_eq!(config.preset, FlingPreset::Heavy);
        assert_eq!(config.hit_bounds.stale_after_ms, 90);
        assert_eq!(config.hit_bounds.fallback_fraction, 1.0);
        assert_eq!(config.max_samples, 12);
    }

    #[test]
    fn json_unknown_preset_rejected() {
        let err = MotionConfig::from_json_str(r#"{"preset":"bouncy"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("unknown fling preset"));
    }

    #[test]
    fn json_round_trip_uses_preset_names() {
        let config = MotionConfig {
            preset: FlingPreset::Floaty,
            ..MotionConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""preset":"floaty""#));
        assert_eq!(MotionConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn json_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perch.json");
        std::fs::write(&path, r#"{"use_work_area":false,"hysteresis_px":4.0}"#).unwrap();
        let config = MotionConfig::from_json_file(&path).unwrap();
        assert!(!config.use_work_area);
        assert_eq!(config.hysteresis_px, 4.0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MotionConfig::from_json_file(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = MotionConfig::default();
        config
            .apply_env_overrides(env(&[
                (ENV_FLING_PRESET, " Floaty "),
                (ENV_USE_WORK_AREA, "0"),
                (ENV_HYSTERESIS_PX, "3.5"),
            ]))
            .unwrap();
        assert_eq!(config.preset, FlingPreset::Floaty);
        assert!(!config.use_work_area);
        assert_eq!(config.hysteresis_px, 3.5);
    }

    #[test]
    fn env_unset_leaves_config_alone() {
        let mut config = MotionConfig::default();
        config.apply_env_overrides(env(&[])).unwrap();
        assert_eq!(config, MotionConfig::default());
    }

    #[test]
    fn env_malformed_value_is_input_error() {
        let mut config = MotionConfig::default();
        let err = config
            .apply_env_overrides(env(&[(ENV_USE_WORK_AREA, "sometimes")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Input(InputError::Unparseable {
                field: "use_work_area",
                ..
            })
        ));
    }

    #[test]
    fn env_override_is_validated_on_load() {
        let err = MotionConfig::default()
            .finish_load(env(&[(ENV_HYSTERESIS_PX, "-3")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn event_sink_config_file_path() {
        let mut config = MotionConfig::default();
        config.events.file = Some("/tmp/perch.jsonl".into());
        let sink = config.to_event_sink_config();
        assert!(!sink.enabled);
        assert!(matches!(sink.destination, EventSinkDestination::File(_)));
        assert_eq!(
            MotionConfig::default().to_event_sink_config().destination,
            EventSinkDestination::Stdout
        );
    }

    #[cfg(feature = "motion-config")]
    #[test]
    fn toml_sections_load() {
        let config = MotionConfig::from_toml_str(
            r#"
            preset = "off"
            use_work_area = false

            [hit_bounds]
            fallback_fraction = 0.5

            [events]
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(config.preset, FlingPreset::Off);
        assert!(!config.use_work_area);
        assert_eq!(config.hit_bounds.fallback_fraction, 0.5);
        assert_eq!(config.hit_bounds.stale_after_ms, 250);
        assert!(config.events.enabled);
        assert!(config.validate().is_empty());
    }

    #[cfg(feature = "motion-config")]
    #[test]
    fn toml_file_bad_syntax_is_toml_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perch.toml");
        std::fs::write(&path, "preset = ").unwrap();
        assert!(matches!(
            MotionConfig::from_toml_file(&path),
            Err(ConfigError::Toml(_))
        ));
    }
}
