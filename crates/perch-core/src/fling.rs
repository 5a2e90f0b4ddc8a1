#![forbid(unsafe_code)]

//! Post-release free motion with wall bounces and exponential decay.
//!
//! # Integration
//!
//! Each step advances by `dt` (clamped to [`MAX_STEP_DT_MS`]):
//!
//! 1. `p += v * dt`
//! 2. Hard-clamp `p` against the range at the new position (the character
//!    may have crossed onto another display mid-flight).
//! 3. Reflect velocity on every axis the clamp moved:
//!    `v = -v * restitution`.
//! 4. Damp: `v *= exp(-damping_per_sec * dt)`.
//! 5. Stop once speed falls below `stop_speed_px_s`.
//!
//! The math lives in [`integrate`], a pure function over [`FlingState`], so it
//! can be tested without a timer. [`FlingSimulator`] adds timing, presets and
//! cancellation on top.
//!
//! # Invariants
//!
//! 1. Started velocity never exceeds `max_speed_px_s`; capping preserves direction.
//! 2. An inactive simulator has zero velocity.
//! 3. With `damping_per_sec > 0` and `stop_speed_px_s > 0`, every fling stops
//!    after a bounded number of steps.
//!
//! # Failure Modes
//!
//! - Scheduler stalls: elapsed time is clamped so a late tick does not
//!   teleport the character through a wall.
//! - Non-finite velocity (bad samples upstream): the start is skipped.

use crate::geometry::{Point, Velocity};
use crate::range::{Axes, ClampRange};

/// Upper bound on elapsed time consumed by a single step.
pub const MAX_STEP_DT_MS: u64 = 50;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Physics parameters for one preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlingConfig {
    /// Whether flings may start at all.
    pub enabled: bool,
    /// Release speed below which no fling starts.
    pub min_speed_px_s: f64,
    /// Release speed cap.
    pub max_speed_px_s: f64,
    /// Exponential decay rate.
    pub damping_per_sec: f64,
    /// Fraction of speed kept (reversed) after a wall hit.
    pub bounce_restitution: f64,
    /// Speed at which motion is considered finished.
    pub stop_speed_px_s: f64,
    /// Nominal tick cadence.
    pub step_ms: u64,
}

impl FlingConfig {
    /// Validate parameter ranges. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.enabled {
            return errors;
        }
        if !(self.min_speed_px_s >= 0.0) {
            errors.push(format!(
                "min_speed_px_s must be >= 0, got {}",
                self.min_speed_px_s
            ));
        }
        if !(self.max_speed_px_s > 0.0) || self.max_speed_px_s < self.min_speed_px_s {
            errors.push(format!(
                "max_speed_px_s must be > 0 and >= min_speed_px_s, got {}",
                self.max_speed_px_s
            ));
        }
        if !(self.damping_per_sec > 0.0) {
            errors.push(format!(
                "damping_per_sec must be > 0, got {}",
                self.damping_per_sec
            ));
        }
        if !(0.0..=1.0).contains(&self.bounce_restitution) {
            errors.push(format!(
                "bounce_restitution must be in [0, 1], got {}",
                self.bounce_restitution
            ));
        }
        if !(self.stop_speed_px_s > 0.0) {
            errors.push(format!(
                "stop_speed_px_s must be > 0, got {}",
                self.stop_speed_px_s
            ));
        }
        if self.step_ms == 0 || self.step_ms > MAX_STEP_DT_MS {
            errors.push(format!(
                "step_ms must be in 1..={MAX_STEP_DT_MS}, got {}",
                self.step_ms
            ));
        }
        errors
    }
}

/// Named physics preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum FlingPreset {
    #[default]
    Default,
    /// Low friction, lively bounces.
    Floaty,
    /// High friction, dull bounces, harder to start.
    Heavy,
    /// Flinging disabled.
    Off,
}

impl FlingPreset {
    pub const ALL: [FlingPreset; 4] = [Self::Default, Self::Floaty, Self::Heavy, Self::Off];

    /// Physics parameters for this preset.
    #[must_use]
    pub const fn config(self) -> FlingConfig {
        match self {
            Self::Default => FlingConfig {
                enabled: true,
                min_speed_px_s: 120.0,
                max_speed_px_s: 3600.0,
                damping_per_sec: 3.2,
                bounce_restitution: 0.55,
                stop_speed_px_s: 40.0,
                step_ms: 8,
            },
            Self::Floaty => FlingConfig {
                enabled: true,
                min_speed_px_s: 90.0,
                max_speed_px_s: 4200.0,
                damping_per_sec: 1.6,
                bounce_restitution: 0.75,
                stop_speed_px_s: 25.0,
                step_ms: 8,
            },
            Self::Heavy => FlingConfig {
                enabled: true,
                min_speed_px_s: 220.0,
                max_speed_px_s: 2400.0,
                damping_per_sec: 6.0,
                bounce_restitution: 0.3,
                stop_speed_px_s: 60.0,
                step_ms: 8,
            },
            Self::Off => FlingConfig {
                enabled: false,
                min_speed_px_s: 0.0,
                max_speed_px_s: 0.0,
                damping_per_sec: 0.0,
                bounce_restitution: 0.0,
                stop_speed_px_s: 0.0,
                step_ms: 8,
            },
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Floaty => "floaty",
            Self::Heavy => "heavy",
            Self::Off => "off",
        }
    }

    /// Look up a preset by its exact lowercase name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl std::fmt::Display for FlingPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a fling did not start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkipReason {
    /// The active preset disables flinging.
    Disabled,
    /// Fewer than two usable drag samples.
    InsufficientSamples,
    /// Release velocity was NaN or infinite.
    NonFiniteVelocity,
    /// Release speed (after capping) below the preset minimum.
    BelowMinSpeed { speed: f64, min: f64 },
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::InsufficientSamples => "insufficient_samples",
            Self::NonFiniteVelocity => "non_finite_velocity",
            Self::BelowMinSpeed { .. } => "below_min_speed",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowMinSpeed { speed, min } => {
                write!(f, "skip: below minimum speed ({speed:.1} < {min:.1} px/s)")
            }
            other => write!(f, "skip: {}", other.as_str()),
        }
    }
}

/// Result of [`FlingSimulator::start`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlingStart {
    Started {
        /// Velocity after capping.
        velocity: Velocity,
        /// Whether the release velocity exceeded the cap.
        capped: bool,
    },
    Skipped(SkipReason),
}

impl FlingStart {
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

/// Why an active fling was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// A new drag grabbed the character.
    DragStarted,
    /// The preset was switched to `off`.
    Disabled,
    /// The backing window went away.
    SurfaceLost,
    /// Application teardown.
    Shutdown,
    /// Explicit request from the host.
    Requested,
}

impl CancelReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DragStarted => "drag_started",
            Self::Disabled => "disabled",
            Self::SurfaceLost => "surface_lost",
            Self::Shutdown => "shutdown",
            Self::Requested => "requested",
        }
    }
}

/// Why an active fling ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopReason {
    /// Speed decayed below `stop_speed_px_s`.
    Settled { speed: f64 },
    /// Velocity became non-finite.
    Diverged,
}

impl StopReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Settled { .. } => "settled",
            Self::Diverged => "diverged",
        }
    }
}

// ---------------------------------------------------------------------------
// State + pure step
// ---------------------------------------------------------------------------

/// Free-motion state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlingState {
    pub active: bool,
    pub vx: f64,
    pub vy: f64,
    pub x: f64,
    pub y: f64,
    pub last_step_ms: u64,
}

impl FlingState {
    #[inline]
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[inline]
    #[must_use]
    pub fn velocity(&self) -> Velocity {
        Velocity::new(self.vx, self.vy)
    }
}

/// What one integration step did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlingStepReport {
    pub position: Point,
    /// Velocity after bounce and damping.
    pub velocity: Velocity,
    /// Axes that hit a wall this step.
    pub collided: Axes,
    /// Impact strength in 0..=1 when a wall was hit.
    pub impact: Option<f64>,
    /// Set when this step ended the fling.
    pub stopped: Option<StopReason>,
}

/// Advance `state` by `dt_secs`.
///
/// `range_at` receives the integrated (unclamped) position and returns the
/// range to clamp against, or `None` to skip clamping.
pub fn integrate(
    state: &FlingState,
    config: &FlingConfig,
    dt_secs: f64,
    range_at: impl FnOnce(Point) -> Option<ClampRange>,
) -> (FlingState, FlingStepReport) {
    let mut next = *state;
    next.x += state.vx * dt_secs;
    next.y += state.vy * dt_secs;

    let mut collided = Axes::empty();
    let mut impact: Option<f64> = None;
    if let Some(range) = range_at(next.position()) {
        let (clamped, moved) = range.clamp(next.position());
        next.x = clamped.x;
        next.y = clamped.y;
        let cap = config.max_speed_px_s.max(1.0);
        for (axis, v) in [(Axes::X, &mut next.vx), (Axes::Y, &mut next.vy)] {
            if moved.contains(axis) {
                let strength = (v.abs() / cap).min(1.0);
                impact = Some(impact.map_or(strength, |s: f64| s.max(strength)));
                *v = -*v * config.bounce_restitution;
                collided |= axis;
            }
        }
    }

    let decay = (-config.damping_per_sec * dt_secs).exp();
    next.vx *= decay;
    next.vy *= decay;

    let speed = next.velocity().speed();
    let stopped = if !speed.is_finite() {
        Some(StopReason::Diverged)
    } else if speed < config.stop_speed_px_s {
        Some(StopReason::Settled { speed })
    } else {
        None
    };

    if stopped.is_some() {
        next.active = false;
        next.vx = 0.0;
        next.vy = 0.0;
    }

    let report = FlingStepReport {
        position: next.position(),
        velocity: next.velocity(),
        collided,
        impact,
        stopped,
    };
    (next, report)
}

// ---------------------------------------------------------------------------
// FlingSimulator
// ---------------------------------------------------------------------------

/// Owns the fling state and applies the active preset.
#[derive(Debug, Clone)]
pub struct FlingSimulator {
    preset: FlingPreset,
    config: FlingConfig,
    state: FlingState,
}

impl Default for FlingSimulator {
    fn default() -> Self {
        Self::new(FlingPreset::Default)
    }
}

impl FlingSimulator {
    #[must_use]
    pub fn new(preset: FlingPreset) -> Self {
        Self {
            preset,
            config: preset.config(),
            state: FlingState::default(),
        }
    }

    /// Use custom physics under a preset label.
    #[must_use]
    pub fn with_config(preset: FlingPreset, config: FlingConfig) -> Self {
        Self {
            preset,
            config,
            state: FlingState::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn preset(&self) -> FlingPreset {
        self.preset
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &FlingConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &FlingState {
        &self.state
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Switch presets. Returns `true` if an active fling was cancelled
    /// because the new preset is disabled.
    pub fn set_preset(&mut self, preset: FlingPreset) -> bool {
        self.preset = preset;
        self.config = preset.config();
        if !self.config.enabled {
            return self.cancel(CancelReason::Disabled);
        }
        false
    }

    /// Try to start a fling from `position` with the release velocity.
    pub fn start(&mut self, position: Point, velocity: Velocity, now_ms: u64) -> FlingStart {
        if !self.config.enabled {
            self.state = FlingState::default();
            return FlingStart::Skipped(SkipReason::Disabled);
        }
        if !velocity.is_finite() || !position.is_finite() {
            return FlingStart::Skipped(SkipReason::NonFiniteVelocity);
        }

        let capped_velocity = velocity.capped(self.config.max_speed_px_s);
        let capped = capped_velocity != velocity;
        let speed = capped_velocity.speed();
        if speed < self.config.min_speed_px_s {
            crate::trace!(speed, min = self.config.min_speed_px_s, "fling skipped");
            return FlingStart::Skipped(SkipReason::BelowMinSpeed {
                speed,
                min: self.config.min_speed_px_s,
            });
        }

        self.state = FlingState {
            active: true,
            vx: capped_velocity.vx,
            vy: capped_velocity.vy,
            x: position.x,
            y: position.y,
            last_step_ms: now_ms,
        };
        crate::debug!(
            preset = self.preset.name(),
            vx = capped_velocity.vx,
            vy = capped_velocity.vy,
            capped,
            "fling started"
        );
        FlingStart::Started {
            velocity: capped_velocity,
            capped,
        }
    }

    /// Run one step at `now_ms`.
    ///
    /// Returns `None` when inactive or when no time has elapsed.
    pub fn step(
        &mut self,
        now_ms: u64,
        range_at: impl FnOnce(Point) -> Option<ClampRange>,
    ) -> Option<FlingStepReport> {
        if !self.state.active {
            return None;
        }
        let elapsed = now_ms.saturating_sub(self.state.last_step_ms);
        if elapsed == 0 {
            return None;
        }
        let dt_ms = elapsed.min(MAX_STEP_DT_MS);
        let (mut next, report) =
            integrate(&self.state, &self.config, dt_ms as f64 / 1000.0, range_at);
        next.last_step_ms = now_ms;
        self.state = next;
        if let Some(reason) = report.stopped {
            crate::debug!(reason = reason.as_str(), "fling stopped");
            self.state = FlingState {
                last_step_ms: now_ms,
                ..FlingState::default()
            };
        }
        Some(report)
    }

    /// Stop immediately and zero all state.
    ///
    /// Returns `true` if a fling was active.
    pub fn cancel(&mut self, reason: CancelReason) -> bool {
        let was_active = self.state.active;
        if was_active {
            crate::debug!(reason = reason.as_str(), "fling cancelled");
        }
        self.state = FlingState::default();
        was_active
    }
}
