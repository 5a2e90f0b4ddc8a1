#![forbid(unsafe_code)]

//! Core: drag clamping, display resolution, and fling physics.
//!
//! # Role in Perch
//! `perch-core` holds the numeric pieces of companion-window motion. Every type
//! here is a plain value or a small state machine with no I/O and no timers, so
//! each piece can be tested in isolation.
//!
//! # Primary responsibilities
//! - **PositionSampleBuffer**: windowed drag history and release velocity.
//! - **DisplayResolver**: active-monitor selection with sticky fallback.
//! - **compute_range**: allowed window-position rectangle from display area and
//!   character hit-bounds.
//! - **HysteresisClamp**: per-axis boundary latching during drags.
//! - **FlingSimulator**: free motion with bounces, damping and stop detection.
//!
//! # How it fits in the system
//! `perch-runtime` owns a `MotionController` that wires these pieces together,
//! feeds them pointer commands and timer ticks, and publishes motion snapshots
//! to the renderer.

pub mod clock;
pub mod display;
pub mod error;
pub mod fling;
pub mod geometry;
pub mod hit_bounds;
pub mod hysteresis;
pub mod logging;
pub mod range;
pub mod samples;

pub use clock::{ManualClock, MotionClock, SystemClock};
pub use display::{Display, DisplayDecision, DisplayId, DisplayResolver, DisplaySource};
pub use error::InputError;
pub use fling::{
    CancelReason, FlingConfig, FlingPreset, FlingSimulator, FlingStart, FlingState,
    FlingStepReport, SkipReason, StopReason,
};
pub use geometry::{Point, Rect, Size, Velocity};
pub use hit_bounds::{FallbackHitBox, HitBoundsTracker, VisibleHitBounds};
pub use hysteresis::{AxisLatch, HysteresisClamp};
pub use range::{Axes, ClampRange, compute_range};
pub use samples::{PositionSample, PositionSampleBuffer};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
