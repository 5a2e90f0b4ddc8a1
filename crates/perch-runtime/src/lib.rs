#![forbid(unsafe_code)]

//! Perch Runtime
//!
//! Ties the `perch-core` motion primitives to a live window: command handling,
//! fixed-rate ticking, snapshot publishing, diagnostics, and configuration.
//!
//! # Key Components
//!
//! - [`MotionController`] - Drag / release / fling state machine for one window
//! - [`MotionRuntime`] - FIFO command queue plus background [`Ticker`]
//! - [`MotionConfig`] - Startup configuration (JSON, TOML, environment)
//! - [`SnapshotSink`] / [`MotionSnapshot`] - Renderer-facing motion updates
//! - [`MotionObserver`] / [`MotionEvent`] - Optional diagnostics
//! - [`MotionEventSink`] - JSONL log of events and snapshots
//!
//! # How it fits in the system
//! The host owns a native window and a monitor list and exposes them through
//! [`WindowSurface`] and [`DisplayTopology`]. Input hooks post
//! [`MotionCommand`]s; the renderer consumes snapshots and reports the
//! character's visible hit-bounds back through
//! [`MotionCommand::SetVisibleBounds`].

pub mod command;
pub mod config;
pub mod controller;
pub mod event_sink;
#[cfg(feature = "logging")]
pub mod logging;
pub mod observer;
pub mod parse;
pub mod runtime;
pub mod snapshot;
pub mod surface;
pub mod ticker;

pub use command::MotionCommand;
pub use config::{ConfigError, EmitConfig, EventsConfig, HitBoundsConfig, MotionConfig};
pub use controller::{MotionController, MotionPhase, MotionStats};
pub use event_sink::{
    EventSinkConfig, EventSinkDestination, MOTION_SCHEMA_VERSION, MotionEventSink,
};
pub use observer::{MotionEvent, MotionObserver};
pub use parse::{finite_point, parse_bool_flag, parse_finite, parse_preset};
pub use runtime::{CommandSender, MotionRuntime};
pub use snapshot::{EmitThresholds, MotionSnapshot, SnapshotGate, SnapshotSink};
pub use surface::{DisplayTopology, HeadlessSurface, SharedTopology, WindowSurface};
pub use ticker::{StopSignal, StopTrigger, Ticker};

// Re-export the core crate so hosts need a single dependency.
pub use perch_core;
