#![forbid(unsafe_code)]

//! Motion snapshots published to the rendering layer.
//!
//! A snapshot is built after every state change the renderer may care about.
//! [`SnapshotGate`] drops snapshots that differ from the last published one by
//! less than the configured epsilons, unless a state flag flipped.

use std::sync::mpsc;

use serde::{Serialize, Serializer};

use perch_core::{Axes, FlingPreset, Point, Velocity};

/// Default minimum position change that justifies a new snapshot.
pub const DEFAULT_POSITION_EPSILON_PX: f64 = 0.25;

/// Default minimum velocity change that justifies a new snapshot.
pub const DEFAULT_VELOCITY_EPSILON_PX_S: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionView {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VelocityView {
    pub vx: f64,
    pub vy: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollidedView {
    pub x: bool,
    pub y: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImpactView {
    pub triggered: bool,
    /// 0..=1, visual only.
    pub strength: f64,
}

/// State of the window's motion at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionSnapshot {
    pub timestamp_ms: u64,
    pub dragging: bool,
    pub flinging: bool,
    pub position: PositionView,
    pub velocity: VelocityView,
    pub collided: CollidedView,
    pub impact: ImpactView,
    #[serde(serialize_with = "serialize_preset")]
    pub preset: FlingPreset,
}

impl MotionSnapshot {
    /// At-rest snapshot with zero velocity and no collision.
    #[must_use]
    pub fn at_rest(timestamp_ms: u64, position: Point, preset: FlingPreset) -> Self {
        Self::new(
            timestamp_ms,
            (false, false),
            position,
            Velocity::ZERO,
            Axes::empty(),
            None,
            preset,
        )
    }

    /// `flags` is `(dragging, flinging)`.
    #[must_use]
    pub fn new(
        timestamp_ms: u64,
        flags: (bool, bool),
        position: Point,
        velocity: Velocity,
        collided: Axes,
        impact: Option<f64>,
        preset: FlingPreset,
    ) -> Self {
        Self {
            timestamp_ms,
            dragging: flags.0,
            flinging: flags.1,
            position: PositionView {
                x: position.x,
                y: position.y,
            },
            velocity: VelocityView {
                vx: velocity.vx,
                vy: velocity.vy,
                speed: velocity.speed(),
            },
            collided: CollidedView {
                x: collided.contains(Axes::X),
                y: collided.contains(Axes::Y),
            },
            impact: ImpactView {
                triggered: impact.is_some(),
                strength: impact.unwrap_or(0.0).clamp(0.0, 1.0),
            },
            preset,
        }
    }

    #[inline]
    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.position.x, self.position.y)
    }

    #[inline]
    #[must_use]
    pub fn velocity(&self) -> Velocity {
        Velocity::new(self.velocity.vx, self.velocity.vy)
    }

    /// Serialize as a single JSON object.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }

    fn flags_differ(&self, other: &Self) -> bool {
        self.dragging != other.dragging
            || self.flinging != other.flinging
            || self.collided != other.collided
            || self.impact.triggered != other.impact.triggered
            || self.preset != other.preset
    }
}

fn serialize_preset<S: Serializer>(preset: &FlingPreset, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(preset.name())
}

/// Suppression thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitThresholds {
    pub position_epsilon_px: f64,
    pub velocity_epsilon_px_s: f64,
}

impl Default for EmitThresholds {
    fn default() -> Self {
        Self {
            position_epsilon_px: DEFAULT_POSITION_EPSILON_PX,
            velocity_epsilon_px_s: DEFAULT_VELOCITY_EPSILON_PX_S,
        }
    }
}

/// Decides whether a snapshot is worth publishing.
#[derive(Debug, Clone, Default)]
pub struct SnapshotGate {
    thresholds: EmitThresholds,
    last: Option<MotionSnapshot>,
}

impl SnapshotGate {
    #[must_use]
    pub fn new(thresholds: EmitThresholds) -> Self {
        Self {
            thresholds,
            last: None,
        }
    }

    /// Returns `true` and remembers `snapshot` if it should be published.
    pub fn admit(&mut self, snapshot: &MotionSnapshot) -> bool {
        let emit = match &self.last {
            None => true,
            Some(last) => {
                snapshot.flags_differ(last)
                    || snapshot.point().distance(last.point())
                        >= self.thresholds.position_epsilon_px
                    || Velocity::new(
                        snapshot.velocity.vx - last.velocity.vx,
                        snapshot.velocity.vy - last.velocity.vy,
                    )
                    .speed()
                        >= self.thresholds.velocity_epsilon_px_s
            }
        };
        if emit {
            self.last = Some(*snapshot);
        }
        emit
    }

    /// Last published snapshot.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&MotionSnapshot> {
        self.last.as_ref()
    }
}

/// Receiver of published snapshots (normally the renderer).
pub trait SnapshotSink {
    fn publish(&mut self, snapshot: &MotionSnapshot);
}

impl SnapshotSink for mpsc::Sender<MotionSnapshot> {
    fn publish(&mut self, snapshot: &MotionSnapshot) {
        // A dropped receiver means the renderer is gone; nothing to do.
        let _ = self.send(*snapshot);
    }
}

impl SnapshotSink for Vec<MotionSnapshot> {
    fn publish(&mut self, snapshot: &MotionSnapshot) {
        self.push(*snapshot);
    }
}
