#![forbid(unsafe_code)]

//! Diagnostic events and the observer interface.
//!
//! Observers see what the controller decided and why. They never influence
//! motion: the controller behaves identically with zero observers.

use std::sync::mpsc;

use serde_json::{Value, json};

use perch_core::{
    Axes, CancelReason, DisplayId, DisplaySource, FlingPreset, InputError, Point, SkipReason,
    StopReason, Velocity,
};

/// Something noteworthy the controller did.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionEvent {
    DragStarted {
        position: Point,
        cancelled_fling: bool,
    },
    DragEnded {
        position: Point,
        /// Release velocity estimate, if enough samples existed.
        velocity: Option<Velocity>,
    },
    FlingStarted {
        velocity: Velocity,
        capped: bool,
    },
    FlingSkipped {
        reason: SkipReason,
    },
    FlingStopped {
        reason: StopReason,
        position: Point,
    },
    FlingCancelled {
        reason: CancelReason,
    },
    Bounce {
        axes: Axes,
        strength: f64,
        position: Point,
    },
    DisplayChanged {
        display: DisplayId,
        source: DisplaySource,
    },
    PresetChanged {
        from: FlingPreset,
        to: FlingPreset,
    },
    InputRejected {
        command: &'static str,
        error: InputError,
    },
}

impl MotionEvent {
    /// Stable event name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DragStarted { .. } => "drag_started",
            Self::DragEnded { .. } => "drag_ended",
            Self::FlingStarted { .. } => "fling_started",
            Self::FlingSkipped { .. } => "fling_skipped",
            Self::FlingStopped { .. } => "fling_stopped",
            Self::FlingCancelled { .. } => "fling_cancelled",
            Self::Bounce { .. } => "bounce",
            Self::DisplayChanged { .. } => "display_changed",
            Self::PresetChanged { .. } => "preset_changed",
            Self::InputRejected { .. } => "input_rejected",
        }
    }

    /// Event payload as a JSON object (without envelope fields).
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::DragStarted {
                position,
                cancelled_fling,
            } => json!({
                "x": position.x,
                "y": position.y,
                "cancelled_fling": cancelled_fling,
            }),
            Self::DragEnded { position, velocity } => json!({
                "x": position.x,
                "y": position.y,
                "vx": velocity.map(|v| v.vx),
                "vy": velocity.map(|v| v.vy),
            }),
            Self::FlingStarted { velocity, capped } => json!({
                "vx": velocity.vx,
                "vy": velocity.vy,
                "speed": velocity.speed(),
                "capped": capped,
            }),
            Self::FlingSkipped { reason } => {
                let mut v = json!({ "reason": reason.as_str() });
                if let SkipReason::BelowMinSpeed { speed, min } = reason {
                    v["speed"] = json!(speed);
                    v["min_speed"] = json!(min);
                }
                v
            }
            Self::FlingStopped { reason, position } => json!({
                "reason": reason.as_str(),
                "x": position.x,
                "y": position.y,
            }),
            Self::FlingCancelled { reason } => json!({ "reason": reason.as_str() }),
            Self::Bounce {
                axes,
                strength,
                position,
            } => json!({
                "axis_x": axes.contains(Axes::X),
                "axis_y": axes.contains(Axes::Y),
                "strength": strength,
                "x": position.x,
                "y": position.y,
            }),
            Self::DisplayChanged { display, source } => json!({
                "display": display.0,
                "source": source.as_str(),
            }),
            Self::PresetChanged { from, to } => json!({
                "from": from.name(),
                "to": to.name(),
            }),
            Self::InputRejected { command, error } => json!({
                "command": command,
                "error": error.to_string(),
            }),
        }
    }
}

/// Receives diagnostic events.
pub trait MotionObserver {
    fn on_event(&mut self, timestamp_ms: u64, event: &MotionEvent);
}

impl MotionObserver for mpsc::Sender<MotionEvent> {
    fn on_event(&mut self, _timestamp_ms: u64, event: &MotionEvent) {
        let _ = self.send(event.clone());
    }
}

impl MotionObserver for Vec<MotionEvent> {
    fn on_event(&mut self, _timestamp_ms: u64, event: &MotionEvent) {
        self.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_payload_carries_speeds() {
        let e = MotionEvent::FlingSkipped {
            reason: SkipReason::BelowMinSpeed {
                speed: 50.0,
                min: 120.0,
            },
        };
        assert_eq!(e.kind(), "fling_skipped");
        let p = e.payload();
        assert_eq!(p["reason"], "below_min_speed");
        assert_eq!(p["speed"], 50.0);
        assert_eq!(p["min_speed"], 120.0);
    }

    #[test]
    fn drag_end_without_estimate_has_null_velocity() {
        let p = MotionEvent::DragEnded {
            position: Point::new(1.0, 2.0),
            velocity: None,
        }
        .payload();
        assert!(p["vx"].is_null());
        assert_eq!(p["x"], 1.0);
    }

    #[test]
    fn vec_observer_records_in_order() {
        let mut seen: Vec<MotionEvent> = Vec::new();
        seen.on_event(
            0,
            &MotionEvent::FlingCancelled {
                reason: CancelReason::Shutdown,
            },
        );
        seen.on_event(
            1,
            &MotionEvent::PresetChanged {
                from: FlingPreset::Default,
                to: FlingPreset::Off,
            },
        );
        let kinds: Vec<_> = seen.iter().map(MotionEvent::kind).collect();
        assert_eq!(kinds, ["fling_cancelled", "preset_changed"]);
    }
}
