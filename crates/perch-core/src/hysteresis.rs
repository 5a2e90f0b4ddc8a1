#![forbid(unsafe_code)]

//! Boundary latching for drag clamping.
//!
//! A plain clamp flips between "pinned" and "free" the instant the target
//! crosses the boundary. Pointer noise of a pixel or two around the edge then
//! shows up as the character shivering against the wall. The clamp here keeps a
//! per-axis latch: once pinned to a side, the axis stays pinned until the
//! unclamped target comes back inside by at least `hysteresis_px`.
//!
//! # State machine (per axis)
//!
//! ```text
//!            target <= min (+tol)                target >= max (-tol)
//!   None ─────────────────────────▶ Min   None ─────────────────────────▶ Max
//!   Min  ──── target >= min + h ───▶ None  Max  ──── target <= max - h ───▶ None
//! ```
//!
//! # Invariants
//!
//! 1. Output always lies within the range.
//! 2. While latched to `Min`, targets in `[min, min + h)` resolve to exactly `min`.
//! 3. [`reset`](HysteresisClamp::reset) returns both axes to `None`.

use crate::geometry::Point;
use crate::range::ClampRange;

/// Default re-entry distance before a latched axis lets go.
pub const DEFAULT_HYSTERESIS_PX: f64 = 2.0;

/// Tolerance for "at the boundary".
const BOUNDARY_TOLERANCE: f64 = 0.001;

/// Latched side of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisLatch {
    #[default]
    None,
    Min,
    Max,
}

impl AxisLatch {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

fn resolve_axis(latch: &mut AxisLatch, target: f64, min: f64, max: f64, hysteresis: f64) -> f64 {
    let at_min = target <= min + BOUNDARY_TOLERANCE;
    let at_max = target >= max - BOUNDARY_TOLERANCE;

    if at_min || at_max {
        let side = match (at_min, at_max) {
            (true, false) => AxisLatch::Min,
            (false, true) => AxisLatch::Max,
            // Collapsed or sub-tolerance range: pick the side the target is past.
            _ => {
                if (target - min).abs() <= (target - max).abs() {
                    AxisLatch::Min
                } else {
                    AxisLatch::Max
                }
            }
        };
        *latch = side;
        return if side == AxisLatch::Min { min } else { max };
    }

    let clamped = target.clamp(min.min(max), max.max(min));
    if clamped != target {
        let side = if (target - min).abs() <= (max - target).abs() {
            AxisLatch::Min
        } else {
            AxisLatch::Max
        };
        *latch = side;
        return if side == AxisLatch::Min { min } else { max };
    }

    match *latch {
        AxisLatch::None => clamped,
        AxisLatch::Min => {
            if target >= min + hysteresis {
                *latch = AxisLatch::None;
                clamped
            } else {
                min
            }
        }
        AxisLatch::Max => {
            if target <= max - hysteresis {
                *latch = AxisLatch::None;
                clamped
            } else {
                max
            }
        }
    }
}

/// Two-axis clamp with boundary hysteresis.
#[derive(Debug, Clone)]
pub struct HysteresisClamp {
    hysteresis_px: f64,
    x: AxisLatch,
    y: AxisLatch,
}

impl Default for HysteresisClamp {
    fn default() -> Self {
        Self::new(DEFAULT_HYSTERESIS_PX)
    }
}

impl HysteresisClamp {
    /// Create a clamp. Negative or non-finite thresholds become zero.
    #[must_use]
    pub fn new(hysteresis_px: f64) -> Self {
        let hysteresis_px = if hysteresis_px.is_finite() {
            hysteresis_px.max(0.0)
        } else {
            0.0
        };
        Self {
            hysteresis_px,
            x: AxisLatch::None,
            y: AxisLatch::None,
        }
    }

    /// Resolve an unclamped drag target against `range`.
    pub fn apply(&mut self, target: Point, range: &ClampRange) -> Point {
        let x = resolve_axis(
            &mut self.x,
            target.x,
            range.min_x,
            range.max_x,
            self.hysteresis_px,
        );
        let y = resolve_axis(
            &mut self.y,
            target.y,
            range.min_y,
            range.max_y,
            self.hysteresis_px,
        );
        Point::new(x, y)
    }

    /// Release both latches.
    pub fn reset(&mut self) {
        self.x = AxisLatch::None;
        self.y = AxisLatch::None;
    }

    /// Current `(x, y)` latch state.
    #[inline]
    #[must_use]
    pub fn latches(&self) -> (AxisLatch, AxisLatch) {
        (self.x, self.y)
    }

    #[inline]
    #[must_use]
    pub fn hysteresis_px(&self) -> f64 {
        self.hysteresis_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::range::compute_range;

    fn range() -> ClampRange {
        compute_range(
            Rect::new(0.0, 0.0, 800.0, 600.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        )
    }

    #[test]
    fn interior_passes_through() {
        let mut clamp = HysteresisClamp::default();
        let p = clamp.apply(Point::new(300.0, 200.0), &range());
        assert_eq!(p, Point::new(300.0, 200.0));
        assert_eq!(clamp.latches(), (AxisLatch::None, AxisLatch::None));
    }

    #[test]
    fn beyond_boundary_snaps_and_latches() {
        let mut clamp = HysteresisClamp::default();
        let p = clamp.apply(Point::new(-50.0, -50.0), &range());
        assert_eq!(p, Point::new(0.0, 0.0));
        assert_eq!(clamp.latches(), (AxisLatch::Min, AxisLatch::Min));
    }

    #[test]
    fn jitter_inside_band_stays_pinned() {
        let mut clamp = HysteresisClamp::default();
        clamp.apply(Point::new(-5.0, 100.0), &range());
        for x in [0.5, 1.0, 1.999, 0.2, 1.5] {
            let p = clamp.apply(Point::new(x, 100.0), &range());
            assert_eq!(p.x, 0.0, "target {x} should stay pinned");
        }
        assert_eq!(clamp.latches().0, AxisLatch::Min);
    }

    #[test]
    fn reentry_past_band_unlatches() {
        let mut clamp = HysteresisClamp::default();
        clamp.apply(Point::new(-5.0, 100.0), &range());
        let p = clamp.apply(Point::new(2.0, 100.0), &range());
        assert_eq!(p.x, 2.0);
        assert_eq!(clamp.latches().0, AxisLatch::None);
    }

    #[test]
    fn max_side_mirrors_min_side() {
        let mut clamp = HysteresisClamp::default();
        let p = clamp.apply(Point::new(900.0, 100.0), &range());
        assert_eq!(p.x, 700.0);
        assert_eq!(clamp.apply(Point::new(698.5, 100.0), &range()).x, 700.0);
        assert_eq!(clamp.apply(Point::new(698.0, 100.0), &range()).x, 698.0);
        assert_eq!(clamp.latches().0, AxisLatch::None);
    }

    #[test]
    fn within_tolerance_counts_as_boundary() {
        let mut clamp = HysteresisClamp::default();
        let p = clamp.apply(Point::new(0.0005, 100.0), &range());
        assert_eq!(p.x, 0.0);
        assert_eq!(clamp.latches().0, AxisLatch::Min);
    }

    #[test]
    fn collapsed_range_pins_to_midpoint() {
        let r = compute_range(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(0.0, 0.0, 200.0, 50.0),
        );
        let mut clamp = HysteresisClamp::default();
        for x in [-200.0, -50.0, 0.0, 75.0] {
            assert_eq!(clamp.apply(Point::new(x, 10.0), &r).x, -50.0);
        }
    }

    #[test]
    fn reset_releases_latches() {
        let mut clamp = HysteresisClamp::default();
        clamp.apply(Point::new(-5.0, 900.0), &range());
        clamp.reset();
        assert_eq!(clamp.latches(), (AxisLatch::None, AxisLatch::None));
    }

    #[test]
    fn axes_latch_independently() {
        let mut clamp = HysteresisClamp::default();
        clamp.apply(Point::new(-5.0, 300.0), &range());
        assert_eq!(clamp.latches(), (AxisLatch::Min, AxisLatch::None));
        let p = clamp.apply(Point::new(1.0, 301.0), &range());
        assert_eq!(p, Point::new(0.0, 301.0));
    }

    #[test]
    fn invalid_threshold_becomes_zero() {
        assert_eq!(HysteresisClamp::new(-3.0).hysteresis_px(), 0.0);
        assert_eq!(HysteresisClamp::new(f64::NAN).hysteresis_px(), 0.0);
    }
}
