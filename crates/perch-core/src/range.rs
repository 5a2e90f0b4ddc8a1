#![forbid(unsafe_code)]

//! Allowed window-position range.
//!
//! The window may be larger than the visible character, so the range is
//! computed from the character's hit-bounds (window-local) rather than the
//! window rectangle: the window is allowed anywhere that keeps the hit-bounds
//! inside the clamp area.
//!
//! When the hit-bounds are larger than the area on an axis, the range on that
//! axis collapses to the rounded midpoint, so `min <= max` always holds.

use bitflags::bitflags;

use crate::geometry::{Point, Rect};

bitflags! {
    /// Axes on which a clamp changed the value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Axes: u8 {
        const X = 0b01;
        const Y = 0b10;
    }
}

/// Inclusive range of allowed window positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampRange {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

/// Compute the allowed window-position range.
///
/// `hit` is relative to the window origin.
#[must_use]
pub fn compute_range(area: Rect, hit: Rect) -> ClampRange {
    let (min_x, max_x) = collapse(area.x - hit.x, area.right() - (hit.x + hit.width));
    let (min_y, max_y) = collapse(area.y - hit.y, area.bottom() - (hit.y + hit.height));
    ClampRange {
        min_x,
        max_x,
        min_y,
        max_y,
    }
}

// Halves round toward +inf, so -1.5 becomes -1 and 1.5 becomes 2.
fn collapse(min: f64, max: f64) -> (f64, f64) {
    if min > max {
        let mid = ((min + max) / 2.0 + 0.5).floor();
        (mid, mid)
    } else {
        (min, max)
    }
}

impl ClampRange {
    /// Clamp a point, reporting the axes that moved.
    #[must_use]
    pub fn clamp(&self, p: Point) -> (Point, Axes) {
        let x = p.x.clamp(self.min_x, self.max_x);
        let y = p.y.clamp(self.min_y, self.max_y);
        let mut moved = Axes::empty();
        if x != p.x {
            moved |= Axes::X;
        }
        if y != p.y {
            moved |= Axes::Y;
        }
        (Point::new(x, y), moved)
    }

    /// Whether the point lies within the range (inclusive).
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Range on one axis as `(min, max)`.
    #[must_use]
    pub fn axis(&self, axis: Axes) -> (f64, f64) {
        if axis == Axes::Y {
            (self.min_y, self.max_y)
        } else {
            (self.min_x, self.max_x)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_range() {
        let r = compute_range(
            Rect::new(0.0, 0.0, 800.0, 600.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        assert_eq!(r.min_x, 0.0);
        assert_eq!(r.max_x, 700.0);
        assert_eq!(r.min_y, 0.0);
        assert_eq!(r.max_y, 500.0);
    }

    #[test]
    fn hit_offset_shifts_range() {
        // Visible character occupies 40..140 inside a 200px window.
        let r = compute_range(
            Rect::new(0.0, 0.0, 800.0, 600.0),
            Rect::new(40.0, 60.0, 100.0, 80.0),
        );
        assert_eq!(r.min_x, -40.0);
        assert_eq!(r.max_x, 660.0);
        assert_eq!(r.min_y, -60.0);
        assert_eq!(r.max_y, 460.0);
    }

    #[test]
    fn oversized_hit_collapses_to_midpoint() {
        let r = compute_range(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(0.0, 0.0, 200.0, 50.0),
        );
        assert_eq!(r.min_x, r.max_x);
        assert_eq!(r.min_x, -50.0);
        assert_eq!(r.min_y, 0.0);
        assert_eq!(r.max_y, 50.0);
    }

    #[test]
    fn collapse_rounds_midpoint() {
        let r = compute_range(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(0.0, 0.0, 103.0, 10.0),
        );
        // min = 0, max = -3, midpoint -1.5 rounds up.
        assert_eq!(r.min_x, -1.0);
        assert_eq!(r.max_x, -1.0);

        let r = compute_range(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(-5.0, 0.0, 107.0, 10.0),
        );
        // min = 5, max = -2, midpoint 1.5 rounds up.
        assert_eq!(r.min_x, 2.0);
        assert_eq!(r.max_x, 2.0);
    }

    #[test]
    fn clamp_reports_moved_axes() {
        let r = compute_range(
            Rect::new(0.0, 0.0, 800.0, 600.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        let (p, moved) = r.clamp(Point::new(-50.0, -50.0));
        assert_eq!(p, Point::new(0.0, 0.0));
        assert_eq!(moved, Axes::X | Axes::Y);

        let (p, moved) = r.clamp(Point::new(350.0, 700.0));
        assert_eq!(p, Point::new(350.0, 500.0));
        assert_eq!(moved, Axes::Y);
    }
}
