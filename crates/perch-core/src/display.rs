#![forbid(unsafe_code)]

//! Active-display selection with sticky fallback.
//!
//! During fast drags across monitors the pointer occasionally reports a point
//! that no display contains (gaps between mismatched monitors, a stray sample
//! past the outer edge). Picking the nearest display on every such sample makes
//! the clamp area jump. [`DisplayResolver`] instead reuses the last resolved
//! display while it is still connected.
//!
//! # Resolution order
//!
//! 1. A display whose full bounds contain the point (`Containing`).
//! 2. The sticky display, if still present (`StickyPrevious`).
//! 3. The display nearest the point (`NearestFallback`).
//!
//! Cases 1 and 3 update the sticky display.

use crate::geometry::{Point, Rect};

/// Platform display identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(pub u32);

impl std::fmt::Display for DisplayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "display#{}", self.0)
    }
}

/// One connected monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Display {
    pub id: DisplayId,
    /// Full display bounds in screen space.
    pub bounds: Rect,
    /// OS work area (bounds minus taskbars/docks).
    pub work_area: Rect,
}

impl Display {
    #[must_use]
    pub const fn new(id: u32, bounds: Rect, work_area: Rect) -> Self {
        Self {
            id: DisplayId(id),
            bounds,
            work_area,
        }
    }

    /// Rectangle the character is clamped against.
    ///
    /// An empty or non-finite work area falls back to the full bounds.
    #[must_use]
    pub fn clamp_area(&self, use_work_area: bool) -> Rect {
        if use_work_area && self.work_area.is_finite() && !self.work_area.is_empty() {
            self.work_area
        } else {
            self.bounds
        }
    }
}

/// How a display was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplaySource {
    Containing,
    StickyPrevious,
    NearestFallback,
}

impl DisplaySource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Containing => "containing",
            Self::StickyPrevious => "sticky_previous",
            Self::NearestFallback => "nearest_fallback",
        }
    }
}

/// Result of display resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayDecision {
    pub display: Display,
    pub source: DisplaySource,
}

impl DisplayDecision {
    #[inline]
    #[must_use]
    pub fn display_id(&self) -> DisplayId {
        self.display.id
    }
}

/// Resolves the active display for a pointer position.
#[derive(Debug, Clone, Default)]
pub struct DisplayResolver {
    sticky: Option<DisplayId>,
}

impl DisplayResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the display for `point` out of the live set.
    ///
    /// Returns `None` only when `displays` is empty.
    pub fn resolve(&mut self, displays: &[Display], point: Point) -> Option<DisplayDecision> {
        if let Some(display) = displays.iter().find(|d| d.bounds.contains(point)) {
            self.remember(display.id);
            return Some(DisplayDecision {
                display: *display,
                source: DisplaySource::Containing,
            });
        }

        if let Some(sticky) = self.sticky
            && let Some(display) = displays.iter().find(|d| d.id == sticky)
        {
            return Some(DisplayDecision {
                display: *display,
                source: DisplaySource::StickyPrevious,
            });
        }

        let nearest = displays.iter().min_by(|a, b| {
            a.bounds
                .distance_to(point)
                .total_cmp(&b.bounds.distance_to(point))
        })?;
        self.remember(nearest.id);
        Some(DisplayDecision {
            display: *nearest,
            source: DisplaySource::NearestFallback,
        })
    }

    fn remember(&mut self, id: DisplayId) {
        if self.sticky != Some(id) {
            crate::trace!(display = %id, "sticky display changed");
        }
        self.sticky = Some(id);
    }

    /// Currently remembered sticky display.
    #[inline]
    #[must_use]
    pub fn sticky(&self) -> Option<DisplayId> {
        self.sticky
    }

    /// Forget the sticky display (called when a drag ends).
    pub fn clear_sticky(&mut self) {
        self.sticky = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual() -> Vec<Display> {
        vec![
            Display::new(
                1,
                Rect::new(0.0, 0.0, 1920.0, 1080.0),
                Rect::new(0.0, 0.0, 1920.0, 1040.0),
            ),
            Display::new(
                2,
                Rect::new(1920.0, 0.0, 1280.0, 1024.0),
                Rect::new(1920.0, 0.0, 1280.0, 1024.0),
            ),
        ]
    }

    #[test]
    fn containing_display_wins() {
        let mut r = DisplayResolver::new();
        let d = r.resolve(&dual(), Point::new(2000.0, 100.0)).unwrap();
        assert_eq!(d.display_id(), DisplayId(2));
        assert_eq!(d.source, DisplaySource::Containing);
        assert_eq!(r.sticky(), Some(DisplayId(2)));
    }

    #[test]
    fn stray_point_reuses_sticky() {
        let mut r = DisplayResolver::new();
        r.resolve(&dual(), Point::new(100.0, 100.0));
        // Below the shorter second display but nearer to it than to display 1.
        let d = r.resolve(&dual(), Point::new(2500.0, 1060.0)).unwrap();
        assert_eq!(d.display_id(), DisplayId(1));
        assert_eq!(d.source, DisplaySource::StickyPrevious);
    }

    #[test]
    fn nearest_fallback_without_sticky() {
        let mut r = DisplayResolver::new();
        let d = r.resolve(&dual(), Point::new(2500.0, 1060.0)).unwrap();
        assert_eq!(d.display_id(), DisplayId(2));
        assert_eq!(d.source, DisplaySource::NearestFallback);
        assert_eq!(r.sticky(), Some(DisplayId(2)));
    }

    #[test]
    fn disconnected_sticky_falls_back_to_nearest() {
        let mut r = DisplayResolver::new();
        r.resolve(&dual(), Point::new(2000.0, 100.0));
        let only_primary = vec![dual()[0]];
        let d = r.resolve(&only_primary, Point::new(5000.0, 100.0)).unwrap();
        assert_eq!(d.display_id(), DisplayId(1));
        assert_eq!(d.source, DisplaySource::NearestFallback);
    }

    #[test]
    fn clear_sticky_forgets() {
        let mut r = DisplayResolver::new();
        r.resolve(&dual(), Point::new(10.0, 10.0));
        r.clear_sticky();
        assert!(r.sticky().is_none());
    }

    #[test]
    fn empty_display_set_yields_none() {
        let mut r = DisplayResolver::new();
        assert!(r.resolve(&[], Point::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn clamp_area_prefers_work_area() {
        let d = dual()[0];
        assert_eq!(d.clamp_area(true).height, 1040.0);
        assert_eq!(d.clamp_area(false).height, 1080.0);
    }

    #[test]
    fn empty_work_area_uses_bounds() {
        let d = Display::new(
            3,
            Rect::new(0.0, 0.0, 800.0, 600.0),
            Rect::new(0.0, 0.0, 0.0, 0.0),
        );
        assert_eq!(d.clamp_area(true), d.bounds);
    }
}
