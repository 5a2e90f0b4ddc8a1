#![forbid(unsafe_code)]

//! Character hit-bounds as reported by the renderer.
//!
//! The renderer reports the visible, interactive footprint of the character in
//! window-local coordinates. Sprite animations change that footprint, and the
//! renderer may fall behind while the window is moving fast. Bounds older than
//! `stale_after_ms` are therefore not trusted during motion; a conservative
//! fallback box derived from the window size is used instead.

use crate::error::InputError;
use crate::geometry::{Rect, Size};

/// Default age after which reported bounds are considered stale while moving.
pub const DEFAULT_STALE_AFTER_MS: u64 = 250;

/// Bounds reported by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleHitBounds {
    /// Window-local rectangle.
    pub rect: Rect,
    pub updated_at_ms: u64,
}

/// Substitute hit-box used when reported bounds are missing or stale.
///
/// A centered box covering `fraction` of the window in each dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackHitBox {
    pub fraction: f64,
}

impl Default for FallbackHitBox {
    fn default() -> Self {
        Self { fraction: 1.0 }
    }
}

impl FallbackHitBox {
    #[must_use]
    pub fn rect(&self, window: Size) -> Rect {
        let fraction = if self.fraction.is_finite() {
            self.fraction.clamp(0.05, 1.0)
        } else {
            1.0
        };
        let width = window.width * fraction;
        let height = window.height * fraction;
        Rect::new(
            (window.width - width) / 2.0,
            (window.height - height) / 2.0,
            width,
            height,
        )
    }
}

/// Tracks the latest reported bounds and decides which box to clamp with.
#[derive(Debug, Clone)]
pub struct HitBoundsTracker {
    current: Option<VisibleHitBounds>,
    stale_after_ms: u64,
    fallback: FallbackHitBox,
}

impl Default for HitBoundsTracker {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER_MS, FallbackHitBox::default())
    }
}

impl HitBoundsTracker {
    #[must_use]
    pub fn new(stale_after_ms: u64, fallback: FallbackHitBox) -> Self {
        Self {
            current: None,
            stale_after_ms,
            fallback,
        }
    }

    /// Validate and store new bounds.
    ///
    /// Rejected input leaves the previous bounds in place.
    pub fn update(
        &mut self,
        rect: Rect,
        timestamp_ms: u64,
        window: Option<Size>,
    ) -> Result<(), InputError> {
        if !rect.is_finite() {
            return Err(InputError::NonFinite {
                field: "visible_bounds",
            });
        }
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return Err(InputError::NonPositiveSize {
                width: rect.width,
                height: rect.height,
            });
        }
        match window {
            Some(size) if size.is_usable() => {}
            _ => return Err(InputError::NoWindowSize),
        }
        self.current = Some(VisibleHitBounds {
            rect,
            updated_at_ms: timestamp_ms,
        });
        Ok(())
    }

    /// Latest accepted bounds, regardless of age.
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<&VisibleHitBounds> {
        self.current.as_ref()
    }

    /// Whether the latest bounds are too old to trust at `now_ms`.
    #[must_use]
    pub fn is_stale(&self, now_ms: u64) -> bool {
        match self.current {
            Some(b) => now_ms.saturating_sub(b.updated_at_ms) > self.stale_after_ms,
            None => true,
        }
    }

    /// Box to clamp with.
    ///
    /// Reported bounds are used when fresh, or at any age while the character
    /// is at rest; otherwise the fallback box.
    #[must_use]
    pub fn effective(&self, now_ms: u64, moving: bool, window: Size) -> Rect {
        match self.current {
            Some(b) if !moving || !self.is_stale(now_ms) => b.rect,
            _ => self.fallback.rect(window),
        }
    }
}
