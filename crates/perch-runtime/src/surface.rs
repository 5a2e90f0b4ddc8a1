#![forbid(unsafe_code)]

//! Host seams: the window being moved and the live monitor set.
//!
//! The controller never talks to a windowing system directly. The host wraps
//! its native window in a [`WindowSurface`] and exposes the current monitors
//! through a [`DisplayTopology`]. [`HeadlessSurface`] and [`SharedTopology`]
//! are in-memory implementations for tests, benches and headless hosts.

use std::borrow::Cow;
use std::sync::{Arc, Mutex};

use perch_core::{Display, Point, Size};

/// The companion window.
pub trait WindowSurface {
    /// Whether the backing native window still exists.
    fn is_alive(&self) -> bool;

    /// Top-left corner in screen space.
    fn position(&self) -> Option<Point>;

    /// Outer window size, used to interpret window-local hit-bounds.
    fn size(&self) -> Option<Size>;

    fn set_position(&mut self, position: Point);
}

/// Connected monitors, queried on every drag sample and fling step.
pub trait DisplayTopology {
    fn displays(&self) -> Cow<'_, [Display]>;
}

impl DisplayTopology for Vec<Display> {
    fn displays(&self) -> Cow<'_, [Display]> {
        Cow::Borrowed(self.as_slice())
    }
}

/// Monitor set that another thread can replace (hotplug, resolution change).
#[derive(Debug, Clone, Default)]
pub struct SharedTopology {
    inner: Arc<Mutex<Vec<Display>>>,
}

impl SharedTopology {
    #[must_use]
    pub fn new(displays: Vec<Display>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(displays)),
        }
    }

    /// Replace the whole monitor set.
    pub fn replace(&self, displays: Vec<Display>) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = displays;
    }
}

impl DisplayTopology for SharedTopology {
    fn displays(&self) -> Cow<'_, [Display]> {
        let guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Cow::Owned(guard.clone())
    }
}

/// In-memory window.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSurface {
    position: Point,
    size: Size,
    alive: bool,
    moves: u64,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            position,
            size,
            alive: true,
            moves: 0,
        }
    }

    /// Simulate the native window being destroyed.
    pub fn close(&mut self) {
        self.alive = false;
    }

    /// Number of `set_position` calls received.
    #[inline]
    #[must_use]
    pub fn moves(&self) -> u64 {
        self.moves
    }

    /// Move without counting, as a window manager would.
    pub fn place(&mut self, position: Point) {
        self.position = position;
    }
}

impl WindowSurface for HeadlessSurface {
    fn is_alive(&self) -> bool {
        self.alive
    }

    fn position(&self) -> Option<Point> {
        self.alive.then_some(self.position)
    }

    fn size(&self) -> Option<Size> {
        self.alive.then_some(self.size)
    }

    fn set_position(&mut self, position: Point) {
        if self.alive {
            self.position = position;
            self.moves += 1;
        }
    }
}
