#![forbid(unsafe_code)]

//! Commands accepted by the motion controller.

use perch_core::{CancelReason, FlingPreset, Rect};

/// One unit of work for [`MotionController::handle`](crate::MotionController::handle).
///
/// Pointer commands and timer ticks share a single FIFO queue so they are
/// applied in arrival order on the owning thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCommand {
    BeginDrag,
    /// Pointer position in screen space.
    DragTo { x: f64, y: f64 },
    EndDrag,
    /// Window-local character bounds from the renderer.
    SetVisibleBounds { rect: Rect, timestamp_ms: u64 },
    SetPreset(FlingPreset),
    CancelFling(CancelReason),
    Tick,
    Shutdown,
}

impl MotionCommand {
    /// Stable name used for span fields and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BeginDrag => "begin_drag",
            Self::DragTo { .. } => "drag_to",
            Self::EndDrag => "end_drag",
            Self::SetVisibleBounds { .. } => "set_visible_bounds",
            Self::SetPreset(_) => "set_preset",
            Self::CancelFling(_) => "cancel_fling",
            Self::Tick => "tick",
            Self::Shutdown => "shutdown",
        }
    }
}
