#![forbid(unsafe_code)]

//! Motion orchestration: drag, release, fling.
//!
//! [`MotionController`] owns every piece of motion state and is driven by
//! discrete commands plus a fixed-rate tick. It is single-threaded by
//! construction; [`MotionRuntime`](crate::MotionRuntime) serializes commands
//! from other threads through a channel.
//!
//! # Lifecycle
//!
//! ```text
//!            begin_drag              end_drag (fling starts)
//!   Idle ─────────────────▶ Dragging ──────────────────────▶ Flinging
//!    ▲                        │  ▲                              │
//!    │  end_drag (skipped)    │  │ begin_drag (cancels fling)   │
//!    └────────────────────────┘  └──────────────────────────────┤
//!    ▲                                                          │
//!    └──────────── settled / cancelled / shutdown ──────────────┘
//! ```
//!
//! While dragging, targets are clamped with hysteresis against the display
//! under the pointer. While flinging, each tick integrates one step and
//! hard-clamps against the display under the character's center. If the
//! window surface is gone every command does nothing except drop in-flight
//! motion.

use std::ops::ControlFlow;

use perch_core::{
    AxisLatch, Axes, CancelReason, ClampRange, DisplayDecision, DisplayId, DisplayResolver,
    FlingPreset, FlingSimulator, FlingStart, FlingState, HitBoundsTracker, HysteresisClamp,
    InputError, MotionClock, Point, PositionSampleBuffer, Rect, SkipReason, SystemClock, Velocity,
    compute_range,
};

use crate::command::MotionCommand;
use crate::config::MotionConfig;
use crate::event_sink::MotionEventSink;
use crate::observer::{MotionEvent, MotionObserver};
use crate::parse::finite_point;
use crate::snapshot::{MotionSnapshot, SnapshotGate, SnapshotSink};
use crate::surface::{DisplayTopology, WindowSurface};

/// Coarse controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    Idle,
    Dragging,
    Flinging,
}

impl MotionPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dragging => "dragging",
            Self::Flinging => "flinging",
        }
    }
}

/// Running counters, for tests and debugging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionStats {
    pub drags: u64,
    pub flings_started: u64,
    pub flings_skipped: u64,
    pub flings_stopped: u64,
    pub bounces: u64,
    pub cancels: u64,
    pub rejected_inputs: u64,
    pub snapshots_emitted: u64,
    pub snapshots_suppressed: u64,
}

/// Owns motion state for one companion window.
pub struct MotionController<W, D, C = SystemClock> {
    surface: W,
    topology: D,
    clock: C,
    config: MotionConfig,
    dragging: bool,
    shut_down: bool,
    grab_offset: Option<Point>,
    samples: PositionSampleBuffer,
    clamp: HysteresisClamp,
    resolver: DisplayResolver,
    hit_bounds: HitBoundsTracker,
    fling: FlingSimulator,
    active_display: Option<DisplayId>,
    gate: SnapshotGate,
    observers: Vec<Box<dyn MotionObserver>>,
    sinks: Vec<Box<dyn SnapshotSink>>,
    stats: MotionStats,
}

impl<W, D, C> std::fmt::Debug for MotionController<W, D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionController")
            .field("dragging", &self.dragging)
            .field("flinging", &self.fling.is_active())
            .field("preset", &self.fling.preset())
            .field("shut_down", &self.shut_down)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<W: WindowSurface, D: DisplayTopology> MotionController<W, D, SystemClock> {
    /// Controller on the wall clock.
    #[must_use]
    pub fn new(surface: W, topology: D, config: MotionConfig) -> Self {
        Self::with_clock(surface, topology, config, SystemClock::new())
    }
}

impl<W: WindowSurface, D: DisplayTopology, C: MotionClock> MotionController<W, D, C> {
    #[must_use]
    pub fn with_clock(surface: W, topology: D, config: MotionConfig, clock: C) -> Self {
        Self {
            samples: config.sample_buffer(),
            clamp: config.hysteresis_clamp(),
            hit_bounds: config.hit_bounds_tracker(),
            fling: config.fling_simulator(),
            gate: config.snapshot_gate(),
            resolver: DisplayResolver::new(),
            surface,
            topology,
            clock,
            config,
            dragging: false,
            shut_down: false,
            grab_offset: None,
            active_display: None,
            observers: Vec::new(),
            sinks: Vec::new(),
            stats: MotionStats::default(),
        }
    }

    pub fn add_observer(&mut self, observer: impl MotionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn add_snapshot_sink(&mut self, sink: impl SnapshotSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Register a JSONL sink as both observer and snapshot sink.
    pub fn attach_event_sink(&mut self, sink: MotionEventSink) {
        self.add_observer(sink.clone());
        self.add_snapshot_sink(sink);
    }

    // ── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn surface(&self) -> &W {
        &self.surface
    }

    #[inline]
    pub fn surface_mut(&mut self) -> &mut W {
        &mut self.surface
    }

    #[inline]
    #[must_use]
    pub fn topology(&self) -> &D {
        &self.topology
    }

    #[inline]
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> MotionPhase {
        if self.dragging {
            MotionPhase::Dragging
        } else if self.fling.is_active() {
            MotionPhase::Flinging
        } else {
            MotionPhase::Idle
        }
    }

    #[inline]
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    #[inline]
    #[must_use]
    pub fn is_flinging(&self) -> bool {
        self.fling.is_active()
    }

    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    #[inline]
    #[must_use]
    pub fn preset(&self) -> FlingPreset {
        self.fling.preset()
    }

    #[inline]
    #[must_use]
    pub fn fling_state(&self) -> &FlingState {
        self.fling.state()
    }

    #[inline]
    #[must_use]
    pub fn latches(&self) -> (AxisLatch, AxisLatch) {
        self.clamp.latches()
    }

    #[inline]
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    #[must_use]
    pub fn sticky_display(&self) -> Option<DisplayId> {
        self.resolver.sticky()
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> MotionStats {
        self.stats
    }

    /// Last snapshot that passed the gate.
    #[inline]
    #[must_use]
    pub fn last_published(&self) -> Option<&MotionSnapshot> {
        self.gate.last()
    }

    /// Current motion state, regardless of the gate.
    #[must_use]
    pub fn snapshot(&self) -> Option<MotionSnapshot> {
        if !self.surface.is_alive() {
            return None;
        }
        let position = self.surface.position()?;
        let velocity = if self.fling.is_active() {
            self.fling.state().velocity()
        } else if self.dragging {
            self.samples.estimate_velocity().unwrap_or(Velocity::ZERO)
        } else {
            Velocity::ZERO
        };
        Some(MotionSnapshot::new(
            self.clock.now_ms(),
            (self.dragging, self.fling.is_active()),
            position,
            velocity,
            Axes::empty(),
            None,
            self.fling.preset(),
        ))
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Apply one command. Returns `Break` once the controller has shut down.
    pub fn handle(&mut self, command: MotionCommand) -> ControlFlow<()> {
        let span = tracing::debug_span!("perch.command", kind = command.kind());
        let _guard = span.enter();
        match command {
            MotionCommand::BeginDrag => self.begin_drag(),
            MotionCommand::DragTo { x, y } => self.drag_to(x, y),
            MotionCommand::EndDrag => self.end_drag(),
            MotionCommand::SetVisibleBounds { rect, timestamp_ms } => {
                self.set_visible_bounds(rect, timestamp_ms);
            }
            MotionCommand::SetPreset(preset) => self.set_preset(preset),
            MotionCommand::CancelFling(reason) => {
                self.cancel_fling(reason);
            }
            MotionCommand::Tick => self.tick(),
            MotionCommand::Shutdown => self.shutdown(),
        }
        if self.shut_down {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Start a drag from the window's current position.
    ///
    /// Cancels any fling, clears samples and latches, and records the current
    /// position as the first sample.
    pub fn begin_drag(&mut self) {
        let Some(position) = self.live_position() else {
            return;
        };
        let now = self.clock.now_ms();
        let cancelled_fling = self.cancel_active(now, CancelReason::DragStarted);

        self.samples.clear();
        self.clamp.reset();
        self.grab_offset = None;
        self.dragging = true;
        self.samples.record(position.x, position.y, now);
        self.stats.drags += 1;

        tracing::debug!(
            x = position.x,
            y = position.y,
            cancelled_fling,
            "drag started"
        );
        self.notify(
            now,
            MotionEvent::DragStarted {
                position,
                cancelled_fling,
            },
        );
        self.publish(MotionSnapshot::new(
            now,
            (true, false),
            position,
            Velocity::ZERO,
            Axes::empty(),
            None,
            self.fling.preset(),
        ));
    }

    /// Move the window to follow the pointer (screen space).
    ///
    /// The first call after [`begin_drag`](Self::begin_drag) records the grab
    /// offset between pointer and window. Ignored unless dragging.
    pub fn drag_to(&mut self, pointer_x: f64, pointer_y: f64) {
        if !self.dragging || self.shut_down {
            return;
        }
        let pointer = match finite_point("pointer", pointer_x, pointer_y) {
            Ok(p) => p,
            Err(err) => {
                self.reject("drag_to", err);
                return;
            }
        };
        let Some(current) = self.live_position() else {
            return;
        };
        let now = self.clock.now_ms();
        let offset = *self.grab_offset.get_or_insert(pointer - current);
        let target = pointer - offset;

        let position = match self.range_for_drag(pointer, now) {
            Some(range) => self.clamp.apply(target, &range),
            None => target,
        };
        if position != current {
            self.surface.set_position(position);
        }
        self.samples.record(position.x, position.y, now);

        let velocity = self.samples.estimate_velocity().unwrap_or(Velocity::ZERO);
        tracing::trace!(
            target_x = target.x,
            target_y = target.y,
            x = position.x,
            y = position.y,
            "drag sample"
        );
        self.publish(MotionSnapshot::new(
            now,
            (true, false),
            position,
            velocity,
            Axes::empty(),
            None,
            self.fling.preset(),
        ));
    }

    /// Release the drag and try to start a fling.
    ///
    /// Samples, latches and the sticky display are cleared whether or not a
    /// fling starts. When none starts an at-rest snapshot is published.
    pub fn end_drag(&mut self) {
        if !self.dragging || self.shut_down {
            return;
        }
        let Some(position) = self.live_position() else {
            return;
        };
        let now = self.clock.now_ms();
        self.dragging = false;

        let estimate = self.samples.estimate_velocity_at(now);
        self.notify(
            now,
            MotionEvent::DragEnded {
                position,
                velocity: estimate,
            },
        );
        let outcome = match estimate {
            Some(velocity) => self.fling.start(position, velocity, now),
            None => FlingStart::Skipped(SkipReason::InsufficientSamples),
        };

        self.samples.clear();
        self.clamp.reset();
        self.resolver.clear_sticky();
        self.grab_offset = None;

        match outcome {
            FlingStart::Started { velocity, capped } => {
                self.stats.flings_started += 1;
                self.notify(now, MotionEvent::FlingStarted { velocity, capped });
                self.publish(MotionSnapshot::new(
                    now,
                    (false, true),
                    position,
                    velocity,
                    Axes::empty(),
                    None,
                    self.fling.preset(),
                ));
            }
            FlingStart::Skipped(reason) => {
                self.stats.flings_skipped += 1;
                tracing::debug!(reason = reason.as_str(), "{reason}");
                self.notify(now, MotionEvent::FlingSkipped { reason });
                self.publish(MotionSnapshot::at_rest(now, position, self.fling.preset()));
            }
        }
    }

    /// Advance an active fling by one step. No-op while dragging or idle.
    pub fn tick(&mut self) {
        if self.dragging || !self.fling.is_active() {
            return;
        }
        if self.live_position().is_none() {
            return;
        }
        let now = self.clock.now_ms();
        let hit = self.hit_box(now, true);
        let use_work_area = self.config.use_work_area;
        let topology = &self.topology;
        let resolver = &mut self.resolver;
        let mut decision = None;
        let report = self.fling.step(now, |p| {
            let hit = hit?;
            let (range, d) = resolve_range(topology, resolver, use_work_area, hit, p + hit.center())?;
            decision = Some(d);
            Some(range)
        });
        if let Some(d) = decision {
            self.note_display(now, d);
        }
        let Some(report) = report else {
            return;
        };

        self.surface.set_position(report.position);
        if !report.collided.is_empty() {
            self.stats.bounces += 1;
            let strength = report.impact.unwrap_or(0.0);
            tracing::trace!(
                axis_x = report.collided.contains(Axes::X),
                axis_y = report.collided.contains(Axes::Y),
                strength,
                "fling bounce"
            );
            self.notify(
                now,
                MotionEvent::Bounce {
                    axes: report.collided,
                    strength,
                    position: report.position,
                },
            );
        }
        if let Some(reason) = report.stopped {
            self.stats.flings_stopped += 1;
            self.notify(
                now,
                MotionEvent::FlingStopped {
                    reason,
                    position: report.position,
                },
            );
        }
        self.publish(MotionSnapshot::new(
            now,
            (false, self.fling.is_active()),
            report.position,
            report.velocity,
            report.collided,
            report.impact,
            self.fling.preset(),
        ));
    }

    /// Store renderer-reported hit-bounds (window-local).
    ///
    /// `timestamp_ms` must come from the same time base as the controller's
    /// clock. Non-finite or non-positive rectangles, and bounds reported while
    /// the window size is unknown, are rejected.
    pub fn set_visible_bounds(&mut self, rect: Rect, timestamp_ms: u64) {
        if self.live_position().is_none() {
            return;
        }
        let size = self.surface.size();
        if let Err(err) = self.hit_bounds.update(rect, timestamp_ms, size) {
            self.reject("set_visible_bounds", err);
        }
    }

    /// Switch fling physics. Switching to `off` cancels an active fling.
    pub fn set_preset(&mut self, preset: FlingPreset) {
        if self.live_position().is_none() {
            return;
        }
        let from = self.fling.preset();
        if from == preset {
            return;
        }
        let now = self.clock.now_ms();
        let cancelled = self.fling.set_preset(preset);
        self.config.preset = preset;
        tracing::debug!(from = from.name(), to = preset.name(), "fling preset changed");
        self.notify(now, MotionEvent::PresetChanged { from, to: preset });
        if cancelled {
            self.stats.cancels += 1;
            self.notify(
                now,
                MotionEvent::FlingCancelled {
                    reason: CancelReason::Disabled,
                },
            );
            self.publish_at_rest(now);
        }
    }

    /// Stop an active fling immediately and publish a zero-velocity snapshot.
    ///
    /// Returns `true` if a fling was active. No-op once the surface is gone.
    pub fn cancel_fling(&mut self, reason: CancelReason) -> bool {
        if self.live_position().is_none() {
            return false;
        }
        let now = self.clock.now_ms();
        if !self.cancel_active(now, reason) {
            return false;
        }
        self.publish_at_rest(now);
        true
    }

    /// Cancel any fling and ignore all further commands.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        let was_dragging = std::mem::replace(&mut self.dragging, false);
        if !self.cancel_fling(CancelReason::Shutdown) && was_dragging {
            let now = self.clock.now_ms();
            self.publish_at_rest(now);
        }
        self.samples.clear();
        self.clamp.reset();
        self.resolver.clear_sticky();
        self.grab_offset = None;
        self.shut_down = true;
        tracing::debug!(stats = ?self.stats, "motion controller shut down");
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Window position, or `None` when commands must be ignored.
    fn live_position(&mut self) -> Option<Point> {
        if self.shut_down {
            return None;
        }
        if !self.surface.is_alive() {
            self.surface_lost();
            return None;
        }
        self.surface.position().filter(Point::is_finite)
    }

    fn surface_lost(&mut self) {
        let now = self.clock.now_ms();
        let cancelled = self.cancel_active(now, CancelReason::SurfaceLost);
        if cancelled || self.dragging {
            tracing::debug!("window surface gone; motion dropped");
        }
        self.dragging = false;
        self.grab_offset = None;
        self.samples.clear();
        self.clamp.reset();
    }

    fn cancel_active(&mut self, now: u64, reason: CancelReason) -> bool {
        if !self.fling.cancel(reason) {
            return false;
        }
        self.stats.cancels += 1;
        self.notify(now, MotionEvent::FlingCancelled { reason });
        true
    }

    fn hit_box(&self, now: u64, moving: bool) -> Option<Rect> {
        let size = self.surface.size().filter(|s| s.is_usable())?;
        Some(self.hit_bounds.effective(now, moving, size))
    }

    fn range_for_drag(&mut self, pointer: Point, now: u64) -> Option<ClampRange> {
        let hit = self.hit_box(now, true)?;
        let (range, decision) = resolve_range(
            &self.topology,
            &mut self.resolver,
            self.config.use_work_area,
            hit,
            pointer,
        )?;
        self.note_display(now, decision);
        Some(range)
    }

    fn note_display(&mut self, now: u64, decision: DisplayDecision) {
        let id = decision.display_id();
        if self.active_display == Some(id) {
            return;
        }
        self.active_display = Some(id);
        tracing::debug!(
            display = %id,
            source = decision.source.as_str(),
            "active display changed"
        );
        self.notify(
            now,
            MotionEvent::DisplayChanged {
                display: id,
                source: decision.source,
            },
        );
    }

    fn reject(&mut self, command: &'static str, error: InputError) {
        self.stats.rejected_inputs += 1;
        tracing::debug!(command, error = %error, "input rejected");
        let now = self.clock.now_ms();
        self.notify(now, MotionEvent::InputRejected { command, error });
    }

    fn notify(&mut self, now: u64, event: MotionEvent) {
        for observer in &mut self.observers {
            observer.on_event(now, &event);
        }
    }

    fn publish_at_rest(&mut self, now: u64) {
        if let Some(position) = self.surface.position() {
            let snapshot = MotionSnapshot::new(
                now,
                (self.dragging, false),
                position,
                Velocity::ZERO,
                Axes::empty(),
                None,
                self.fling.preset(),
            );
            self.publish(snapshot);
        }
    }

    fn publish(&mut self, snapshot: MotionSnapshot) {
        if !self.gate.admit(&snapshot) {
            self.stats.snapshots_suppressed += 1;
            return;
        }
        self.stats.snapshots_emitted += 1;
        for sink in &mut self.sinks {
            sink.publish(&snapshot);
        }
    }
}

/// Range for the display under `probe`, with the decision that produced it.
fn resolve_range<D: DisplayTopology>(
    topology: &D,
    resolver: &mut DisplayResolver,
    use_work_area: bool,
    hit: Rect,
    probe: Point,
) -> Option<(ClampRange, DisplayDecision)> {
    let displays = topology.displays();
    let decision = resolver.resolve(&displays, probe)?;
    let area = decision.display.clamp_area(use_work_area);
    Some((compute_range(area, hit), decision))
}
