#![forbid(unsafe_code)]

//! Every command runs inside a `perch.command` span tagged with its kind, and
//! the controller's diagnostic events are emitted inside that span.
//!
//! Run:
//!   cargo test -p perch-runtime --test tracing_command_spans

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

use perch_core::{Display, FlingPreset, ManualClock, Point, Rect, Size};
use perch_runtime::{HeadlessSurface, MotionCommand, MotionConfig, MotionController};

// ============================================================================
// Capture layer
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    message: String,
    fields: HashMap<String, String>,
    parent_span: Option<String>,
    parent_kind: Option<String>,
}

#[derive(Default, Clone)]
struct Captured {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    kinds: Arc<Mutex<HashMap<u64, String>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for Captured
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        if let Some(kind) = fields.get("kind") {
            self.kinds
                .lock()
                .unwrap()
                .insert(id.into_u64(), kind.clone());
        }
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields,
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned().unwrap_or_default();
        let parent = ctx.current_span().id().and_then(|id| ctx.span(id));
        let parent_kind = parent
            .as_ref()
            .and_then(|span| self.kinds.lock().unwrap().get(&span.id().into_u64()).cloned());
        self.events.lock().unwrap().push(CapturedEvent {
            message,
            fields,
            parent_span: parent.map(|span| span.name().to_string()),
            parent_kind,
        });
    }
}

fn with_capture(f: impl FnOnce()) -> Captured {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(captured.clone());
    tracing::subscriber::with_default(subscriber, f);
    captured
}

fn controller() -> (
    MotionController<HeadlessSurface, Vec<Display>, ManualClock>,
    ManualClock,
) {
    let clock = ManualClock::new(0);
    let area = Rect::new(0.0, 0.0, 800.0, 600.0);
    let c = MotionController::with_clock(
        HeadlessSurface::new(Point::new(100.0, 100.0), Size::new(100.0, 100.0)),
        vec![Display::new(1, area, area)],
        MotionConfig::default(),
        clock.clone(),
    );
    (c, clock)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn each_command_gets_a_kind_tagged_span() {
    let captured = with_capture(|| {
        let (mut c, clock) = controller();
        c.handle(MotionCommand::BeginDrag);
        c.handle(MotionCommand::DragTo { x: 150.0, y: 150.0 });
        clock.advance(10);
        c.handle(MotionCommand::DragTo { x: 190.0, y: 150.0 });
        c.handle(MotionCommand::EndDrag);
        clock.advance(8);
        c.handle(MotionCommand::Tick);
    });

    let spans = captured.spans.lock().unwrap().clone();
    let kinds: Vec<_> = spans
        .iter()
        .filter(|s| s.name == "perch.command")
        .map(|s| s.fields.get("kind").cloned().unwrap_or_default())
        .collect();
    assert_eq!(
        kinds,
        ["begin_drag", "drag_to", "drag_to", "end_drag", "tick"]
    );
}

#[test]
fn lifecycle_events_nest_under_their_command() {
    let captured = with_capture(|| {
        let (mut c, clock) = controller();
        c.handle(MotionCommand::BeginDrag);
        c.handle(MotionCommand::DragTo { x: 150.0, y: 150.0 });
        clock.advance(10);
        c.handle(MotionCommand::DragTo { x: 190.0, y: 150.0 });
        c.handle(MotionCommand::EndDrag);
        c.handle(MotionCommand::SetPreset(FlingPreset::Off));
    });

    let events = captured.events.lock().unwrap().clone();
    let find = |message: &str| {
        events
            .iter()
            .find(|e| e.message == message)
            .unwrap_or_else(|| panic!("missing event {message:?}: {events:#?}"))
            .clone()
    };

    let started = find("drag started");
    assert_eq!(started.parent_span.as_deref(), Some("perch.command"));
    assert_eq!(started.parent_kind.as_deref(), Some("begin_drag"));
    assert_eq!(started.fields.get("cancelled_fling").map(String::as_str), Some("false"));

    let fling = find("fling started");
    assert_eq!(fling.parent_kind.as_deref(), Some("end_drag"));
    assert_eq!(fling.fields.get("capped").map(String::as_str), Some("true"));

    let switched = find("fling preset changed");
    assert_eq!(switched.parent_kind.as_deref(), Some("set_preset"));
    assert_eq!(switched.fields.get("to").map(String::as_str), Some("off"));

    let cancelled = find("fling cancelled");
    assert_eq!(cancelled.parent_kind.as_deref(), Some("set_preset"));
}

#[test]
fn rejected_input_is_logged() {
    let captured = with_capture(|| {
        let (mut c, _) = controller();
        c.handle(MotionCommand::SetVisibleBounds {
            rect: Rect::new(0.0, 0.0, 0.0, 10.0),
            timestamp_ms: 0,
        });
    });
    let events = captured.events.lock().unwrap().clone();
    let rejected = events
        .iter()
        .find(|e| e.message == "input rejected")
        .expect("input rejected event");
    assert_eq!(
        rejected.fields.get("command").map(String::as_str),
        Some("set_visible_bounds")
    );
    assert_eq!(rejected.parent_kind.as_deref(), Some("set_visible_bounds"));
}
