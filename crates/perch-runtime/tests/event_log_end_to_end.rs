#![forbid(unsafe_code)]

//! A configured JSONL event log records a full drag / fling / shutdown
//! session in order.
//!
//! Run:
//!   cargo test -p perch-runtime --test event_log_end_to_end

use serde_json::Value;

use perch_core::{Display, ManualClock, MotionClock, Point, Rect, Size};
use perch_runtime::{
    EventsConfig, HeadlessSurface, MOTION_SCHEMA_VERSION, MotionCommand, MotionConfig,
    MotionController, MotionEventSink,
};

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .expect("read log")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect()
}

fn event_kinds(lines: &[Value]) -> Vec<String> {
    lines
        .iter()
        .filter(|l| l["type"] == "event")
        .map(|l| l["kind"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn session(config: MotionConfig) -> (MotionEventSink, u64) {
    let area = Rect::new(0.0, 0.0, 800.0, 600.0);
    let clock = ManualClock::new(5_000);
    let mut c = MotionController::with_clock(
        HeadlessSurface::new(Point::new(100.0, 100.0), Size::new(100.0, 100.0)),
        vec![Display::new(1, area, area)],
        config.clone(),
        clock.clone(),
    );
    let sink = MotionEventSink::from_config(&config.to_event_sink_config())
        .expect("open sink")
        .expect("sink enabled");
    c.attach_event_sink(sink.clone());

    c.handle(MotionCommand::BeginDrag);
    c.handle(MotionCommand::DragTo { x: 150.0, y: 150.0 });
    clock.advance(10);
    c.handle(MotionCommand::DragTo { x: 190.0, y: 150.0 });
    c.handle(MotionCommand::EndDrag);
    let mut ticks = 0;
    while c.is_flinging() && ticks < 1_000 {
        clock.advance(8);
        c.handle(MotionCommand::Tick);
        ticks += 1;
    }
    assert!(!c.is_flinging(), "fling did not settle");
    c.handle(MotionCommand::Shutdown);
    sink.flush().expect("flush");
    (sink, clock.now_ms())
}

#[test]
fn session_is_logged_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("motion.jsonl");
    let config = MotionConfig {
        events: EventsConfig {
            enabled: true,
            file: Some(path.to_string_lossy().into_owned()),
            ..EventsConfig::default()
        },
        ..MotionConfig::default()
    };

    let (sink, end_ms) = session(config);
    let lines = read_lines(&path);
    assert_eq!(lines.len() as u64, sink.lines_written());
    assert!(lines.iter().all(|l| l["schema"] == MOTION_SCHEMA_VERSION));

    let kinds = event_kinds(&lines);
    assert_eq!(kinds.first().map(String::as_str), Some("drag_started"));
    assert_eq!(kinds.last().map(String::as_str), Some("fling_stopped"));
    for expected in ["display_changed", "drag_ended", "fling_started", "bounce"] {
        assert!(kinds.iter().any(|k| k == expected), "missing {expected}");
    }

    // Timestamps never go backwards.
    let stamps: Vec<u64> = lines
        .iter()
        .map(|l| l["ts_ms"].as_u64().expect("ts_ms"))
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    assert!(stamps.iter().all(|&t| (5_000..=end_ms).contains(&t)));

    // Snapshots use the renderer-facing field names.
    let first_snapshot = lines
        .iter()
        .find(|l| l["type"] == "snapshot")
        .expect("snapshot line");
    assert_eq!(first_snapshot["data"]["dragging"], true);
    assert_eq!(first_snapshot["data"]["preset"], "default");
    assert!(first_snapshot["data"]["timestampMs"].is_u64());

    let last_snapshot = lines
        .iter()
        .rev()
        .find(|l| l["type"] == "snapshot")
        .expect("snapshot line");
    assert_eq!(last_snapshot["data"]["flinging"], false);
    assert_eq!(last_snapshot["data"]["velocity"]["speed"], 0.0);
}

#[test]
fn snapshots_can_be_left_out() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events-only.jsonl");
    let config = MotionConfig {
        events: EventsConfig {
            enabled: true,
            file: Some(path.to_string_lossy().into_owned()),
            include_snapshots: false,
            ..EventsConfig::default()
        },
        ..MotionConfig::default()
    };

    session(config);
    let lines = read_lines(&path);
    assert!(!lines.is_empty());
    assert!(lines.iter().all(|l| l["type"] == "event"));
}

#[test]
fn disabled_log_opens_nothing() {
    let config = MotionConfig::default();
    assert!(
        MotionEventSink::from_config(&config.to_event_sink_config())
            .expect("config")
            .is_none()
    );
}
