#![forbid(unsafe_code)]

//! JSONL sink for motion events and snapshots.
//!
//! One line per diagnostic event or published snapshot, written to stdout or
//! appended to a file. Writes are serialized behind a mutex so line order
//! matches call order, and clones share the same writer. Write failures are
//! logged and otherwise ignored; the sink never affects motion.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::observer::{MotionEvent, MotionObserver};
use crate::snapshot::{MotionSnapshot, SnapshotSink};

/// Schema tag carried by every line.
pub const MOTION_SCHEMA_VERSION: &str = "perch-motion-v1";

/// Where lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSinkDestination {
    Stdout,
    /// Append to a file at the given path.
    File(PathBuf),
}

impl EventSinkDestination {
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSinkConfig {
    pub enabled: bool,
    pub destination: EventSinkDestination,
    /// Flush after every line.
    pub flush_on_write: bool,
    /// Also record published snapshots, not only events.
    pub include_snapshots: bool,
}

impl Default for EventSinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            destination: EventSinkDestination::Stdout,
            flush_on_write: true,
            include_snapshots: true,
        }
    }
}

impl EventSinkConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn enabled_stdout() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn enabled_file(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            destination: EventSinkDestination::file(path),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_flush_on_write(mut self, enabled: bool) -> Self {
        self.flush_on_write = enabled;
        self
    }

    #[must_use]
    pub fn with_snapshots(mut self, enabled: bool) -> Self {
        self.include_snapshots = enabled;
        self
    }
}

struct EventSinkInner {
    writer: BufWriter<Box<dyn Write + Send>>,
    flush_on_write: bool,
    lines: u64,
}

/// Shared JSONL writer.
#[derive(Clone)]
pub struct MotionEventSink {
    inner: Arc<Mutex<EventSinkInner>>,
    include_snapshots: bool,
}

impl std::fmt::Debug for MotionEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionEventSink")
            .field("include_snapshots", &self.include_snapshots)
            .finish()
    }
}

impl MotionEventSink {
    /// Build a sink from config. Returns `Ok(None)` when disabled.
    pub fn from_config(config: &EventSinkConfig) -> io::Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let writer: Box<dyn Write + Send> = match &config.destination {
            EventSinkDestination::Stdout => Box::new(io::stdout()),
            EventSinkDestination::File(path) => {
                Box::new(OpenOptions::new().create(true).append(true).open(path)?)
            }
        };
        Ok(Some(Self::from_writer(
            writer,
            config.flush_on_write,
            config.include_snapshots,
        )))
    }

    /// Wrap an arbitrary writer.
    #[must_use]
    pub fn from_writer(
        writer: Box<dyn Write + Send>,
        flush_on_write: bool,
        include_snapshots: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EventSinkInner {
                writer: BufWriter::new(writer),
                flush_on_write,
                lines: 0,
            })),
            include_snapshots,
        }
    }

    /// Write one line followed by a newline.
    pub fn write_jsonl(&self, line: &str) -> io::Result<()> {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.writer.write_all(line.as_bytes())?;
        inner.writer.write_all(b"\n")?;
        if inner.flush_on_write {
            inner.writer.flush()?;
        }
        inner.lines += 1;
        Ok(())
    }

    pub fn flush(&self) -> io::Result<()> {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.writer.flush()
    }

    /// Lines successfully written so far.
    #[must_use]
    pub fn lines_written(&self) -> u64 {
        match self.inner.lock() {
            Ok(guard) => guard.lines,
            Err(poisoned) => poisoned.into_inner().lines,
        }
    }

    fn write_value(&self, value: &Value) {
        if let Err(err) = self.write_jsonl(&value.to_string()) {
            tracing::warn!(error = %err, "motion event sink write failed");
        }
    }
}

/// Envelope for a diagnostic event line.
#[must_use]
pub fn event_line(timestamp_ms: u64, event: &MotionEvent) -> Value {
    json!({
        "schema": MOTION_SCHEMA_VERSION,
        "type": "event",
        "ts_ms": timestamp_ms,
        "kind": event.kind(),
        "data": event.payload(),
    })
}

/// Envelope for a snapshot line.
#[must_use]
pub fn snapshot_line(snapshot: &MotionSnapshot) -> Value {
    json!({
        "schema": MOTION_SCHEMA_VERSION,
        "type": "snapshot",
        "ts_ms": snapshot.timestamp_ms,
        "data": snapshot,
    })
}

impl MotionObserver for MotionEventSink {
    fn on_event(&mut self, timestamp_ms: u64, event: &MotionEvent) {
        self.write_value(&event_line(timestamp_ms, event));
    }
}

impl SnapshotSink for MotionEventSink {
    fn publish(&mut self, snapshot: &MotionSnapshot) {
        if self.include_snapshots {
            self.write_value(&snapshot_line(snapshot));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::{CancelReason, FlingPreset, Point};

    #[test]
    fn schema_version_stable() {
        assert_eq!(MOTION_SCHEMA_VERSION, "perch-motion-v1");
    }

    #[test]
    fn config_default_is_disabled() {
        let config = EventSinkConfig::default();
        assert!(!config.enabled);
        assert!(config.flush_on_write);
        assert_eq!(config.destination, EventSinkDestination::Stdout);
        assert!(MotionEventSink::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn file_sink_appends_lines() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let config = EventSinkConfig::enabled_file(tmp.path());
        let mut sink = MotionEventSink::from_config(&config).unwrap().unwrap();
        sink.on_event(
            7,
            &MotionEvent::FlingCancelled {
                reason: CancelReason::Requested,
            },
        );
        sink.publish(&MotionSnapshot::at_rest(
            8,
            Point::new(1.0, 2.0),
            FlingPreset::Heavy,
        ));
        assert_eq!(sink.lines_written(), 2);

        let text = std::fs::read_to_string(tmp.path()).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "fling_cancelled");
        assert_eq!(lines[0]["data"]["reason"], "requested");
        assert_eq!(lines[1]["type"], "snapshot");
        assert_eq!(lines[1]["data"]["preset"], "heavy");
        assert!(lines.iter().all(|l| l["schema"] == MOTION_SCHEMA_VERSION));
    }

    #[test]
    fn snapshots_can_be_excluded() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let config = EventSinkConfig::enabled_file(tmp.path()).with_snapshots(false);
        let mut sink = MotionEventSink::from_config(&config).unwrap().unwrap();
        sink.publish(&MotionSnapshot::at_rest(0, Point::default(), FlingPreset::Off));
        assert_eq!(sink.lines_written(), 0);
    }

    #[test]
    fn clones_share_writer() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let config = EventSinkConfig::enabled_file(tmp.path()).with_flush_on_write(false);
        let a = MotionEventSink::from_config(&config).unwrap().unwrap();
        let b = a.clone();
        a.write_jsonl("{\"n\":1}").unwrap();
        b.write_jsonl("{\"n\":2}").unwrap();
        a.flush().unwrap();
        let text = std::fs::read_to_string(tmp.path()).unwrap();
        assert_eq!(text, "{\"n\":1}\n{\"n\":2}\n");
        assert_eq!(b.lines_written(), 2);
    }
}
