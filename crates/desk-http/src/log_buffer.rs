//! Bounded in-memory log buffer
//!
//! Keeps the most recent log lines so a desktop host can show request
//! diagnostics (failed calls, base URL fallbacks) in its own UI. Feed it by
//! adding [`LogBufferLayer`] to the tracing subscriber.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::error::HttpError;

/// Entries returned by [`LogBuffer::since`] when no limit is given
pub const DEFAULT_QUERY_LIMIT: usize = 500;

/// One captured log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Sequence number, starting at 1
    pub id: u64,
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Level name
    pub level: String,
    /// Event target
    pub target: String,
    /// Rendered message
    pub message: String,
}

#[derive(Debug)]
struct Inner {
    seq: u64,
    entries: VecDeque<LogEntry>,
    level: LevelFilter,
}

/// Ring buffer of log entries
#[derive(Debug)]
pub struct LogBuffer {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl LogBuffer {
    /// Create a buffer keeping at most `capacity` entries at or above `level`
    pub fn new(capacity: usize, level: LevelFilter) -> Self {
        Self {
            inner: Mutex::new(Inner {
                seq: 0,
                entries: VecDeque::with_capacity(capacity),
                level,
            }),
            capacity,
        }
    }

    // Entries are plain data, a panic while holding the lock leaves them usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current capture level
    pub fn level(&self) -> LevelFilter {
        self.lock().level
    }

    /// Change the capture level
    pub fn set_level(&self, level: LevelFilter) {
        self.lock().level = level;
    }

    /// Change the capture level from its name
    ///
    /// Accepts `trace`, `debug`, `info`, `warn`, `error` and `off`, in any case.
    pub fn set_level_str(&self, level: &str) -> Result<(), HttpError> {
        let filter = match level.trim().to_lowercase().as_str() {
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "warn" => LevelFilter::WARN,
            "error" => LevelFilter::ERROR,
            "off" => LevelFilter::OFF,
            _ => return Err(HttpError::Other(format!("Invalid log level '{}'", level))),
        };
        self.set_level(filter);
        Ok(())
    }

    /// Record a line, evicting the oldest one when full
    pub fn push(&self, level: tracing::Level, target: &str, message: String) -> Option<u64> {
        if self.capacity == 0 {
            return None;
        }
        let mut inner = self.lock();
        if level > inner.level {
            return None;
        }

        inner.seq += 1;
        let entry = LogEntry {
            id: inner.seq,
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            target: target.to_string(),
            message,
        };
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(entry);
        Some(inner.seq)
    }

    /// Entries newer than `since_id`, oldest first, and the latest id issued
    pub fn since(&self, since_id: Option<u64>, limit: Option<usize>) -> (Vec<LogEntry>, u64) {
        let inner = self.lock();
        let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).min(self.capacity);
        let since_id = since_id.unwrap_or(0);

        let entries = inner
            .entries
            .iter()
            .filter(|e| e.id > since_id)
            .take(limit)
            .cloned()
            .collect();
        (entries, inner.seq)
    }

    /// Drop every entry; ids keep increasing
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of entries held
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the buffer holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

impl MessageVisitor {
    fn render(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

/// Tracing layer writing every event into a [`LogBuffer`]
#[derive(Debug, Clone)]
pub struct LogBufferLayer {
    buffer: Arc<LogBuffer>,
}

impl LogBufferLayer {
    /// Feed `buffer`
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for LogBufferLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.buffer.level() {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.buffer
            .push(*metadata.level(), metadata.target(), visitor.render());
    }
}
