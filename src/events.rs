//! Append-only match event log with bounded retention.
//!
//! Each [`Event`] carries a machine timestamp (Unix milliseconds), a human-readable
//! UTC time, and the message. [`EventLog`] drops the oldest entries first once it
//! grows past its capacity. Every appended event is mirrored to the `log` facade.

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use std::collections::VecDeque;

/// Default number of retained events.
pub const DEFAULT_EVENT_CAPACITY: usize = 2000;

/// Single immutable log record.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Event {
    /// Unix milliseconds.
    pub timestamp: i64,
    /// RFC 3339 UTC, second precision.
    pub time: String,
    pub message: String,
}

impl Event {
    pub fn now(message: impl Into<String>) -> Self {
        Self::at(Utc::now(), message)
    }

    pub fn at(when: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp: when.timestamp_millis(),
            time: when.to_rfc3339_opts(SecondsFormat::Secs, true),
            message: message.into(),
        }
    }
}

/// FIFO-bounded event log. Oldest first.
#[derive(Clone, Debug)]
pub struct EventLog {
    entries: VecDeque<Event>,
    capacity: usize,
}

impl EventLog {
    /// Capacity below 1 is raised to 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_CAPACITY)),
            capacity,
        }
    }

    pub fn push(&mut self, event: Event) {
        info!("match_event message={:?}", event.message);
        self.entries.push_back(event);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Appends a message stamped with the current time.
    pub fn record(&mut self, message: impl Into<String>) {
        self.push(Event::now(message));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter()
    }

    /// Snapshot of the retained log, oldest first.
    pub fn to_vec(&self) -> Vec<Event> {
        self.entries.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&Event> {
        self.entries.back()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_at_formats_both_timestamps() {
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let event = Event::at(when, "hello");
        assert_eq!(event.timestamp, when.timestamp_millis());
        assert_eq!(event.time, "2024-03-01T12:30:05Z");
        assert_eq!(event.message, "hello");
    }

    #[test]
    fn log_evicts_oldest_first_and_keeps_order() {
        let mut log = EventLog::with_capacity(3);
        for i in 0..5 {
            log.record(format!("e{}", i));
        }
        assert_eq!(log.len(), 3);
        let messages: Vec<String> = log.iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages, vec!["e2", "e3", "e4"]);
    }

    #[test]
    fn default_log_never_exceeds_2000() {
        let mut log = EventLog::default();
        for i in 0..(DEFAULT_EVENT_CAPACITY + 25) {
            log.record(format!("e{}", i));
        }
        assert_eq!(log.len(), DEFAULT_EVENT_CAPACITY);
        assert_eq!(log.iter().next().map(|e| e.message.as_str()), Some("e25"));
        assert_eq!(log.last().map(|e| e.message.as_str()), Some("e2024"));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut log = EventLog::with_capacity(0);
        log.record("a");
        log.record("b");
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.to_vec()[0].message, "b");
    }
}
