//! In-memory sink implementation.
//!
//! Records every log record and analytics event it receives, in order. Useful for
//! tests and for embedding applications that want to inspect a submission's trace.

use crate::{AnalyticsError, AnalyticsEvent, AnalyticsSink, LogRecord, LogSink};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Recording sink for both log records and analytics events.
#[derive(Debug, Default)]
pub struct MemorySink {
	logs: Mutex<Vec<LogRecord>>,
	events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemorySink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a copy of the recorded log records.
	pub fn logs(&self) -> Vec<LogRecord> {
		lock(&self.logs).clone()
	}

	/// Returns a copy of the recorded analytics events.
	pub fn events(&self) -> Vec<AnalyticsEvent> {
		lock(&self.events).clone()
	}

	/// Returns the log records recorded for one correlation identifier.
	pub fn logs_for(&self, tx_id: &str) -> Vec<LogRecord> {
		lock(&self.logs)
			.iter()
			.filter(|record| record.tx_id == tx_id)
			.cloned()
			.collect()
	}

	/// Returns the analytics events recorded for one correlation identifier.
	pub fn events_for(&self, tx_id: &str) -> Vec<AnalyticsEvent> {
		lock(&self.events)
			.iter()
			.filter(|event| event.tx_id == tx_id)
			.cloned()
			.collect()
	}
}

// A panicking sink user must not make the sink unusable for everyone else.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LogSink for MemorySink {
	fn record(&self, record: LogRecord) {
		lock(&self.logs).push(record);
	}
}

impl AnalyticsSink for MemorySink {
	fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
		lock(&self.events).push(event);
		Ok(())
	}
}
