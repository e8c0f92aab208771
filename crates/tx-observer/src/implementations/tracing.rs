//! Tracing-backed sinks.
//!
//! These are the default sinks. Log records become `tracing` events at the
//! matching level with `tag` and `tx_id` fields; analytics events are emitted at
//! info level on the `analytics` target so a subscriber can route them separately.

use crate::{AnalyticsError, AnalyticsEvent, AnalyticsSink, LogLevel, LogRecord, LogSink};

/// Writes log records through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
	fn record(&self, record: LogRecord) {
		match record.level {
			LogLevel::Debug => {
				tracing::debug!(tag = %record.tag, tx_id = %record.tx_id, "{}", record.message)
			},
			LogLevel::Error => {
				tracing::error!(tag = %record.tag, tx_id = %record.tx_id, "{}", record.message)
			},
		}
	}
}

/// Writes analytics events through `tracing` on the `analytics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalyticsSink;

impl AnalyticsSink for TracingAnalyticsSink {
	fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
		tracing::info!(
			target: "analytics",
			event = event.name.as_str(),
			tx_id = %event.tx_id,
			"Tracked event"
		);
		Ok(())
	}
}
