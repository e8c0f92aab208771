//! Lifecycle observation for transaction submissions.
//!
//! Projects each lifecycle event of a submission into log records and analytics
//! events. Both outputs go to injected sinks so the process-wide logging and
//! analytics backends can be swapped for recording fakes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod observer;

pub use observer::{LifecycleObserver, ObserverFactory};

/// Sink implementations.
pub mod implementations {
	pub mod memory;
	pub mod noop;
	pub mod tracing;
}

/// Errors reported by analytics sinks.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// The backend refused or could not accept the event.
	#[error("Analytics backend error: {0}")]
	Backend(String),
}

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
	Debug,
	Error,
}

/// One log line produced while observing a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
	pub level: LogLevel,
	/// Subsystem label supplied with the intent.
	pub tag: String,
	/// Correlation identifier of the submission.
	pub tx_id: String,
	pub message: String,
}

/// Names of the analytics events emitted for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalyticsEventName {
	/// Submission started.
	TransactionSendStart,
	/// Gas was estimated.
	TransactionSendGasEstimated,
	/// A receipt arrived.
	TransactionSendReceipt,
}

impl AnalyticsEventName {
	pub fn as_str(&self) -> &'static str {
		match self {
			AnalyticsEventName::TransactionSendStart => "transaction_send_start",
			AnalyticsEventName::TransactionSendGasEstimated => "transaction_send_gas_estimated",
			AnalyticsEventName::TransactionSendReceipt => "transaction_send_gas_receipt",
		}
	}
}

impl fmt::Display for AnalyticsEventName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// An analytics record keyed by the submission's correlation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
	pub name: AnalyticsEventName,
	pub tx_id: String,
}

/// Destination for log records.
///
/// Implementations must not panic; the observer calls them on the submission path.
pub trait LogSink: Send + Sync {
	fn record(&self, record: LogRecord);
}

/// Destination for analytics events.
pub trait AnalyticsSink: Send + Sync {
	/// Records one event. Errors are reported by the caller and otherwise ignored.
	fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError>;
}
