//! Projection of lifecycle events into log records and analytics events.

use crate::implementations::noop::NoopAnalyticsSink;
use crate::implementations::tracing::{TracingAnalyticsSink, TracingLogSink};
use crate::{AnalyticsEvent, AnalyticsEventName, AnalyticsSink, LogLevel, LogRecord, LogSink};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tx_types::{truncate_id, LifecycleEvent, TransactionReceipt};

/// Builds observers that share one pair of sinks.
#[derive(Clone)]
pub struct ObserverFactory {
	logs: Arc<dyn LogSink>,
	analytics: Arc<dyn AnalyticsSink>,
}

impl ObserverFactory {
	pub fn new(logs: Arc<dyn LogSink>, analytics: Arc<dyn AnalyticsSink>) -> Self {
		Self { logs, analytics }
	}

	/// Factory writing through `tracing`, with analytics switched on or off.
	pub fn tracing(analytics_enabled: bool) -> Self {
		let analytics: Arc<dyn AnalyticsSink> = if analytics_enabled {
			Arc::new(TracingAnalyticsSink)
		} else {
			Arc::new(NoopAnalyticsSink)
		};
		Self::new(Arc::new(TracingLogSink), analytics)
	}

	/// Creates an observer bound to one submission.
	pub fn make_observer(&self, tag: &str, tx_id: &str) -> LifecycleObserver {
		LifecycleObserver {
			tag: tag.to_string(),
			tx_id: tx_id.to_string(),
			logs: self.logs.clone(),
			analytics: self.analytics.clone(),
		}
	}
}

impl Default for ObserverFactory {
	fn default() -> Self {
		Self::tracing(true)
	}
}

/// Observer for a single submission, bound to its tag and correlation identifier.
#[derive(Clone)]
pub struct LifecycleObserver {
	tag: String,
	tx_id: String,
	logs: Arc<dyn LogSink>,
	analytics: Arc<dyn AnalyticsSink>,
}

impl LifecycleObserver {
	pub fn tx_id(&self) -> &str {
		&self.tx_id
	}

	pub fn tag(&self) -> &str {
		&self.tag
	}

	/// Emits the log records and analytics events for one lifecycle event.
	///
	/// Never panics: a sink that panics is reported through `tracing` and the
	/// event is otherwise dropped.
	pub fn observe(&self, event: &LifecycleEvent) {
		if catch_unwind(AssertUnwindSafe(|| self.dispatch(event))).is_err() {
			tracing::error!(
				tx_id = %truncate_id(&self.tx_id),
				event = %event.kind(),
				"Lifecycle sink panicked"
			);
		}
	}

	// Every variant is matched explicitly; a new variant does not compile until it
	// is handled here.
	fn dispatch(&self, event: &LifecycleEvent) {
		let tx_id = &self.tx_id;
		match event {
			LifecycleEvent::Started => {
				self.debug(format!("Sending transaction with id {}", tx_id));
				self.track(AnalyticsEventName::TransactionSendStart);
			},
			LifecycleEvent::EstimatedGas { gas } => {
				self.debug(format!("Transaction with id {} estimated gas: {}", tx_id, gas));
				self.track(AnalyticsEventName::TransactionSendGasEstimated);
			},
			LifecycleEvent::TransactionHashReceived { hash } => {
				self.debug(format!("Transaction id {} hash received: {}", tx_id, hash));
			},
			LifecycleEvent::ReceiptReceived { receipt } => {
				self.debug(format!(
					"Transaction id {} received receipt: {}",
					tx_id,
					render_receipt(receipt)
				));
				self.track(AnalyticsEventName::TransactionSendReceipt);
			},
			LifecycleEvent::Confirmed => {
				self.debug(format!("Transaction confirmed with id: {}", tx_id));
			},
			LifecycleEvent::Failed { error } => {
				self.error(format!("Transaction failed: {}: {}", tx_id, error));
			},
			LifecycleEvent::Exception { error } => {
				self.error(format!("Transaction Exception caught {}: {}", tx_id, error));
			},
		}
	}

	fn debug(&self, message: String) {
		self.log(LogLevel::Debug, message);
	}

	fn error(&self, message: String) {
		self.log(LogLevel::Error, message);
	}

	fn log(&self, level: LogLevel, message: String) {
		self.logs.record(LogRecord {
			level,
			tag: self.tag.clone(),
			tx_id: self.tx_id.clone(),
			message,
		});
	}

	fn track(&self, name: AnalyticsEventName) {
		let event = AnalyticsEvent {
			name,
			tx_id: self.tx_id.clone(),
		};
		if let Err(e) = self.analytics.track(event) {
			tracing::warn!(
				tx_id = %truncate_id(&self.tx_id),
				event = name.as_str(),
				error = %e,
				"Failed to record analytics event"
			);
		}
	}
}

fn render_receipt(receipt: &TransactionReceipt) -> String {
	serde_json::to_string(receipt).unwrap_or_else(|_| format!("{:?}", receipt))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemorySink;
	use crate::AnalyticsError;
	use tx_types::TransactionHash;

	fn observer_with_sink(tag: &str, tx_id: &str) -> (LifecycleObserver, Arc<MemorySink>) {
		let sink = Arc::new(MemorySink::new());
		let factory = ObserverFactory::new(sink.clone(), sink.clone());
		(factory.make_observer(tag, tx_id), sink)
	}

	fn receipt() -> TransactionReceipt {
		TransactionReceipt {
			hash: TransactionHash(vec![0xab; 4]),
			block_number: 7,
			success: true,
		}
	}

	fn all_events() -> Vec<LifecycleEvent> {
		vec![
			LifecycleEvent::Started,
			LifecycleEvent::EstimatedGas { gas: 21_000 },
			LifecycleEvent::TransactionHashReceived {
				hash: TransactionHash(vec![0xab; 4]),
			},
			LifecycleEvent::ReceiptReceived { receipt: receipt() },
			LifecycleEvent::Confirmed,
			LifecycleEvent::Failed {
				error: "reverted".into(),
			},
			LifecycleEvent::Exception {
				error: "connection reset".into(),
			},
		]
	}

	#[test]
	fn test_started_logs_and_tracks() {
		let (observer, sink) = observer_with_sink("send", "tx-1");
		observer.observe(&LifecycleEvent::Started);

		let logs = sink.logs();
		assert_eq!(logs.len(), 1);
		assert_eq!(logs[0].level, LogLevel::Debug);
		assert_eq!(logs[0].tag, "send");
		assert_eq!(logs[0].message, "Sending transaction with id tx-1");
		assert_eq!(
			sink.events(),
			vec![AnalyticsEvent {
				name: AnalyticsEventName::TransactionSendStart,
				tx_id: "tx-1".into()
			}]
		);
	}

	#[test]
	fn test_every_event_kind_has_expected_side_effects() {
		// (level, message fragment, analytics event)
		let expected = [
			(LogLevel::Debug, "Sending transaction", Some(AnalyticsEventName::TransactionSendStart)),
			(LogLevel::Debug, "estimated gas: 21000", Some(AnalyticsEventName::TransactionSendGasEstimated)),
			(LogLevel::Debug, "hash received: 0xabababab", None),
			(LogLevel::Debug, "\"block_number\":7", Some(AnalyticsEventName::TransactionSendReceipt)),
			(LogLevel::Debug, "confirmed with id: tx-1", None),
			(LogLevel::Error, "reverted", None),
			(LogLevel::Error, "Exception caught tx-1: connection reset", None),
		];

		for (event, (level, fragment, analytics)) in all_events().iter().zip(expected) {
			let (observer, sink) = observer_with_sink("send", "tx-1");
			observer.observe(event);

			let logs = sink.logs();
			assert_eq!(logs.len(), 1, "{:?}", event);
			assert_eq!(logs[0].level, level, "{:?}", event);
			assert!(logs[0].message.contains(fragment), "{}", logs[0].message);

			let names: Vec<_> = sink.events().into_iter().map(|e| e.name).collect();
			assert_eq!(names, analytics.into_iter().collect::<Vec<_>>(), "{:?}", event);
		}
	}

	#[test]
	fn test_failed_and_exception_are_distinguishable() {
		let (observer, sink) = observer_with_sink("send", "tx-1");
		observer.observe(&LifecycleEvent::Failed {
			error: "boom".into(),
		});
		observer.observe(&LifecycleEvent::Exception {
			error: "boom".into(),
		});

		let logs = sink.logs();
		assert_eq!(logs.len(), 2);
		assert!(logs.iter().all(|r| r.level == LogLevel::Error));
		assert_ne!(logs[0].message, logs[1].message);
		assert!(sink.events().is_empty());
	}

	#[test]
	fn test_records_carry_bound_tx_id() {
		let sink = Arc::new(MemorySink::new());
		let factory = ObserverFactory::new(sink.clone(), sink.clone());
		let first = factory.make_observer("send", "tx-1");
		let second = factory.make_observer("send", "tx-2");

		for event in all_events() {
			first.observe(&event);
			second.observe(&event);
		}

		assert_eq!(sink.logs_for("tx-1").len(), 7);
		assert_eq!(sink.logs_for("tx-2").len(), 7);
		assert_eq!(sink.events_for("tx-1").len(), 3);
		assert_eq!(sink.events_for("tx-2").len(), 3);
		for record in sink.logs_for("tx-2") {
			assert!(!record.message.contains("tx-1"));
		}
	}

	struct FailingAnalytics;

	impl AnalyticsSink for FailingAnalytics {
		fn track(&self, _event: AnalyticsEvent) -> Result<(), AnalyticsError> {
			Err(AnalyticsError::Backend("unavailable".into()))
		}
	}

	#[test]
	fn test_analytics_failure_does_not_stop_logging() {
		let logs = Arc::new(MemorySink::new());
		let factory = ObserverFactory::new(logs.clone(), Arc::new(FailingAnalytics));
		let observer = factory.make_observer("send", "tx-1");

		observer.observe(&LifecycleEvent::Started);
		observer.observe(&LifecycleEvent::EstimatedGas { gas: 1 });

		assert_eq!(logs.logs().len(), 2);
	}

	struct PanickingLogs;

	impl LogSink for PanickingLogs {
		fn record(&self, _record: LogRecord) {
			panic!("log backend down");
		}
	}

	#[test]
	fn test_panicking_sink_is_contained() {
		let analytics = Arc::new(MemorySink::new());
		let factory = ObserverFactory::new(Arc::new(PanickingLogs), analytics.clone());
		let observer = factory.make_observer("send", "tx-1");

		observer.observe(&LifecycleEvent::Started);
		observer.observe(&LifecycleEvent::Confirmed);

		assert!(analytics.events().is_empty());
	}

	#[test]
	fn test_disabled_analytics_factory() {
		let factory = ObserverFactory::tracing(false);
		let observer = factory.make_observer("send", "tx-9");
		assert_eq!(observer.tx_id(), "tx-9");
		assert_eq!(observer.tag(), "send");
		observer.observe(&LifecycleEvent::Started);
	}
}
