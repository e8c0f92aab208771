//! Producer side of a submission's lifecycle.
//!
//! The tracker forwards each event to the submission's listener at most once and
//! in lifecycle order, and settles the three completion points returned to the
//! caller. Out-of-order and duplicate events are dropped with a warning.

use crate::EventListener;
use std::collections::HashSet;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tx_types::{
	LifecycleEvent, LifecycleEventKind, SubmissionError, TransactionHash, TransactionReceipt,
};

type Settle<T> = oneshot::Sender<Result<T, SubmissionError>>;

/// A completion point of a submission.
///
/// Resolves once the tracker settles it. If the tracker is dropped first the
/// point rejects with [`SubmissionError::Abandoned`].
#[derive(Debug)]
pub struct Pending<T> {
	rx: oneshot::Receiver<Result<T, SubmissionError>>,
}

impl<T> Future for Pending<T> {
	type Output = Result<T, SubmissionError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx)
			.poll(cx)
			.map(|settled| settled.unwrap_or(Err(SubmissionError::Abandoned)))
	}
}

fn pending<T>() -> (Settle<T>, Pending<T>) {
	let (tx, rx) = oneshot::channel();
	(tx, Pending { rx })
}

/// Independently awaitable completion points of one submission.
#[derive(Debug)]
pub struct SubmissionHandle {
	/// Resolves when the network assigns a hash.
	pub hash: Pending<TransactionHash>,
	/// Resolves when a receipt is available, before confirmation.
	pub receipt: Pending<TransactionReceipt>,
	/// Resolves with the receipt once it reaches the confirmation depth.
	pub confirmation: Pending<TransactionReceipt>,
}

impl SubmissionHandle {
	/// Waits for confirmation, discarding the other completion points.
	pub async fn confirmed(self) -> Result<TransactionReceipt, SubmissionError> {
		self.confirmation.await
	}
}

/// Emits lifecycle events for one submission and settles its completion points.
pub struct LifecycleTracker {
	listener: EventListener,
	seen: HashSet<LifecycleEventKind>,
	// Position of the last accepted event on the success path.
	position: Option<u8>,
	finished: bool,
	hash: Option<Settle<TransactionHash>>,
	receipt: Option<Settle<TransactionReceipt>>,
	confirmation: Option<Settle<TransactionReceipt>>,
}

impl LifecycleTracker {
	pub fn new(listener: EventListener) -> (Self, SubmissionHandle) {
		let (hash_tx, hash) = pending();
		let (receipt_tx, receipt) = pending();
		let (confirmation_tx, confirmation) = pending();

		let tracker = Self {
			listener,
			seen: HashSet::new(),
			position: None,
			finished: false,
			hash: Some(hash_tx),
			receipt: Some(receipt_tx),
			confirmation: Some(confirmation_tx),
		};
		let handle = SubmissionHandle {
			hash,
			receipt,
			confirmation,
		};
		(tracker, handle)
	}

	/// Returns true once Confirmed, Failed or Exception has been emitted.
	pub fn is_finished(&self) -> bool {
		self.finished
	}

	pub fn started(&mut self) {
		self.emit(LifecycleEvent::Started);
	}

	pub fn estimated_gas(&mut self, gas: u64) {
		self.emit(LifecycleEvent::EstimatedGas { gas });
	}

	pub fn hash_received(&mut self, hash: TransactionHash) {
		if self.emit(LifecycleEvent::TransactionHashReceived { hash: hash.clone() }) {
			settle(&mut self.hash, Ok(hash));
		}
	}

	pub fn receipt_received(&mut self, receipt: TransactionReceipt) {
		if self.emit(LifecycleEvent::ReceiptReceived {
			receipt: receipt.clone(),
		}) {
			settle(&mut self.receipt, Ok(receipt));
		}
	}

	/// Marks the transaction confirmed with its final receipt.
	///
	/// Completion points skipped on the way are settled from the receipt.
	pub fn confirmed(&mut self, receipt: TransactionReceipt) {
		if self.emit(LifecycleEvent::Confirmed) {
			settle(&mut self.hash, Ok(receipt.hash.clone()));
			settle(&mut self.receipt, Ok(receipt.clone()));
			settle(&mut self.confirmation, Ok(receipt));
		}
	}

	/// Ends the submission with a transaction-level failure.
	pub fn failed(&mut self, error: impl Into<String>) {
		let error = error.into();
		if self.emit(LifecycleEvent::Failed {
			error: error.clone(),
		}) {
			self.reject_all(SubmissionError::Failed(error));
		}
	}

	/// Ends the submission with a local or transport fault.
	pub fn exception(&mut self, error: impl Into<String>) {
		let error = error.into();
		if self.emit(LifecycleEvent::Exception {
			error: error.clone(),
		}) {
			self.reject_all(SubmissionError::Exception(error));
		}
	}

	fn reject_all(&mut self, error: SubmissionError) {
		settle(&mut self.hash, Err(error.clone()));
		settle(&mut self.receipt, Err(error.clone()));
		settle(&mut self.confirmation, Err(error));
	}

	/// Forwards the event if it is acceptable at this point of the lifecycle.
	fn emit(&mut self, event: LifecycleEvent) -> bool {
		let kind = event.kind();
		if !self.accepts(kind) {
			tracing::warn!(
				event = %kind,
				finished = self.finished,
				"Dropping duplicate or out-of-order lifecycle event"
			);
			return false;
		}

		self.seen.insert(kind);
		if let Some(position) = success_path_position(kind) {
			self.position = Some(position);
		}
		if kind.is_terminal() {
			self.finished = true;
		}

		let listener = &self.listener;
		if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
			tracing::error!(event = %kind, "Lifecycle listener panicked");
		}
		true
	}

	fn accepts(&self, kind: LifecycleEventKind) -> bool {
		if self.finished || self.seen.contains(&kind) {
			return false;
		}
		match kind {
			LifecycleEventKind::Started => self.seen.is_empty(),
			LifecycleEventKind::Failed | LifecycleEventKind::Exception => {
				self.seen.contains(&LifecycleEventKind::Started)
			},
			_ => match (success_path_position(kind), self.position) {
				(Some(next), Some(last)) => next > last,
				_ => false,
			},
		}
	}
}

fn success_path_position(kind: LifecycleEventKind) -> Option<u8> {
	match kind {
		LifecycleEventKind::Started => Some(0),
		LifecycleEventKind::EstimatedGas => Some(1),
		LifecycleEventKind::TransactionHashReceived => Some(2),
		LifecycleEventKind::ReceiptReceived => Some(3),
		LifecycleEventKind::Confirmed => Some(4),
		LifecycleEventKind::Failed | LifecycleEventKind::Exception => None,
	}
}

fn settle<T>(slot: &mut Option<Settle<T>>, value: Result<T, SubmissionError>) {
	if let Some(tx) = slot.take() {
		// The caller may have dropped this completion point.
		let _ = tx.send(value);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Arc, Mutex};

	type Recorded = Arc<Mutex<Vec<LifecycleEvent>>>;

	fn recording_tracker() -> (LifecycleTracker, SubmissionHandle, Recorded) {
		let events = Arc::new(Mutex::new(Vec::new()));
		let sink = events.clone();
		let (tracker, handle) = LifecycleTracker::new(Box::new(move |event: &LifecycleEvent| {
			sink.lock().unwrap().push(event.clone())
		}));
		(tracker, handle, events)
	}

	fn kinds(events: &Recorded) -> Vec<LifecycleEventKind> {
		events.lock().unwrap().iter().map(|e| e.kind()).collect()
	}

	fn receipt(success: bool) -> TransactionReceipt {
		TransactionReceipt {
			hash: TransactionHash(vec![0x11; 32]),
			block_number: 100,
			success,
		}
	}

	#[tokio::test]
	async fn test_full_sequence_settles_every_point() {
		let (mut tracker, handle, events) = recording_tracker();

		tracker.started();
		tracker.estimated_gas(21_000);
		tracker.hash_received(TransactionHash(vec![0x11; 32]));
		tracker.receipt_received(receipt(true));
		tracker.confirmed(receipt(true));

		assert!(tracker.is_finished());
		assert_eq!(
			kinds(&events),
			vec![
				LifecycleEventKind::Started,
				LifecycleEventKind::EstimatedGas,
				LifecycleEventKind::TransactionHashReceived,
				LifecycleEventKind::ReceiptReceived,
				LifecycleEventKind::Confirmed,
			]
		);
		assert_eq!(handle.hash.await.unwrap(), TransactionHash(vec![0x11; 32]));
		assert_eq!(handle.receipt.await.unwrap(), receipt(true));
		assert_eq!(handle.confirmation.await.unwrap(), receipt(true));
	}

	#[tokio::test]
	async fn test_duplicate_receipt_is_dropped() {
		let (mut tracker, _handle, events) = recording_tracker();

		tracker.started();
		tracker.hash_received(TransactionHash(vec![1]));
		tracker.receipt_received(receipt(true));
		tracker.receipt_received(receipt(true));

		assert_eq!(
			kinds(&events)
				.iter()
				.filter(|k| **k == LifecycleEventKind::ReceiptReceived)
				.count(),
			1
		);
	}

	#[tokio::test]
	async fn test_events_before_start_or_out_of_order_are_dropped() {
		let (mut tracker, _handle, events) = recording_tracker();

		tracker.hash_received(TransactionHash(vec![1]));
		tracker.failed("too early");
		assert!(kinds(&events).is_empty());

		tracker.started();
		tracker.hash_received(TransactionHash(vec![1]));
		tracker.estimated_gas(10);
		assert_eq!(
			kinds(&events),
			vec![
				LifecycleEventKind::Started,
				LifecycleEventKind::TransactionHashReceived
			]
		);
	}

	#[tokio::test]
	async fn test_failure_rejects_pending_points() {
		let (mut tracker, handle, events) = recording_tracker();

		tracker.started();
		tracker.hash_received(TransactionHash(vec![7]));
		tracker.failed("reverted");
		tracker.confirmed(receipt(true));

		assert_eq!(
			kinds(&events),
			vec![
				LifecycleEventKind::Started,
				LifecycleEventKind::TransactionHashReceived,
				LifecycleEventKind::Failed,
			]
		);
		assert_eq!(handle.hash.await.unwrap(), TransactionHash(vec![7]));
		assert_eq!(
			handle.receipt.await.unwrap_err(),
			SubmissionError::Failed("reverted".into())
		);
		assert_eq!(
			handle.confirmation.await.unwrap_err(),
			SubmissionError::Failed("reverted".into())
		);
	}

	#[tokio::test]
	async fn test_exception_rejects_with_exception() {
		let (mut tracker, handle, _events) = recording_tracker();

		tracker.started();
		tracker.exception("connection reset");

		assert_eq!(
			handle.confirmed().await.unwrap_err(),
			SubmissionError::Exception("connection reset".into())
		);
	}

	#[tokio::test]
	async fn test_dropped_tracker_abandons_points() {
		let (mut tracker, handle, _events) = recording_tracker();
		tracker.started();
		drop(tracker);

		assert_eq!(handle.hash.await.unwrap_err(), SubmissionError::Abandoned);
	}

	#[tokio::test]
	async fn test_panicking_listener_does_not_stop_submission() {
		let (mut tracker, handle) = LifecycleTracker::new(Box::new(|_: &LifecycleEvent| {
			panic!("broken observer")
		}));

		tracker.started();
		tracker.hash_received(TransactionHash(vec![3]));
		tracker.confirmed(receipt(true));

		assert!(tracker.is_finished());
		assert_eq!(handle.confirmation.await.unwrap(), receipt(true));
	}
}
