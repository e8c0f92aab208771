//! Lifecycle events for a single transaction submission.
//!
//! A submission emits at most one event of each kind, in the order
//! Started, EstimatedGas (only without a gas override), TransactionHashReceived,
//! ReceiptReceived, Confirmed. Failed and Exception may end the sequence at any
//! point after Started.

use crate::{TransactionHash, TransactionReceipt};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete notification describing the progress of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
	/// Submission has begun.
	Started,
	/// Gas estimation completed.
	EstimatedGas { gas: u64 },
	/// The network accepted the transaction and assigned a hash.
	TransactionHashReceived { hash: TransactionHash },
	/// A receipt became available, before the confirmation depth is reached.
	ReceiptReceived { receipt: TransactionReceipt },
	/// The receipt reached the required confirmation depth.
	Confirmed,
	/// The chain reported a transaction-level failure.
	Failed { error: String },
	/// An unexpected local or transport fault occurred.
	Exception { error: String },
}

/// Payload-free discriminant of a [`LifecycleEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LifecycleEventKind {
	Started,
	EstimatedGas,
	TransactionHashReceived,
	ReceiptReceived,
	Confirmed,
	Failed,
	Exception,
}

impl LifecycleEvent {
	pub fn kind(&self) -> LifecycleEventKind {
		match self {
			LifecycleEvent::Started => LifecycleEventKind::Started,
			LifecycleEvent::EstimatedGas { .. } => LifecycleEventKind::EstimatedGas,
			LifecycleEvent::TransactionHashReceived { .. } => {
				LifecycleEventKind::TransactionHashReceived
			},
			LifecycleEvent::ReceiptReceived { .. } => LifecycleEventKind::ReceiptReceived,
			LifecycleEvent::Confirmed => LifecycleEventKind::Confirmed,
			LifecycleEvent::Failed { .. } => LifecycleEventKind::Failed,
			LifecycleEvent::Exception { .. } => LifecycleEventKind::Exception,
		}
	}
}

impl LifecycleEventKind {
	/// Returns true for kinds that end a submission.
	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			LifecycleEventKind::Confirmed
				| LifecycleEventKind::Failed
				| LifecycleEventKind::Exception
		)
	}
}

impl fmt::Display for LifecycleEventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			LifecycleEventKind::Started => "started",
			LifecycleEventKind::EstimatedGas => "estimated_gas",
			LifecycleEventKind::TransactionHashReceived => "transaction_hash_received",
			LifecycleEventKind::ReceiptReceived => "receipt_received",
			LifecycleEventKind::Confirmed => "confirmed",
			LifecycleEventKind::Failed => "failed",
			LifecycleEventKind::Exception => "exception",
		};
		f.write_str(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_terminal_kinds() {
		assert!(LifecycleEventKind::Confirmed.is_terminal());
		assert!(LifecycleEventKind::Failed.is_terminal());
		assert!(LifecycleEventKind::Exception.is_terminal());
		assert!(!LifecycleEventKind::Started.is_terminal());
		assert!(!LifecycleEventKind::ReceiptReceived.is_terminal());
	}

	#[test]
	fn test_kind_ignores_payload() {
		let a = LifecycleEvent::EstimatedGas { gas: 21_000 };
		let b = LifecycleEvent::EstimatedGas { gas: 90_000 };
		assert_eq!(a.kind(), b.kind());
		assert_eq!(
			LifecycleEvent::Failed {
				error: "reverted".into()
			}
			.kind(),
			LifecycleEventKind::Failed
		);
	}
}
