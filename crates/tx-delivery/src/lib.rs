//! Transaction delivery for the lifecycle system.
//!
//! Defines the contract of the send primitive that drives a transaction through
//! the network while emitting lifecycle events, and of the resolver that supplies
//! the fee contract for the active connection. The [`LifecycleTracker`] is the
//! producer half every sender uses: it forwards events in order and settles the
//! hash, receipt and confirmation completion points handed back to callers.

use alloy_primitives::Address;
use async_trait::async_trait;
use thiserror::Error;
use tx_types::{CallRequest, FeeContract, LifecycleEvent};

mod tracker;

pub use tracker::{LifecycleTracker, Pending, SubmissionHandle};

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Callback receiving every lifecycle event of one submission.
pub type EventListener = Box<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a transaction execution fails.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// Error that occurs when no suitable provider is available for the operation.
	#[error("No provider available")]
	NoProviderAvailable,
	/// Error that occurs when the fee contract cannot be resolved.
	#[error("Fee contract error: {0}")]
	FeeContract(String),
}

/// Everything a sender needs to submit one transaction.
#[derive(Debug, Clone)]
pub struct SendRequest {
	/// Chain of the active connection.
	pub chain_id: u64,
	pub call: CallRequest,
	/// Sending account.
	pub account: Address,
	pub fee_contract: FeeContract,
	/// Fixed gas limit; estimation is skipped when set.
	pub gas_limit: Option<u64>,
}

/// The send primitive.
///
/// Implementations emit the lifecycle sequence through the listener, normally by
/// feeding a [`LifecycleTracker`] built from it, and return the tracker's handle.
/// An `Err` return means nothing was emitted: implementations must fail before
/// emitting `Started` or not at all.
#[async_trait]
pub trait TransactionSender: Send + Sync {
	async fn send(
		&self,
		request: SendRequest,
		listener: EventListener,
	) -> Result<SubmissionHandle, DeliveryError>;
}

/// Resolves the fee/settlement token contract of a connection.
#[async_trait]
pub trait FeeContractResolver: Send + Sync {
	async fn resolve(&self, chain_id: u64) -> Result<FeeContract, DeliveryError>;
}
