//! Submission orchestration for the transaction lifecycle system.
//!
//! The [`TransactionSubmitter`] resolves the fee contract of its connection, hands
//! the intent to the send primitive with an observer bound to the intent's tag and
//! correlation identifier, and exposes two calling conventions: the raw handle with
//! every completion point, or a single awaited confirmation.

use std::sync::Arc;
use tracing::instrument;
use tx_config::DEFAULT_TAG;
use tx_delivery::{FeeContractResolver, SendRequest, SubmissionHandle, TransactionSender};
use tx_observer::ObserverFactory;
use tx_types::{
	truncate_id, LifecycleEvent, SubmissionError, TransactionIntent, TransactionReceipt,
};

pub mod builder;

pub use builder::{BuilderError, SubmitterBuilder};

/// Submits transactions on one chain connection and tracks their lifecycle.
#[derive(Clone)]
pub struct TransactionSubmitter {
	/// Chain id of the active connection.
	chain_id: u64,
	sender: Arc<dyn TransactionSender>,
	resolver: Arc<dyn FeeContractResolver>,
	observers: ObserverFactory,
	default_tag: String,
}

impl TransactionSubmitter {
	pub fn new(
		chain_id: u64,
		sender: Arc<dyn TransactionSender>,
		resolver: Arc<dyn FeeContractResolver>,
	) -> Self {
		Self {
			chain_id,
			sender,
			resolver,
			observers: ObserverFactory::default(),
			default_tag: DEFAULT_TAG.to_string(),
		}
	}

	/// Replaces the factory used to build each submission's observer.
	pub fn with_observer_factory(mut self, observers: ObserverFactory) -> Self {
		self.observers = observers;
		self
	}

	/// Sets the tag used for intents with an empty tag.
	pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
		self.default_tag = tag.into();
		self
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	/// Sends the intent and returns its completion points without waiting on them.
	///
	/// Fails before any lifecycle event if the fee contract cannot be resolved or
	/// the send primitive rejects the request. Use this when intermediate events
	/// matter, e.g. to react as soon as a hash is known.
	#[instrument(skip_all, fields(tag = %intent.tag(), tx_id = %truncate_id(intent.tx_id())))]
	pub async fn submit_raw(
		&self,
		intent: TransactionIntent,
	) -> Result<SubmissionHandle, SubmissionError> {
		let fee_contract = self
			.resolver
			.resolve(self.chain_id)
			.await
			.map_err(|e| SubmissionError::FeeContract(e.to_string()))?;

		let tag = if intent.tag().is_empty() {
			self.default_tag.as_str()
		} else {
			intent.tag()
		};
		let observer = self.observers.make_observer(tag, intent.tx_id());

		let request = SendRequest {
			chain_id: self.chain_id,
			call: intent.call().clone(),
			account: intent.account(),
			fee_contract,
			gas_limit: intent.gas_limit(),
		};

		self.sender
			.send(
				request,
				Box::new(move |event: &LifecycleEvent| observer.observe(event)),
			)
			.await
			.map_err(|e| SubmissionError::Send(e.to_string()))
	}

	/// Sends the intent and waits for its confirmation.
	///
	/// Resolves with the confirmed receipt or the confirmation's rejection as is.
	pub async fn submit_and_confirm(
		&self,
		intent: TransactionIntent,
	) -> Result<TransactionReceipt, SubmissionError> {
		self.submit_raw(intent).await?.confirmed().await
	}
}
