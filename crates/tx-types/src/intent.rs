//! Transaction intent types.
//!
//! An intent is the unsent call plus the identity a submission is tracked under.
//! It is immutable once built and moves into the submitter on submission.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A contract call that has not been sent yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
	/// Target contract address.
	pub to: Address,
	/// ABI-encoded method selector and arguments.
	pub data: Bytes,
	/// Native value attached to the call.
	pub value: U256,
}

impl CallRequest {
	pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			to,
			data: data.into(),
			value: U256::ZERO,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}
}

/// Everything needed to submit and track one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
	call: CallRequest,
	account: Address,
	tag: String,
	tx_id: String,
	gas_limit: Option<u64>,
}

impl TransactionIntent {
	/// Creates an intent that will have its gas estimated.
	///
	/// `tag` labels the subsystem in logs; `tx_id` is the caller's correlation
	/// identifier and is carried unchanged through every record of the submission.
	pub fn new(
		call: CallRequest,
		account: Address,
		tag: impl Into<String>,
		tx_id: impl Into<String>,
	) -> Self {
		Self {
			call,
			account,
			tag: tag.into(),
			tx_id: tx_id.into(),
			gas_limit: None,
		}
	}

	/// Fixes the gas limit, which skips estimation.
	pub fn with_gas_limit(mut self, gas: u64) -> Self {
		self.gas_limit = Some(gas);
		self
	}

	pub fn call(&self) -> &CallRequest {
		&self.call
	}

	pub fn account(&self) -> Address {
		self.account
	}

	pub fn tag(&self) -> &str {
		&self.tag
	}

	pub fn tx_id(&self) -> &str {
		&self.tx_id
	}

	pub fn gas_limit(&self) -> Option<u64> {
		self.gas_limit
	}
}
