//! Transaction delivery types.
//!
//! Hashes and receipts produced by the network, and the fee contract handle
//! resolved for the active connection before a submission starts.

use crate::with_0x_prefix;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blockchain transaction hash representation.
///
/// Stores transaction hashes as raw bytes to support different blockchain formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", with_0x_prefix(&hex::encode(&self.0)))
	}
}

/// Transaction receipt containing execution details.
///
/// Provides information about a transaction after it has been included in a block,
/// including its success status and block number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

/// Handle to the fee/settlement token contract of a chain.
///
/// Resolved once per submission from the active connection and handed to the
/// send primitive alongside the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeContract {
	/// Chain the contract is deployed on.
	pub chain_id: u64,
	/// Contract address.
	pub address: Address,
}
