//! Alloy-based EVM implementations of the send primitive and fee contract resolver.
//!
//! Both share one HTTP provider per configured chain. The sender signs with
//! caller-supplied local signers; where keys come from is up to the caller.

use crate::{
	DeliveryError, EventListener, FeeContractResolver, LifecycleTracker, SendRequest,
	SubmissionHandle, TransactionSender,
};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, FixedBytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tx_config::{Config, NetworksConfig};
use tx_types::{truncate_id, FeeContract, TransactionHash, TransactionReceipt};

type DynProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

/// HTTP providers for every configured chain.
pub struct AlloyConnections {
	providers: HashMap<u64, DynProvider>,
}

impl AlloyConnections {
	/// Creates one provider per network, each with a wallet holding all signers.
	pub fn new(
		networks: &NetworksConfig,
		signers: &[PrivateKeySigner],
	) -> Result<Self, DeliveryError> {
		if networks.is_empty() {
			return Err(DeliveryError::Network(
				"At least one network must be configured".to_string(),
			));
		}
		let Some((first, rest)) = signers.split_first() else {
			return Err(DeliveryError::Network(
				"At least one signer must be supplied".to_string(),
			));
		};

		let mut providers = HashMap::new();
		for (chain_id, network) in networks {
			let url = network.rpc_url.parse().map_err(|e| {
				DeliveryError::Network(format!("Invalid RPC URL for network {}: {}", chain_id, e))
			})?;

			let mut wallet = EthereumWallet::from(first.clone().with_chain_id(Some(*chain_id)));
			for signer in rest {
				wallet.register_signer(signer.clone().with_chain_id(Some(*chain_id)));
			}

			let provider = ProviderBuilder::new()
				.with_recommended_fillers()
				.wallet(wallet)
				.on_http(url);

			providers.insert(*chain_id, Arc::new(provider) as DynProvider);
		}

		Ok(Self { providers })
	}

	fn provider(&self, chain_id: u64) -> Result<&DynProvider, DeliveryError> {
		self.providers
			.get(&chain_id)
			.ok_or(DeliveryError::NoProviderAvailable)
	}
}

/// Send primitive backed by an alloy provider.
///
/// After `Started`, gas is estimated unless the request fixes it, the transaction
/// is broadcast, and the receipt and block height are polled until the receipt is
/// `min_confirmations` deep. No overall timeout is applied.
pub struct AlloySender {
	connections: Arc<AlloyConnections>,
	min_confirmations: u64,
	poll_interval: Duration,
}

impl AlloySender {
	pub fn new(
		connections: Arc<AlloyConnections>,
		min_confirmations: u64,
		poll_interval: Duration,
	) -> Self {
		Self {
			connections,
			min_confirmations,
			poll_interval,
		}
	}
}

#[async_trait]
impl TransactionSender for AlloySender {
	async fn send(
		&self,
		request: SendRequest,
		listener: EventListener,
	) -> Result<SubmissionHandle, DeliveryError> {
		let provider = self.connections.provider(request.chain_id)?.clone();
		let (tracker, handle) = LifecycleTracker::new(listener);

		let run = SendRun {
			provider,
			min_confirmations: self.min_confirmations,
			poll_interval: self.poll_interval,
		};
		tokio::spawn(run.drive(request, tracker));

		Ok(handle)
	}
}

struct SendRun {
	provider: DynProvider,
	min_confirmations: u64,
	poll_interval: Duration,
}

impl SendRun {
	async fn drive(self, request: SendRequest, mut tracker: LifecycleTracker) {
		tracker.started();
		tracing::debug!(
			chain_id = request.chain_id,
			fee_contract = %request.fee_contract.address,
			"Sending transaction"
		);

		let mut tx = TransactionRequest::default()
			.from(request.account)
			.to(request.call.to)
			.value(request.call.value)
			.input(request.call.data.clone().into());

		let estimate = self.provider.estimate_gas(&tx);
		let Some(gas) = select_gas(&mut tracker, request.gas_limit, estimate).await else {
			return;
		};
		tx = tx.gas_limit(gas);

		let pending = match self.provider.send_transaction(tx).await {
			Ok(pending) => pending,
			Err(e) => {
				report(&mut tracker, "Failed to send transaction", e);
				return;
			},
		};
		let tx_hash = *pending.tx_hash();
		let hash = TransactionHash(tx_hash.0.to_vec());
		tracing::info!(
			tx_hash = %truncate_id(&hash.to_string()),
			chain_id = request.chain_id,
			"Submitted transaction"
		);
		tracker.hash_received(hash);

		let receipt = match self.wait_for_receipt(tx_hash).await {
			Ok(receipt) => receipt,
			Err(e) => {
				tracker.exception(e.to_string());
				return;
			},
		};
		tracker.receipt_received(receipt.clone());
		if !receipt.success {
			tracker.failed("Transaction reverted");
			return;
		}

		match self.wait_for_depth(receipt.block_number).await {
			Ok(()) => tracker.confirmed(receipt),
			Err(e) => tracker.exception(e.to_string()),
		}
	}

	async fn wait_for_receipt(
		&self,
		tx_hash: FixedBytes<32>,
	) -> Result<TransactionReceipt, DeliveryError> {
		loop {
			match self.provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => {
					let mined =
						mined_receipt(receipt.transaction_hash, receipt.block_number, receipt.status());
					match mined {
						Some(mined) => return Ok(mined),
						// Still pending
						None => tokio::time::sleep(self.poll_interval).await,
					}
				},
				// Not mined yet
				Ok(None) => tokio::time::sleep(self.poll_interval).await,
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"Failed to get receipt: {}",
						e
					)));
				},
			}
		}
	}

	async fn wait_for_depth(&self, tx_block: u64) -> Result<(), DeliveryError> {
		loop {
			let current_block = self.provider.get_block_number().await.map_err(|e| {
				DeliveryError::Network(format!("Failed to get block number: {}", e))
			})?;

			let current_confirmations = current_block.saturating_sub(tx_block);
			if current_confirmations >= self.min_confirmations {
				return Ok(());
			}

			tracing::debug!(
				"Waiting for {} more confirmations...",
				self.min_confirmations - current_confirmations
			);
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

/// Picks the gas limit for a send.
///
/// A fixed limit wins and `estimate` is never awaited, so no `EstimatedGas`
/// event is emitted. Returns `None` once an estimation failure is reported.
async fn select_gas<E>(
	tracker: &mut LifecycleTracker,
	gas_limit: Option<u64>,
	estimate: E,
) -> Option<u64>
where
	E: IntoFuture<Output = Result<u64, TransportError>>,
{
	if let Some(gas) = gas_limit {
		return Some(gas);
	}
	match estimate.await {
		Ok(gas) => {
			tracker.estimated_gas(gas);
			Some(gas)
		},
		Err(e) => {
			report(tracker, "Failed to estimate gas", e);
			None
		},
	}
}

/// Converts an RPC receipt into a lifecycle receipt.
///
/// Nodes may return a receipt without a block number while the transaction is
/// pending; that is not a mined receipt.
fn mined_receipt(
	hash: FixedBytes<32>,
	block_number: Option<u64>,
	success: bool,
) -> Option<TransactionReceipt> {
	Some(TransactionReceipt {
		hash: TransactionHash(hash.0.to_vec()),
		block_number: block_number?,
		success,
	})
}

/// Routes an RPC failure to the matching lifecycle event.
///
/// Error responses from the node are chain-level rejections; anything else is a
/// transport fault.
fn report(
	tracker: &mut LifecycleTracker,
	context: &str,
	error: TransportError,
) {
	if error.is_error_resp() {
		tracker.failed(format!("{}: {}", context, error));
	} else {
		tracker.exception(format!("{}: {}", context, error));
	}
}

/// Resolves the configured fee contract and checks it is deployed.
pub struct AlloyFeeContractResolver {
	connections: Arc<AlloyConnections>,
	contracts: HashMap<u64, Address>,
}

impl AlloyFeeContractResolver {
	pub fn new(connections: Arc<AlloyConnections>, networks: &NetworksConfig) -> Self {
		let contracts = networks
			.iter()
			.map(|(chain_id, network)| (*chain_id, network.fee_contract))
			.collect();
		Self {
			connections,
			contracts,
		}
	}
}

#[async_trait]
impl FeeContractResolver for AlloyFeeContractResolver {
	async fn resolve(&self, chain_id: u64) -> Result<FeeContract, DeliveryError> {
		let address = *self.contracts.get(&chain_id).ok_or_else(|| {
			DeliveryError::FeeContract(format!("No fee contract configured for chain {}", chain_id))
		})?;
		let provider = self.connections.provider(chain_id)?;

		let code = provider
			.get_code_at(address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get code: {}", e)))?;
		if code.is_empty() {
			return Err(DeliveryError::FeeContract(format!(
				"No contract deployed at {} on chain {}",
				address, chain_id
			)));
		}

		Ok(FeeContract { chain_id, address })
	}
}

/// Builds the alloy sender and resolver for a configuration.
pub fn create_alloy_delivery(
	config: &Config,
	signers: &[PrivateKeySigner],
) -> Result<(AlloySender, AlloyFeeContractResolver), DeliveryError> {
	let connections = Arc::new(AlloyConnections::new(&config.networks, signers)?);
	let sender = AlloySender::new(
		connections.clone(),
		config.submitter.min_confirmations,
		Duration::from_secs(config.submitter.poll_interval_seconds),
	);
	let resolver = AlloyFeeContractResolver::new(connections, &config.networks);
	Ok((sender, resolver))
}
