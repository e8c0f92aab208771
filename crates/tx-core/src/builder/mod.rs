//! Builder for constructing submitters from configuration.
//!
//! Applies the configured default tag and analytics switch, and either accepts
//! caller-supplied collaborators or wires the alloy-backed ones.

use crate::TransactionSubmitter;
use alloy_signer_local::PrivateKeySigner;
use std::sync::Arc;
use thiserror::Error;
use tx_config::Config;
use tx_delivery::implementations::evm::alloy::create_alloy_delivery;
use tx_delivery::{FeeContractResolver, TransactionSender};
use tx_observer::ObserverFactory;

/// Errors that can occur during submitter construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Delivery error: {0}")]
	Delivery(String),
}

/// Builds [`TransactionSubmitter`]s for the chains of a configuration.
pub struct SubmitterBuilder {
	config: Config,
}

impl SubmitterBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds a submitter for `chain_id` around the given collaborators.
	pub fn build_with(
		&self,
		chain_id: u64,
		sender: Arc<dyn TransactionSender>,
		resolver: Arc<dyn FeeContractResolver>,
	) -> Result<TransactionSubmitter, BuilderError> {
		self.config
			.network(chain_id)
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		tracing::info!(
			chain_id,
			analytics = self.config.analytics.enabled,
			"Built transaction submitter"
		);

		Ok(TransactionSubmitter::new(chain_id, sender, resolver)
			.with_observer_factory(ObserverFactory::tracing(self.config.analytics.enabled))
			.with_default_tag(self.config.submitter.default_tag.clone()))
	}

	/// Builds a submitter for `chain_id` backed by alloy providers.
	pub fn build_alloy(
		&self,
		chain_id: u64,
		signers: &[PrivateKeySigner],
	) -> Result<TransactionSubmitter, BuilderError> {
		let (sender, resolver) = create_alloy_delivery(&self.config, signers).map_err(|e| {
			tracing::error!(chain_id, error = %e, "Failed to create alloy delivery");
			BuilderError::Delivery(e.to_string())
		})?;
		self.build_with(chain_id, Arc::new(sender), Arc::new(resolver))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const CONFIG: &str = r#"
[submitter]
default_tag = "payments"

[analytics]
enabled = false

[networks.44787]
rpc_url = "https://alfajores-forno.celo-testnet.org"
fee_contract = "0x874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1"
"#;

	fn builder() -> SubmitterBuilder {
		SubmitterBuilder::new(CONFIG.parse().unwrap())
	}

	#[tokio::test]
	async fn test_build_alloy_for_configured_chain() {
		let submitter = builder()
			.build_alloy(44787, &[PrivateKeySigner::random()])
			.unwrap();
		assert_eq!(submitter.chain_id(), 44787);
	}

	#[tokio::test]
	async fn test_build_rejects_unknown_chain() {
		let result = builder().build_alloy(1, &[PrivateKeySigner::random()]);
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}

	#[tokio::test]
	async fn test_build_requires_signer() {
		let result = builder().build_alloy(44787, &[]);
		assert!(matches!(result, Err(BuilderError::Delivery(_))));
	}
}
