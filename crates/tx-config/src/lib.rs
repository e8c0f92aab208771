//! Configuration for the transaction submission stack.
//!
//! Configuration is read from TOML. `${VAR}` and `${VAR:-default}` references are
//! resolved from the environment before parsing, and the parsed configuration is
//! validated before it is handed out.

use alloy_primitives::Address;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Submission behaviour.
	pub submitter: SubmitterConfig,
	/// Analytics fan-out.
	#[serde(default)]
	pub analytics: AnalyticsConfig,
	/// Per-chain connection and fee contract settings.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
}

/// Settings applied to every submission.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitterConfig {
	/// Tag used when a caller does not supply one.
	#[serde(default = "default_tag")]
	pub default_tag: String,
	/// Blocks on top of the receipt's block before a transaction counts as confirmed.
	#[serde(default = "default_confirmations")]
	pub min_confirmations: u64,
	/// Interval between receipt and block height polls.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
}

/// Tag used for intents submitted without one.
pub const DEFAULT_TAG: &str = "transactions";

fn default_tag() -> String {
	DEFAULT_TAG.to_string()
}

fn default_confirmations() -> u64 {
	1
}

fn default_poll_interval_seconds() -> u64 {
	3
}

/// Analytics settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyticsConfig {
	/// When false, analytics records are discarded.
	#[serde(default = "default_analytics_enabled")]
	pub enabled: bool,
}

impl Default for AnalyticsConfig {
	fn default() -> Self {
		Self {
			enabled: default_analytics_enabled(),
		}
	}
}

fn default_analytics_enabled() -> bool {
	true
}

/// Connection settings for one chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// HTTP(S) RPC endpoint.
	pub rpc_url: String,
	/// Fee/settlement token contract used to pay for transactions.
	pub fee_contract: Address,
}

/// Chain id to network settings.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Deserializes the networks table, whose keys are chain ids written as strings.
fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await?;
		content.parse()
	}

	/// Returns the settings for a chain.
	pub fn network(&self, chain_id: u64) -> Result<&NetworkConfig, ConfigError> {
		self.networks.get(&chain_id).ok_or_else(|| {
			ConfigError::Validation(format!("Network {} not found in configuration", chain_id))
		})
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.submitter.default_tag.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Submitter default_tag cannot be empty".into(),
			));
		}
		if self.submitter.min_confirmations == 0 {
			return Err(ConfigError::Validation(
				"min_confirmations must be at least 1".into(),
			));
		}
		if self.submitter.min_confirmations > 100 {
			return Err(ConfigError::Validation(
				"min_confirmations cannot exceed 100".into(),
			));
		}
		if self.submitter.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"poll_interval_seconds must be greater than 0".into(),
			));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"Networks configuration cannot be empty".into(),
			));
		}
		for (chain_id, network) in &self.networks {
			if !(network.rpc_url.starts_with("http://") || network.rpc_url.starts_with("https://"))
			{
				return Err(ConfigError::Validation(format!(
					"Network {} rpc_url must be an http(s) URL",
					chain_id
				)));
			}
			if network.fee_contract == Address::ZERO {
				return Err(ConfigError::Validation(format!(
					"Network {} fee_contract cannot be the zero address",
					chain_id
				)));
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
