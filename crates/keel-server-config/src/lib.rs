// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the Keel server.
//!
//! This crate provides:
//! - Layered configuration from defaults, a TOML file and the environment
//! - Type-safe configuration with cross-field validation
//! - Consistent environment variable naming (`KEEL_*`)
//!
//! # Usage
//!
//! ```ignore
//! use keel_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Gateway forwarding to {}", config.gateway.endpoint_name);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use keel_common_core::{ENDPOINT_NAME_PREFIX, MAX_NAME_LEN, MODEL_NAME_PREFIX};
use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub gateway: GatewayConfig,
	pub provisioner: ProvisionerConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`KEEL_*`)
/// 2. Config file (`/etc/keel/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::process()),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![Box::new(EnvSource::process())])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::process()),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		gateway: layer.gateway.unwrap_or_default().finalize(),
		provisioner: layer.provisioner.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		endpoint_name = %config.gateway.endpoint_name,
		region = %config.gateway.region,
		invoke_timeout_secs = config.gateway.invoke_timeout_secs,
		instance_type = %config.provisioner.instance_type,
		removal_policy = %config.provisioner.removal_policy,
		log_format = %config.logging.format,
		"Server configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.gateway.invoke_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"invoke_timeout_secs must be greater than zero".to_string(),
		));
	}

	let provisioner = &config.provisioner;
	if provisioner.initial_instance_count == 0 {
		return Err(ConfigError::Validation(
			"initial_instance_count must be at least 1".to_string(),
		));
	}
	if provisioner.poll_interval_secs == 0 {
		return Err(ConfigError::Validation(
			"poll_interval_secs must be greater than zero".to_string(),
		));
	}
	if provisioner.ready_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"ready_timeout_secs must be greater than zero".to_string(),
		));
	}

	for (field, prefix, length) in [
		("model_name_length", MODEL_NAME_PREFIX, provisioner.model_name_length),
		(
			"endpoint_name_length",
			ENDPOINT_NAME_PREFIX,
			provisioner.endpoint_name_length,
		),
	] {
		if length == 0 || prefix.len() + length > MAX_NAME_LEN {
			return Err(ConfigError::Validation(format!(
				"{field} must be between 1 and {} (prefix '{prefix}' counts towards the {MAX_NAME_LEN} character limit)",
				MAX_NAME_LEN - prefix.len()
			)));
		}
	}

	if provisioner.image.trim().is_empty() {
		return Err(ConfigError::Validation("image must not be empty".to_string()));
	}

	let prefix = provisioner.key_prefix.trim_end_matches('/');
	if !provisioner
		.artifact_key
		.strip_prefix(prefix)
		.is_some_and(|rest| prefix.is_empty() || rest.starts_with('/'))
	{
		return Err(ConfigError::Validation(format!(
			"artifact_key '{}' must live under key_prefix '{}'",
			provisioner.artifact_key, provisioner.key_prefix
		)));
	}

	Ok(())
}
