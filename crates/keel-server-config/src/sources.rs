// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	GatewayConfigLayer, HttpConfigLayer, LogFormat, LoggingConfigLayer, ProvisionerConfigLayer,
	RemovalPolicy,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/keel/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `KEEL_<FIELD>` for server, gateway and logging settings and
/// `KEEL_PROVISIONER_<FIELD>` for the provisioner.
pub struct EnvSource {
	/// Fixed variables instead of the process environment.
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn process() -> Self {
		Self { vars: None }
	}

	pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: Some(
				vars.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parse<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
	where
		T: FromStr,
		T::Err: Display,
	{
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid value '{v}': {e}"),
			}),
			None => Ok(None),
		}
	}

	fn load_http(&self) -> Result<HttpConfigLayer, ConfigError> {
		Ok(HttpConfigLayer {
			host: self.var("KEEL_SERVER_HOST"),
			port: self.parse("KEEL_SERVER_PORT")?,
		})
	}

	fn load_gateway(&self) -> Result<GatewayConfigLayer, ConfigError> {
		Ok(GatewayConfigLayer {
			endpoint_name: self.var("KEEL_ENDPOINT_NAME"),
			region: self
				.var("KEEL_REGION")
				.or_else(|| self.var("AWS_REGION")),
			runtime_url: self.var("KEEL_RUNTIME_URL"),
			invoke_timeout_secs: self.parse("KEEL_INVOKE_TIMEOUT_SECS")?,
		})
	}

	fn load_provisioner(&self) -> Result<ProvisionerConfigLayer, ConfigError> {
		Ok(ProvisionerConfigLayer {
			artifact_source: self
				.var("KEEL_PROVISIONER_ARTIFACT_SOURCE")
				.map(PathBuf::from),
			key_prefix: self.var("KEEL_PROVISIONER_KEY_PREFIX"),
			artifact_key: self.var("KEEL_PROVISIONER_ARTIFACT_KEY"),
			image: self.var("KEEL_PROVISIONER_IMAGE"),
			instance_type: self.var("KEEL_PROVISIONER_INSTANCE_TYPE"),
			variant_name: self.var("KEEL_PROVISIONER_VARIANT_NAME"),
			initial_instance_count: self.parse("KEEL_PROVISIONER_INITIAL_INSTANCE_COUNT")?,
			model_name_length: self.parse("KEEL_PROVISIONER_MODEL_NAME_LENGTH")?,
			endpoint_name_length: self.parse("KEEL_PROVISIONER_ENDPOINT_NAME_LENGTH")?,
			removal_policy: self.parse::<RemovalPolicy>("KEEL_PROVISIONER_REMOVAL_POLICY")?,
			auto_delete_objects: self.bool("KEEL_PROVISIONER_AUTO_DELETE_OBJECTS"),
			poll_interval_secs: self.parse("KEEL_PROVISIONER_POLL_INTERVAL_SECS")?,
			ready_timeout_secs: self.parse("KEEL_PROVISIONER_READY_TIMEOUT_SECS")?,
			rollback_on_failure: self.bool("KEEL_PROVISIONER_ROLLBACK_ON_FAILURE"),
		})
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		Ok(LoggingConfigLayer {
			level: self.var("KEEL_LOG_LEVEL"),
			format: self.parse::<LogFormat>("KEEL_LOG_FORMAT")?,
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(self.load_http()?),
			gateway: Some(self.load_gateway()?),
			provisioner: Some(self.load_provisioner()?),
			logging: Some(self.load_logging()?),
		})
	}
}
