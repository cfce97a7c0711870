// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gateway configuration section.

use std::time::Duration;

use serde::Deserialize;

/// Endpoint invoked when none is configured.
pub const FALLBACK_ENDPOINT_NAME: &str = "flask-endpoint";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_INVOKE_TIMEOUT_SECS: u64 = 60;

/// Gateway configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
	pub endpoint_name: String,
	pub region: String,
	pub runtime_url: String,
	pub invoke_timeout_secs: u64,
}

impl GatewayConfig {
	pub fn invoke_timeout(&self) -> Duration {
		Duration::from_secs(self.invoke_timeout_secs)
	}
}

impl Default for GatewayConfig {
	fn default() -> Self {
		GatewayConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfigLayer {
	#[serde(default)]
	pub endpoint_name: Option<String>,
	#[serde(default)]
	pub region: Option<String>,
	#[serde(default)]
	pub runtime_url: Option<String>,
	#[serde(default)]
	pub invoke_timeout_secs: Option<u64>,
}

impl GatewayConfigLayer {
	pub fn merge(&mut self, other: GatewayConfigLayer) {
		if other.endpoint_name.is_some() {
			self.endpoint_name = other.endpoint_name;
		}
		if other.region.is_some() {
			self.region = other.region;
		}
		if other.runtime_url.is_some() {
			self.runtime_url = other.runtime_url;
		}
		if other.invoke_timeout_secs.is_some() {
			self.invoke_timeout_secs = other.invoke_timeout_secs;
		}
	}

	pub fn finalize(self) -> GatewayConfig {
		let region = self.region.unwrap_or_else(|| DEFAULT_REGION.to_string());
		let runtime_url = self
			.runtime_url
			.unwrap_or_else(|| format!("https://runtime.sagemaker.{region}.amazonaws.com"));
		GatewayConfig {
			endpoint_name: self
				.endpoint_name
				.unwrap_or_else(|| FALLBACK_ENDPOINT_NAME.to_string()),
			region,
			runtime_url,
			invoke_timeout_secs: self
				.invoke_timeout_secs
				.unwrap_or(DEFAULT_INVOKE_TIMEOUT_SECS),
		}
	}
}
