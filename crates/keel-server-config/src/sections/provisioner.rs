// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioner configuration section.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

/// Whether the artifact store and its contents survive teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
	#[default]
	Destroy,
	Retain,
}

impl FromStr for RemovalPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"destroy" => Ok(RemovalPolicy::Destroy),
			"retain" => Ok(RemovalPolicy::Retain),
			other => Err(format!(
				"unknown removal policy '{other}' (expected destroy or retain)"
			)),
		}
	}
}

impl fmt::Display for RemovalPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RemovalPolicy::Destroy => f.write_str("destroy"),
			RemovalPolicy::Retain => f.write_str("retain"),
		}
	}
}

/// Provisioner configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
	pub artifact_source: PathBuf,
	pub key_prefix: String,
	pub artifact_key: String,
	pub image: String,
	pub instance_type: String,
	pub variant_name: String,
	pub initial_instance_count: u32,
	pub model_name_length: usize,
	pub endpoint_name_length: usize,
	pub removal_policy: RemovalPolicy,
	pub auto_delete_objects: bool,
	pub poll_interval_secs: u64,
	pub ready_timeout_secs: u64,
	pub rollback_on_failure: bool,
}

impl Default for ProvisionerConfig {
	fn default() -> Self {
		ProvisionerConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionerConfigLayer {
	#[serde(default)]
	pub artifact_source: Option<PathBuf>,
	#[serde(default)]
	pub key_prefix: Option<String>,
	#[serde(default)]
	pub artifact_key: Option<String>,
	#[serde(default)]
	pub image: Option<String>,
	#[serde(default)]
	pub instance_type: Option<String>,
	#[serde(default)]
	pub variant_name: Option<String>,
	#[serde(default)]
	pub initial_instance_count: Option<u32>,
	#[serde(default)]
	pub model_name_length: Option<usize>,
	#[serde(default)]
	pub endpoint_name_length: Option<usize>,
	#[serde(default)]
	pub removal_policy: Option<RemovalPolicy>,
	#[serde(default)]
	pub auto_delete_objects: Option<bool>,
	#[serde(default)]
	pub poll_interval_secs: Option<u64>,
	#[serde(default)]
	pub ready_timeout_secs: Option<u64>,
	#[serde(default)]
	pub rollback_on_failure: Option<bool>,
}

macro_rules! merge_fields {
	($target:expr, $other:expr, $($field:ident),+ $(,)?) => {
		$(
			if $other.$field.is_some() {
				$target.$field = $other.$field;
			}
		)+
	};
}

impl ProvisionerConfigLayer {
	pub fn merge(&mut self, other: ProvisionerConfigLayer) {
		merge_fields!(
			self,
			other,
			artifact_source,
			key_prefix,
			artifact_key,
			image,
			instance_type,
			variant_name,
			initial_instance_count,
			model_name_length,
			endpoint_name_length,
			removal_policy,
			auto_delete_objects,
			poll_interval_secs,
			ready_timeout_secs,
			rollback_on_failure,
		);
	}

	pub fn finalize(self) -> ProvisionerConfig {
		ProvisionerConfig {
			artifact_source: self
				.artifact_source
				.unwrap_or_else(|| PathBuf::from("./local_model_artifacts")),
			key_prefix: self.key_prefix.unwrap_or_else(|| "models/".to_string()),
			artifact_key: self
				.artifact_key
				.unwrap_or_else(|| "models/models.tar.gz".to_string()),
			image: self
				.image
				.unwrap_or_else(|| "app-custom-model:latest".to_string()),
			instance_type: self
				.instance_type
				.unwrap_or_else(|| "ml.t2.medium".to_string()),
			variant_name: self
				.variant_name
				.unwrap_or_else(|| "AllTraffic".to_string()),
			initial_instance_count: self.initial_instance_count.unwrap_or(1),
			model_name_length: self.model_name_length.unwrap_or(6),
			endpoint_name_length: self.endpoint_name_length.unwrap_or(10),
			removal_policy: self.removal_policy.unwrap_or_default(),
			auto_delete_objects: self.auto_delete_objects.unwrap_or(true),
			poll_interval_secs: self.poll_interval_secs.unwrap_or(5),
			ready_timeout_secs: self.ready_timeout_secs.unwrap_or(30 * 60),
			rollback_on_failure: self.rollback_on_failure.unwrap_or(true),
		}
	}
}
