// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Maps resolved configuration onto provisioner settings.

use std::time::Duration;

use keel_provisioner::{DeploySettings, RemovalPolicy, StackSettings};
use keel_server_config::{ProvisionerConfig, RemovalPolicy as ConfiguredRemovalPolicy};

pub fn stack_settings(config: &ProvisionerConfig) -> StackSettings {
	StackSettings {
		artifact_source: config.artifact_source.clone(),
		key_prefix: config.key_prefix.clone(),
		artifact_key: config.artifact_key.clone(),
		image: config.image.clone(),
		instance_type: config.instance_type.clone(),
		variant_name: config.variant_name.clone(),
		initial_instance_count: config.initial_instance_count,
		model_name_length: config.model_name_length,
		endpoint_name_length: config.endpoint_name_length,
		removal_policy: match config.removal_policy {
			ConfiguredRemovalPolicy::Destroy => RemovalPolicy::Destroy,
			ConfiguredRemovalPolicy::Retain => RemovalPolicy::Retain,
		},
		auto_delete_objects: config.auto_delete_objects,
		..StackSettings::default()
	}
}

pub fn deploy_settings(config: &ProvisionerConfig) -> DeploySettings {
	DeploySettings {
		poll_interval: Duration::from_secs(config.poll_interval_secs),
		ready_timeout: Duration::from_secs(config.ready_timeout_secs),
		rollback_on_failure: config.rollback_on_failure,
	}
}
