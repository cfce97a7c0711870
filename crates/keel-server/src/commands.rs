// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning commands that do not need a live cloud account.

use std::sync::Arc;

use keel_provisioner::{
	Deployment, InMemoryControlPlane, Operation, Provisioner, TeardownSummary,
};
use keel_server_config::ProvisionerConfig;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::ServerError;
use crate::settings::{deploy_settings, stack_settings};

/// Renders a freshly named plan as a deployment-engine template.
pub fn synth(config: &ProvisionerConfig, pretty: bool) -> Result<String, ServerError> {
	let provisioner = Provisioner::new(
		Arc::new(InMemoryControlPlane::new()),
		stack_settings(config),
		deploy_settings(config),
	);
	let template = provisioner.plan()?.plan.to_template();
	let rendered = if pretty {
		serde_json::to_string_pretty(&template)?
	} else {
		serde_json::to_string(&template)?
	};
	Ok(rendered)
}

/// Outcome of a provision-then-teardown run against the in-memory control plane.
#[derive(Debug, Serialize)]
pub struct DryRunReport {
	pub endpoint: String,
	pub deployment: Deployment,
	pub teardown: TeardownSummary,
	pub operations: Vec<Operation>,
}

#[instrument(skip(config))]
pub async fn dry_run(config: &ProvisionerConfig) -> Result<DryRunReport, ServerError> {
	let plane = Arc::new(InMemoryControlPlane::new());
	let provisioner = Provisioner::new(
		plane.clone(),
		stack_settings(config),
		deploy_settings(config),
	);

	let provisioned = provisioner.provision().await?;
	let teardown = provisioner.teardown(&provisioned).await?;
	info!(
		endpoint = %provisioned.endpoint,
		deleted = teardown.deleted.len(),
		retained = teardown.retained.len(),
		"dry run complete"
	);

	Ok(DryRunReport {
		endpoint: provisioned.endpoint.to_string(),
		deployment: provisioned.deployment,
		teardown,
		operations: plane.operations(),
	})
}
