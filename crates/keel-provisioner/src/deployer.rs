// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Applies a [`Plan`] against a [`ControlPlane`].
//!
//! Nodes are created one at a time in creation order. A node whose
//! completion is [`Completion::UntilReady`] is polled until the control plane
//! reports it ready before any dependent starts. The first failure stops the
//! walk; resources created so far are rolled back in reverse order unless
//! rollback is disabled. Export resolution failures roll back the same way.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::control_plane::{
	ControlPlane, CreateRequest, DeployedResource, ResolvedResource, ResolvedVariant,
	ResourceState,
};
use crate::error::{ProvisionError, Result};
use crate::plan::{Plan, PlanNode};
use crate::resource::{AttrRef, Completion, RemovalPolicy, ResourceId, ResourceSpec};

#[derive(Debug, Clone)]
pub struct DeploySettings {
	pub poll_interval: Duration,
	/// Upper bound on a single node's readiness wait.
	pub ready_timeout: Duration,
	pub rollback_on_failure: bool,
}

impl Default for DeploySettings {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_secs(5),
			ready_timeout: Duration::from_secs(30 * 60),
			rollback_on_failure: true,
		}
	}
}

/// Record of a successful apply.
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
	pub id: Uuid,
	pub started_at: DateTime<Utc>,
	pub completed_at: DateTime<Utc>,
	/// Created resources, in creation order.
	pub resources: Vec<DeployedResource>,
	/// Export name to resolved value.
	pub outputs: BTreeMap<String, String>,
}

impl Deployment {
	pub fn resource(&self, id: &ResourceId) -> Option<&DeployedResource> {
		self.resources.iter().find(|r| &r.id == id)
	}

	pub fn output(&self, name: &str) -> Option<&str> {
		self.outputs.get(name).map(String::as_str)
	}
}

/// What a teardown removed and what it left in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownSummary {
	pub deleted: Vec<ResourceId>,
	pub retained: Vec<ResourceId>,
}

pub struct Deployer {
	control_plane: Arc<dyn ControlPlane>,
	settings: DeploySettings,
}

impl Deployer {
	pub fn new(control_plane: Arc<dyn ControlPlane>, settings: DeploySettings) -> Self {
		Self {
			control_plane,
			settings,
		}
	}

	#[instrument(skip(self, plan), fields(resources = plan.len()))]
	pub async fn apply(&self, plan: &Plan) -> Result<Deployment> {
		let id = Uuid::new_v4();
		let started_at = Utc::now();
		info!(deployment_id = %id, "applying plan");

		let mut created: Vec<DeployedResource> = Vec::with_capacity(plan.len());
		let outputs = match self.create_all(plan, &mut created).await {
			Ok(outputs) => outputs,
			Err(err) => {
				if self.settings.rollback_on_failure {
					self.rollback(plan, &created).await;
				}
				return Err(err);
			}
		};

		info!(deployment_id = %id, created = created.len(), "plan applied");
		Ok(Deployment {
			id,
			started_at,
			completed_at: Utc::now(),
			resources: created,
			outputs,
		})
	}

	/// Deletes the deployment's resources in reverse creation order, leaving
	/// retained ones in place. Stops at the first deletion failure.
	#[instrument(skip(self, plan, deployment), fields(deployment_id = %deployment.id))]
	pub async fn teardown(&self, plan: &Plan, deployment: &Deployment) -> Result<TeardownSummary> {
		let mut summary = TeardownSummary::default();
		for node in plan.teardown_order() {
			let Some(resource) = deployment.resource(node.id()) else {
				continue;
			};
			if node.removal_policy() == RemovalPolicy::Retain {
				debug!(resource = %node.id(), "retaining resource");
				summary.retained.push(node.id().clone());
				continue;
			}
			self.control_plane
				.delete(resource)
				.await
				.map_err(|source| ProvisionError::TeardownFailed {
					resource: node.id().clone(),
					source,
				})?;
			debug!(resource = %node.id(), physical_id = %resource.physical_id, "deleted");
			summary.deleted.push(node.id().clone());
		}
		info!(
			deleted = summary.deleted.len(),
			retained = summary.retained.len(),
			"teardown complete"
		);
		Ok(summary)
	}

	/// Rolls back a deployment the caller cannot use, unless rollback is
	/// disabled.
	pub async fn abandon(&self, plan: &Plan, deployment: &Deployment) {
		if self.settings.rollback_on_failure {
			warn!(deployment_id = %deployment.id, "abandoning deployment");
			self.rollback(plan, &deployment.resources).await;
		}
	}

	/// Creates every node, then resolves the plan's exports.
	async fn create_all(
		&self,
		plan: &Plan,
		created: &mut Vec<DeployedResource>,
	) -> Result<BTreeMap<String, String>> {
		for node in plan.creation_order() {
			if let Err(err) = self.apply_node(node, created).await {
				warn!(resource = %node.id(), error = %err, "apply failed");
				return Err(err);
			}
		}

		let mut outputs = BTreeMap::new();
		for export in plan.exports() {
			let value = lookup(created, &ResourceId::new(export.name.clone()), &export.value)?;
			outputs.insert(export.name.clone(), value);
		}
		Ok(outputs)
	}

	async fn apply_node(&self, node: &PlanNode, created: &mut Vec<DeployedResource>) -> Result<()> {
		let request = CreateRequest {
			id: node.id().clone(),
			resource: resolve(node, created)?,
		};

		let resource = self
			.control_plane
			.create(&request)
			.await
			.map_err(|source| ProvisionError::StepFailed {
				resource: node.id().clone(),
				kind: node.kind(),
				source,
			})?;
		debug!(
			resource = %node.id(),
			kind = %node.kind(),
			physical_id = %resource.physical_id,
			"created"
		);
		created.push(resource);

		if node.completion() == Completion::UntilReady {
			if let Some(resource) = created.last() {
				self.wait_until_ready(node, resource).await?;
			}
		}
		Ok(())
	}

	async fn wait_until_ready(&self, node: &PlanNode, resource: &DeployedResource) -> Result<()> {
		let deadline = Instant::now() + self.settings.ready_timeout;
		loop {
			let state = self
				.control_plane
				.state(resource)
				.await
				.map_err(|source| ProvisionError::StepFailed {
					resource: node.id().clone(),
					kind: node.kind(),
					source,
				})?;
			match state {
				ResourceState::Ready => {
					debug!(resource = %node.id(), "ready");
					return Ok(());
				}
				ResourceState::Failed(reason) => {
					return Err(ProvisionError::NotReady {
						resource: node.id().clone(),
						reason,
					});
				}
				ResourceState::Pending => {}
			}

			if Instant::now() + self.settings.poll_interval > deadline {
				return Err(ProvisionError::ReadyTimeout {
					resource: node.id().clone(),
				});
			}
			sleep(self.settings.poll_interval).await;
		}
	}

	/// Best effort: failures are logged and the remaining deletions proceed.
	async fn rollback(&self, plan: &Plan, created: &[DeployedResource]) {
		for resource in created.iter().rev() {
			let retained = plan
				.node(&resource.id)
				.is_some_and(|node| node.removal_policy() == RemovalPolicy::Retain);
			if retained {
				continue;
			}
			match self.control_plane.delete(resource).await {
				Ok(()) => debug!(resource = %resource.id, "rolled back"),
				Err(err) => warn!(resource = %resource.id, error = %err, "rollback delete failed"),
			}
		}
	}
}

fn lookup(created: &[DeployedResource], dependent: &ResourceId, reference: &AttrRef) -> Result<String> {
	created
		.iter()
		.find(|r| r.id == reference.resource)
		.and_then(|r| r.attribute(reference.attribute))
		.map(str::to_string)
		.ok_or_else(|| ProvisionError::UnresolvedReference {
			resource: dependent.clone(),
			target: reference.resource.clone(),
		})
}

/// Replaces every attribute reference in the node's spec with its value.
fn resolve(node: &PlanNode, created: &[DeployedResource]) -> Result<ResolvedResource> {
	let id = node.id();
	let resolved = match node.spec() {
		ResourceSpec::ArtifactStore {
			auto_delete_objects,
		} => ResolvedResource::ArtifactStore {
			auto_delete_objects: *auto_delete_objects,
		},
		ResourceSpec::Role {
			service_principal,
			managed_policies,
		} => ResolvedResource::Role {
			service_principal: service_principal.clone(),
			managed_policies: managed_policies.clone(),
		},
		ResourceSpec::ReadGrant { role, store } => ResolvedResource::ReadGrant {
			role_arn: lookup(created, id, role)?,
			store_name: lookup(created, id, store)?,
		},
		ResourceSpec::ArtifactUpload {
			store,
			source,
			key_prefix,
		} => ResolvedResource::ArtifactUpload {
			store_name: lookup(created, id, store)?,
			source: source.clone(),
			key_prefix: key_prefix.clone(),
		},
		ResourceSpec::Model {
			name,
			execution_role,
			image,
			model_data,
		} => ResolvedResource::Model {
			name: name.clone(),
			execution_role_arn: lookup(created, id, execution_role)?,
			image: image.clone(),
			model_data_url: format!(
				"s3://{}/{}",
				lookup(created, id, &model_data.store)?,
				model_data.key
			),
		},
		ResourceSpec::EndpointConfig { name, variants } => ResolvedResource::EndpointConfig {
			name: name.clone(),
			variants: variants
				.iter()
				.map(|v| {
					Ok(ResolvedVariant {
						variant_name: v.variant_name.clone(),
						model_name: lookup(created, id, &v.model)?,
						instance_type: v.instance_type.clone(),
						initial_instance_count: v.initial_instance_count,
					})
				})
				.collect::<Result<Vec<_>>>()?,
		},
		ResourceSpec::Endpoint { name, config } => ResolvedResource::Endpoint {
			name: name.clone(),
			config_name: lookup(created, id, config)?,
		},
	};
	Ok(resolved)
}
