// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory [`ControlPlane`] for dry runs and tests.
//!
//! Enforces the provider rules that make ordering matter: a model can only be
//! registered once its role can read the artifact store and the artifact is
//! present, an endpoint needs an existing configuration, and a non-empty store
//! cannot be deleted unless it was created with auto-delete.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use crate::control_plane::{
	ControlPlane, ControlPlaneError, CreateRequest, DeployedResource, ResolvedResource,
	ResourceState,
};
use crate::resource::{ResourceId, ResourceKind};

pub const DEFAULT_ACCOUNT_ID: &str = "000000000000";
pub const DEFAULT_REGION: &str = "us-east-1";

/// One successful call against the plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
	Create {
		id: ResourceId,
		kind: ResourceKind,
		physical_id: String,
	},
	Delete {
		id: ResourceId,
		kind: ResourceKind,
		physical_id: String,
	},
}

#[derive(Debug)]
struct LiveResource {
	deployed: DeployedResource,
	spec: ResolvedResource,
	pending_polls: u32,
	/// Key prefixes uploaded into a store.
	objects: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
	live: BTreeMap<(ResourceKind, String), LiveResource>,
	operations: Vec<Operation>,
	sequence: u64,
	fail_create: HashSet<ResourceKind>,
	fail_ready: HashSet<ResourceKind>,
	fail_delete: HashSet<ResourceKind>,
}

impl State {
	fn find(&self, kind: ResourceKind, physical_id: &str) -> Option<&LiveResource> {
		self.live.get(&(kind, physical_id.to_string()))
	}

	fn role_by_arn(&self, arn: &str) -> Option<&LiveResource> {
		self.live
			.values()
			.find(|r| r.deployed.kind == ResourceKind::Role && r.deployed.arn.as_deref() == Some(arn))
	}

	fn has_grant(&self, role_arn: &str, store_name: &str) -> bool {
		self.live.values().any(|r| {
			matches!(
				&r.spec,
				ResolvedResource::ReadGrant { role_arn: a, store_name: s }
					if a == role_arn && s == store_name
			)
		})
	}
}

/// A fake provider that keeps every resource in a map.
#[derive(Debug)]
pub struct InMemoryControlPlane {
	account_id: String,
	region: String,
	ready_after_polls: u32,
	state: Mutex<State>,
}

impl Default for InMemoryControlPlane {
	fn default() -> Self {
		Self::new()
	}
}

impl InMemoryControlPlane {
	pub fn new() -> Self {
		Self {
			account_id: DEFAULT_ACCOUNT_ID.to_string(),
			region: DEFAULT_REGION.to_string(),
			ready_after_polls: 0,
			state: Mutex::new(State::default()),
		}
	}

	pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
		self.account_id = account_id.into();
		self
	}

	pub fn with_region(mut self, region: impl Into<String>) -> Self {
		self.region = region.into();
		self
	}

	/// Resources report `Pending` for this many polls before becoming ready.
	pub fn with_pending_polls(mut self, polls: u32) -> Self {
		self.ready_after_polls = polls;
		self
	}

	/// Makes every create of `kind` fail.
	pub fn fail_create(&self, kind: ResourceKind) {
		self.lock().fail_create.insert(kind);
	}

	/// Makes every resource of `kind` report `Failed` when polled.
	pub fn fail_ready(&self, kind: ResourceKind) {
		self.lock().fail_ready.insert(kind);
	}

	pub fn fail_delete(&self, kind: ResourceKind) {
		self.lock().fail_delete.insert(kind);
	}

	pub fn operations(&self) -> Vec<Operation> {
		self.lock().operations.clone()
	}

	/// Logical ids of resources that currently exist.
	pub fn live_resources(&self) -> Vec<ResourceId> {
		self.lock()
			.live
			.values()
			.map(|r| r.deployed.id.clone())
			.collect()
	}

	pub fn is_live(&self, id: &ResourceId) -> bool {
		self.lock().live.values().any(|r| &r.deployed.id == id)
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn arn(&self, service: &str, resource: &str) -> String {
		format!(
			"arn:aws:{service}:{}:{}:{resource}",
			self.region, self.account_id
		)
	}

	fn check_create(&self, state: &State, resource: &ResolvedResource) -> Result<(), ControlPlaneError> {
		match resource {
			ResolvedResource::ArtifactStore { .. } | ResolvedResource::Role { .. } => Ok(()),
			ResolvedResource::ReadGrant {
				role_arn,
				store_name,
			} => {
				require(state.role_by_arn(role_arn).is_some(), role_arn)?;
				require(state.find(ResourceKind::ArtifactStore, store_name).is_some(), store_name)
			}
			ResolvedResource::ArtifactUpload { store_name, .. } => {
				require(state.find(ResourceKind::ArtifactStore, store_name).is_some(), store_name)
			}
			ResolvedResource::Model {
				name,
				execution_role_arn,
				model_data_url,
				..
			} => {
				unique(state, ResourceKind::Model, name.as_str())?;
				require(state.role_by_arn(execution_role_arn).is_some(), execution_role_arn)?;
				let (bucket, key) = split_object_url(model_data_url)?;
				let store = state
					.find(ResourceKind::ArtifactStore, bucket)
					.ok_or_else(|| not_found(bucket))?;
				if !state.has_grant(execution_role_arn, bucket) {
					return Err(ControlPlaneError::Api {
						message: format!("access denied: role cannot read bucket {bucket}"),
					});
				}
				if !store.objects.iter().any(|prefix| key.starts_with(prefix.as_str())) {
					return Err(ControlPlaneError::Api {
						message: format!("could not find model data at {model_data_url}"),
					});
				}
				Ok(())
			}
			ResolvedResource::EndpointConfig { name, variants } => {
				unique(state, ResourceKind::EndpointConfig, name.as_str())?;
				for variant in variants {
					require(
						state.find(ResourceKind::Model, &variant.model_name).is_some(),
						&variant.model_name,
					)?;
				}
				Ok(())
			}
			ResolvedResource::Endpoint { name, config_name } => {
				unique(state, ResourceKind::Endpoint, name.as_str())?;
				require(
					state.find(ResourceKind::EndpointConfig, config_name).is_some(),
					config_name,
				)
			}
		}
	}
}

fn require(present: bool, what: &str) -> Result<(), ControlPlaneError> {
	if present {
		Ok(())
	} else {
		Err(not_found(what))
	}
}

fn not_found(what: &str) -> ControlPlaneError {
	ControlPlaneError::NotFound {
		physical_id: what.to_string(),
	}
}

fn already_exists(name: &str) -> ControlPlaneError {
	ControlPlaneError::Api {
		message: format!("resource {name} already exists"),
	}
}

/// Names are unique per kind; an endpoint may share its configuration's name.
fn unique(state: &State, kind: ResourceKind, name: &str) -> Result<(), ControlPlaneError> {
	if state.find(kind, name).is_some() {
		return Err(already_exists(name));
	}
	Ok(())
}

fn split_object_url(url: &str) -> Result<(&str, &str), ControlPlaneError> {
	url.strip_prefix("s3://")
		.and_then(|rest| rest.split_once('/'))
		.ok_or_else(|| ControlPlaneError::Api {
			message: format!("malformed object url: {url}"),
		})
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
	async fn create(&self, request: &CreateRequest) -> Result<DeployedResource, ControlPlaneError> {
		let kind = request.resource.kind();
		let mut state = self.lock();
		if state.fail_create.contains(&kind) {
			return Err(ControlPlaneError::Api {
				message: format!("injected create failure for {kind}"),
			});
		}
		self.check_create(&state, &request.resource)?;

		state.sequence += 1;
		let sequence = state.sequence;
		let generated = format!("{}-{sequence:04}", request.id.as_str().to_ascii_lowercase());
		let (physical_id, arn, url) = match &request.resource {
			ResolvedResource::ArtifactStore { .. } => {
				let arn = format!("arn:aws:s3:::{generated}");
				(generated, Some(arn), None)
			}
			ResolvedResource::Role { .. } => {
				let arn = format!("arn:aws:iam::{}:role/{generated}", self.account_id);
				(generated, Some(arn), None)
			}
			ResolvedResource::ReadGrant { .. } => (generated, None, None),
			ResolvedResource::ArtifactUpload {
				store_name,
				key_prefix,
				..
			} => {
				let store_key = (ResourceKind::ArtifactStore, store_name.clone());
				if let Some(store) = state.live.get_mut(&store_key) {
					store.objects.push(key_prefix.clone());
				}
				(generated, None, None)
			}
			ResolvedResource::Model { name, .. } => {
				let arn = self.arn("sagemaker", &format!("model/{name}"));
				(name.to_string(), Some(arn), None)
			}
			ResolvedResource::EndpointConfig { name, .. } => {
				let arn = self.arn("sagemaker", &format!("endpoint-config/{name}"));
				(name.to_string(), Some(arn), None)
			}
			ResolvedResource::Endpoint { name, .. } => {
				let arn = self.arn("sagemaker", &format!("endpoint/{name}"));
				let url = format!(
					"https://runtime.sagemaker.{}.amazonaws.com/endpoints/{name}/invocations",
					self.region
				);
				(name.to_string(), Some(arn), Some(url))
			}
		};

		let deployed = DeployedResource {
			id: request.id.clone(),
			kind,
			physical_id: physical_id.clone(),
			arn,
			url,
		};
		state.live.insert(
			(kind, physical_id.clone()),
			LiveResource {
				deployed: deployed.clone(),
				spec: request.resource.clone(),
				pending_polls: self.ready_after_polls,
				objects: Vec::new(),
			},
		);
		state.operations.push(Operation::Create {
			id: request.id.clone(),
			kind,
			physical_id,
		});
		Ok(deployed)
	}

	async fn state(&self, resource: &DeployedResource) -> Result<ResourceState, ControlPlaneError> {
		let mut state = self.lock();
		if state.fail_ready.contains(&resource.kind) {
			return Ok(ResourceState::Failed(format!(
				"{} entered a failed state",
				resource.physical_id
			)));
		}
		let live = state
			.live
			.get_mut(&(resource.kind, resource.physical_id.clone()))
			.ok_or_else(|| not_found(&resource.physical_id))?;
		if live.pending_polls > 0 {
			live.pending_polls -= 1;
			return Ok(ResourceState::Pending);
		}
		Ok(ResourceState::Ready)
	}

	async fn delete(&self, resource: &DeployedResource) -> Result<(), ControlPlaneError> {
		let mut state = self.lock();
		if state.fail_delete.contains(&resource.kind) {
			return Err(ControlPlaneError::Api {
				message: format!("injected delete failure for {}", resource.kind),
			});
		}
		let key = (resource.kind, resource.physical_id.clone());
		let (spec, has_objects) = state
			.live
			.get(&key)
			.map(|live| (live.spec.clone(), !live.objects.is_empty()))
			.ok_or_else(|| not_found(&resource.physical_id))?;

		match spec {
			ResolvedResource::ArtifactStore {
				auto_delete_objects: false,
			} if has_objects => {
				return Err(ControlPlaneError::Api {
					message: format!("bucket {} is not empty", resource.physical_id),
				});
			}
			ResolvedResource::ArtifactUpload {
				store_name,
				key_prefix,
				..
			} => {
				let store_key = (ResourceKind::ArtifactStore, store_name);
				if let Some(store) = state.live.get_mut(&store_key) {
					if let Some(pos) = store.objects.iter().position(|p| *p == key_prefix) {
						store.objects.remove(pos);
					}
				}
			}
			_ => {}
		}

		state.live.remove(&key);
		state.operations.push(Operation::Delete {
			id: resource.id.clone(),
			kind: resource.kind,
			physical_id: resource.physical_id.clone(),
		});
		Ok(())
	}
}
