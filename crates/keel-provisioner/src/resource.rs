// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource declarations that make up a provisioning plan.
//!
//! A [`ResourceSpec`] describes one resource to create. Values that are only
//! known once another resource exists (a role ARN, a bucket name) are written
//! as [`AttrRef`]s and resolved by the deployer after the referenced resource
//! has been created. Every reference implies a dependency edge.

use std::fmt;
use std::path::PathBuf;

use keel_common_core::ResourceName;
use serde::{Deserialize, Serialize};

/// Logical identifier of a node in a plan, e.g. `ModelBucket`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ResourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ResourceId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

impl From<String> for ResourceId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<&ResourceId> for ResourceId {
	fn from(id: &ResourceId) -> Self {
		id.clone()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
	ArtifactStore,
	Role,
	ReadGrant,
	ArtifactUpload,
	Model,
	EndpointConfig,
	Endpoint,
}

impl ResourceKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ResourceKind::ArtifactStore => "artifact_store",
			ResourceKind::Role => "role",
			ResourceKind::ReadGrant => "read_grant",
			ResourceKind::ArtifactUpload => "artifact_upload",
			ResourceKind::Model => "model",
			ResourceKind::EndpointConfig => "endpoint_config",
			ResourceKind::Endpoint => "endpoint",
		}
	}

	/// Resource type name used in synthesized templates.
	pub fn type_name(&self) -> &'static str {
		match self {
			ResourceKind::ArtifactStore => "AWS::S3::Bucket",
			ResourceKind::Role => "AWS::IAM::Role",
			ResourceKind::ReadGrant => "AWS::IAM::Policy",
			ResourceKind::ArtifactUpload => "Custom::BucketDeployment",
			ResourceKind::Model => "AWS::SageMaker::Model",
			ResourceKind::EndpointConfig => "AWS::SageMaker::EndpointConfig",
			ResourceKind::Endpoint => "AWS::SageMaker::Endpoint",
		}
	}
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Attribute of a created resource that other resources may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
	/// Physical name (bucket name, model name, endpoint name).
	Name,
	Arn,
	Url,
}

/// Late-bound reference to an attribute of another plan node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttrRef {
	pub resource: ResourceId,
	pub attribute: Attribute,
}

impl AttrRef {
	pub fn new(resource: impl Into<ResourceId>, attribute: Attribute) -> Self {
		Self {
			resource: resource.into(),
			attribute,
		}
	}

	pub fn name(resource: impl Into<ResourceId>) -> Self {
		Self::new(resource, Attribute::Name)
	}

	pub fn arn(resource: impl Into<ResourceId>) -> Self {
		Self::new(resource, Attribute::Arn)
	}

	pub fn url(resource: impl Into<ResourceId>) -> Self {
		Self::new(resource, Attribute::Url)
	}
}

/// What happens to a resource when its deployment is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
	/// Delete the resource (non-production default).
	#[default]
	Destroy,
	/// Leave the resource in place.
	Retain,
}

/// When a node counts as complete, allowing its dependents to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
	/// Complete as soon as the create call returns.
	OnCreate,
	/// Complete once the control plane reports the resource ready.
	UntilReady,
}

/// Location of a packaged model inside an artifact store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
	pub store: AttrRef,
	pub key: String,
}

/// One traffic variant of an endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionVariant {
	pub variant_name: String,
	pub model: AttrRef,
	pub instance_type: String,
	pub initial_instance_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSpec {
	ArtifactStore {
		auto_delete_objects: bool,
	},
	Role {
		service_principal: String,
		managed_policies: Vec<String>,
	},
	ReadGrant {
		role: AttrRef,
		store: AttrRef,
	},
	ArtifactUpload {
		store: AttrRef,
		source: PathBuf,
		key_prefix: String,
	},
	Model {
		name: ResourceName,
		execution_role: AttrRef,
		image: String,
		model_data: ArtifactLocation,
	},
	EndpointConfig {
		name: ResourceName,
		variants: Vec<ProductionVariant>,
	},
	Endpoint {
		name: ResourceName,
		config: AttrRef,
	},
}

impl ResourceSpec {
	pub fn kind(&self) -> ResourceKind {
		match self {
			ResourceSpec::ArtifactStore { .. } => ResourceKind::ArtifactStore,
			ResourceSpec::Role { .. } => ResourceKind::Role,
			ResourceSpec::ReadGrant { .. } => ResourceKind::ReadGrant,
			ResourceSpec::ArtifactUpload { .. } => ResourceKind::ArtifactUpload,
			ResourceSpec::Model { .. } => ResourceKind::Model,
			ResourceSpec::EndpointConfig { .. } => ResourceKind::EndpointConfig,
			ResourceSpec::Endpoint { .. } => ResourceKind::Endpoint,
		}
	}

	/// All attribute references made by this spec.
	pub fn references(&self) -> Vec<&AttrRef> {
		match self {
			ResourceSpec::ArtifactStore { .. } | ResourceSpec::Role { .. } => Vec::new(),
			ResourceSpec::ReadGrant { role, store } => vec![role, store],
			ResourceSpec::ArtifactUpload { store, .. } => vec![store],
			ResourceSpec::Model {
				execution_role,
				model_data,
				..
			} => vec![execution_role, &model_data.store],
			ResourceSpec::EndpointConfig { variants, .. } => {
				variants.iter().map(|v| &v.model).collect()
			}
			ResourceSpec::Endpoint { config, .. } => vec![config],
		}
	}

	/// Roles need permission propagation and endpoints need to come in
	/// service before dependents may use them.
	pub fn default_completion(&self) -> Completion {
		match self {
			ResourceSpec::Role { .. } | ResourceSpec::Endpoint { .. } => Completion::UntilReady,
			_ => Completion::OnCreate,
		}
	}

	/// Checks constraints that do not depend on other nodes.
	pub fn validate(&self) -> Result<(), String> {
		match self {
			ResourceSpec::ArtifactStore { .. } => Ok(()),
			ResourceSpec::Role {
				service_principal, ..
			} => {
				if service_principal.trim().is_empty() {
					return Err("service principal must not be empty".to_string());
				}
				Ok(())
			}
			ResourceSpec::ReadGrant { .. } => Ok(()),
			ResourceSpec::ArtifactUpload { key_prefix, .. } => {
				if key_prefix.starts_with('/') {
					return Err(format!("key prefix '{key_prefix}' must be relative"));
				}
				Ok(())
			}
			ResourceSpec::Model {
				image, model_data, ..
			} => {
				if image.trim().is_empty() {
					return Err("container image must not be empty".to_string());
				}
				if model_data.key.trim().is_empty() {
					return Err("model data key must not be empty".to_string());
				}
				Ok(())
			}
			ResourceSpec::EndpointConfig { variants, .. } => {
				if variants.is_empty() {
					return Err("endpoint configuration needs at least one variant".to_string());
				}
				for variant in variants {
					if variant.initial_instance_count == 0 {
						return Err(format!(
							"variant '{}' must start with at least one instance",
							variant.variant_name
						));
					}
					if variant.instance_type.trim().is_empty() {
						return Err(format!(
							"variant '{}' has no instance type",
							variant.variant_name
						));
					}
				}
				Ok(())
			}
			ResourceSpec::Endpoint { .. } => Ok(()),
		}
	}
}
