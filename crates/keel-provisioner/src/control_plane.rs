// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Control-plane abstraction for the cloud provider's resource APIs.
//!
//! The deployer issues fully resolved create requests through this trait; the
//! provider behind it is eventually consistent, so readiness is observed by
//! polling [`ControlPlane::state`].

use std::path::PathBuf;

use async_trait::async_trait;
use keel_common_core::ResourceName;
use serde::Serialize;

use crate::resource::{Attribute, ResourceId, ResourceKind};

/// Errors returned by a control-plane implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlPlaneError {
	#[error("control plane API error: {message}")]
	Api { message: String },

	#[error("resource not found: {physical_id}")]
	NotFound { physical_id: String },

	#[error("control plane request timed out")]
	Timeout,
}

/// A traffic variant with its model reference resolved to a concrete name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariant {
	pub variant_name: String,
	pub model_name: String,
	pub instance_type: String,
	pub initial_instance_count: u32,
}

/// A resource spec with every attribute reference replaced by its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedResource {
	ArtifactStore {
		auto_delete_objects: bool,
	},
	Role {
		service_principal: String,
		managed_policies: Vec<String>,
	},
	ReadGrant {
		role_arn: String,
		store_name: String,
	},
	ArtifactUpload {
		store_name: String,
		source: PathBuf,
		key_prefix: String,
	},
	Model {
		name: ResourceName,
		execution_role_arn: String,
		image: String,
		model_data_url: String,
	},
	EndpointConfig {
		name: ResourceName,
		variants: Vec<ResolvedVariant>,
	},
	Endpoint {
		name: ResourceName,
		config_name: String,
	},
}

impl ResolvedResource {
	pub fn kind(&self) -> ResourceKind {
		match self {
			ResolvedResource::ArtifactStore { .. } => ResourceKind::ArtifactStore,
			ResolvedResource::Role { .. } => ResourceKind::Role,
			ResolvedResource::ReadGrant { .. } => ResourceKind::ReadGrant,
			ResolvedResource::ArtifactUpload { .. } => ResourceKind::ArtifactUpload,
			ResolvedResource::Model { .. } => ResourceKind::Model,
			ResolvedResource::EndpointConfig { .. } => ResourceKind::EndpointConfig,
			ResolvedResource::Endpoint { .. } => ResourceKind::Endpoint,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
	pub id: ResourceId,
	pub resource: ResolvedResource,
}

/// A resource that exists at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedResource {
	pub id: ResourceId,
	pub kind: ResourceKind,
	pub physical_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub arn: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

impl DeployedResource {
	pub fn attribute(&self, attribute: Attribute) -> Option<&str> {
		match attribute {
			Attribute::Name => Some(self.physical_id.as_str()),
			Attribute::Arn => self.arn.as_deref(),
			Attribute::Url => self.url.as_deref(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
	Pending,
	Ready,
	Failed(String),
}

/// Create/read/delete primitives of the cloud provider.
#[async_trait]
pub trait ControlPlane: Send + Sync {
	async fn create(&self, request: &CreateRequest) -> Result<DeployedResource, ControlPlaneError>;

	async fn state(&self, resource: &DeployedResource) -> Result<ResourceState, ControlPlaneError>;

	async fn delete(&self, resource: &DeployedResource) -> Result<(), ControlPlaneError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn attribute_lookup() {
		let resource = DeployedResource {
			id: ResourceId::new("SageMakerInvokeRole"),
			kind: ResourceKind::Role,
			physical_id: "keel-role-1".to_string(),
			arn: Some("arn:aws:iam::000000000000:role/keel-role-1".to_string()),
			url: None,
		};
		assert_eq!(resource.attribute(Attribute::Name), Some("keel-role-1"));
		assert_eq!(
			resource.attribute(Attribute::Arn),
			Some("arn:aws:iam::000000000000:role/keel-role-1")
		);
		assert_eq!(resource.attribute(Attribute::Url), None);
	}
}
