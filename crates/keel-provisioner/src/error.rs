// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioner error types.

use keel_common_core::NameError;

use crate::control_plane::ControlPlaneError;
use crate::resource::{ResourceId, ResourceKind};

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Errors raised while building, applying or tearing down a plan.
///
/// Plan construction errors are detected before any resource is created.
/// Apply errors are fatal to the deployment: the walk stops at the first one.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
	#[error("duplicate resource id: {0}")]
	DuplicateResource(ResourceId),

	#[error("resource {dependent} references unknown resource {missing}")]
	UnknownResource {
		dependent: ResourceId,
		missing: ResourceId,
	},

	#[error("resource {0} cannot depend on itself")]
	SelfDependency(ResourceId),

	#[error("dependency cycle among resources: {}", join_ids(.0))]
	DependencyCycle(Vec<ResourceId>),

	#[error("duplicate export name: {0}")]
	DuplicateExport(String),

	#[error("invalid spec for {resource}: {reason}")]
	InvalidSpec { resource: ResourceId, reason: String },

	#[error(transparent)]
	InvalidName(#[from] NameError),

	#[error("resource {resource} references {target} before it was created")]
	UnresolvedReference {
		resource: ResourceId,
		target: ResourceId,
	},

	#[error("failed to create {resource} ({kind}): {source}")]
	StepFailed {
		resource: ResourceId,
		kind: ResourceKind,
		#[source]
		source: ControlPlaneError,
	},

	#[error("{resource} failed to become ready: {reason}")]
	NotReady { resource: ResourceId, reason: String },

	#[error("timed out waiting for {resource} to become ready")]
	ReadyTimeout { resource: ResourceId },

	#[error("failed to delete {resource}: {source}")]
	TeardownFailed {
		resource: ResourceId,
		#[source]
		source: ControlPlaneError,
	},

	#[error("deployment has no export named {0}")]
	MissingExport(String),
}

fn join_ids(ids: &[ResourceId]) -> String {
	ids.iter()
		.map(ResourceId::as_str)
		.collect::<Vec<_>>()
		.join(", ")
}
