// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning for Keel's managed inference endpoint.
//!
//! A [`Plan`] is an acyclic graph of resources whose edges come from
//! attribute references and explicit orderings. The [`Deployer`] walks it in
//! dependency order against a [`ControlPlane`], waiting on readiness where a
//! node requires it, and publishes the endpoint name as an export.

pub mod control_plane;
pub mod deployer;
pub mod error;
pub mod memory;
pub mod naming;
pub mod plan;
pub mod provisioner;
pub mod resource;
pub mod stack;
pub mod template;

pub use control_plane::{
	ControlPlane, ControlPlaneError, CreateRequest, DeployedResource, ResolvedResource,
	ResolvedVariant, ResourceState,
};
pub use deployer::{DeploySettings, Deployer, Deployment, TeardownSummary};
pub use error::{ProvisionError, Result};
pub use memory::{InMemoryControlPlane, Operation};
pub use naming::{generate_name, generate_name_with, generate_resource_name};
pub use plan::{Export, Plan, PlanBuilder, PlanNode};
pub use provisioner::{Provisioned, Provisioner};
pub use resource::{
	ArtifactLocation, AttrRef, Attribute, Completion, ProductionVariant, RemovalPolicy,
	ResourceId, ResourceKind, ResourceSpec,
};
pub use stack::{ids, inference_stack, InferenceStack, StackSettings};
pub use template::Template;
