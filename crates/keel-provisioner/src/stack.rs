// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The inference endpoint stack.
//!
//! Builds the chain artifact store → role → read grant → artifact upload →
//! model → endpoint configuration → endpoint, and exports the endpoint name.

use std::path::PathBuf;

use keel_common_core::{ResourceName, ENDPOINT_EXPORT_NAME};
use rand::RngCore;

use crate::error::{ProvisionError, Result};
use crate::naming::{
	generate_resource_name, DEFAULT_ENDPOINT_NAME_LENGTH, DEFAULT_MODEL_NAME_LENGTH,
	ENDPOINT_NAME_PREFIX, MODEL_NAME_PREFIX,
};
use crate::plan::{Plan, PlanBuilder};
use crate::resource::{
	ArtifactLocation, AttrRef, ProductionVariant, RemovalPolicy, ResourceId, ResourceSpec,
};

/// Logical ids of the stack's nodes.
pub mod ids {
	pub const MODEL_BUCKET: &str = "ModelBucket";
	pub const EXECUTION_ROLE: &str = "SageMakerInvokeRole";
	pub const BUCKET_READ_GRANT: &str = "ModelBucketReadGrant";
	pub const ARTIFACT_UPLOAD: &str = "DeployModelArtifact";
	pub const MODEL: &str = "SageMakerModel";
	pub const ENDPOINT_CONFIG: &str = "CustomEndpointConfig";
	pub const ENDPOINT: &str = "CustomEndpoint";
}

#[derive(Debug, Clone)]
pub struct StackSettings {
	/// Local directory holding the packaged model.
	pub artifact_source: PathBuf,
	pub key_prefix: String,
	/// Object key of the packaged model; must live under `key_prefix`.
	pub artifact_key: String,
	pub image: String,
	pub instance_type: String,
	pub variant_name: String,
	pub initial_instance_count: u32,
	pub model_name_length: usize,
	pub endpoint_name_length: usize,
	pub removal_policy: RemovalPolicy,
	pub auto_delete_objects: bool,
	pub service_principal: String,
	pub managed_policies: Vec<String>,
	pub export_name: String,
}

impl Default for StackSettings {
	fn default() -> Self {
		Self {
			artifact_source: PathBuf::from("./local_model_artifacts"),
			key_prefix: "models/".to_string(),
			artifact_key: "models/models.tar.gz".to_string(),
			image: "app-custom-model:latest".to_string(),
			instance_type: "ml.t2.medium".to_string(),
			variant_name: "AllTraffic".to_string(),
			initial_instance_count: 1,
			model_name_length: DEFAULT_MODEL_NAME_LENGTH,
			endpoint_name_length: DEFAULT_ENDPOINT_NAME_LENGTH,
			removal_policy: RemovalPolicy::Destroy,
			auto_delete_objects: true,
			service_principal: "sagemaker.amazonaws.com".to_string(),
			managed_policies: vec!["AmazonSageMakerFullAccess".to_string()],
			export_name: ENDPOINT_EXPORT_NAME.to_string(),
		}
	}
}

/// A built stack plus the names generated for it.
#[derive(Debug, Clone)]
pub struct InferenceStack {
	pub plan: Plan,
	pub model_name: ResourceName,
	/// Shared by the endpoint configuration and the endpoint.
	pub endpoint_name: ResourceName,
}

pub fn inference_stack<R: RngCore + ?Sized>(
	settings: &StackSettings,
	rng: &mut R,
) -> Result<InferenceStack> {
	if !settings.artifact_key.starts_with(&settings.key_prefix) {
		return Err(ProvisionError::InvalidSpec {
			resource: ResourceId::new(ids::MODEL),
			reason: format!(
				"artifact key '{}' is outside upload prefix '{}'",
				settings.artifact_key, settings.key_prefix
			),
		});
	}

	let mut builder = PlanBuilder::new();

	let bucket = builder.add(
		ids::MODEL_BUCKET,
		ResourceSpec::ArtifactStore {
			auto_delete_objects: settings.auto_delete_objects,
		},
	)?;
	builder.set_removal_policy(&bucket, settings.removal_policy)?;

	let role = builder.add(
		ids::EXECUTION_ROLE,
		ResourceSpec::Role {
			service_principal: settings.service_principal.clone(),
			managed_policies: settings.managed_policies.clone(),
		},
	)?;

	let grant = builder.add(
		ids::BUCKET_READ_GRANT,
		ResourceSpec::ReadGrant {
			role: AttrRef::arn(&role),
			store: AttrRef::name(&bucket),
		},
	)?;

	let upload = builder.add(
		ids::ARTIFACT_UPLOAD,
		ResourceSpec::ArtifactUpload {
			store: AttrRef::name(&bucket),
			source: settings.artifact_source.clone(),
			key_prefix: settings.key_prefix.clone(),
		},
	)?;
	// Uploaded objects live and die with their bucket.
	builder.set_removal_policy(&upload, settings.removal_policy)?;

	let model_name =
		generate_resource_name(rng, MODEL_NAME_PREFIX, settings.model_name_length)?;
	let model = builder.add(
		ids::MODEL,
		ResourceSpec::Model {
			name: model_name.clone(),
			execution_role: AttrRef::arn(&role),
			image: settings.image.clone(),
			model_data: ArtifactLocation {
				store: AttrRef::name(&bucket),
				key: settings.artifact_key.clone(),
			},
		},
	)?;
	// Neither edge is implied by a reference: the model only names the role
	// and the bucket, not the grant or the upload.
	builder.add_dependency(&model, &grant)?;
	builder.add_dependency(&model, &upload)?;

	let endpoint_name =
		generate_resource_name(rng, ENDPOINT_NAME_PREFIX, settings.endpoint_name_length)?;
	let config = builder.add(
		ids::ENDPOINT_CONFIG,
		ResourceSpec::EndpointConfig {
			name: endpoint_name.clone(),
			variants: vec![ProductionVariant {
				variant_name: settings.variant_name.clone(),
				model: AttrRef::name(&model),
				instance_type: settings.instance_type.clone(),
				initial_instance_count: settings.initial_instance_count,
			}],
		},
	)?;

	let endpoint = builder.add(
		ids::ENDPOINT,
		ResourceSpec::Endpoint {
			name: endpoint_name.clone(),
			config: AttrRef::name(&config),
		},
	)?;

	builder.export(settings.export_name.clone(), AttrRef::name(&endpoint))?;

	Ok(InferenceStack {
		plan: builder.build()?,
		model_name,
		endpoint_name,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::resource::{Completion, ResourceKind};
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	fn build(settings: &StackSettings) -> InferenceStack {
		inference_stack(settings, &mut StdRng::seed_from_u64(1)).unwrap()
	}

	fn id(s: &str) -> ResourceId {
		ResourceId::new(s)
	}

	#[test]
	fn every_link_in_the_chain_is_a_declared_edge() {
		let stack = build(&StackSettings::default());
		let plan = &stack.plan;

		let edges = [
			(ids::BUCKET_READ_GRANT, ids::EXECUTION_ROLE),
			(ids::BUCKET_READ_GRANT, ids::MODEL_BUCKET),
			(ids::ARTIFACT_UPLOAD, ids::MODEL_BUCKET),
			(ids::MODEL, ids::EXECUTION_ROLE),
			(ids::MODEL, ids::BUCKET_READ_GRANT),
			(ids::MODEL, ids::ARTIFACT_UPLOAD),
			(ids::ENDPOINT_CONFIG, ids::MODEL),
			(ids::ENDPOINT, ids::ENDPOINT_CONFIG),
		];
		for (dependent, dependency) in edges {
			assert!(
				plan.depends_on(&id(dependent), &id(dependency)),
				"{dependent} must depend on {dependency}"
			);
		}
	}

	#[test]
	fn endpoint_never_precedes_its_configuration() {
		let stack = build(&StackSettings::default());
		let order: Vec<_> = stack
			.plan
			.creation_order()
			.map(|n| n.id().as_str().to_string())
			.collect();
		let pos = |name: &str| order.iter().position(|n| n == name).unwrap();

		assert!(pos(ids::MODEL_BUCKET) < pos(ids::BUCKET_READ_GRANT));
		assert!(pos(ids::EXECUTION_ROLE) < pos(ids::BUCKET_READ_GRANT));
		assert!(pos(ids::BUCKET_READ_GRANT) < pos(ids::MODEL));
		assert!(pos(ids::ARTIFACT_UPLOAD) < pos(ids::MODEL));
		assert!(pos(ids::MODEL) < pos(ids::ENDPOINT_CONFIG));
		assert!(pos(ids::ENDPOINT_CONFIG) < pos(ids::ENDPOINT));
		assert_eq!(order.len(), 7);
	}

	#[test]
	fn names_follow_generation_policy() {
		let stack = build(&StackSettings::default());
		assert!(stack.model_name.as_str().starts_with("model-"));
		assert_eq!(stack.model_name.as_str().len(), "model-".len() + 6);
		assert!(stack.endpoint_name.as_str().starts_with("endpoint-"));
		assert_eq!(stack.endpoint_name.as_str().len(), "endpoint-".len() + 10);
	}

	#[test]
	fn endpoint_and_configuration_share_a_name() {
		let stack = build(&StackSettings::default());
		let config = stack.plan.node(&id(ids::ENDPOINT_CONFIG)).unwrap();
		let endpoint = stack.plan.node(&id(ids::ENDPOINT)).unwrap();
		match (config.spec(), endpoint.spec()) {
			(
				ResourceSpec::EndpointConfig { name: a, variants },
				ResourceSpec::Endpoint { name: b, .. },
			) => {
				assert_eq!(a, b);
				assert_eq!(variants.len(), 1);
				assert_eq!(variants[0].initial_instance_count, 1);
				assert_eq!(variants[0].instance_type, "ml.t2.medium");
				assert_eq!(variants[0].variant_name, "AllTraffic");
			}
			other => panic!("unexpected specs: {other:?}"),
		}
	}

	#[test]
	fn exports_endpoint_name() {
		let stack = build(&StackSettings::default());
		let export = stack.plan.export(ENDPOINT_EXPORT_NAME).unwrap();
		assert_eq!(export.value, AttrRef::name(ids::ENDPOINT));
	}

	#[test]
	fn retain_policy_covers_bucket_and_upload_only() {
		let settings = StackSettings {
			removal_policy: RemovalPolicy::Retain,
			..Default::default()
		};
		let stack = build(&settings);
		for node in stack.plan.nodes() {
			let expected = match node.kind() {
				ResourceKind::ArtifactStore | ResourceKind::ArtifactUpload => RemovalPolicy::Retain,
				_ => RemovalPolicy::Destroy,
			};
			assert_eq!(node.removal_policy(), expected, "{}", node.id());
		}
	}

	#[test]
	fn role_and_endpoint_wait_for_readiness() {
		let stack = build(&StackSettings::default());
		let plan = &stack.plan;
		assert_eq!(
			plan.node(&id(ids::EXECUTION_ROLE)).unwrap().completion(),
			Completion::UntilReady
		);
		assert_eq!(
			plan.node(&id(ids::ENDPOINT)).unwrap().completion(),
			Completion::UntilReady
		);
		assert_eq!(
			plan.node(&id(ids::MODEL)).unwrap().completion(),
			Completion::OnCreate
		);
	}

	#[test]
	fn artifact_key_outside_prefix_is_rejected() {
		let settings = StackSettings {
			artifact_key: "other/models.tar.gz".to_string(),
			..Default::default()
		};
		let err = inference_stack(&settings, &mut StdRng::seed_from_u64(1)).unwrap_err();
		assert!(matches!(err, ProvisionError::InvalidSpec { .. }));
	}

	#[test]
	fn zero_capacity_is_rejected() {
		let settings = StackSettings {
			initial_instance_count: 0,
			..Default::default()
		};
		assert!(inference_stack(&settings, &mut StdRng::seed_from_u64(1)).is_err());
	}

	#[test]
	fn fresh_names_on_every_build() {
		let settings = StackSettings::default();
		let a = inference_stack(&settings, &mut rand::thread_rng()).unwrap();
		let b = inference_stack(&settings, &mut rand::thread_rng()).unwrap();
		assert_ne!(a.endpoint_name, b.endpoint_name);
	}
}
