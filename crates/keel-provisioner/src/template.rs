// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Template synthesis for an external deployment engine.
//!
//! The template lists every node with its type, properties and `DependsOn`
//! edges. Attribute references render as `Ref` / `Fn::GetAtt` so the engine
//! resolves them at deploy time.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::plan::Plan;
use crate::resource::{AttrRef, Attribute, RemovalPolicy, ResourceSpec};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
	pub resources: BTreeMap<String, TemplateResource>,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub outputs: BTreeMap<String, TemplateOutput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
	#[serde(rename = "Type")]
	pub resource_type: String,
	pub properties: Value,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub depends_on: Vec<String>,
	pub deletion_policy: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
	pub value: Value,
	pub export: TemplateExport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateExport {
	pub name: String,
}

impl Plan {
	pub fn to_template(&self) -> Template {
		let resources = self
			.nodes()
			.iter()
			.map(|node| {
				let resource = TemplateResource {
					resource_type: node.kind().type_name().to_string(),
					properties: properties(node.spec()),
					depends_on: node
						.dependencies()
						.iter()
						.map(|id| id.to_string())
						.collect(),
					deletion_policy: match node.removal_policy() {
						RemovalPolicy::Destroy => "Delete",
						RemovalPolicy::Retain => "Retain",
					},
				};
				(node.id().to_string(), resource)
			})
			.collect();

		let outputs = self
			.exports()
			.iter()
			.map(|export| {
				let output = TemplateOutput {
					value: render_ref(&export.value),
					export: TemplateExport {
						name: export.name.clone(),
					},
				};
				(export.name.clone(), output)
			})
			.collect();

		Template { resources, outputs }
	}
}

fn render_ref(reference: &AttrRef) -> Value {
	match reference.attribute {
		Attribute::Name => json!({ "Ref": reference.resource.as_str() }),
		Attribute::Arn => json!({ "Fn::GetAtt": [reference.resource.as_str(), "Arn"] }),
		Attribute::Url => json!({ "Fn::GetAtt": [reference.resource.as_str(), "Url"] }),
	}
}

fn properties(spec: &ResourceSpec) -> Value {
	match spec {
		ResourceSpec::ArtifactStore {
			auto_delete_objects,
		} => json!({ "AutoDeleteObjects": auto_delete_objects }),
		ResourceSpec::Role {
			service_principal,
			managed_policies,
		} => json!({
			"AssumeRolePolicyDocument": {
				"Version": "2012-10-17",
				"Statement": [{
					"Effect": "Allow",
					"Principal": { "Service": service_principal },
					"Action": "sts:AssumeRole",
				}],
			},
			"ManagedPolicyArns": managed_policies
				.iter()
				.map(|p| format!("arn:aws:iam::aws:policy/{p}"))
				.collect::<Vec<_>>(),
		}),
		ResourceSpec::ReadGrant { role, store } => json!({
			"Roles": [render_ref(role)],
			"PolicyDocument": {
				"Version": "2012-10-17",
				"Statement": [{
					"Effect": "Allow",
					"Action": ["s3:GetObject*", "s3:GetBucket*", "s3:List*"],
					"Resource": [
						{ "Fn::Join": ["", ["arn:aws:s3:::", render_ref(store)]] },
						{ "Fn::Join": ["", ["arn:aws:s3:::", render_ref(store), "/*"]] },
					],
				}],
			},
		}),
		ResourceSpec::ArtifactUpload {
			store,
			source,
			key_prefix,
		} => json!({
			"DestinationBucketName": render_ref(store),
			"DestinationBucketKeyPrefix": key_prefix,
			"Source": source.display().to_string(),
		}),
		ResourceSpec::Model {
			name,
			execution_role,
			image,
			model_data,
		} => json!({
			"ModelName": name.as_str(),
			"ExecutionRoleArn": render_ref(execution_role),
			"PrimaryContainer": {
				"Image": image,
				"ModelDataUrl": {
					"Fn::Join": ["", ["s3://", render_ref(&model_data.store), "/", model_data.key]],
				},
			},
		}),
		ResourceSpec::EndpointConfig { name, variants } => json!({
			"EndpointConfigName": name.as_str(),
			"ProductionVariants": variants
				.iter()
				.map(|v| json!({
					"VariantName": v.variant_name,
					"ModelName": render_ref(&v.model),
					"InstanceType": v.instance_type,
					"InitialInstanceCount": v.initial_instance_count,
				}))
				.collect::<Vec<_>>(),
		}),
		ResourceSpec::Endpoint { name, config } => json!({
			"EndpointName": name.as_str(),
			"EndpointConfigName": render_ref(config),
		}),
	}
}
