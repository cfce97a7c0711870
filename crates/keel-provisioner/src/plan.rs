// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dependency plan construction.
//!
//! A [`Plan`] is a directed acyclic graph of resource-creation nodes. Edges
//! come from two places: attribute references inside a spec, and explicit
//! [`PlanBuilder::add_dependency`] calls for orderings that no reference
//! expresses (for example, a read grant that must exist before a model is
//! registered). Execution order is derived from the edges, never from the
//! order in which resources were added.

use std::collections::{BTreeSet, HashMap};

use crate::error::{ProvisionError, Result};
use crate::resource::{AttrRef, Completion, RemovalPolicy, ResourceId, ResourceKind, ResourceSpec};

#[derive(Debug, Clone)]
pub struct PlanNode {
	id: ResourceId,
	spec: ResourceSpec,
	removal_policy: RemovalPolicy,
	completion: Completion,
	dependencies: BTreeSet<ResourceId>,
}

impl PlanNode {
	pub fn id(&self) -> &ResourceId {
		&self.id
	}

	pub fn spec(&self) -> &ResourceSpec {
		&self.spec
	}

	pub fn kind(&self) -> ResourceKind {
		self.spec.kind()
	}

	pub fn removal_policy(&self) -> RemovalPolicy {
		self.removal_policy
	}

	pub fn completion(&self) -> Completion {
		self.completion
	}

	/// Direct dependencies, implied and explicit.
	pub fn dependencies(&self) -> &BTreeSet<ResourceId> {
		&self.dependencies
	}
}

/// A named value published once the plan has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
	pub name: String,
	pub value: AttrRef,
}

#[derive(Debug, Default)]
pub struct PlanBuilder {
	nodes: Vec<PlanNode>,
	index: HashMap<ResourceId, usize>,
	exports: Vec<Export>,
}

impl PlanBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a node. Every resource the spec references must already be in the
	/// plan, and each one becomes a dependency of the new node.
	pub fn add(&mut self, id: impl Into<ResourceId>, spec: ResourceSpec) -> Result<ResourceId> {
		let id = id.into();
		if self.index.contains_key(&id) {
			return Err(ProvisionError::DuplicateResource(id));
		}

		spec.validate().map_err(|reason| ProvisionError::InvalidSpec {
			resource: id.clone(),
			reason,
		})?;

		let mut dependencies = BTreeSet::new();
		for reference in spec.references() {
			if !self.index.contains_key(&reference.resource) {
				return Err(ProvisionError::UnknownResource {
					dependent: id,
					missing: reference.resource.clone(),
				});
			}
			dependencies.insert(reference.resource.clone());
		}

		let completion = spec.default_completion();
		self.index.insert(id.clone(), self.nodes.len());
		self.nodes.push(PlanNode {
			id: id.clone(),
			spec,
			removal_policy: RemovalPolicy::default(),
			completion,
			dependencies,
		});
		Ok(id)
	}

	/// Declares that `dependent` must not start before `dependency` completes.
	pub fn add_dependency(&mut self, dependent: &ResourceId, dependency: &ResourceId) -> Result<()> {
		if dependent == dependency {
			return Err(ProvisionError::SelfDependency(dependent.clone()));
		}
		if !self.index.contains_key(dependency) {
			return Err(ProvisionError::UnknownResource {
				dependent: dependent.clone(),
				missing: dependency.clone(),
			});
		}
		let node = self.node_mut(dependent)?;
		node.dependencies.insert(dependency.clone());
		Ok(())
	}

	pub fn set_removal_policy(&mut self, id: &ResourceId, policy: RemovalPolicy) -> Result<()> {
		self.node_mut(id)?.removal_policy = policy;
		Ok(())
	}

	pub fn set_completion(&mut self, id: &ResourceId, completion: Completion) -> Result<()> {
		self.node_mut(id)?.completion = completion;
		Ok(())
	}

	/// Publishes an attribute of a node under a globally unique export name.
	pub fn export(&mut self, name: impl Into<String>, value: AttrRef) -> Result<()> {
		let name = name.into();
		if self.exports.iter().any(|e| e.name == name) {
			return Err(ProvisionError::DuplicateExport(name));
		}
		if !self.index.contains_key(&value.resource) {
			return Err(ProvisionError::UnknownResource {
				dependent: ResourceId::new(name),
				missing: value.resource,
			});
		}
		self.exports.push(Export { name, value });
		Ok(())
	}

	/// Validates the graph and fixes the creation order.
	pub fn build(self) -> Result<Plan> {
		let order = topological_order(&self.nodes, &self.index)?;
		Ok(Plan {
			nodes: self.nodes,
			index: self.index,
			exports: self.exports,
			order,
		})
	}

	fn node_mut(&mut self, id: &ResourceId) -> Result<&mut PlanNode> {
		let idx = *self
			.index
			.get(id)
			.ok_or_else(|| ProvisionError::UnknownResource {
				dependent: id.clone(),
				missing: id.clone(),
			})?;
		Ok(&mut self.nodes[idx])
	}
}

/// Kahn's algorithm. Among nodes that are ready at the same time, the one
/// added first goes first, so the order is deterministic.
fn topological_order(nodes: &[PlanNode], index: &HashMap<ResourceId, usize>) -> Result<Vec<usize>> {
	let mut remaining: Vec<usize> = nodes.iter().map(|n| n.dependencies.len()).collect();
	let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
	for (idx, node) in nodes.iter().enumerate() {
		for dependency in &node.dependencies {
			dependents[index[dependency]].push(idx);
		}
	}

	let mut ready: BTreeSet<usize> = remaining
		.iter()
		.enumerate()
		.filter(|(_, count)| **count == 0)
		.map(|(idx, _)| idx)
		.collect();

	let mut order = Vec::with_capacity(nodes.len());
	while let Some(idx) = ready.pop_first() {
		order.push(idx);
		for &dependent in &dependents[idx] {
			remaining[dependent] -= 1;
			if remaining[dependent] == 0 {
				ready.insert(dependent);
			}
		}
	}

	if order.len() != nodes.len() {
		let stuck = remaining
			.iter()
			.enumerate()
			.filter(|(_, count)| **count > 0)
			.map(|(idx, _)| nodes[idx].id.clone())
			.collect();
		return Err(ProvisionError::DependencyCycle(stuck));
	}

	Ok(order)
}

/// A validated, acyclic provisioning plan.
#[derive(Debug, Clone)]
pub struct Plan {
	nodes: Vec<PlanNode>,
	index: HashMap<ResourceId, usize>,
	exports: Vec<Export>,
	order: Vec<usize>,
}

impl Plan {
	/// Nodes in the order they were declared.
	pub fn nodes(&self) -> &[PlanNode] {
		&self.nodes
	}

	pub fn node(&self, id: &ResourceId) -> Option<&PlanNode> {
		self.index.get(id).map(|&idx| &self.nodes[idx])
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Whether `dependent` declares a direct edge onto `dependency`.
	pub fn depends_on(&self, dependent: &ResourceId, dependency: &ResourceId) -> bool {
		self.node(dependent)
			.is_some_and(|node| node.dependencies.contains(dependency))
	}

	/// Direct dependencies of `id`, or `None` if the node is unknown.
	pub fn dependencies(&self, id: &ResourceId) -> Option<&BTreeSet<ResourceId>> {
		self.node(id).map(PlanNode::dependencies)
	}

	/// Nodes in an order where every node follows all of its dependencies.
	pub fn creation_order(&self) -> impl DoubleEndedIterator<Item = &PlanNode> + '_ {
		self.order.iter().map(|&idx| &self.nodes[idx])
	}

	/// Exact reverse of [`Plan::creation_order`].
	pub fn teardown_order(&self) -> impl Iterator<Item = &PlanNode> + '_ {
		self.creation_order().rev()
	}

	pub fn exports(&self) -> &[Export] {
		&self.exports
	}

	pub fn export(&self, name: &str) -> Option<&Export> {
		self.exports.iter().find(|e| e.name == name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::resource::Attribute;

	fn store() -> ResourceSpec {
		ResourceSpec::ArtifactStore {
			auto_delete_objects: true,
		}
	}

	fn role() -> ResourceSpec {
		ResourceSpec::Role {
			service_principal: "sagemaker.amazonaws.com".to_string(),
			managed_policies: vec!["AmazonSageMakerFullAccess".to_string()],
		}
	}

	fn grant(role: &ResourceId, store: &ResourceId) -> ResourceSpec {
		ResourceSpec::ReadGrant {
			role: AttrRef::arn(role),
			store: AttrRef::name(store),
		}
	}

	fn ids<'a>(nodes: impl Iterator<Item = &'a PlanNode>) -> Vec<&'a str> {
		nodes.map(|n| n.id().as_str()).collect()
	}

	#[test]
	fn references_imply_edges() {
		let mut builder = PlanBuilder::new();
		let bucket = builder.add("Bucket", store()).unwrap();
		let role_id = builder.add("Role", role()).unwrap();
		let grant_id = builder.add("Grant", grant(&role_id, &bucket)).unwrap();
		let plan = builder.build().unwrap();

		assert!(plan.depends_on(&grant_id, &role_id));
		assert!(plan.depends_on(&grant_id, &bucket));
		assert!(!plan.depends_on(&bucket, &grant_id));
		assert!(!plan.depends_on(&role_id, &bucket));
		assert_eq!(plan.dependencies(&grant_id).map(BTreeSet::len), Some(2));
		assert!(plan.dependencies(&ResourceId::new("Missing")).is_none());
	}

	#[test]
	fn reference_to_unknown_resource_is_rejected() {
		let mut builder = PlanBuilder::new();
		builder.add("Role", role()).unwrap();
		let err = builder
			.add("Grant", grant(&ResourceId::new("Role"), &ResourceId::new("Missing")))
			.unwrap_err();
		assert!(matches!(
			err,
			ProvisionError::UnknownResource { ref missing, .. } if missing.as_str() == "Missing"
		));
	}

	#[test]
	fn duplicate_ids_are_rejected() {
		let mut builder = PlanBuilder::new();
		builder.add("Bucket", store()).unwrap();
		assert!(matches!(
			builder.add("Bucket", store()),
			Err(ProvisionError::DuplicateResource(_))
		));
	}

	#[test]
	fn invalid_spec_is_rejected_before_insertion() {
		let mut builder = PlanBuilder::new();
		let err = builder
			.add(
				"Role",
				ResourceSpec::Role {
					service_principal: " ".to_string(),
					managed_policies: vec![],
				},
			)
			.unwrap_err();
		assert!(matches!(err, ProvisionError::InvalidSpec { .. }));
		assert!(builder.build().unwrap().is_empty());
	}

	#[test]
	fn self_dependency_is_rejected() {
		let mut builder = PlanBuilder::new();
		let bucket = builder.add("Bucket", store()).unwrap();
		assert!(matches!(
			builder.add_dependency(&bucket, &bucket),
			Err(ProvisionError::SelfDependency(_))
		));
	}

	#[test]
	fn explicit_cycle_is_rejected_at_build() {
		let mut builder = PlanBuilder::new();
		let bucket = builder.add("Bucket", store()).unwrap();
		let role_id = builder.add("Role", role()).unwrap();
		let grant_id = builder.add("Grant", grant(&role_id, &bucket)).unwrap();
		builder.add_dependency(&role_id, &grant_id).unwrap();

		match builder.build() {
			Err(ProvisionError::DependencyCycle(ids)) => {
				assert!(ids.contains(&role_id));
				assert!(ids.contains(&grant_id));
				assert!(!ids.contains(&bucket));
			}
			other => panic!("expected cycle, got {other:?}"),
		}
	}

	#[test]
	fn creation_order_follows_edges_not_insertion() {
		let mut builder = PlanBuilder::new();
		let role_id = builder.add("Role", role()).unwrap();
		let bucket = builder.add("Bucket", store()).unwrap();
		// Force the role to wait for the bucket even though it was added first.
		builder.add_dependency(&role_id, &bucket).unwrap();
		let plan = builder.build().unwrap();

		assert_eq!(ids(plan.creation_order()), vec!["Bucket", "Role"]);
		assert_eq!(ids(plan.teardown_order()), vec!["Role", "Bucket"]);
	}

	#[test]
	fn independent_nodes_keep_insertion_order() {
		let mut builder = PlanBuilder::new();
		builder.add("A", store()).unwrap();
		builder.add("B", store()).unwrap();
		builder.add("C", role()).unwrap();
		let plan = builder.build().unwrap();
		assert_eq!(ids(plan.creation_order()), vec!["A", "B", "C"]);
	}

	#[test]
	fn exports_must_be_unique_and_known() {
		let mut builder = PlanBuilder::new();
		let bucket = builder.add("Bucket", store()).unwrap();
		builder.export("BucketName", AttrRef::name(&bucket)).unwrap();
		assert!(matches!(
			builder.export("BucketName", AttrRef::name(&bucket)),
			Err(ProvisionError::DuplicateExport(_))
		));
		assert!(matches!(
			builder.export("Other", AttrRef::name("Nope")),
			Err(ProvisionError::UnknownResource { .. })
		));

		let plan = builder.build().unwrap();
		let export = plan.export("BucketName").unwrap();
		assert_eq!(export.value.attribute, Attribute::Name);
	}

	#[test]
	fn removal_policy_and_completion_overrides() {
		let mut builder = PlanBuilder::new();
		let bucket = builder.add("Bucket", store()).unwrap();
		builder
			.set_removal_policy(&bucket, RemovalPolicy::Retain)
			.unwrap();
		builder
			.set_completion(&bucket, Completion::UntilReady)
			.unwrap();
		let plan = builder.build().unwrap();
		let node = plan.node(&bucket).unwrap();
		assert_eq!(node.removal_policy(), RemovalPolicy::Retain);
		assert_eq!(node.completion(), Completion::UntilReady);
	}
}
