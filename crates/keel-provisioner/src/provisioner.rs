// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds the inference stack, applies it, and hands back the endpoint handle.

use std::sync::Arc;

use keel_common_core::EndpointHandle;
use tracing::{info, instrument, warn};

use crate::control_plane::ControlPlane;
use crate::deployer::{DeploySettings, Deployer, Deployment, TeardownSummary};
use crate::error::{ProvisionError, Result};
use crate::plan::Plan;
use crate::stack::{inference_stack, InferenceStack, StackSettings};

/// A live stack and the handle the gateway needs to reach it.
#[derive(Debug, Clone)]
pub struct Provisioned {
	pub endpoint: EndpointHandle,
	pub plan: Plan,
	pub deployment: Deployment,
}

/// Builds the inference stack and applies it against a control plane.
pub struct Provisioner {
	stack: StackSettings,
	deployer: Deployer,
}

impl Provisioner {
	pub fn new(
		control_plane: Arc<dyn ControlPlane>,
		stack: StackSettings,
		deploy: DeploySettings,
	) -> Self {
		Self {
			stack,
			deployer: Deployer::new(control_plane, deploy),
		}
	}

	/// Builds a fresh plan with newly generated names. Nothing is created.
	pub fn plan(&self) -> Result<InferenceStack> {
		inference_stack(&self.stack, &mut rand::thread_rng())
	}

	#[instrument(skip(self))]
	pub async fn provision(&self) -> Result<Provisioned> {
		let stack = self.plan()?;
		info!(
			model = %stack.model_name,
			endpoint = %stack.endpoint_name,
			"provisioning inference stack"
		);
		let deployment = self.deployer.apply(&stack.plan).await?;

		let endpoint = match self.endpoint_handle(&deployment) {
			Ok(endpoint) => endpoint,
			Err(err) => {
				warn!(error = %err, "exported endpoint unusable");
				self.deployer.abandon(&stack.plan, &deployment).await;
				return Err(err);
			}
		};
		info!(endpoint = %endpoint, export = %self.stack.export_name, "endpoint exported");

		Ok(Provisioned {
			endpoint,
			plan: stack.plan,
			deployment,
		})
	}

	fn endpoint_handle(&self, deployment: &Deployment) -> Result<EndpointHandle> {
		let name = deployment
			.output(&self.stack.export_name)
			.ok_or_else(|| ProvisionError::MissingExport(self.stack.export_name.clone()))?;
		Ok(EndpointHandle::parse(name)?)
	}

	#[instrument(skip(self, provisioned), fields(endpoint = %provisioned.endpoint))]
	pub async fn teardown(&self, provisioned: &Provisioned) -> Result<TeardownSummary> {
		self.deployer
			.teardown(&provisioned.plan, &provisioned.deployment)
			.await
	}
}
