// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keel_common_core::NameError;
use keel_gateway::InvokeError;
use keel_provisioner::ProvisionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
	#[error("invalid endpoint name '{name}': {source}")]
	InvalidEndpoint {
		name: String,
		#[source]
		source: NameError,
	},

	#[error("failed to build inference client: {0}")]
	Client(#[from] InvokeError),

	#[error(transparent)]
	Provision(#[from] ProvisionError),

	#[error("failed to render template: {0}")]
	Render(#[from] serde_json::Error),
}
