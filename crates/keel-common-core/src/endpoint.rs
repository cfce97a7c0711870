// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The endpoint handle passed from the provisioner to the gateway.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::name::{NameError, ResourceName};

/// Export key under which the provisioner publishes the live endpoint name.
pub const ENDPOINT_EXPORT_NAME: &str = "InferenceEndpointName";

/// Identifies the live inference endpoint the gateway invokes.
///
/// Immutable once created. The gateway takes one of these as a required
/// construction argument instead of resolving a global export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointHandle {
	name: ResourceName,
}

impl EndpointHandle {
	pub fn new(name: ResourceName) -> Self {
		Self { name }
	}

	pub fn parse(name: impl Into<String>) -> Result<Self, NameError> {
		ResourceName::new(name).map(Self::new)
	}

	pub fn name(&self) -> &ResourceName {
		&self.name
	}

	pub fn as_str(&self) -> &str {
		self.name.as_str()
	}
}

impl fmt::Display for EndpointHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.name, f)
	}
}

impl From<ResourceName> for EndpointHandle {
	fn from(name: ResourceName) -> Self {
		Self::new(name)
	}
}
