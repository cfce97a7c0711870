// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Platform resource names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Naming ceiling imposed by the managed-ML hosting platform.
pub const MAX_NAME_LEN: usize = 63;

pub const MODEL_NAME_PREFIX: &str = "model-";
pub const ENDPOINT_NAME_PREFIX: &str = "endpoint-";

/// Errors returned when a resource name does not satisfy platform rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
	#[error("resource name must not be empty")]
	Empty,

	#[error("resource name '{name}' is {len} characters (max {MAX_NAME_LEN})")]
	TooLong { name: String, len: usize },

	#[error("resource name '{name}' contains invalid character {ch:?}")]
	InvalidCharacter { name: String, ch: char },

	#[error("resource name '{name}' must start and end with a letter or digit")]
	InvalidBoundary { name: String },
}

/// A validated model, endpoint-configuration or endpoint name.
///
/// Names are 1 to 63 ASCII letters, digits or hyphens, and must start and end
/// with a letter or digit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
	pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
		let name = name.into();
		validate(&name)?;
		Ok(Self(name))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_inner(self) -> String {
		self.0
	}
}

fn validate(name: &str) -> Result<(), NameError> {
	if name.is_empty() {
		return Err(NameError::Empty);
	}

	let len = name.chars().count();
	if len > MAX_NAME_LEN {
		return Err(NameError::TooLong {
			name: name.to_string(),
			len,
		});
	}

	if let Some(ch) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-')) {
		return Err(NameError::InvalidCharacter {
			name: name.to_string(),
			ch,
		});
	}

	if name.starts_with('-') || name.ends_with('-') {
		return Err(NameError::InvalidBoundary {
			name: name.to_string(),
		});
	}

	Ok(())
}

impl fmt::Display for ResourceName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for ResourceName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl TryFrom<String> for ResourceName {
	type Error = NameError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl From<ResourceName> for String {
	fn from(name: ResourceName) -> Self {
		name.0
	}
}
