// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gateway error types.

use std::time::Duration;

/// Fixed top-level message of every `500` response.
pub const INVOCATION_FAILURE: &str = "Failed to invoke model";

/// Placeholder used when a failure carries no message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Input rejected before the endpoint is called. Always a `400`.
///
/// The display strings are the exact messages returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
	#[error("No request body provided")]
	MissingBody,

	#[error("Invalid JSON in request body")]
	InvalidJson,

	#[error("Text must be a string")]
	MissingOrNonStringText,

	#[error("Text must not be a number")]
	NumericTextRejected,
}

/// Failure while calling the endpoint or decoding its reply. Always a `500`.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
	#[error("request to model endpoint failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("model endpoint returned {status}: {message}")]
	Api { status: u16, message: String },

	#[error("failed to decode model response: {0}")]
	Decode(String),

	#[error("model invocation timed out after {0:?}")]
	Timeout(Duration),

	#[error("{0}")]
	Panicked(String),
}

impl InvokeError {
	/// Message placed in the `details` field of a `500` response.
	pub fn details(&self) -> String {
		let message = self.to_string();
		if message.trim().is_empty() {
			UNKNOWN_ERROR.to_string()
		} else {
			message
		}
	}
}
