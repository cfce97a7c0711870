// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The outbound response envelope.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::client::JSON_CONTENT_TYPE;
use crate::error::{RequestError, INVOCATION_FAILURE};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseBody {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<String>,
}

/// `{statusCode, contentType, body}`; `body` is always serialized JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
	pub status_code: u16,
	pub content_type: &'static str,
	pub body: String,
}

impl InvocationResponse {
	fn json(status_code: u16, body: &ResponseBody) -> Self {
		// Only string-keyed JSON values reach here, so serialization cannot fail.
		let body = serde_json::to_string(body)
			.unwrap_or_else(|_| format!(r#"{{"error":"{INVOCATION_FAILURE}"}}"#));
		Self {
			status_code,
			content_type: JSON_CONTENT_TYPE,
			body,
		}
	}

	/// `200` with `{"result": <parsed>}`.
	pub fn success(result: Value) -> Self {
		Self::json(
			200,
			&ResponseBody {
				result: Some(result),
				..Default::default()
			},
		)
	}

	/// `400` with `{"error": <message>}`.
	pub fn rejected(error: RequestError) -> Self {
		Self::json(
			400,
			&ResponseBody {
				error: Some(error.to_string()),
				..Default::default()
			},
		)
	}

	/// `500` with `{"error": "Failed to invoke model", "details": <details>}`.
	pub fn invocation_failure(details: impl Into<String>) -> Self {
		Self::json(
			500,
			&ResponseBody {
				error: Some(INVOCATION_FAILURE.to_string()),
				details: Some(details.into()),
				..Default::default()
			},
		)
	}

	pub fn body_json(&self) -> Result<Value, serde_json::Error> {
		serde_json::from_str(&self.body)
	}
}

impl IntoResponse for InvocationResponse {
	fn into_response(self) -> Response {
		let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
	}
}
