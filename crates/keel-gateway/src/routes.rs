// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface of the gateway.

use std::sync::Arc;

use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::error::RequestError;
use crate::handler::Gateway;
use crate::response::InvocationResponse;
use crate::validation::InvocationRequest;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub endpoint: String,
}

/// `POST /` runs the invocation pipeline; `GET /health` reports liveness.
pub fn router(gateway: Arc<Gateway>) -> Router {
	Router::new()
		.route("/", post(invoke))
		.route("/health", get(health))
		.with_state(gateway)
}

async fn invoke(
	State(gateway): State<Arc<Gateway>>,
	body: Result<Bytes, BytesRejection>,
) -> InvocationResponse {
	match body {
		Ok(body) if body.is_empty() => gateway.handle(InvocationRequest::empty()).await,
		Ok(body) => gateway.handle(InvocationRequest::new(body)).await,
		Err(rejection) => {
			// Oversized or interrupted bodies cannot be parsed.
			debug!(error = %rejection, "failed to read request body");
			InvocationResponse::rejected(RequestError::InvalidJson)
		}
	}
}

async fn health(State(gateway): State<Arc<Gateway>>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok",
		endpoint: gateway.endpoint().to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::{InferenceClient, InvokeRequest};
	use crate::error::InvokeError;
	use async_trait::async_trait;
	use axum::body::Body;
	use axum::http::{header, Request, StatusCode};
	use keel_common_core::EndpointHandle;
	use serde_json::{json, Value};
	use tower::ServiceExt;

	struct Echo;

	#[async_trait]
	impl InferenceClient for Echo {
		async fn invoke(&self, request: InvokeRequest) -> Result<Bytes, InvokeError> {
			Ok(request.body)
		}
	}

	fn app() -> Router {
		let gateway = Gateway::new(
			Arc::new(Echo),
			EndpointHandle::parse("endpoint-0123456789").unwrap(),
		);
		router(Arc::new(gateway))
	}

	async fn send(request: Request<Body>) -> (StatusCode, Option<String>, Value) {
		let response = app().oneshot(request).await.unwrap();
		let status = response.status();
		let content_type = response
			.headers()
			.get(header::CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
			.map(str::to_string);
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		(status, content_type, serde_json::from_slice(&bytes).unwrap())
	}

	fn post(body: impl Into<Body>) -> Request<Body> {
		Request::builder()
			.method("POST")
			.uri("/")
			.header(header::CONTENT_TYPE, "application/json")
			.body(body.into())
			.unwrap()
	}

	#[tokio::test]
	async fn post_valid_text_returns_result() {
		let (status, content_type, body) = send(post(r#"{"text":"hello"}"#)).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(content_type.as_deref(), Some("application/json"));
		assert_eq!(body, json!({ "result": { "text": "hello" } }));
	}

	#[tokio::test]
	async fn post_without_body_is_400() {
		let (status, content_type, body) = send(post(Body::empty())).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(content_type.as_deref(), Some("application/json"));
		assert_eq!(body, json!({ "error": "No request body provided" }));
	}

	#[tokio::test]
	async fn post_numeric_text_is_400() {
		let (status, _, body) = send(post(r#"{"text":"  42 "}"#)).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, json!({ "error": "Text must not be a number" }));
	}

	#[tokio::test]
	async fn health_reports_endpoint() {
		let request = Request::builder()
			.uri("/health")
			.body(Body::empty())
			.unwrap();
		let (status, _, body) = send(request).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(
			body,
			json!({ "status": "ok", "endpoint": "endpoint-0123456789" })
		);
	}
}
