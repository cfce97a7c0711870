// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The invocation pipeline.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use keel_common_core::EndpointHandle;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::client::{InferenceClient, InvokeRequest};
use crate::error::InvokeError;
use crate::response::InvocationResponse;
use crate::validation::{validate, InvocationRequest};

pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(60);

/// Validates requests and forwards valid ones to a single endpoint.
///
/// Holds no per-request state; concurrent calls to [`Gateway::handle`] are
/// independent.
pub struct Gateway {
	client: Arc<dyn InferenceClient>,
	endpoint: EndpointHandle,
	invoke_timeout: Duration,
}

impl Gateway {
	pub fn new(client: Arc<dyn InferenceClient>, endpoint: EndpointHandle) -> Self {
		Self {
			client,
			endpoint,
			invoke_timeout: DEFAULT_INVOKE_TIMEOUT,
		}
	}

	pub fn with_invoke_timeout(mut self, timeout: Duration) -> Self {
		self.invoke_timeout = timeout;
		self
	}

	pub fn endpoint(&self) -> &EndpointHandle {
		&self.endpoint
	}

	pub fn invoke_timeout(&self) -> Duration {
		self.invoke_timeout
	}

	/// Runs the pipeline. Every path, including a panicking client, yields a
	/// response.
	#[instrument(skip(self, request), fields(endpoint = %self.endpoint))]
	pub async fn handle(&self, request: InvocationRequest) -> InvocationResponse {
		let text = match validate(&request) {
			Ok(text) => text,
			Err(err) => {
				debug!(error = %err, "request rejected");
				return InvocationResponse::rejected(err);
			}
		};

		info!(text_len = text.len(), "invoking model");
		match self.invoke(&text).await {
			Ok(result) => InvocationResponse::success(result),
			Err(err) => {
				let details = err.details();
				warn!(error = %details, "model invocation failed");
				InvocationResponse::invocation_failure(details)
			}
		}
	}

	async fn invoke(&self, text: &str) -> Result<Value, InvokeError> {
		let payload = json!({ "text": text }).to_string();
		let request = InvokeRequest::json(self.endpoint.as_str(), payload);
		let call = AssertUnwindSafe(self.client.invoke(request)).catch_unwind();

		let bytes = match tokio::time::timeout(self.invoke_timeout, call).await {
			Err(_) => return Err(InvokeError::Timeout(self.invoke_timeout)),
			Ok(Err(panic)) => return Err(InvokeError::Panicked(panic_message(panic.as_ref()))),
			Ok(Ok(result)) => result?,
		};

		let text = std::str::from_utf8(&bytes).map_err(|e| InvokeError::Decode(e.to_string()))?;
		serde_json::from_str(text).map_err(|e| InvokeError::Decode(e.to_string()))
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		String::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::RequestError;
	use async_trait::async_trait;
	use bytes::Bytes;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	enum Reply {
		Body(&'static str),
		Fail(fn() -> InvokeError),
		Panic,
		Hang,
	}

	struct MockClient {
		reply: Reply,
		calls: AtomicUsize,
		last_request: Mutex<Option<InvokeRequest>>,
	}

	impl MockClient {
		fn new(reply: Reply) -> Arc<Self> {
			Arc::new(Self {
				reply,
				calls: AtomicUsize::new(0),
				last_request: Mutex::new(None),
			})
		}
	}

	#[async_trait]
	impl InferenceClient for MockClient {
		async fn invoke(&self, request: InvokeRequest) -> Result<Bytes, InvokeError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			*self.last_request.lock().unwrap() = Some(request);
			match &self.reply {
				Reply::Body(body) => Ok(Bytes::from_static(body.as_bytes())),
				Reply::Fail(make) => Err(make()),
				Reply::Panic => panic!("client exploded"),
				Reply::Hang => {
					futures::future::pending::<()>().await;
					unreachable!()
				}
			}
		}
	}

	fn gateway(client: Arc<MockClient>) -> Gateway {
		Gateway::new(client, EndpointHandle::parse("endpoint-0123456789").unwrap())
	}

	fn post(body: &str) -> InvocationRequest {
		InvocationRequest::new(body.to_string())
	}

	#[tokio::test]
	async fn missing_body_is_rejected_without_invoking() {
		let client = MockClient::new(Reply::Body("{}"));
		let response = gateway(client.clone()).handle(InvocationRequest::empty()).await;
		assert_eq!(response.status_code, 400);
		assert_eq!(
			response.body_json().unwrap(),
			json!({ "error": "No request body provided" })
		);
		assert_eq!(client.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn each_client_error_short_circuits() {
		let cases = [
			("not json", RequestError::InvalidJson),
			(r#"{"text": 42}"#, RequestError::MissingOrNonStringText),
			(r#"{"text": "123"}"#, RequestError::NumericTextRejected),
		];
		for (body, expected) in cases {
			let client = MockClient::new(Reply::Body("{}"));
			let response = gateway(client.clone()).handle(post(body)).await;
			assert_eq!(response.status_code, 400, "{body}");
			assert_eq!(
				response.body_json().unwrap(),
				json!({ "error": expected.to_string() })
			);
			assert_eq!(client.calls.load(Ordering::SeqCst), 0);
		}
	}

	#[tokio::test]
	async fn success_wraps_parsed_result() {
		let client = MockClient::new(Reply::Body(r#"{"label":"x"}"#));
		let response = gateway(client.clone()).handle(post(r#"{"text": "hello"}"#)).await;
		assert_eq!(response.status_code, 200);
		assert_eq!(response.content_type, "application/json");
		assert_eq!(response.body_json().unwrap(), json!({ "result": { "label": "x" } }));

		let request = client.last_request.lock().unwrap().clone().unwrap();
		assert_eq!(request.endpoint_name, "endpoint-0123456789");
		assert_eq!(request.content_type, "application/json");
		assert_eq!(request.accept, "application/json");
		let payload: Value = serde_json::from_slice(&request.body).unwrap();
		assert_eq!(payload, json!({ "text": "hello" }));
	}

	#[tokio::test]
	async fn client_failure_becomes_500_with_details() {
		let client = MockClient::new(Reply::Fail(|| InvokeError::Api {
			status: 400,
			message: "bad input".to_string(),
		}));
		let response = gateway(client).handle(post(r#"{"text": "hello"}"#)).await;
		assert_eq!(response.status_code, 500);
		assert_eq!(
			response.body_json().unwrap(),
			json!({
				"error": "Failed to invoke model",
				"details": "model endpoint returned 400: bad input"
			})
		);
	}

	#[tokio::test]
	async fn undecodable_reply_is_an_invocation_failure() {
		let client = MockClient::new(Reply::Body("<html>oops</html>"));
		let response = gateway(client).handle(post(r#"{"text": "hello"}"#)).await;
		assert_eq!(response.status_code, 500);
		let body = response.body_json().unwrap();
		assert_eq!(body["error"], "Failed to invoke model");
		assert!(body["details"]
			.as_str()
			.unwrap()
			.starts_with("failed to decode model response"));
	}

	#[tokio::test]
	async fn panicking_client_is_contained() {
		let client = MockClient::new(Reply::Panic);
		let response = gateway(client).handle(post(r#"{"text": "hello"}"#)).await;
		assert_eq!(response.status_code, 500);
		assert_eq!(response.body_json().unwrap()["details"], "client exploded");
	}

	#[tokio::test]
	async fn empty_failure_message_uses_placeholder() {
		let client = MockClient::new(Reply::Fail(|| InvokeError::Panicked(String::new())));
		let response = gateway(client).handle(post(r#"{"text": "hello"}"#)).await;
		assert_eq!(response.body_json().unwrap()["details"], "Unknown error");
	}

	#[tokio::test(start_paused = true)]
	async fn hung_invocation_hits_deadline() {
		let client = MockClient::new(Reply::Hang);
		let response = gateway(client)
			.with_invoke_timeout(Duration::from_secs(5))
			.handle(post(r#"{"text": "hello"}"#))
			.await;
		assert_eq!(response.status_code, 500);
		assert_eq!(
			response.body_json().unwrap()["details"],
			"model invocation timed out after 5s"
		);
	}

	#[tokio::test]
	async fn identical_requests_yield_identical_responses() {
		let client = MockClient::new(Reply::Body(r#"{"label":"x","score":0.5}"#));
		let gateway = gateway(client);
		let first = gateway.handle(post(r#"{"text": "hello"}"#)).await;
		let second = gateway.handle(post(r#"{"text": "hello"}"#)).await;
		assert_eq!(first, second);
	}
}
