// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client for the managed inference runtime.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, error};

use crate::error::InvokeError;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A single synchronous invocation of a named endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
	pub endpoint_name: String,
	pub body: Bytes,
	pub content_type: String,
	pub accept: String,
}

impl InvokeRequest {
	/// JSON in, JSON out.
	pub fn json(endpoint_name: impl Into<String>, body: impl Into<Bytes>) -> Self {
		Self {
			endpoint_name: endpoint_name.into(),
			body: body.into(),
			content_type: JSON_CONTENT_TYPE.to_string(),
			accept: JSON_CONTENT_TYPE.to_string(),
		}
	}
}

/// Calls an inference endpoint and returns the raw response body.
#[async_trait]
pub trait InferenceClient: Send + Sync {
	async fn invoke(&self, request: InvokeRequest) -> Result<Bytes, InvokeError>;
}

/// Invokes endpoints over the runtime's HTTP API.
///
/// Request signing is left to the environment (a signing proxy or a runtime
/// URL that accepts ambient credentials).
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
	http: Client,
	runtime_url: String,
}

impl HttpInferenceClient {
	pub fn new(runtime_url: impl Into<String>) -> Result<Self, InvokeError> {
		let http = keel_common_http::builder().build()?;
		Ok(Self::with_client(http, runtime_url))
	}

	pub fn with_client(http: Client, runtime_url: impl Into<String>) -> Self {
		let runtime_url = runtime_url.into().trim_end_matches('/').to_string();
		Self { http, runtime_url }
	}

	pub fn runtime_url(&self) -> &str {
		&self.runtime_url
	}

	fn invocation_url(&self, endpoint_name: &str) -> String {
		format!(
			"{}/endpoints/{}/invocations",
			self.runtime_url, endpoint_name
		)
	}
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
	async fn invoke(&self, request: InvokeRequest) -> Result<Bytes, InvokeError> {
		let url = self.invocation_url(&request.endpoint_name);
		debug!(url = %url, bytes = request.body.len(), "invoking endpoint");

		let response = self
			.http
			.post(&url)
			.header(CONTENT_TYPE, request.content_type)
			.header(ACCEPT, request.accept)
			.body(request.body)
			.send()
			.await?;

		if !response.status().is_success() {
			let status = response.status().as_u16();
			let message = response.text().await.unwrap_or_else(|e| e.to_string());
			error!(status, message = %message, "endpoint invocation failed");
			return Err(InvokeError::Api { status, message });
		}

		Ok(response.bytes().await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{body_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	#[tokio::test]
	async fn posts_json_to_endpoint_invocations() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/endpoints/endpoint-abc/invocations"))
			.and(header("content-type", "application/json"))
			.and(header("accept", "application/json"))
			.and(body_json(serde_json::json!({ "text": "hello" })))
			.respond_with(ResponseTemplate::new(200).set_body_string(r#"{"label":"x"}"#))
			.expect(1)
			.mount(&server)
			.await;

		let client = HttpInferenceClient::new(server.uri()).unwrap();
		let body = client
			.invoke(InvokeRequest::json("endpoint-abc", r#"{"text":"hello"}"#))
			.await
			.unwrap();
		assert_eq!(&body[..], br#"{"label":"x"}"#);
	}

	#[tokio::test]
	async fn non_success_status_maps_to_api_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(424).set_body_string("model container crashed"))
			.mount(&server)
			.await;

		let client = HttpInferenceClient::new(format!("{}/", server.uri())).unwrap();
		let err = client
			.invoke(InvokeRequest::json("endpoint-abc", "{}"))
			.await
			.unwrap_err();
		match err {
			InvokeError::Api { status, message } => {
				assert_eq!(status, 424);
				assert_eq!(message, "model container crashed");
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[tokio::test]
	async fn unreadable_error_body_keeps_the_read_failure() {
		use tokio::io::{AsyncReadExt, AsyncWriteExt};

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			let (mut socket, _) = listener.accept().await.unwrap();
			let mut request = Vec::new();
			let mut buf = [0u8; 1024];
			while !request.ends_with(b"\r\n\r\n{}") {
				let n = socket.read(&mut buf).await.unwrap();
				if n == 0 {
					break;
				}
				request.extend_from_slice(&buf[..n]);
			}
			// Promises more body than it sends.
			socket
				.write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial")
				.await
				.unwrap();
			socket.shutdown().await.unwrap();
		});

		let client = HttpInferenceClient::new(format!("http://{addr}")).unwrap();
		let err = client
			.invoke(InvokeRequest::json("endpoint-abc", "{}"))
			.await
			.unwrap_err();
		match err {
			InvokeError::Api { status, message } => {
				assert_eq!(status, 500);
				assert!(!message.is_empty());
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[tokio::test]
	async fn unreachable_runtime_maps_to_http_error() {
		// Nothing listens on the discard port.
		let client = HttpInferenceClient::new("http://127.0.0.1:9").unwrap();
		let err = client
			.invoke(InvokeRequest::json("endpoint-abc", "{}"))
			.await
			.unwrap_err();
		assert!(matches!(err, InvokeError::Http(_)));
	}

	#[test]
	fn trailing_slash_is_normalized() {
		let client = HttpInferenceClient::with_client(Client::new(), "https://runtime.example.com/");
		assert_eq!(
			client.invocation_url("endpoint-1"),
			"https://runtime.example.com/endpoints/endpoint-1/invocations"
		);
	}
}
