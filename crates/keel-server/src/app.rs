// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use axum::Router;
use keel_common_core::EndpointHandle;
use keel_gateway::{Gateway, HttpInferenceClient};
use keel_server_config::GatewayConfig;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ServerError;

/// Builds the gateway for the configured endpoint name.
pub fn build_gateway(config: &GatewayConfig) -> Result<Gateway, ServerError> {
	let endpoint =
		EndpointHandle::parse(config.endpoint_name.as_str()).map_err(|source| {
			ServerError::InvalidEndpoint {
				name: config.endpoint_name.clone(),
				source,
			}
		})?;
	let client = HttpInferenceClient::new(config.runtime_url.as_str())?;

	info!(
		endpoint = %endpoint,
		runtime_url = %client.runtime_url(),
		timeout_secs = config.invoke_timeout_secs,
		"gateway configured"
	);
	Ok(Gateway::new(Arc::new(client), endpoint).with_invoke_timeout(config.invoke_timeout()))
}

pub fn create_router(gateway: Arc<Gateway>) -> Router {
	keel_gateway::router(gateway).layer(TraceLayer::new_for_http())
}
