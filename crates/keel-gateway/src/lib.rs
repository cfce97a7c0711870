// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Invocation gateway for Keel.
//!
//! Validates inbound `{"text": ...}` requests, invokes the configured
//! endpoint once, and maps every outcome to a JSON envelope with status 200,
//! 400 or 500. The endpoint is fixed at construction through an
//! [`EndpointHandle`](keel_common_core::EndpointHandle).

pub mod client;
pub mod error;
pub mod handler;
pub mod response;
pub mod routes;
pub mod validation;

pub use client::{HttpInferenceClient, InferenceClient, InvokeRequest, JSON_CONTENT_TYPE};
pub use error::{InvokeError, RequestError, INVOCATION_FAILURE, UNKNOWN_ERROR};
pub use handler::{Gateway, DEFAULT_INVOKE_TIMEOUT};
pub use response::{InvocationResponse, ResponseBody};
pub use routes::{router, HealthResponse};
pub use validation::{is_numeric_literal, validate, InvocationRequest};
