// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared vocabulary for Keel.
//!
//! The provisioner and the gateway never call each other. The only value that
//! crosses between them is the endpoint name, carried as an [`EndpointHandle`]
//! that the gateway receives at construction time.

pub mod endpoint;
pub mod name;

pub use endpoint::{EndpointHandle, ENDPOINT_EXPORT_NAME};
pub use name::{NameError, ResourceName, ENDPOINT_NAME_PREFIX, MAX_NAME_LEN, MODEL_NAME_PREFIX};
