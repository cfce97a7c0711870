// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for the Keel server.

pub mod gateway;
pub mod http;
pub mod logging;
pub mod provisioner;

pub use gateway::{GatewayConfig, GatewayConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use provisioner::{ProvisionerConfig, ProvisionerConfigLayer, RemovalPolicy};
