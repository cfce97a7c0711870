// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wiring for the `keel` binary: configuration to gateway, router and
//! provisioner.

pub mod app;
pub mod commands;
pub mod error;
pub mod logging;
pub mod settings;

pub use app::{build_gateway, create_router};
pub use commands::{dry_run, synth, DryRunReport};
pub use error::ServerError;
pub use logging::init_tracing;
pub use settings::{deploy_settings, stack_settings};
