// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};

/// Creates a new HTTP client builder with the standard Keel User-Agent header.
///
/// # Example
/// ```ignore
/// let client = keel_common_http::builder().build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Returns the standard Keel User-Agent string.
///
/// Format: `keel/{platform}/{version}`
pub fn user_agent() -> String {
	format!("keel/{}/{}", platform(), env!("CARGO_PKG_VERSION"))
}

/// Platform string in `{os}-{arch}` format, e.g. "linux-x86_64".
pub fn platform() -> String {
	format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}
