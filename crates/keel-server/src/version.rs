// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build information for the `keel` binary.

/// Format version info for display.
pub fn format_version_info() -> String {
	format!(
		"keel version: {}\n\
		 Platform:     {}\n\
		 User-Agent:   {}",
		env!("CARGO_PKG_VERSION"),
		keel_common_http::platform(),
		keel_common_http::user_agent(),
	)
}
