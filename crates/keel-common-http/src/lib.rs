// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Keel.
//!
//! Every outbound client is built from [`builder`] so requests carry the same
//! User-Agent header. Keel clients do not retry; callers own retry policy.

mod client;

pub use client::{builder, platform, user_agent};
