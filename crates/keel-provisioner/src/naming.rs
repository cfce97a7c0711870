// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Random resource name generation.
//!
//! Names are `prefix + hex(random bytes)[..length]`, truncated to the
//! platform's 63-character ceiling. Collisions with existing resources are
//! unlikely but not checked for.

pub use keel_common_core::{ENDPOINT_NAME_PREFIX, MODEL_NAME_PREFIX};
use keel_common_core::{NameError, ResourceName, MAX_NAME_LEN};
use rand::RngCore;

pub const DEFAULT_MODEL_NAME_LENGTH: usize = 6;
pub const DEFAULT_ENDPOINT_NAME_LENGTH: usize = 10;

/// Generates a name using the thread-local random generator.
pub fn generate_name(prefix: &str, length: usize) -> String {
	generate_name_with(&mut rand::thread_rng(), prefix, length)
}

/// Generates a name from `length` random bytes drawn from `rng`.
pub fn generate_name_with<R: RngCore + ?Sized>(rng: &mut R, prefix: &str, length: usize) -> String {
	let mut bytes = vec![0u8; length];
	rng.fill_bytes(&mut bytes);
	let encoded = hex::encode(bytes);
	// Two hex digits per byte, so the slice is always in range.
	let suffix = &encoded[..length];
	truncate_chars(format!("{prefix}{suffix}"), MAX_NAME_LEN)
}

/// Generates a name and validates it against platform naming rules.
pub fn generate_resource_name<R: RngCore + ?Sized>(
	rng: &mut R,
	prefix: &str,
	length: usize,
) -> Result<ResourceName, NameError> {
	ResourceName::new(generate_name_with(rng, prefix, length))
}

fn truncate_chars(mut value: String, max: usize) -> String {
	if let Some((idx, _)) = value.char_indices().nth(max) {
		value.truncate(idx);
	}
	value
}
