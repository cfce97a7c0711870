// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request validation: presence, parse, shape, then domain checks.
//!
//! Every step is a pure function of the request body. The first failing step
//! decides the error.

use bytes::Bytes;
use serde_json::Value;

use crate::error::RequestError;

/// Inbound envelope as received from the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationRequest {
	pub body: Option<Bytes>,
}

impl InvocationRequest {
	pub fn new(body: impl Into<Bytes>) -> Self {
		Self {
			body: Some(body.into()),
		}
	}

	pub fn empty() -> Self {
		Self { body: None }
	}
}

/// Returns the `text` field of a valid request, untrimmed.
pub fn validate(request: &InvocationRequest) -> Result<String, RequestError> {
	let body = match &request.body {
		Some(body) if !body.is_empty() => body,
		_ => return Err(RequestError::MissingBody),
	};

	let value: Value = serde_json::from_slice(body).map_err(|_| RequestError::InvalidJson)?;

	let text = match value.get("text") {
		Some(Value::String(text)) => text,
		_ => return Err(RequestError::MissingOrNonStringText),
	};

	let trimmed = text.trim();
	if trimmed.is_empty() {
		return Err(RequestError::MissingOrNonStringText);
	}
	if is_numeric_literal(trimmed) {
		return Err(RequestError::NumericTextRejected);
	}

	Ok(text.clone())
}

/// Whether `s`, trimmed, is wholly a numeric literal.
///
/// Accepts signed decimals with optional fraction and exponent, signed
/// `Infinity`, and unsigned hex, octal and binary literals. `NaN` and the
/// empty string are not numeric.
pub fn is_numeric_literal(s: &str) -> bool {
	let s = s.trim();
	if let Some(digits) = radix_digits(s) {
		return digits;
	}

	let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
	if unsigned == "Infinity" {
		return true;
	}
	is_decimal(unsigned)
}

/// `Some(valid)` when `s` carries a radix prefix, `None` otherwise.
fn radix_digits(s: &str) -> Option<bool> {
	let bytes = s.as_bytes();
	if bytes.len() < 2 || bytes[0] != b'0' {
		return None;
	}
	let valid: fn(char) -> bool = match bytes[1] {
		b'x' | b'X' => |c| c.is_ascii_hexdigit(),
		b'o' | b'O' => |c| matches!(c, '0'..='7'),
		b'b' | b'B' => |c| matches!(c, '0' | '1'),
		_ => return None,
	};
	// Both prefix bytes are ASCII, so index 2 is a char boundary.
	let digits = &s[2..];
	Some(!digits.is_empty() && digits.chars().all(valid))
}

fn is_decimal(s: &str) -> bool {
	let (mantissa, exponent) = match s.find(['e', 'E']) {
		Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
		None => (s, None),
	};

	let (int_part, frac_part) = match mantissa.split_once('.') {
		Some((int_part, frac_part)) => (int_part, frac_part),
		None => (mantissa, ""),
	};
	let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
	if !all_digits(int_part) || !all_digits(frac_part) {
		return false;
	}
	if int_part.is_empty() && frac_part.is_empty() {
		return false;
	}

	match exponent {
		None => true,
		Some(exp) => {
			let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
			!digits.is_empty() && all_digits(digits)
		}
	}
}
