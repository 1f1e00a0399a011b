// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Property-map scrubbing rules.
//!
//! Identity travels out-of-band, so identity keys never appear in a property
//! map. Campaign attribution belongs on page views only. Values are scalars.

use serde_json::{Map, Value};

/// Keys that would duplicate the bound identity inside a property map.
pub const IDENTITY_KEYS: &[&str] = &[
	"userId",
	"user_id",
	"anonymousId",
	"anonymous_id",
	"distinctId",
	"distinct_id",
];

/// Returns true if `key` names an identity field.
pub fn is_identity_key(key: &str) -> bool {
	IDENTITY_KEYS.contains(&key)
}

/// Returns true if `key` is a campaign-attribution (UTM) field.
pub fn is_attribution_key(key: &str) -> bool {
	let lower = key.to_ascii_lowercase();
	lower.starts_with("utm_") || (lower.starts_with("utm") && key[3..].starts_with(char::is_uppercase))
}

/// Returns true if `value` is a string, number, boolean or null.
pub fn is_scalar(value: &Value) -> bool {
	!matches!(value, Value::Array(_) | Value::Object(_))
}

/// Removes every key matching `predicate`, returning the removed keys in
/// map order.
pub fn strip_keys(map: &mut Map<String, Value>, predicate: impl Fn(&str) -> bool) -> Vec<String> {
	let removed: Vec<String> = map.keys().filter(|k| predicate(k)).cloned().collect();
	for key in &removed {
		map.remove(key);
	}
	removed
}

pub fn strip_identity_keys(map: &mut Map<String, Value>) -> Vec<String> {
	strip_keys(map, is_identity_key)
}

pub fn strip_attribution_keys(map: &mut Map<String, Value>) -> Vec<String> {
	strip_keys(map, is_attribution_key)
}

/// Removes arrays and objects.
pub fn strip_non_scalars(map: &mut Map<String, Value>) -> Vec<String> {
	let removed: Vec<String> = map
		.iter()
		.filter(|(_, v)| !is_scalar(v))
		.map(|(k, _)| k.clone())
		.collect();
	for key in &removed {
		map.remove(key);
	}
	removed
}
