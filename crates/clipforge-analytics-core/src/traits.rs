// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Profile traits: durable facts about a user.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::plan::Plan;
use crate::sanitize::{strip_attribution_keys, strip_identity_keys, strip_non_scalars};

/// Keys removed while building a [`Traits`] set, grouped by rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectedTraits {
	pub identity: Vec<String>,
	pub attribution: Vec<String>,
	pub non_scalar: Vec<String>,
}

impl RejectedTraits {
	pub fn is_empty(&self) -> bool {
		self.identity.is_empty() && self.attribution.is_empty() && self.non_scalar.is_empty()
	}
}

/// The full trait set sent with an identify call.
///
/// Traits are replaced wholesale on every identify; there is no merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Traits(Map<String, Value>);

impl Traits {
	pub fn new() -> Self {
		Self(Map::new())
	}

	/// Builds a trait set, dropping identity keys, UTM fields and non-scalar
	/// values.
	pub fn from_map(mut map: Map<String, Value>) -> (Self, RejectedTraits) {
		let rejected = RejectedTraits {
			identity: strip_identity_keys(&mut map),
			attribution: strip_attribution_keys(&mut map),
			non_scalar: strip_non_scalars(&mut map),
		};
		(Self(map), rejected)
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	/// Sets a single trait. Used by the facade to keep `plan` current.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.0.insert(key.into(), value.into());
	}

	/// The `plan` trait, if present and recognised.
	pub fn plan(&self) -> Option<Plan> {
		self.0.get("plan")?.as_str()?.parse().ok()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}

	pub fn to_value(&self) -> Value {
		Value::Object(self.0.clone())
	}
}
