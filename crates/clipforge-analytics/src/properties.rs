// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Helper for building event properties and profile traits.

use serde_json::{Map, Value};

/// A builder for event properties or identify traits.
///
/// # Example
///
/// ```
/// use clipforge_analytics::Properties;
///
/// let props = Properties::new()
///     .insert("featureName", "templates")
///     .insert("template_count", 12)
///     .insert("is_trial", true);
/// assert_eq!(props.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
	inner: Map<String, Value>,
}

impl Properties {
	pub fn new() -> Self {
		Self { inner: Map::new() }
	}

	/// Inserts a key-value pair.
	///
	/// Values should be scalars; the tracker drops arrays and objects.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	/// Inserts only when `value` is `Some`.
	pub fn insert_opt<K, V>(self, key: K, value: Option<V>) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		match value {
			Some(value) => self.insert(key, value),
			None => self,
		}
	}

	/// Merges another set into this one; `other` wins on conflicts.
	pub fn merge(mut self, other: Properties) -> Self {
		self.inner.extend(other.inner);
		self
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.inner.get(key)
	}

	pub fn into_map(self) -> Map<String, Value> {
		self.inner
	}
}

impl From<Map<String, Value>> for Properties {
	fn from(inner: Map<String, Value>) -> Self {
		Self { inner }
	}
}

impl From<Value> for Properties {
	fn from(value: Value) -> Self {
		match value {
			Value::Object(inner) => Self { inner },
			_ => Self::new(),
		}
	}
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Properties {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		iter
			.into_iter()
			.fold(Self::new(), |props, (k, v)| props.insert(k, v))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn new_is_empty() {
		assert!(Properties::new().is_empty());
	}

	#[test]
	fn insert_scalars() {
		let props = Properties::new()
			.insert("plan", "free")
			.insert("projects", 3)
			.insert("trial", false);

		assert_eq!(props.len(), 3);
		assert_eq!(props.get("plan"), Some(&Value::String("free".to_string())));
		assert_eq!(props.get("trial"), Some(&Value::Bool(false)));
	}

	#[test]
	fn insert_opt_skips_none() {
		let props = Properties::new()
			.insert_opt("company", Some("Acme"))
			.insert_opt::<_, &str>("role", None);

		assert_eq!(props.len(), 1);
		assert!(props.get("role").is_none());
	}

	#[test]
	fn merge_prefers_other() {
		let merged = Properties::new()
			.insert("a", 1)
			.insert("b", 2)
			.merge(Properties::new().insert("b", 20).insert("c", 3));

		assert_eq!(merged.len(), 3);
		assert_eq!(merged.get("b"), Some(&Value::from(20)));
	}

	#[test]
	fn from_non_object_value_is_empty() {
		assert!(Properties::from(Value::from("nope")).is_empty());
	}

	#[test]
	fn collects_from_pairs() {
		let props: Properties = vec![("a", "x"), ("b", "y")].into_iter().collect();
		assert_eq!(props.len(), 2);
	}

	proptest! {
		#[test]
		fn len_counts_unique_keys(keys in proptest::collection::vec("[a-z]{1,8}", 0..20)) {
			let unique: std::collections::HashSet<_> = keys.iter().cloned().collect();
			let props: Properties = keys.into_iter().map(|k| (k, true)).collect();
			prop_assert_eq!(props.len(), unique.len());
		}
	}
}
