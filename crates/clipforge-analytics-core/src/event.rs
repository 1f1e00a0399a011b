// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event and page-view records, and the event naming convention.
//!
//! Records are ephemeral: they are built by the facade, handed to a transport
//! and dropped. Neither carries identity; the transport pairs each record with
//! the identity bound at call time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::sanitize::is_attribution_key;

/// Unique identifier for an outgoing message.
///
/// UUIDv7, so ids sort in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
	pub fn new() -> Self {
		let v7 = uuid7::uuid7();
		Self(Uuid::from_bytes(*v7.as_bytes()))
	}
}

impl Default for MessageId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for MessageId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A discrete action, e.g. "Signed Up".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
	pub message_id: MessageId,
	pub name: String,
	pub properties: Map<String, Value>,
	pub timestamp: DateTime<Utc>,
}

impl EventRecord {
	pub fn new(name: impl Into<String>, properties: Map<String, Value>) -> Self {
		Self {
			message_id: MessageId::new(),
			name: name.into(),
			properties,
			timestamp: Utc::now(),
		}
	}
}

/// A navigation. The only record allowed to carry campaign attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageView {
	pub message_id: MessageId,
	pub name: String,
	pub properties: Map<String, Value>,
	pub timestamp: DateTime<Utc>,
}

impl PageView {
	pub fn new(name: impl Into<String>, properties: Map<String, Value>) -> Self {
		Self {
			message_id: MessageId::new(),
			name: name.into(),
			properties,
			timestamp: Utc::now(),
		}
	}

	/// The attribution keys this navigation carried.
	pub fn attribution_keys(&self) -> Vec<String> {
		self
			.properties
			.keys()
			.filter(|k| is_attribution_key(k))
			.cloned()
			.collect()
	}
}

/// Maximum allowed length for event names.
pub const MAX_EVENT_NAME_LENGTH: usize = 200;

/// Lowercase joiners allowed inside a Title Case name ("Time on Page Reached").
const MINOR_WORDS: &[&str] = &[
	"a", "an", "and", "at", "by", "for", "in", "of", "on", "or", "the", "to", "with",
];

/// Past-tense verbs that do not end in "-ed".
const IRREGULAR_PAST: &[&str] = &[
	"Began", "Bought", "Built", "Chose", "Done", "Drew", "Gave", "Got", "Left", "Lost", "Made",
	"Paid", "Ran", "Read", "Sent", "Set", "Shared", "Shown", "Sold", "Spent", "Took", "Viewed",
	"Won", "Wrote",
];

/// Ways a name can miss the "short, past-tense, Title Case" convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameViolation {
	Empty,
	TooLong,
	/// Uses `_` or `-` separators, e.g. "sign_up_click".
	SnakeOrKebabCase,
	/// A word other than a minor joiner starts lowercase.
	NotTitleCase,
	/// No word reads as a past-tense verb.
	NotPastTense,
}

impl std::fmt::Display for NameViolation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let msg = match self {
			NameViolation::Empty => "event name is empty",
			NameViolation::TooLong => "event name is too long",
			NameViolation::SnakeOrKebabCase => "event name uses snake or kebab case",
			NameViolation::NotTitleCase => "event name is not Title Case",
			NameViolation::NotPastTense => "event name is not past tense",
		};
		f.write_str(msg)
	}
}

/// Checks `name` against the naming convention.
///
/// Advisory: the facade cannot enforce tense structurally, so callers log the
/// violation and still send the event.
pub fn check_event_name(name: &str) -> Result<(), NameViolation> {
	let trimmed = name.trim();
	if trimmed.is_empty() {
		return Err(NameViolation::Empty);
	}
	if trimmed.chars().count() > MAX_EVENT_NAME_LENGTH {
		return Err(NameViolation::TooLong);
	}
	if trimmed.contains(['_', '-']) {
		return Err(NameViolation::SnakeOrKebabCase);
	}

	let words: Vec<&str> = trimmed.split_whitespace().collect();
	let title_case = words.iter().enumerate().all(|(i, word)| {
		let first = word.chars().next().unwrap_or(' ');
		first.is_uppercase() || first.is_ascii_digit() || (i > 0 && MINOR_WORDS.contains(word))
	});
	if !title_case {
		return Err(NameViolation::NotTitleCase);
	}

	let past_tense = words
		.iter()
		.any(|word| word.ends_with("ed") || IRREGULAR_PAST.contains(word));
	if !past_tense {
		return Err(NameViolation::NotPastTense);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog;
	use proptest::prelude::*;
	use serde_json::json;

	#[test]
	fn message_ids_are_unique_and_ordered() {
		let first = MessageId::new();
		let second = MessageId::new();
		assert_ne!(first, second);
		assert!(first < second);
	}

	#[test]
	fn page_view_reports_attribution_keys() {
		let props = json!({"utm_source": "ads", "utm_campaign": "spring", "path": "/pricing"});
		let page = PageView::new("Pricing", props.as_object().cloned().unwrap());

		assert_eq!(
			page.attribution_keys(),
			vec!["utm_campaign".to_string(), "utm_source".to_string()]
		);
	}

	#[test]
	fn convention_accepts_catalog_names() {
		for name in catalog::ALL {
			assert_eq!(check_event_name(name), Ok(()), "{name}");
		}
	}

	#[test]
	fn convention_rejects_snake_case_clicks() {
		assert_eq!(
			check_event_name("sign_up_click"),
			Err(NameViolation::SnakeOrKebabCase)
		);
		assert_eq!(
			check_event_name("export-video"),
			Err(NameViolation::SnakeOrKebabCase)
		);
	}

	#[test]
	fn convention_rejects_present_tense() {
		assert_eq!(check_event_name("Sign Up"), Err(NameViolation::NotPastTense));
		assert_eq!(check_event_name("Click Button"), Err(NameViolation::NotPastTense));
	}

	#[test]
	fn convention_rejects_lowercase_words() {
		assert_eq!(check_event_name("signed up"), Err(NameViolation::NotTitleCase));
		assert_eq!(check_event_name("Time on Page Reached"), Ok(()));
	}

	#[test]
	fn convention_rejects_empty_and_oversized() {
		assert_eq!(check_event_name("   "), Err(NameViolation::Empty));
		let long = format!("{} Reached", "Word ".repeat(50));
		assert_eq!(check_event_name(&long), Err(NameViolation::TooLong));
	}

	proptest! {
		#[test]
		fn title_case_with_ed_suffix_passes(
			noun in "[A-Z][a-z]{1,10}",
			verb in "[A-Z][a-z]{1,10}",
		) {
			let name = format!("{noun} {verb}ed");
			prop_assert_eq!(check_event_name(&name), Ok(()));
		}
	}
}
