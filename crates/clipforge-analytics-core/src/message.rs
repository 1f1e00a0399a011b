// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire messages handed to the collector.
//!
//! Each message pairs a record with the identity bound when it was emitted.
//! Identity lives only in the envelope fields, never in `properties`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::{EventRecord, MessageId, PageView};
use crate::identity::{AnonymousId, Identity, UserId};
use crate::traits::Traits;

/// A collector message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
	Page {
		message_id: MessageId,
		anonymous_id: AnonymousId,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		user_id: Option<UserId>,
		name: String,
		#[serde(default)]
		properties: Map<String, Value>,
		timestamp: DateTime<Utc>,
	},
	Identify {
		message_id: MessageId,
		/// The anonymous id being linked to `user_id`.
		anonymous_id: AnonymousId,
		user_id: UserId,
		#[serde(default)]
		traits: Traits,
		timestamp: DateTime<Utc>,
	},
	Track {
		message_id: MessageId,
		anonymous_id: AnonymousId,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		user_id: Option<UserId>,
		event: String,
		#[serde(default)]
		properties: Map<String, Value>,
		timestamp: DateTime<Utc>,
	},
}

impl Message {
	pub fn page(identity: &Identity, page: &PageView) -> Self {
		Message::Page {
			message_id: page.message_id,
			anonymous_id: identity.anonymous_id().clone(),
			user_id: identity.user_id().cloned(),
			name: page.name.clone(),
			properties: page.properties.clone(),
			timestamp: page.timestamp,
		}
	}

	/// Builds an identify message. Returns `None` for an anonymous identity,
	/// which has nothing to link.
	pub fn identify(identity: &Identity, traits: &Traits) -> Option<Self> {
		let user_id = identity.user_id()?.clone();
		Some(Message::Identify {
			message_id: MessageId::new(),
			anonymous_id: identity.anonymous_id().clone(),
			user_id,
			traits: traits.clone(),
			timestamp: Utc::now(),
		})
	}

	pub fn track(identity: &Identity, event: &EventRecord) -> Self {
		Message::Track {
			message_id: event.message_id,
			anonymous_id: identity.anonymous_id().clone(),
			user_id: identity.user_id().cloned(),
			event: event.name.clone(),
			properties: event.properties.clone(),
			timestamp: event.timestamp,
		}
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Message::Page { .. } => "page",
			Message::Identify { .. } => "identify",
			Message::Track { .. } => "track",
		}
	}

	pub fn message_id(&self) -> MessageId {
		match self {
			Message::Page { message_id, .. }
			| Message::Identify { message_id, .. }
			| Message::Track { message_id, .. } => *message_id,
		}
	}

	pub fn anonymous_id(&self) -> &AnonymousId {
		match self {
			Message::Page { anonymous_id, .. }
			| Message::Identify { anonymous_id, .. }
			| Message::Track { anonymous_id, .. } => anonymous_id,
		}
	}

	pub fn user_id(&self) -> Option<&UserId> {
		match self {
			Message::Page { user_id, .. } | Message::Track { user_id, .. } => user_id.as_ref(),
			Message::Identify { user_id, .. } => Some(user_id),
		}
	}

	/// Page name or event name; `None` for identify.
	pub fn name(&self) -> Option<&str> {
		match self {
			Message::Page { name, .. } => Some(name),
			Message::Track { event, .. } => Some(event),
			Message::Identify { .. } => None,
		}
	}

	/// Page or event properties; `None` for identify.
	pub fn properties(&self) -> Option<&Map<String, Value>> {
		match self {
			Message::Page { properties, .. } | Message::Track { properties, .. } => Some(properties),
			Message::Identify { .. } => None,
		}
	}
}
