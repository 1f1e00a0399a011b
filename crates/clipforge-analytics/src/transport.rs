// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tracking transport seam and its in-process implementations.

use std::sync::{Arc, Mutex, MutexGuard};

use clipforge_analytics_core::{AnonymousId, Message};

use crate::error::{AnalyticsError, Result};

/// A tracking backend.
///
/// Methods are synchronous and must not block on network I/O; implementations
/// that deliver remotely queue the message and return.
pub trait Transport: Send + Sync {
	/// Mints the anonymous id for a fresh visitor.
	fn anonymous_id(&self) -> Result<AnonymousId>;

	fn page(&self, message: Message) -> Result<()>;

	fn identify(&self, message: Message) -> Result<()>;

	fn track(&self, message: Message) -> Result<()>;

	/// Forgets any per-visitor state and mints a new anonymous id.
	fn reset(&self) -> Result<AnonymousId>;
}

pub type SharedTransport = Arc<dyn Transport>;

/// Discards every message. Used when no collector is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransport;

impl Transport for NoopTransport {
	fn anonymous_id(&self) -> Result<AnonymousId> {
		Ok(AnonymousId::generate())
	}

	fn page(&self, _message: Message) -> Result<()> {
		Ok(())
	}

	fn identify(&self, _message: Message) -> Result<()> {
		Ok(())
	}

	fn track(&self, _message: Message) -> Result<()> {
		Ok(())
	}

	fn reset(&self) -> Result<AnonymousId> {
		Ok(AnonymousId::generate())
	}
}

#[derive(Debug, Default)]
struct Recorded {
	messages: Vec<Message>,
	resets: usize,
	unavailable: bool,
}

/// Records messages in memory. Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
	inner: Arc<Mutex<Recorded>>,
}

impl MemoryTransport {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, Recorded> {
		self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Makes every subsequent call fail with `TransportUnavailable`.
	pub fn set_unavailable(&self, unavailable: bool) {
		self.lock().unavailable = unavailable;
	}

	pub fn messages(&self) -> Vec<Message> {
		self.lock().messages.clone()
	}

	/// Recorded messages of one kind (`page`, `identify` or `track`).
	pub fn messages_of(&self, kind: &str) -> Vec<Message> {
		self
			.lock()
			.messages
			.iter()
			.filter(|m| m.kind() == kind)
			.cloned()
			.collect()
	}

	/// Names of recorded track messages, in order.
	pub fn event_names(&self) -> Vec<String> {
		self
			.messages_of("track")
			.iter()
			.filter_map(|m| m.name().map(str::to_string))
			.collect()
	}

	pub fn reset_count(&self) -> usize {
		self.lock().resets
	}

	fn record(&self, message: Message) -> Result<()> {
		let mut recorded = self.lock();
		if recorded.unavailable {
			return Err(AnalyticsError::TransportUnavailable(
				"memory transport disabled".to_string(),
			));
		}
		recorded.messages.push(message);
		Ok(())
	}
}

impl Transport for MemoryTransport {
	fn anonymous_id(&self) -> Result<AnonymousId> {
		if self.lock().unavailable {
			return Err(AnalyticsError::TransportUnavailable(
				"memory transport disabled".to_string(),
			));
		}
		Ok(AnonymousId::generate())
	}

	fn page(&self, message: Message) -> Result<()> {
		self.record(message)
	}

	fn identify(&self, message: Message) -> Result<()> {
		self.record(message)
	}

	fn track(&self, message: Message) -> Result<()> {
		self.record(message)
	}

	fn reset(&self) -> Result<AnonymousId> {
		let mut recorded = self.lock();
		if recorded.unavailable {
			return Err(AnalyticsError::TransportUnavailable(
				"memory transport disabled".to_string(),
			));
		}
		recorded.resets += 1;
		Ok(AnonymousId::generate())
	}
}
