// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport that prints each message as one JSON line.

use std::io::Write;
use std::sync::Mutex;

use clipforge_analytics::{AnalyticsError, AnonymousId, Message, Result, Transport};

pub struct StdoutTransport {
	out: Mutex<Box<dyn Write + Send>>,
}

impl StdoutTransport {
	pub fn new() -> Self {
		Self::with_writer(Box::new(std::io::stdout()))
	}

	pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
		Self {
			out: Mutex::new(out),
		}
	}

	fn emit(&self, message: &Message) -> Result<()> {
		let line = serde_json::to_string(message)?;
		let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		writeln!(out, "{line}")
			.and_then(|()| out.flush())
			.map_err(|e| AnalyticsError::TransportUnavailable(e.to_string()))
	}
}

impl Transport for StdoutTransport {
	fn anonymous_id(&self) -> Result<AnonymousId> {
		Ok(AnonymousId::generate())
	}

	fn page(&self, message: Message) -> Result<()> {
		self.emit(&message)
	}

	fn identify(&self, message: Message) -> Result<()> {
		self.emit(&message)
	}

	fn track(&self, message: Message) -> Result<()> {
		self.emit(&message)
	}

	fn reset(&self) -> Result<AnonymousId> {
		Ok(AnonymousId::generate())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clipforge_analytics::{EventRecord, Identity};
	use serde_json::{Map, Value};
	use std::sync::Arc;

	#[derive(Clone, Default)]
	struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

	impl Write for SharedBuffer {
		fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
			self.0.lock().unwrap().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> std::io::Result<()> {
			Ok(())
		}
	}

	#[test]
	fn writes_one_json_line_per_message() {
		let buffer = SharedBuffer::default();
		let transport = StdoutTransport::with_writer(Box::new(buffer.clone()));
		let identity = Identity::anonymous(AnonymousId::from_transport("anon_cli"));

		for name in ["Signed Up", "Logged In"] {
			transport
				.track(Message::track(&identity, &EventRecord::new(name, Map::new())))
				.unwrap();
		}

		let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
		let lines: Vec<Value> = output
			.lines()
			.map(|l| serde_json::from_str(l).unwrap())
			.collect();
		assert_eq!(lines.len(), 2);
		assert_eq!(lines[1]["event"], "Logged In");
		assert_eq!(lines[0]["anonymous_id"], "anon_cli");
	}
}
