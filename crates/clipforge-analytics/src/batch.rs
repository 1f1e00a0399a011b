// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Message batching and background flush for the HTTP transport.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use clipforge_analytics_core::Message;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::Result;

/// Configuration for the message batch queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
	/// Maximum number of messages per request.
	pub max_batch_size: usize,
	/// Interval between automatic flushes.
	pub flush_interval: Duration,
	/// Maximum number of messages to hold before dropping the oldest.
	pub max_queue_size: usize,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			max_batch_size: 10,
			flush_interval: Duration::from_secs(10),
			max_queue_size: 1000,
		}
	}
}

/// Command sent to the background flush task.
#[derive(Debug)]
pub enum BatchCommand {
	Enqueue(Message),
	/// Force an immediate flush.
	Flush,
	/// Flush what is queued, then stop. The sender is signalled once done.
	Shutdown(oneshot::Sender<()>),
}

/// Delivers one batch to the collector.
#[async_trait::async_trait]
pub trait BatchSender: Send + Sync {
	async fn send_batch(&self, messages: Vec<Message>) -> Result<()>;
}

/// Owns the queue and drives flushes. Runs inside a spawned task.
pub struct BatchProcessor {
	config: BatchConfig,
	sender: Arc<dyn BatchSender>,
	queue: VecDeque<Message>,
}

impl BatchProcessor {
	pub fn new(config: BatchConfig, sender: Arc<dyn BatchSender>) -> Self {
		Self {
			config,
			sender,
			queue: VecDeque::new(),
		}
	}

	/// Queues a message, dropping the oldest on overflow.
	///
	/// Returns true when a full batch is ready.
	pub fn enqueue(&mut self, message: Message) -> bool {
		while self.queue.len() >= self.config.max_queue_size.max(1) {
			if let Some(dropped) = self.queue.pop_front() {
				warn!(
					kind = dropped.kind(),
					message_id = %dropped.message_id(),
					"Dropped analytics message due to queue overflow"
				);
			}
		}
		self.queue.push_back(message);
		self.queue.len() >= self.config.max_batch_size
	}

	pub fn queue_len(&self) -> usize {
		self.queue.len()
	}

	/// Sends everything queued, one request per `max_batch_size` messages.
	///
	/// A failed batch is dropped; the remaining batches are still attempted
	/// and the first error is returned.
	pub async fn flush(&mut self) -> Result<()> {
		let mut first_error = None;
		let batch_size = self.config.max_batch_size.max(1);

		while !self.queue.is_empty() {
			let take = batch_size.min(self.queue.len());
			let batch: Vec<Message> = self.queue.drain(..take).collect();
			debug!(count = batch.len(), "Flushing analytics batch");

			if let Err(e) = self.sender.send_batch(batch).await {
				first_error.get_or_insert(e);
			}
		}

		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}

	async fn flush_logged(&mut self, reason: &'static str) {
		if let Err(e) = self.flush().await {
			error!(error = %e, reason, "Failed to flush analytics batch");
		}
	}

	/// Runs until shutdown is requested or every sender is dropped.
	pub async fn run(mut self, mut rx: mpsc::Receiver<BatchCommand>) {
		info!(
			flush_interval_ms = self.config.flush_interval.as_millis() as u64,
			max_batch_size = self.config.max_batch_size,
			"Starting analytics batch processor"
		);

		let mut ticker = tokio::time::interval(self.config.flush_interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		ticker.tick().await;

		loop {
			tokio::select! {
				_ = ticker.tick() => self.flush_logged("interval").await,
				command = rx.recv() => match command {
					Some(BatchCommand::Enqueue(message)) => {
						if self.enqueue(message) {
							self.flush_logged("batch_full").await;
						}
					}
					Some(BatchCommand::Flush) => self.flush_logged("requested").await,
					Some(BatchCommand::Shutdown(done)) => {
						self.flush_logged("shutdown").await;
						let _ = done.send(());
						break;
					}
					None => {
						self.flush_logged("closed").await;
						break;
					}
				},
			}
		}

		info!("Analytics batch processor stopped");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::AnalyticsError;
	use clipforge_analytics_core::{AnonymousId, EventRecord, Identity};
	use proptest::prelude::*;
	use serde_json::Map;
	use std::sync::atomic::{AtomicBool, Ordering};
	use tokio::sync::Mutex;

	struct MockSender {
		batches: Mutex<Vec<Vec<Message>>>,
		should_fail: AtomicBool,
	}

	impl MockSender {
		fn new() -> Self {
			Self {
				batches: Mutex::new(Vec::new()),
				should_fail: AtomicBool::new(false),
			}
		}

		async fn batches(&self) -> Vec<Vec<Message>> {
			self.batches.lock().await.clone()
		}
	}

	#[async_trait::async_trait]
	impl BatchSender for MockSender {
		async fn send_batch(&self, messages: Vec<Message>) -> Result<()> {
			if self.should_fail.load(Ordering::SeqCst) {
				return Err(AnalyticsError::ServerError {
					status: 500,
					message: "mock failure".to_string(),
				});
			}
			self.batches.lock().await.push(messages);
			Ok(())
		}
	}

	fn message(name: &str) -> Message {
		let identity = Identity::anonymous(AnonymousId::from_transport("anon_batch"));
		Message::track(&identity, &EventRecord::new(name, Map::new()))
	}

	fn config(max_batch_size: usize, max_queue_size: usize) -> BatchConfig {
		BatchConfig {
			max_batch_size,
			flush_interval: Duration::from_secs(60),
			max_queue_size,
		}
	}

	#[test]
	fn enqueue_reports_full_batch() {
		let mut processor = BatchProcessor::new(config(2, 10), Arc::new(MockSender::new()));
		assert!(!processor.enqueue(message("One Happened")));
		assert!(processor.enqueue(message("Two Happened")));
	}

	#[test]
	fn overflow_drops_oldest() {
		let mut processor = BatchProcessor::new(config(100, 3), Arc::new(MockSender::new()));
		for name in ["A Viewed", "B Viewed", "C Viewed", "D Viewed"] {
			processor.enqueue(message(name));
		}

		assert_eq!(processor.queue_len(), 3);
		let names: Vec<_> = processor
			.queue
			.iter()
			.filter_map(|m| m.name().map(str::to_string))
			.collect();
		assert_eq!(names, vec!["B Viewed", "C Viewed", "D Viewed"]);
	}

	#[tokio::test]
	async fn flush_splits_into_batches() {
		let sender = Arc::new(MockSender::new());
		let mut processor = BatchProcessor::new(config(2, 100), sender.clone());
		for i in 0..5 {
			processor.enqueue(message(&format!("Event {i} Happened")));
		}

		processor.flush().await.unwrap();

		let sizes: Vec<_> = sender.batches().await.iter().map(Vec::len).collect();
		assert_eq!(sizes, vec![2, 2, 1]);
		assert_eq!(processor.queue_len(), 0);
	}

	#[tokio::test]
	async fn flush_of_empty_queue_sends_nothing() {
		let sender = Arc::new(MockSender::new());
		let mut processor = BatchProcessor::new(BatchConfig::default(), sender.clone());
		processor.flush().await.unwrap();
		assert!(sender.batches().await.is_empty());
	}

	#[tokio::test]
	async fn failed_flush_drops_batch_and_reports_error() {
		let sender = Arc::new(MockSender::new());
		sender.should_fail.store(true, Ordering::SeqCst);
		let mut processor = BatchProcessor::new(BatchConfig::default(), sender.clone());
		processor.enqueue(message("Signed Up"));

		assert!(processor.flush().await.is_err());
		assert_eq!(processor.queue_len(), 0);
	}

	#[tokio::test]
	async fn shutdown_flushes_pending_messages() {
		let sender = Arc::new(MockSender::new());
		let (tx, rx) = mpsc::channel(16);
		let handle = tokio::spawn(BatchProcessor::new(config(10, 100), sender.clone()).run(rx));

		tx.send(BatchCommand::Enqueue(message("Signed Up"))).await.unwrap();
		tx.send(BatchCommand::Enqueue(message("Logged In"))).await.unwrap();
		let (done_tx, done_rx) = oneshot::channel();
		tx.send(BatchCommand::Shutdown(done_tx)).await.unwrap();

		done_rx.await.unwrap();
		handle.await.unwrap();

		let batches = sender.batches().await;
		assert_eq!(batches.len(), 1);
		assert_eq!(batches[0].len(), 2);
	}

	#[tokio::test]
	async fn full_batch_is_sent_without_waiting_for_interval() {
		let sender = Arc::new(MockSender::new());
		let (tx, rx) = mpsc::channel(16);
		let handle = tokio::spawn(BatchProcessor::new(config(2, 100), sender.clone()).run(rx));

		tx.send(BatchCommand::Enqueue(message("One Happened"))).await.unwrap();
		tx.send(BatchCommand::Enqueue(message("Two Happened"))).await.unwrap();
		drop(tx);
		handle.await.unwrap();

		assert_eq!(sender.batches().await.len(), 1);
	}

	proptest! {
		#[test]
		fn queue_never_exceeds_capacity(max_queue in 1usize..50, count in 0usize..200) {
			let mut processor = BatchProcessor::new(
				config(1000, max_queue),
				Arc::new(MockSender::new()),
			);
			for _ in 0..count {
				processor.enqueue(message("Feature Used"));
			}
			prop_assert!(processor.queue_len() <= max_queue);
			prop_assert_eq!(processor.queue_len(), count.min(max_queue));
		}
	}
}
