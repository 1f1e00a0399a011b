// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP transport: queues messages and posts them to the collector in batches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clipforge_analytics_core::{AnonymousId, Message};
use clipforge_common_http::RetryConfig;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::batch::{BatchCommand, BatchConfig, BatchProcessor, BatchSender};
use crate::config::{normalize_collector_url, validate_write_key, AnalyticsConfig};
use crate::error::{AnalyticsError, Result};
use crate::transport::Transport;

/// Builder for an [`HttpTransport`].
pub struct HttpTransportBuilder {
	write_key: Option<String>,
	collector_url: Option<String>,
	batch_config: BatchConfig,
	retry_config: RetryConfig,
	request_timeout: Duration,
}

impl HttpTransportBuilder {
	pub fn new() -> Self {
		Self {
			write_key: None,
			collector_url: None,
			batch_config: BatchConfig::default(),
			retry_config: RetryConfig::default(),
			request_timeout: Duration::from_secs(10),
		}
	}

	/// Sets the write key. Must start with `cf_write_`.
	pub fn write_key(mut self, key: impl Into<String>) -> Self {
		self.write_key = Some(key.into());
		self
	}

	/// Sets the collector base URL, e.g. `https://collector.clipforge.dev`.
	pub fn collector_url(mut self, url: impl Into<String>) -> Self {
		self.collector_url = Some(url.into());
		self
	}

	pub fn batch_config(mut self, config: BatchConfig) -> Self {
		self.batch_config = config;
		self
	}

	pub fn retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;
		self
	}

	/// Validates settings and starts the background flush task.
	///
	/// Must be called from within a tokio runtime.
	pub fn build(self) -> Result<HttpTransport> {
		let write_key = self.write_key.ok_or(AnalyticsError::InvalidWriteKey)?;
		validate_write_key(&write_key)?;
		let collector_url = self
			.collector_url
			.ok_or_else(|| AnalyticsError::InvalidCollectorUrl(String::new()))?;
		let collector_url = normalize_collector_url(&collector_url)?;

		let runtime = tokio::runtime::Handle::try_current()
			.map_err(|e| AnalyticsError::TransportUnavailable(e.to_string()))?;

		let http_client = clipforge_common_http::builder()
			.timeout(self.request_timeout)
			.build()?;

		let sender = Arc::new(HttpBatchSender {
			http_client,
			write_key,
			batch_url: format!("{collector_url}/v1/batch"),
			retry_config: self.retry_config,
		});

		let (tx, rx) = mpsc::channel(self.batch_config.max_queue_size.max(1));
		let processor = BatchProcessor::new(self.batch_config, sender);
		let handle = runtime.spawn(processor.run(rx));

		info!(collector_url = %collector_url, "Analytics HTTP transport initialized");

		Ok(HttpTransport {
			collector_url,
			tx,
			handle: Mutex::new(Some(handle)),
			closed: AtomicBool::new(false),
		})
	}
}

impl Default for HttpTransportBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Batching HTTP transport.
///
/// Calls never wait on the network: messages go to a bounded queue drained by
/// a background task. Call [`HttpTransport::shutdown`] before exit to flush.
pub struct HttpTransport {
	collector_url: String,
	tx: mpsc::Sender<BatchCommand>,
	handle: Mutex<Option<JoinHandle<()>>>,
	closed: AtomicBool,
}

impl HttpTransport {
	pub fn builder() -> HttpTransportBuilder {
		HttpTransportBuilder::new()
	}

	/// Builds a transport from loaded configuration.
	pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
		let mut builder = Self::builder()
			.batch_config(config.batch_config())
			.request_timeout(config.request_timeout());
		if let Some(url) = &config.collector_url {
			builder = builder.collector_url(url.clone());
		}
		if let Some(key) = &config.write_key {
			builder = builder.write_key(key.clone());
		}
		builder.build()
	}

	pub fn collector_url(&self) -> &str {
		&self.collector_url
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	fn check_closed(&self) -> Result<()> {
		if self.is_closed() {
			return Err(AnalyticsError::ClientShutdown);
		}
		Ok(())
	}

	fn enqueue(&self, message: Message) -> Result<()> {
		self.check_closed()?;
		self
			.tx
			.try_send(BatchCommand::Enqueue(message))
			.map_err(|e| match e {
				mpsc::error::TrySendError::Full(_) => AnalyticsError::QueueFull,
				mpsc::error::TrySendError::Closed(_) => {
					AnalyticsError::TransportUnavailable("batch processor stopped".to_string())
				}
			})
	}

	/// Asks the background task to flush now. Does not wait for delivery.
	pub fn flush(&self) -> Result<()> {
		self.check_closed()?;
		match self.tx.try_send(BatchCommand::Flush) {
			Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
			Err(mpsc::error::TrySendError::Closed(_)) => Err(AnalyticsError::TransportUnavailable(
				"batch processor stopped".to_string(),
			)),
		}
	}

	/// Flushes queued messages and stops the background task.
	pub async fn shutdown(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}

		info!("Shutting down analytics HTTP transport");

		let (done_tx, done_rx) = oneshot::channel();
		if self.tx.send(BatchCommand::Shutdown(done_tx)).await.is_ok() {
			let _ = done_rx.await;
		}

		let handle = self
			.handle
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.take();
		if let Some(handle) = handle {
			if let Err(e) = handle.await {
				warn!(error = %e, "Analytics batch task ended abnormally");
			}
		}

		info!("Analytics HTTP transport shut down");
		Ok(())
	}
}

impl Transport for HttpTransport {
	fn anonymous_id(&self) -> Result<AnonymousId> {
		Ok(AnonymousId::generate())
	}

	fn page(&self, message: Message) -> Result<()> {
		self.enqueue(message)
	}

	fn identify(&self, message: Message) -> Result<()> {
		self.enqueue(message)
	}

	fn track(&self, message: Message) -> Result<()> {
		self.enqueue(message)
	}

	/// Pushes out the outgoing visitor's messages before minting a new id.
	fn reset(&self) -> Result<AnonymousId> {
		self.flush()?;
		Ok(AnonymousId::generate())
	}
}

#[derive(Serialize)]
struct BatchRequest<'a> {
	batch: &'a [Message],
}

struct HttpBatchSender {
	http_client: Client,
	write_key: String,
	batch_url: String,
	retry_config: RetryConfig,
}

impl HttpBatchSender {
	async fn post_once(&self, body: &BatchRequest<'_>) -> Result<()> {
		let response = self
			.http_client
			.post(&self.batch_url)
			.bearer_auth(&self.write_key)
			.json(body)
			.send()
			.await?;

		let status = response.status();
		if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
			let retry_after = response
				.headers()
				.get(reqwest::header::RETRY_AFTER)
				.and_then(|v| v.to_str().ok())
				.and_then(|s| s.parse().ok());
			return Err(AnalyticsError::RateLimited {
				retry_after_secs: retry_after,
			});
		}

		if !status.is_success() {
			return Err(AnalyticsError::ServerError {
				status: status.as_u16(),
				message: response.text().await.unwrap_or_default(),
			});
		}

		Ok(())
	}
}

#[async_trait::async_trait]
impl BatchSender for HttpBatchSender {
	async fn send_batch(&self, messages: Vec<Message>) -> Result<()> {
		let body = BatchRequest { batch: &messages };
		debug!(url = %self.batch_url, count = messages.len(), "Sending analytics batch");

		clipforge_common_http::retry(&self.retry_config, || self.post_once(&body)).await
	}
}
