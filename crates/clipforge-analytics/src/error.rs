// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics SDK.

use std::time::Duration;

use clipforge_analytics_core::IdentityError;
use clipforge_common_http::RetryableError;
use thiserror::Error;

/// Analytics SDK errors.
///
/// Only [`AnalyticsError::Identity`] ever reaches callers of the tracking
/// facade; everything else is logged and swallowed there.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// Write key is missing or malformed.
	#[error("invalid write key: must start with 'cf_write_'")]
	InvalidWriteKey,

	/// Collector URL is missing or not http(s).
	#[error("invalid collector URL: {0}")]
	InvalidCollectorUrl(String),

	/// Configuration value could not be parsed.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// Caller broke the identity contract.
	#[error(transparent)]
	Identity(#[from] IdentityError),

	/// The transport cannot accept messages at all.
	#[error("transport unavailable: {0}")]
	TransportUnavailable(String),

	/// The transport's queue is full; the message was dropped.
	#[error("transport queue full")]
	QueueFull,

	/// Client has been shut down.
	#[error("client has been shut down")]
	ClientShutdown,

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Collector returned an error response.
	#[error("collector error ({status}): {message}")]
	ServerError { status: u16, message: String },

	/// Rate limited by the collector.
	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	/// Reading or writing persisted state failed.
	#[error("storage error: {0}")]
	Storage(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl AnalyticsError {
	/// True for errors meaning the transport will never deliver again.
	pub fn is_fatal_for_transport(&self) -> bool {
		matches!(
			self,
			AnalyticsError::TransportUnavailable(_) | AnalyticsError::ClientShutdown
		)
	}
}

impl RetryableError for AnalyticsError {
	fn is_retryable(&self) -> bool {
		match self {
			AnalyticsError::RequestFailed(e) => e.is_retryable(),
			AnalyticsError::ServerError { status, .. } => {
				matches!(*status, 429 | 408 | 500 | 502 | 503 | 504)
			}
			AnalyticsError::RateLimited { .. } => true,
			_ => false,
		}
	}

	fn retry_after(&self) -> Option<Duration> {
		match self {
			AnalyticsError::RateLimited {
				retry_after_secs: Some(secs),
			} => Some(Duration::from_secs(*secs)),
			_ => None,
		}
	}
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
