// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analytics configuration: defaults, TOML file, then environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::batch::BatchConfig;
use crate::error::{AnalyticsError, Result};

/// Prefix every write key must carry.
pub const WRITE_KEY_PREFIX: &str = "cf_write_";

/// Default namespace for persisted client state.
pub const DEFAULT_NAMESPACE: &str = "clipforge.analytics";

pub const ENV_COLLECTOR_URL: &str = "CLIPFORGE_ANALYTICS_COLLECTOR_URL";
pub const ENV_WRITE_KEY: &str = "CLIPFORGE_ANALYTICS_WRITE_KEY";
pub const ENV_NAMESPACE: &str = "CLIPFORGE_ANALYTICS_NAMESPACE";
pub const ENV_LOCALE: &str = "CLIPFORGE_ANALYTICS_LOCALE";
pub const ENV_FLUSH_INTERVAL_MS: &str = "CLIPFORGE_ANALYTICS_FLUSH_INTERVAL_MS";
pub const ENV_MAX_BATCH_SIZE: &str = "CLIPFORGE_ANALYTICS_MAX_BATCH_SIZE";

/// Settings for a [`Tracker`](crate::Tracker) and its HTTP transport.
///
/// Without a collector URL the tracker runs against a no-op transport.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsConfig {
	pub collector_url: Option<String>,
	pub write_key: Option<String>,
	pub namespace: String,
	/// Overrides the detected locale.
	pub locale: Option<String>,
	/// Overrides the detected device string.
	pub device: Option<String>,
	pub app_version: Option<String>,
	pub state_path: Option<PathBuf>,
	pub flush_interval_ms: u64,
	pub max_batch_size: usize,
	pub max_queue_size: usize,
	pub request_timeout_ms: u64,
}

impl Default for AnalyticsConfig {
	fn default() -> Self {
		let batch = BatchConfig::default();
		Self {
			collector_url: None,
			write_key: None,
			namespace: DEFAULT_NAMESPACE.to_string(),
			locale: None,
			device: None,
			app_version: None,
			state_path: None,
			flush_interval_ms: batch.flush_interval.as_millis() as u64,
			max_batch_size: batch.max_batch_size,
			max_queue_size: batch.max_queue_size,
			request_timeout_ms: 10_000,
		}
	}
}

impl std::fmt::Debug for AnalyticsConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AnalyticsConfig")
			.field("collector_url", &self.collector_url)
			.field("write_key", &self.write_key.as_ref().map(|_| "[REDACTED]"))
			.field("namespace", &self.namespace)
			.field("locale", &self.locale)
			.field("device", &self.device)
			.field("app_version", &self.app_version)
			.field("state_path", &self.state_path)
			.field("flush_interval_ms", &self.flush_interval_ms)
			.field("max_batch_size", &self.max_batch_size)
			.field("max_queue_size", &self.max_queue_size)
			.field("request_timeout_ms", &self.request_timeout_ms)
			.finish()
	}
}

impl AnalyticsConfig {
	/// Defaults overlaid with the process environment.
	pub fn from_env() -> Result<Self> {
		Self::default().merge_env(|key| std::env::var(key).ok())
	}

	/// Defaults, then `path` when it exists, then the process environment.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let base = match path {
			Some(path) if path.exists() => Self::load_file(path)?,
			Some(path) => {
				debug!(path = %path.display(), "analytics config file not found, using defaults");
				Self::default()
			}
			None => Self::default(),
		};
		base.merge_env(|key| std::env::var(key).ok())
	}

	pub fn load_file(path: &Path) -> Result<Self> {
		let contents = std::fs::read_to_string(path)?;
		Self::from_toml_str(&contents)
	}

	pub fn from_toml_str(contents: &str) -> Result<Self> {
		toml::from_str(contents).map_err(|e| AnalyticsError::InvalidConfig(e.to_string()))
	}

	/// Applies environment overrides read through `lookup`.
	pub fn merge_env<F>(mut self, lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		if let Some(url) = get(ENV_COLLECTOR_URL) {
			self.collector_url = Some(url);
		}
		if let Some(key) = get(ENV_WRITE_KEY) {
			self.write_key = Some(key);
		}
		if let Some(namespace) = get(ENV_NAMESPACE) {
			self.namespace = namespace;
		}
		if let Some(locale) = get(ENV_LOCALE) {
			self.locale = Some(locale);
		}
		if let Some(raw) = get(ENV_FLUSH_INTERVAL_MS) {
			self.flush_interval_ms = parse_number(ENV_FLUSH_INTERVAL_MS, &raw)?;
		}
		if let Some(raw) = get(ENV_MAX_BATCH_SIZE) {
			self.max_batch_size = parse_number(ENV_MAX_BATCH_SIZE, &raw)?;
		}
		Ok(self)
	}

	pub fn with_collector_url(mut self, url: impl Into<String>) -> Self {
		self.collector_url = Some(url.into());
		self
	}

	pub fn with_write_key(mut self, key: impl Into<String>) -> Self {
		self.write_key = Some(key.into());
		self
	}

	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();
		self
	}

	pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.state_path = Some(path.into());
		self
	}

	pub fn with_flush_interval(mut self, interval: Duration) -> Self {
		self.flush_interval_ms = interval.as_millis() as u64;
		self
	}

	pub fn with_max_batch_size(mut self, size: usize) -> Self {
		self.max_batch_size = size;
		self
	}

	pub fn batch_config(&self) -> BatchConfig {
		BatchConfig {
			max_batch_size: self.max_batch_size.max(1),
			flush_interval: Duration::from_millis(self.flush_interval_ms.max(1)),
			max_queue_size: self.max_queue_size.max(1),
		}
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	/// True when a collector URL is set, meaning HTTP delivery is wanted.
	pub fn wants_http(&self) -> bool {
		self.collector_url.is_some()
	}

	/// The state file path: the configured one, else the platform default.
	pub fn resolved_state_path(&self) -> Option<PathBuf> {
		self.state_path.clone().or_else(default_state_path)
	}
}

/// `$XDG_DATA_HOME/clipforge/analytics.json` or the platform equivalent.
pub fn default_state_path() -> Option<PathBuf> {
	dirs::data_dir().map(|dir| dir.join("clipforge").join("analytics.json"))
}

/// Checks the write key prefix.
pub fn validate_write_key(key: &str) -> Result<()> {
	match key.strip_prefix(WRITE_KEY_PREFIX) {
		Some(rest) if !rest.is_empty() => Ok(()),
		_ => Err(AnalyticsError::InvalidWriteKey),
	}
}

/// Checks the URL is http(s) and strips a trailing slash.
pub fn normalize_collector_url(url: &str) -> Result<String> {
	let trimmed = url.trim().trim_end_matches('/');
	let host = trimmed
		.strip_prefix("https://")
		.or_else(|| trimmed.strip_prefix("http://"));
	match host {
		Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
		_ => Err(AnalyticsError::InvalidCollectorUrl(url.to_string())),
	}
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
	raw
		.trim()
		.parse()
		.map_err(|_| AnalyticsError::InvalidConfig(format!("{key} must be a number, got '{raw}'")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn defaults_match_batch_defaults() {
		let config = AnalyticsConfig::default();
		assert_eq!(config.namespace, DEFAULT_NAMESPACE);
		assert_eq!(config.batch_config(), BatchConfig::default());
		assert!(!config.wants_http());
	}

	#[test]
	fn env_overrides_defaults() {
		let config = AnalyticsConfig::default()
			.merge_env(lookup(&[
				(ENV_COLLECTOR_URL, "https://collector.example.com"),
				(ENV_WRITE_KEY, "cf_write_abc"),
				(ENV_NAMESPACE, "clipforge.test"),
				(ENV_LOCALE, "de-DE"),
				(ENV_FLUSH_INTERVAL_MS, "250"),
				(ENV_MAX_BATCH_SIZE, "5"),
			]))
			.unwrap();

		assert_eq!(
			config.collector_url.as_deref(),
			Some("https://collector.example.com")
		);
		assert_eq!(config.namespace, "clipforge.test");
		assert_eq!(config.locale.as_deref(), Some("de-DE"));
		assert_eq!(config.batch_config().flush_interval, Duration::from_millis(250));
		assert_eq!(config.batch_config().max_batch_size, 5);
	}

	#[test]
	fn blank_env_values_are_ignored() {
		let config = AnalyticsConfig::default()
			.merge_env(lookup(&[(ENV_NAMESPACE, "  ")]))
			.unwrap();
		assert_eq!(config.namespace, DEFAULT_NAMESPACE);
	}

	#[test]
	fn non_numeric_env_value_is_rejected() {
		let err = AnalyticsConfig::default()
			.merge_env(lookup(&[(ENV_MAX_BATCH_SIZE, "lots")]))
			.unwrap_err();
		assert!(matches!(err, AnalyticsError::InvalidConfig(_)));
	}

	#[test]
	fn toml_file_is_parsed() {
		let config = AnalyticsConfig::from_toml_str(
			r#"
			collector_url = "http://localhost:8080"
			write_key = "cf_write_local"
			max_batch_size = 50
			app_version = "2.4.0"
			"#,
		)
		.unwrap();

		assert_eq!(config.max_batch_size, 50);
		assert_eq!(config.app_version.as_deref(), Some("2.4.0"));
		assert_eq!(config.namespace, DEFAULT_NAMESPACE);
	}

	#[test]
	fn unknown_toml_keys_are_rejected() {
		assert!(AnalyticsConfig::from_toml_str("colector_url = \"x\"").is_err());
	}

	#[test]
	fn load_reads_file_from_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("analytics.toml");
		std::fs::write(&path, "namespace = \"clipforge.disk\"\n").unwrap();

		let config = AnalyticsConfig::load_file(&path).unwrap();
		assert_eq!(config.namespace, "clipforge.disk");
	}

	#[test]
	fn debug_redacts_write_key() {
		let config = AnalyticsConfig::default().with_write_key("cf_write_supersecret");
		let debug = format!("{config:?}");
		assert!(!debug.contains("supersecret"));
		assert!(debug.contains("[REDACTED]"));
	}

	#[test]
	fn write_key_needs_prefix_and_body() {
		assert!(validate_write_key("cf_write_abc").is_ok());
		assert!(validate_write_key("cf_write_").is_err());
		assert!(validate_write_key("loom_analytics_write_abc").is_err());
	}

	#[test]
	fn collector_url_is_normalized() {
		assert_eq!(
			normalize_collector_url("https://collector.example.com/").unwrap(),
			"https://collector.example.com"
		);
		assert!(normalize_collector_url("ftp://collector").is_err());
		assert!(normalize_collector_url("https://").is_err());
	}
}
