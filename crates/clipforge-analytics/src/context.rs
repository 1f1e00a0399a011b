// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session and device context attached to every page and track call.

use clipforge_analytics_core::Plan;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::AnalyticsConfig;

/// Library name for the `$lib` property.
pub const LIB_NAME: &str = "clipforge-analytics";
/// Library version for the `$lib_version` property.
pub const LIB_VERSION: &str = env!("CARGO_PKG_VERSION");

const FALLBACK_LOCALE: &str = "en-US";

/// Identifies one visit. Replaced on reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for SessionId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for SessionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Static client context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
	pub locale: String,
	pub device: String,
	pub app_version: Option<String>,
}

impl ClientContext {
	/// Detects locale and device from the host.
	pub fn detect() -> Self {
		Self {
			locale: sys_locale::get_locale().unwrap_or_else(|| FALLBACK_LOCALE.to_string()),
			device: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
			app_version: None,
		}
	}

	/// Detected context with any overrides from `config` applied.
	pub fn from_config(config: &AnalyticsConfig) -> Self {
		let mut context = Self::detect();
		if let Some(locale) = &config.locale {
			context.locale = locale.clone();
		}
		if let Some(device) = &config.device {
			context.device = device.clone();
		}
		context.app_version = config.app_version.clone();
		context
	}

	/// Adds context keys to `properties`. Existing keys are left untouched.
	pub fn enrich(&self, properties: &mut Map<String, Value>, session: SessionId, plan: Option<Plan>) {
		let mut add = |key: &str, value: Value| {
			properties.entry(key.to_string()).or_insert(value);
		};

		add("$session_id", Value::from(session.to_string()));
		if let Some(plan) = plan {
			add("$plan", Value::from(plan.as_str()));
		}
		add("$locale", Value::from(self.locale.clone()));
		add("$device", Value::from(self.device.clone()));
		if let Some(version) = &self.app_version {
			add("$app_version", Value::from(version.clone()));
		}
		add("$lib", Value::from(LIB_NAME));
		add("$lib_version", Value::from(LIB_VERSION));
	}
}

impl Default for ClientContext {
	fn default() -> Self {
		Self::detect()
	}
}
