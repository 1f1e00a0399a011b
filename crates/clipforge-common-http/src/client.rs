// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP client builder with the Clipforge User-Agent header.

use reqwest::{Client, ClientBuilder};

const PRODUCT: &str = "clipforge";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates a new HTTP client builder with the standard Clipforge User-Agent.
///
/// # Example
/// ```ignore
/// let client = clipforge_common_http::builder()
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Returns the standard User-Agent string.
///
/// Format: `clipforge/{os}-{arch}/{version}`
pub fn user_agent() -> String {
	format!(
		"{PRODUCT}/{}-{}/{VERSION}",
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_three_segments() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "clipforge");
		assert_eq!(parts[2], VERSION);
	}

	#[test]
	fn builder_builds() {
		assert!(builder().build().is_ok());
	}
}
