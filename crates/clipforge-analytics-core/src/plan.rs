// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subscription plan tiers.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// The plan tier a user is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
	#[default]
	Free,
	Pro,
	Business,
}

impl Plan {
	pub fn as_str(&self) -> &'static str {
		match self {
			Plan::Free => "free",
			Plan::Pro => "pro",
			Plan::Business => "business",
		}
	}

	/// Exports allowed per UTC day, `None` when unlimited.
	pub fn daily_export_limit(&self) -> Option<u32> {
		match self {
			Plan::Free => Some(3),
			Plan::Pro | Plan::Business => None,
		}
	}
}

impl std::fmt::Display for Plan {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for Plan {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"free" => Ok(Plan::Free),
			"pro" => Ok(Plan::Pro),
			"business" => Ok(Plan::Business),
			_ => Err(ParseError::InvalidPlan(s.to_string())),
		}
	}
}
