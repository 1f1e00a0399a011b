// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics core.

use thiserror::Error;

/// Violations of the identity lifecycle contract.
///
/// These are caller errors: accepting them silently would corrupt the
/// anonymous/identified state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
	#[error("user id must not be empty")]
	EmptyUserId,

	#[error("user id exceeds {max} characters")]
	UserIdTooLong { max: usize },

	#[error("already identified as {current}; reset before identifying as {requested}")]
	Conflict { current: String, requested: String },
}

/// Failures parsing core enums from strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("invalid plan: {0}")]
	InvalidPlan(String),
}
