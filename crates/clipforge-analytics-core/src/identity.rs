// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracking identity and its lifecycle.
//!
//! A visitor starts out [`Identity::Anonymous`] under a transport-issued
//! anonymous id. Signup promotes the identity to [`Identity::Identified`],
//! which links every earlier anonymous event to the user id. Login re-identifies
//! under the same user id to refresh traits. Only a reset returns the identity
//! to anonymous, under a fresh anonymous id.
//!
//! ```
//! use clipforge_analytics_core::{AnonymousId, Identity, IdentifyOutcome, UserId};
//!
//! let anon = Identity::anonymous(AnonymousId::generate());
//! let user = UserId::parse("A7X9K").unwrap();
//!
//! let (identified, outcome) = anon.identify(user.clone()).unwrap();
//! assert_eq!(outcome, IdentifyOutcome::Linked);
//! assert_eq!(identified.user_id(), Some(&user));
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IdentityError;

/// Maximum accepted length for a user id.
pub const MAX_USER_ID_LENGTH: usize = 200;

/// Opaque identifier the transport assigns to an unauthenticated visitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnonymousId(String);

impl AnonymousId {
	/// Prefix applied to locally minted anonymous ids.
	pub const PREFIX: &'static str = "anon_";

	/// Mints a new random anonymous id.
	pub fn generate() -> Self {
		Self(format!("{}{}", Self::PREFIX, Uuid::new_v4().simple()))
	}

	/// Wraps an id issued by an external transport.
	pub fn from_transport(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for AnonymousId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

/// Stable, caller-assigned identifier of a signed-up user.
///
/// The shape is the caller's business; only blank and oversized ids are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
	pub fn parse(id: impl Into<String>) -> Result<Self, IdentityError> {
		let id = id.into();
		if id.trim().is_empty() {
			return Err(IdentityError::EmptyUserId);
		}
		if id.chars().count() > MAX_USER_ID_LENGTH {
			return Err(IdentityError::UserIdTooLong {
				max: MAX_USER_ID_LENGTH,
			});
		}
		Ok(Self(id))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for UserId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl std::str::FromStr for UserId {
	type Err = IdentityError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

/// The identity every outgoing call is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Identity {
	Anonymous {
		anonymous_id: AnonymousId,
	},
	Identified {
		user_id: UserId,
		/// The anonymous id in force at signup, kept for audit.
		anonymous_id: AnonymousId,
	},
}

/// What an identify call did to the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifyOutcome {
	/// Anonymous visitor promoted; prior anonymous events now belong to the user.
	Linked,
	/// Already identified as the same user; traits refreshed.
	Refreshed,
}

impl IdentifyOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			IdentifyOutcome::Linked => "linked",
			IdentifyOutcome::Refreshed => "refreshed",
		}
	}
}

impl std::fmt::Display for IdentifyOutcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Identity {
	pub fn anonymous(anonymous_id: AnonymousId) -> Self {
		Identity::Anonymous { anonymous_id }
	}

	/// Rebuilds an identity from persisted parts.
	pub fn restore(user_id: Option<UserId>, anonymous_id: AnonymousId) -> Self {
		match user_id {
			Some(user_id) => Identity::Identified {
				user_id,
				anonymous_id,
			},
			None => Identity::Anonymous { anonymous_id },
		}
	}

	pub fn anonymous_id(&self) -> &AnonymousId {
		match self {
			Identity::Anonymous { anonymous_id } | Identity::Identified { anonymous_id, .. } => {
				anonymous_id
			}
		}
	}

	pub fn user_id(&self) -> Option<&UserId> {
		match self {
			Identity::Anonymous { .. } => None,
			Identity::Identified { user_id, .. } => Some(user_id),
		}
	}

	pub fn is_identified(&self) -> bool {
		matches!(self, Identity::Identified { .. })
	}

	/// The id a collector should attribute calls to.
	pub fn distinct_id(&self) -> &str {
		match self {
			Identity::Anonymous { anonymous_id } => anonymous_id.as_str(),
			Identity::Identified { user_id, .. } => user_id.as_str(),
		}
	}

	/// Applies an identify call.
	///
	/// Identifying as a different user while identified is rejected; callers
	/// must reset between distinct identities.
	pub fn identify(&self, user_id: UserId) -> Result<(Identity, IdentifyOutcome), IdentityError> {
		match self {
			Identity::Anonymous { anonymous_id } => Ok((
				Identity::Identified {
					user_id,
					anonymous_id: anonymous_id.clone(),
				},
				IdentifyOutcome::Linked,
			)),
			Identity::Identified {
				user_id: current, ..
			} if *current == user_id => Ok((self.clone(), IdentifyOutcome::Refreshed)),
			Identity::Identified {
				user_id: current, ..
			} => Err(IdentityError::Conflict {
				current: current.to_string(),
				requested: user_id.to_string(),
			}),
		}
	}
}
