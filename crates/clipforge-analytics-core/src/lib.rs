// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Clipforge product analytics.
//!
//! This crate holds the transport-independent parts of the tracking contract,
//! shared by the client SDK (`clipforge-analytics`) and anything that consumes
//! its messages:
//!
//! - The anonymous/identified [`Identity`] state machine
//! - [`EventRecord`] and [`PageView`] records and the event naming convention
//! - Profile [`Traits`] and the property scrubbing rules
//! - One-shot engagement milestones
//! - The collector [`Message`] format
//!
//! # Example
//!
//! ```
//! use clipforge_analytics_core::{
//!     catalog, AnonymousId, EventRecord, Identity, Message, UserId,
//! };
//!
//! let anonymous = Identity::anonymous(AnonymousId::generate());
//! let (identity, _) = anonymous.identify(UserId::parse("A7X9K").unwrap()).unwrap();
//!
//! let event = EventRecord::new(catalog::SIGNED_UP, Default::default());
//! let message = Message::track(&identity, &event);
//! assert_eq!(message.user_id().unwrap().as_str(), "A7X9K");
//! ```

pub mod catalog;
pub mod engagement;
pub mod error;
pub mod event;
pub mod identity;
pub mod message;
pub mod plan;
pub mod sanitize;
pub mod traits;

pub use engagement::{EngagementConfig, EngagementTracker, Milestone};
pub use error::{IdentityError, ParseError};
pub use event::{
	check_event_name, EventRecord, MessageId, NameViolation, PageView, MAX_EVENT_NAME_LENGTH,
};
pub use identity::{AnonymousId, IdentifyOutcome, Identity, UserId, MAX_USER_ID_LENGTH};
pub use message::Message;
pub use plan::Plan;
pub use traits::{RejectedTraits, Traits};
