// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Clipforge product analytics SDK.
//!
//! The [`Tracker`] facade sits between application code and a [`Transport`].
//! It owns the anonymous/identified identity, caches profile traits, and
//! enriches every page and track call with session and device context.
//!
//! # Lifecycle
//!
//! - `page` on every navigation
//! - `identify` once at signup (links the anonymous history) and on each login
//! - `track` for discrete actions, named as past-tense Title Case phrases
//! - `reset` at logout
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use clipforge_analytics::{AnalyticsConfig, HttpTransport, Properties, TrackerBuilder};
//!
//! # async fn example() -> clipforge_analytics::Result<()> {
//! let config = AnalyticsConfig::from_env()?;
//! let transport = Arc::new(HttpTransport::from_config(&config)?);
//! let mut tracker = TrackerBuilder::from_config(&config)
//!     .transport(transport.clone())
//!     .build();
//!
//! tracker.page("Pricing", Properties::new().insert("utm_source", "newsletter"));
//! tracker.signed_up("A7X9K", Properties::new().insert("plan", "free"), Properties::new())?;
//!
//! transport.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod properties;
pub mod store;
pub mod tracker;
pub mod transport;

pub use batch::BatchConfig;
pub use config::AnalyticsConfig;
pub use context::{ClientContext, SessionId};
pub use error::{AnalyticsError, Result};
pub use http::{HttpTransport, HttpTransportBuilder};
pub use properties::Properties;
pub use store::{ClientState, FileStore, MemoryStore, StateStore, UsageCounters};
pub use tracker::{Tracker, TrackerBuilder};
pub use transport::{MemoryTransport, NoopTransport, SharedTransport, Transport};

pub use clipforge_analytics_core::{
	catalog, AnonymousId, EventRecord, IdentifyOutcome, Identity, IdentityError, Message, Milestone,
	PageView, Plan, Traits, UserId,
};
pub use clipforge_common_http::RetryConfig;
