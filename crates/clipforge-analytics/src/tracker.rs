// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tracking facade.
//!
//! [`Tracker`] owns the current identity and trait cache, scrubs and enriches
//! properties, and forwards messages to a [`Transport`](crate::Transport). Only identify can
//! fail; delivery problems are logged and otherwise invisible to callers.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use clipforge_analytics_core::sanitize::{strip_identity_keys, strip_keys, strip_non_scalars};
use clipforge_analytics_core::{
	catalog, check_event_name, AnonymousId, EngagementConfig, EngagementTracker, EventRecord,
	IdentifyOutcome, Identity, Message, Milestone, PageView, Plan, RejectedTraits, Traits, UserId,
};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::AnalyticsConfig;
use crate::context::{ClientContext, SessionId};
use crate::error::{AnalyticsError, Result};
use crate::properties::Properties;
use crate::store::{ClientState, FileStore, MemoryStore, StateStore, UsageCounters};
use crate::transport::{NoopTransport, SharedTransport};

/// Builder for a [`Tracker`].
pub struct TrackerBuilder {
	transport: Option<SharedTransport>,
	store: Option<Arc<dyn StateStore>>,
	context: Option<ClientContext>,
	engagement: EngagementConfig,
}

impl TrackerBuilder {
	pub fn new() -> Self {
		Self {
			transport: None,
			store: None,
			context: None,
			engagement: EngagementConfig::default(),
		}
	}

	/// Context and file store from configuration. The transport is still the
	/// caller's choice.
	pub fn from_config(config: &AnalyticsConfig) -> Self {
		let store: Arc<dyn StateStore> = match config.resolved_state_path() {
			Some(path) => Arc::new(FileStore::with_namespace(path, config.namespace.clone())),
			None => Arc::new(MemoryStore::new()),
		};
		Self::new()
			.store(store)
			.context(ClientContext::from_config(config))
	}

	/// Defaults to [`NoopTransport`].
	pub fn transport(mut self, transport: SharedTransport) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Defaults to a fresh [`MemoryStore`].
	pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
		self.store = Some(store);
		self
	}

	/// Defaults to [`ClientContext::detect`].
	pub fn context(mut self, context: ClientContext) -> Self {
		self.context = Some(context);
		self
	}

	pub fn engagement(mut self, config: EngagementConfig) -> Self {
		self.engagement = config;
		self
	}

	/// Restores persisted state, or starts a new anonymous visitor.
	pub fn build(self) -> Tracker {
		let transport = self
			.transport
			.unwrap_or_else(|| Arc::new(NoopTransport) as SharedTransport);
		let store = self
			.store
			.unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn StateStore>);

		let state = match store.load() {
			Ok(state) => state.unwrap_or_default(),
			Err(e) => {
				warn!(error = %e, "Failed to load analytics state, starting fresh");
				ClientState::default()
			}
		};

		let mut degraded = false;
		let anonymous_id = match state.anonymous_id {
			Some(id) => id,
			None => transport.anonymous_id().unwrap_or_else(|e| {
				if e.is_fatal_for_transport() {
					warn!(error = %e, "Analytics transport unavailable, continuing without delivery");
					degraded = true;
				}
				AnonymousId::generate()
			}),
		};

		let tracker = Tracker {
			transport,
			store,
			context: self.context.unwrap_or_default(),
			identity: Identity::restore(state.user_id, anonymous_id),
			traits: state.traits,
			plan: state.plan,
			usage: state.usage,
			session_id: SessionId::new(),
			engagement: EngagementTracker::new(self.engagement),
			page_attribution: BTreeSet::new(),
			page_seen: false,
			degraded,
		};
		tracker.persist();

		info!(
			distinct_id = %tracker.identity.distinct_id(),
			identified = tracker.identity.is_identified(),
			"Analytics tracker initialized"
		);
		tracker
	}
}

impl Default for TrackerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Identity & event tracking facade.
///
/// Owned by the application root and passed by `&mut`. Methods never block on
/// network I/O.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use clipforge_analytics::{MemoryTransport, Properties, Tracker};
///
/// let transport = MemoryTransport::new();
/// let mut tracker = Tracker::builder()
///     .transport(Arc::new(transport.clone()))
///     .build();
///
/// tracker.page("Home", Properties::new().insert("utm_source", "newsletter"));
/// tracker.track("Feature Used", Properties::new().insert("featureName", "templates"));
/// tracker.identify("A7X9K", Properties::new().insert("plan", "pro")).unwrap();
///
/// assert_eq!(transport.messages().len(), 3);
/// ```
pub struct Tracker {
	transport: SharedTransport,
	store: Arc<dyn StateStore>,
	context: ClientContext,
	identity: Identity,
	traits: Traits,
	plan: Plan,
	usage: UsageCounters,
	session_id: SessionId,
	engagement: EngagementTracker,
	/// Attribution keys sent with the current page view.
	page_attribution: BTreeSet<String>,
	page_seen: bool,
	degraded: bool,
}

impl Tracker {
	pub fn builder() -> TrackerBuilder {
		TrackerBuilder::new()
	}

	/// A tracker over `transport` with an in-memory store.
	pub fn new(transport: SharedTransport) -> Self {
		Self::builder().transport(transport).build()
	}

	pub fn identity(&self) -> &Identity {
		&self.identity
	}

	pub fn traits(&self) -> &Traits {
		&self.traits
	}

	pub fn plan(&self) -> Plan {
		self.plan
	}

	pub fn usage(&self) -> &UsageCounters {
		&self.usage
	}

	pub fn session_id(&self) -> SessionId {
		self.session_id
	}

	/// True once the transport has reported itself unavailable.
	pub fn is_degraded(&self) -> bool {
		self.degraded
	}

	/// A snapshot of what would be persisted.
	pub fn state(&self) -> ClientState {
		ClientState {
			user_id: self.identity.user_id().cloned(),
			anonymous_id: Some(self.identity.anonymous_id().clone()),
			traits: self.traits.clone(),
			plan: self.plan,
			usage: self.usage.clone(),
		}
	}

	/// Records a page view. Call first on every navigation.
	pub fn page(&mut self, name: &str, properties: Properties) {
		let mut props = scrub(properties.into_map(), "page");
		self.context
			.enrich(&mut props, self.session_id, Some(self.plan));

		let page = PageView::new(name, props);
		self.page_attribution = page.attribution_keys().into_iter().collect();
		self.page_seen = true;

		debug!(page_name = %name, distinct_id = %self.identity.distinct_id(), "Recording page view");
		let message = Message::page(&self.identity, &page);
		self.deliver(message);
	}

	/// Binds the visitor to `user_id` and replaces the trait cache.
	///
	/// Traits without a `plan` key carry the current plan tier.
	///
	/// The first identify links the anonymous history (`Linked`); repeats for
	/// the same user refresh traits (`Refreshed`). A different user while
	/// identified is rejected until [`Tracker::reset`].
	pub fn identify(&mut self, user_id: &str, traits: Properties) -> Result<IdentifyOutcome> {
		let user_id = UserId::parse(user_id)?;
		let (identity, outcome) = self.identity.identify(user_id).map_err(|e| {
			warn!(error = %e, "Rejected identify call");
			AnalyticsError::from(e)
		})?;

		let (mut traits, rejected) = Traits::from_map(traits.into_map());
		log_rejected_traits(&rejected);

		match traits.plan() {
			Some(plan) => self.plan = plan,
			None if traits.get("plan").is_none() => traits.set("plan", self.plan.as_str()),
			None => {}
		}
		self.identity = identity;
		self.traits = traits;

		info!(
			user_id = %self.identity.distinct_id(),
			outcome = outcome.as_str(),
			trait_count = self.traits.len(),
			"Identified user"
		);
		self.send_identify();
		self.persist();
		Ok(outcome)
	}

	/// Records a discrete action, e.g. "Project Created".
	pub fn track(&mut self, event_name: &str, properties: Properties) {
		if let Err(violation) = check_event_name(event_name) {
			warn!(event_name = %event_name, %violation, "Event name breaks naming convention");
		}
		if !self.page_seen {
			debug!(event_name = %event_name, "Event tracked before any page view");
		}

		let mut props = scrub(properties.into_map(), "track");
		let attribution = &self.page_attribution;
		let repeated = strip_keys(&mut props, |key| attribution.contains(key));
		if !repeated.is_empty() {
			debug!(event_name = %event_name, keys = ?repeated, "Dropped attribution already sent with page view");
		}
		self.context
			.enrich(&mut props, self.session_id, Some(self.plan));

		debug!(event_name = %event_name, distinct_id = %self.identity.distinct_id(), "Tracking event");
		let event = EventRecord::new(event_name, props);
		let message = Message::track(&self.identity, &event);
		self.deliver(message);
	}

	/// Forgets the user: new anonymous id, new session, empty traits, counters
	/// and milestones. The stored state is replaced by the fresh visitor.
	pub fn reset(&mut self) {
		let anonymous_id = if self.degraded {
			AnonymousId::generate()
		} else {
			match self.transport.reset() {
				Ok(id) => id,
				Err(e) => {
					self.note_transport_error("reset", e);
					AnonymousId::generate()
				}
			}
		};

		self.identity = Identity::anonymous(anonymous_id);
		self.traits = Traits::new();
		self.plan = Plan::default();
		self.usage = UsageCounters::default();
		self.session_id = SessionId::new();
		self.engagement.reset();
		self.page_attribution.clear();
		self.page_seen = false;

		self.persist();
		info!(distinct_id = %self.identity.distinct_id(), "Analytics identity reset");
	}

	/// Identify at signup followed by `Signed Up`.
	pub fn signed_up(
		&mut self,
		user_id: &str,
		traits: Properties,
		properties: Properties,
	) -> Result<IdentifyOutcome> {
		let outcome = self.identify(user_id, traits)?;
		self.track(catalog::SIGNED_UP, properties);
		Ok(outcome)
	}

	/// Identify at login followed by `Logged In`.
	pub fn logged_in(
		&mut self,
		user_id: &str,
		traits: Properties,
		properties: Properties,
	) -> Result<IdentifyOutcome> {
		let outcome = self.identify(user_id, traits)?;
		self.track(catalog::LOGGED_IN, properties);
		Ok(outcome)
	}

	/// `Logged Out` under the outgoing identity, then [`Tracker::reset`].
	pub fn logged_out(&mut self) {
		self.track(catalog::LOGGED_OUT, Properties::new());
		self.reset();
	}

	/// Changes plan tier, refreshing the `plan` trait when identified.
	pub fn upgrade_plan(&mut self, plan: Plan) {
		let from = self.plan;
		if from == plan {
			debug!(plan = %plan, "Plan unchanged");
			return;
		}

		self.plan = plan;
		if self.identity.is_identified() {
			self.traits.set("plan", plan.as_str());
			self.send_identify();
		}
		self.persist();

		self.track(
			catalog::PLAN_UPGRADED,
			Properties::new()
				.insert("from", from.as_str())
				.insert("to", plan.as_str()),
		);
	}

	/// Counts a project and tracks `Project Created`. Returns the new total.
	pub fn project_created(&mut self, properties: Properties) -> u32 {
		let count = self.usage.record_project();
		self.persist();
		self.track(
			catalog::PROJECT_CREATED,
			properties.insert("project_count", count),
		);
		count
	}

	/// Counts an export for the current UTC day. Returns today's total.
	pub fn video_exported(&mut self, properties: Properties) -> u32 {
		self.video_exported_on(Utc::now().date_naive(), properties)
	}

	/// Counts an export on `day`.
	///
	/// Tracks `Video Exported`, plus `Export Limit Reached` on the export
	/// that uses up the plan's daily allowance.
	pub fn video_exported_on(&mut self, day: NaiveDate, properties: Properties) -> u32 {
		let count = self.usage.record_export(day);
		self.persist();
		self.track(
			catalog::VIDEO_EXPORTED,
			properties.insert("exports_today", count),
		);

		if let Some(limit) = self.plan.daily_export_limit() {
			if count == limit {
				self.track(
					catalog::EXPORT_LIMIT_REACHED,
					Properties::new()
						.insert("limit", limit)
						.insert("plan", self.plan.as_str()),
				);
			}
		}
		count
	}

	/// Records an onboarding step. Tracks only the first completion.
	pub fn complete_onboarding_step(&mut self, step: &str) -> bool {
		if !self.usage.complete_step(step) {
			debug!(step = %step, "Onboarding step already completed");
			return false;
		}
		self.persist();
		self.track(
			catalog::ONBOARDING_STEP_COMPLETED,
			Properties::new().insert("step", step),
		);
		true
	}

	/// Feeds a scroll position in percent.
	pub fn observe_scroll(&mut self, depth_percent: f64, at: Instant) -> Vec<Milestone> {
		let fired = self.engagement.observe_scroll(depth_percent, at);
		self.emit_milestones(&fired);
		fired
	}

	/// Evaluates a debounced scroll sample whose quiet period has passed.
	pub fn poll_engagement(&mut self, now: Instant) -> Vec<Milestone> {
		let fired = self.engagement.poll(now);
		self.emit_milestones(&fired);
		fired
	}

	pub fn observe_time_on_page(&mut self, elapsed: Duration) -> Vec<Milestone> {
		let fired = self.engagement.observe_time_on_page(elapsed);
		self.emit_milestones(&fired);
		fired
	}

	pub fn record_interaction(&mut self) -> Vec<Milestone> {
		let fired = self.engagement.record_interaction();
		self.emit_milestones(&fired);
		fired
	}

	fn emit_milestones(&mut self, milestones: &[Milestone]) {
		for milestone in milestones {
			self.track(milestone.event_name(), Properties::from(milestone.properties()));
		}
	}

	fn send_identify(&mut self) {
		if let Some(message) = Message::identify(&self.identity, &self.traits) {
			self.deliver(message);
		}
	}

	fn deliver(&mut self, message: Message) {
		let kind = message.kind();
		if self.degraded {
			debug!(kind, "Analytics transport unavailable, message not delivered");
			return;
		}

		let result = match message {
			page @ Message::Page { .. } => self.transport.page(page),
			identify @ Message::Identify { .. } => self.transport.identify(identify),
			track @ Message::Track { .. } => self.transport.track(track),
		};
		if let Err(e) = result {
			self.note_transport_error(kind, e);
		}
	}

	fn note_transport_error(&mut self, operation: &'static str, error: AnalyticsError) {
		if error.is_fatal_for_transport() {
			if !self.degraded {
				warn!(operation, error = %error, "Analytics transport unavailable, continuing without delivery");
				self.degraded = true;
			}
		} else {
			warn!(operation, error = %error, "Analytics message dropped");
		}
	}

	fn persist(&self) {
		if let Err(e) = self.store.save(&self.state()) {
			warn!(error = %e, "Failed to save analytics state");
		}
	}
}

/// Removes identity keys and non-scalar values from page or track properties.
fn scrub(mut props: Map<String, Value>, operation: &'static str) -> Map<String, Value> {
	let identity = strip_identity_keys(&mut props);
	if !identity.is_empty() {
		warn!(operation, keys = ?identity, "Stripped identity keys from properties");
	}
	let non_scalar = strip_non_scalars(&mut props);
	if !non_scalar.is_empty() {
		warn!(operation, keys = ?non_scalar, "Dropped non-scalar property values");
	}
	props
}

fn log_rejected_traits(rejected: &RejectedTraits) {
	if rejected.is_empty() {
		return;
	}
	if !rejected.identity.is_empty() {
		warn!(keys = ?rejected.identity, "Stripped identity keys from traits");
	}
	if !rejected.attribution.is_empty() {
		warn!(keys = ?rejected.attribution, "Stripped campaign attribution from traits");
	}
	if !rejected.non_scalar.is_empty() {
		warn!(keys = ?rejected.non_scalar, "Dropped non-scalar trait values");
	}
}
