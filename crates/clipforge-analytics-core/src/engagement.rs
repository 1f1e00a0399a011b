// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-shot engagement milestones: scroll depth, time on page, interactions.
//!
//! Each milestone fires at most once per session, no matter how often its
//! threshold is crossed. Scroll samples are debounced: a sample is evaluated
//! only after [`EngagementConfig::scroll_debounce`] passes without a newer one.
//!
//! Time is passed in by the caller, so the tracker never reads a clock.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};

use crate::catalog;

/// A crossed engagement threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Milestone {
	/// Percent of the page scrolled.
	ScrollDepth(u8),
	/// Whole minutes on the page.
	TimeOnPage(u32),
	/// Interactions counted this session.
	Interactions(u32),
}

impl Milestone {
	pub fn event_name(&self) -> &'static str {
		match self {
			Milestone::ScrollDepth(_) => catalog::SCROLL_DEPTH_REACHED,
			Milestone::TimeOnPage(_) => catalog::TIME_ON_PAGE_REACHED,
			Milestone::Interactions(_) => catalog::ENGAGEMENT_THRESHOLD_REACHED,
		}
	}

	pub fn properties(&self) -> Map<String, Value> {
		let value = match self {
			Milestone::ScrollDepth(depth) => json!({ "depth_percent": depth }),
			Milestone::TimeOnPage(minutes) => json!({ "minutes": minutes }),
			Milestone::Interactions(count) => json!({ "interactions": count }),
		};
		match value {
			Value::Object(map) => map,
			_ => Map::new(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct EngagementConfig {
	/// Ascending scroll thresholds in percent.
	pub scroll_thresholds: Vec<u8>,
	/// The 100% milestone counts as reached this many points short of the end.
	pub completion_tolerance: u8,
	pub scroll_debounce: Duration,
	/// Ascending time-on-page thresholds in whole minutes.
	pub time_thresholds_minutes: Vec<u32>,
	pub interaction_thresholds: Vec<u32>,
}

impl Default for EngagementConfig {
	fn default() -> Self {
		Self {
			scroll_thresholds: vec![25, 50, 75, 100],
			completion_tolerance: 10,
			scroll_debounce: Duration::from_millis(150),
			time_thresholds_minutes: vec![1, 3, 5],
			interaction_thresholds: vec![5],
		}
	}
}

#[derive(Debug, Clone, Copy)]
struct PendingScroll {
	depth: f64,
	at: Instant,
}

/// Per-session milestone state.
#[derive(Debug, Clone)]
pub struct EngagementTracker {
	config: EngagementConfig,
	fired: BTreeSet<Milestone>,
	interactions: u32,
	pending_scroll: Option<PendingScroll>,
}

impl Default for EngagementTracker {
	fn default() -> Self {
		Self::new(EngagementConfig::default())
	}
}

impl EngagementTracker {
	pub fn new(config: EngagementConfig) -> Self {
		Self {
			config,
			fired: BTreeSet::new(),
			interactions: 0,
			pending_scroll: None,
		}
	}

	/// Records a scroll sample.
	///
	/// A previous sample whose quiet period elapsed before `at` is evaluated
	/// first, as its debounce timer would have fired by then.
	pub fn observe_scroll(&mut self, depth_percent: f64, at: Instant) -> Vec<Milestone> {
		let fired = self.poll(at);
		if depth_percent.is_finite() {
			self.pending_scroll = Some(PendingScroll {
				depth: depth_percent.clamp(0.0, 100.0),
				at,
			});
		}
		fired
	}

	/// Evaluates the pending scroll sample once its quiet period has passed.
	pub fn poll(&mut self, now: Instant) -> Vec<Milestone> {
		match self.pending_scroll {
			Some(pending) if now.saturating_duration_since(pending.at) >= self.config.scroll_debounce => {
				self.pending_scroll = None;
				self.evaluate_scroll(pending.depth)
			}
			_ => Vec::new(),
		}
	}

	fn evaluate_scroll(&mut self, depth: f64) -> Vec<Milestone> {
		let reached: Vec<Milestone> = self
			.config
			.scroll_thresholds
			.iter()
			.filter(|&&threshold| self.scroll_reached(threshold, depth))
			.map(|&threshold| Milestone::ScrollDepth(threshold))
			.collect();
		self.fire(reached)
	}

	fn scroll_reached(&self, threshold: u8, depth: f64) -> bool {
		let effective = if threshold >= 100 {
			100u8.saturating_sub(self.config.completion_tolerance)
		} else {
			threshold
		};
		depth >= f64::from(effective)
	}

	/// Records the time spent on the current page.
	pub fn observe_time_on_page(&mut self, elapsed: Duration) -> Vec<Milestone> {
		let minutes = elapsed.as_secs() / 60;
		let reached: Vec<Milestone> = self
			.config
			.time_thresholds_minutes
			.iter()
			.filter(|&&threshold| u64::from(threshold) <= minutes)
			.map(|&threshold| Milestone::TimeOnPage(threshold))
			.collect();
		self.fire(reached)
	}

	/// Counts one interaction.
	pub fn record_interaction(&mut self) -> Vec<Milestone> {
		self.interactions = self.interactions.saturating_add(1);
		let count = self.interactions;
		let reached: Vec<Milestone> = self
			.config
			.interaction_thresholds
			.iter()
			.filter(|&&threshold| threshold <= count)
			.map(|&threshold| Milestone::Interactions(threshold))
			.collect();
		self.fire(reached)
	}

	fn fire(&mut self, reached: Vec<Milestone>) -> Vec<Milestone> {
		reached
			.into_iter()
			.filter(|milestone| self.fired.insert(*milestone))
			.collect()
	}

	pub fn has_fired(&self, milestone: Milestone) -> bool {
		self.fired.contains(&milestone)
	}

	pub fn interactions(&self) -> u32 {
		self.interactions
	}

	/// Forgets every fired milestone. Called when a new session starts.
	pub fn reset(&mut self) {
		self.fired.clear();
		self.interactions = 0;
		self.pending_scroll = None;
	}
}
