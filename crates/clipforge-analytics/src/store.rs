// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persisted client state: identity, traits, plan and usage counters.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use clipforge_analytics_core::{AnonymousId, Plan, Traits, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::DEFAULT_NAMESPACE;
use crate::error::{AnalyticsError, Result};

/// Usage counters driving plan-limit events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageCounters {
	pub project_count: u32,
	/// Exports on `exports_date` (UTC).
	pub exports_today: u32,
	pub exports_date: Option<NaiveDate>,
	pub onboarding_completed: BTreeSet<String>,
}

impl UsageCounters {
	/// Counts a new project and returns the total.
	pub fn record_project(&mut self) -> u32 {
		self.project_count = self.project_count.saturating_add(1);
		self.project_count
	}

	/// Counts an export on `today`, restarting the count on a new day.
	pub fn record_export(&mut self, today: NaiveDate) -> u32 {
		if self.exports_date != Some(today) {
			self.exports_date = Some(today);
			self.exports_today = 0;
		}
		self.exports_today = self.exports_today.saturating_add(1);
		self.exports_today
	}

	/// Marks an onboarding step done. Returns false if it already was.
	pub fn complete_step(&mut self, step: &str) -> bool {
		self.onboarding_completed.insert(step.to_string())
	}
}

/// Everything the tracker persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientState {
	/// Absent while anonymous.
	pub user_id: Option<UserId>,
	pub anonymous_id: Option<AnonymousId>,
	pub traits: Traits,
	pub plan: Plan,
	pub usage: UsageCounters,
}

/// Storage for [`ClientState`].
pub trait StateStore: Send + Sync {
	fn load(&self) -> Result<Option<ClientState>>;

	fn save(&self, state: &ClientState) -> Result<()>;
}

/// In-process store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
	slot: Arc<Mutex<Option<ClientState>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, Option<ClientState>> {
		self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

impl StateStore for MemoryStore {
	fn load(&self) -> Result<Option<ClientState>> {
		Ok(self.lock().clone())
	}

	fn save(&self, state: &ClientState) -> Result<()> {
		*self.lock() = Some(state.clone());
		Ok(())
	}
}

/// JSON file store.
///
/// The file holds one entry per namespace, so several apps can share it.
/// Writes go to a sibling temp file that is renamed into place. A file that
/// no longer parses is moved aside to `<path>.corrupt` on the next save.
#[derive(Debug, Clone)]
pub struct FileStore {
	path: PathBuf,
	namespace: String,
}

impl FileStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self::with_namespace(path, DEFAULT_NAMESPACE)
	}

	pub fn with_namespace(path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			namespace: namespace.into(),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	fn read_all(&self) -> Result<Map<String, Value>> {
		if !self.path.exists() {
			return Ok(Map::new());
		}
		let contents = std::fs::read_to_string(&self.path)?;
		if contents.trim().is_empty() {
			return Ok(Map::new());
		}
		Ok(serde_json::from_str(&contents)?)
	}

	/// Like `read_all`, but an unparsable file is moved aside so the save can
	/// start over.
	fn read_for_update(&self) -> Result<Map<String, Value>> {
		match self.read_all() {
			Err(AnalyticsError::Serialization(e)) => {
				let aside = self.sibling(".corrupt");
				warn!(
					path = %self.path.display(),
					moved_to = %aside.display(),
					error = %e,
					"Analytics state file is corrupt, replacing it"
				);
				std::fs::rename(&self.path, &aside)?;
				Ok(Map::new())
			}
			other => other,
		}
	}

	fn sibling(&self, suffix: &str) -> PathBuf {
		let mut name = self.path.clone().into_os_string();
		name.push(suffix);
		PathBuf::from(name)
	}

	fn write_all(&self, entries: &Map<String, Value>) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}

		let tmp = self.sibling(".tmp");
		std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
		std::fs::rename(&tmp, &self.path)?;
		debug!(path = %self.path.display(), namespace = %self.namespace, "Saved analytics state");
		Ok(())
	}
}

impl StateStore for FileStore {
	fn load(&self) -> Result<Option<ClientState>> {
		let mut entries = self.read_all()?;
		match entries.remove(&self.namespace) {
			Some(value) => Ok(Some(serde_json::from_value(value)?)),
			None => Ok(None),
		}
	}

	fn save(&self, state: &ClientState) -> Result<()> {
		let mut entries = self.read_for_update()?;
		entries.insert(self.namespace.clone(), serde_json::to_value(state)?);
		self.write_all(&entries)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn day(d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
	}

	fn identified_state() -> ClientState {
		let (traits, _) = Traits::from_map(
			json!({"name": "Ada", "plan": "pro"})
				.as_object()
				.cloned()
				.unwrap(),
		);
		ClientState {
			user_id: Some(UserId::parse("A7X9K").unwrap()),
			anonymous_id: Some(AnonymousId::from_transport("anon_1")),
			traits,
			plan: Plan::Pro,
			usage: UsageCounters::default(),
		}
	}

	#[test]
	fn exports_restart_each_day() {
		let mut usage = UsageCounters::default();
		assert_eq!(usage.record_export(day(1)), 1);
		assert_eq!(usage.record_export(day(1)), 2);
		assert_eq!(usage.record_export(day(2)), 1);
		assert_eq!(usage.exports_date, Some(day(2)));
	}

	#[test]
	fn onboarding_steps_complete_once() {
		let mut usage = UsageCounters::default();
		assert!(usage.complete_step("connect_storage"));
		assert!(!usage.complete_step("connect_storage"));
		assert_eq!(usage.onboarding_completed.len(), 1);
	}

	#[test]
	fn memory_store_clones_share_state() {
		let store = MemoryStore::new();
		assert!(store.load().unwrap().is_none());

		store.clone().save(&identified_state()).unwrap();
		assert_eq!(store.load().unwrap(), Some(identified_state()));
	}

	#[test]
	fn file_store_creates_parent_dirs() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().join("nested/deeper/analytics.json"));

		store.save(&identified_state()).unwrap();

		assert!(store.path().exists());
		assert_eq!(store.load().unwrap(), Some(identified_state()));
	}

	#[test]
	fn file_store_missing_file_loads_none() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().join("absent.json"));
		assert!(store.load().unwrap().is_none());
	}

	#[test]
	fn file_store_namespaces_are_independent() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("analytics.json");
		let editor = FileStore::with_namespace(&path, "clipforge.editor");
		let site = FileStore::with_namespace(&path, "clipforge.site");

		editor.save(&identified_state()).unwrap();
		site.save(&ClientState::default()).unwrap();
		assert_eq!(editor.load().unwrap(), Some(identified_state()));

		editor.save(&ClientState::default()).unwrap();
		assert_eq!(editor.load().unwrap(), Some(ClientState::default()));
		assert_eq!(site.load().unwrap(), Some(ClientState::default()));
		assert!(FileStore::with_namespace(&path, "clipforge.other")
			.load()
			.unwrap()
			.is_none());
	}

	#[test]
	fn file_store_leaves_no_temp_file() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().join("analytics.json"));
		store.save(&ClientState::default()).unwrap();

		let names: Vec<_> = std::fs::read_dir(dir.path())
			.unwrap()
			.map(|e| e.unwrap().file_name().into_string().unwrap())
			.collect();
		assert_eq!(names, vec!["analytics.json".to_string()]);
	}

	#[test]
	fn corrupt_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("analytics.json");
		std::fs::write(&path, "{not json").unwrap();
		assert!(FileStore::new(path).load().is_err());
	}

	#[test]
	fn save_replaces_corrupt_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("analytics.json");
		std::fs::write(&path, "{ not json").unwrap();
		let store = FileStore::new(&path);

		store.save(&identified_state()).unwrap();

		assert_eq!(store.load().unwrap(), Some(identified_state()));
		let aside = dir.path().join("analytics.json.corrupt");
		assert_eq!(std::fs::read_to_string(aside).unwrap(), "{ not json");
	}

	#[test]
	fn state_tolerates_missing_fields() {
		let state: ClientState =
			serde_json::from_value(json!({"anonymous_id": "anon_legacy"})).unwrap();
		assert_eq!(state.plan, Plan::Free);
		assert!(state.user_id.is_none());
	}
}
