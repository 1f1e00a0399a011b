// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `clipforge-track`: drive the analytics tracker from the command line.
//!
//! State persists in a JSON file between invocations, so a lifecycle can be
//! replayed one command at a time. Without a collector URL, messages are
//! printed to stdout as JSON lines.

mod props;
mod stdout;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clipforge_analytics::{
	catalog, AnalyticsConfig, ClientContext, HttpTransport, MemoryStore, Plan, Properties,
	SharedTransport, Tracker, TrackerBuilder,
};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::props::parse_pairs;
use crate::stdout::StdoutTransport;

/// Spacing between replayed scroll samples; longer than the debounce window.
const SCROLL_SAMPLE_SPACING: Duration = Duration::from_millis(200);

/// Clipforge analytics tracker
#[derive(Parser, Debug)]
#[command(name = "clipforge-track", version, about, long_about = None)]
struct Args {
	/// Path to a TOML configuration file
	#[arg(short, long, env = "CLIPFORGE_ANALYTICS_CONFIG")]
	config: Option<PathBuf>,

	/// Collector base URL; omit to print messages to stdout
	#[arg(long, env = "CLIPFORGE_ANALYTICS_COLLECTOR_URL")]
	collector_url: Option<String>,

	/// Collector write key (cf_write_...)
	#[arg(long, env = "CLIPFORGE_ANALYTICS_WRITE_KEY", hide_env_values = true)]
	write_key: Option<String>,

	/// State file (defaults to the XDG data dir)
	#[arg(long)]
	state_file: Option<PathBuf>,

	/// Namespace within the state file
	#[arg(long)]
	namespace: Option<String>,

	/// Log level when RUST_LOG is unset
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Output logs as JSON
	#[arg(long)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Record a page view
	Page {
		name: String,
		/// Property (repeatable: --prop KEY=VALUE)
		#[arg(long = "prop", value_name = "KEY=VALUE")]
		props: Vec<String>,
	},
	/// Record an event
	Track {
		event: String,
		#[arg(long = "prop", value_name = "KEY=VALUE")]
		props: Vec<String>,
	},
	/// Identify the current visitor
	Identify {
		user_id: String,
		/// Trait (repeatable: --trait KEY=VALUE)
		#[arg(long = "trait", value_name = "KEY=VALUE")]
		traits: Vec<String>,
	},
	/// Forget the current user and start a new anonymous visitor
	Reset,
	/// Print the persisted state
	Status,
	/// Replay scroll positions and report fired milestones
	Scroll {
		/// Scroll depths in percent, in order
		#[arg(required = true)]
		depths: Vec<f64>,
	},
	/// Run a full visitor lifecycle with throwaway state
	Demo {
		#[arg(long, default_value = "A7X9K")]
		user_id: String,
	},
}

fn init_tracing(level: &str, json: bool) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("clipforge={level}")));

	if json {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().compact().with_writer(std::io::stderr))
			.init();
	}
}

fn load_config(args: &Args) -> Result<AnalyticsConfig> {
	let mut config = AnalyticsConfig::load(args.config.as_deref())
		.context("failed to load analytics configuration")?;

	if let Some(url) = &args.collector_url {
		config = config.with_collector_url(url.clone());
	}
	if let Some(key) = &args.write_key {
		config = config.with_write_key(key.clone());
	}
	if let Some(path) = &args.state_file {
		config = config.with_state_path(path.clone());
	}
	if let Some(namespace) = &args.namespace {
		config = config.with_namespace(namespace.clone());
	}
	Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	init_tracing(&args.log_level, args.json_logs);

	let config = load_config(&args)?;

	let http = if config.wants_http() {
		Some(Arc::new(
			HttpTransport::from_config(&config).context("failed to start HTTP transport")?,
		))
	} else {
		None
	};
	let transport: SharedTransport = match &http {
		Some(http) => http.clone(),
		None => Arc::new(StdoutTransport::new()),
	};

	let builder = match &args.command {
		Command::Demo { .. } => TrackerBuilder::new()
			.store(Arc::new(MemoryStore::new()))
			.context(ClientContext::from_config(&config)),
		_ => TrackerBuilder::from_config(&config),
	};
	let mut tracker = builder.transport(transport).build();
	let result = run_command(args.command, &mut tracker);

	if let Some(http) = http {
		http
			.shutdown()
			.await
			.context("failed to flush analytics queue")?;
	}
	result
}

fn run_command(command: Command, tracker: &mut Tracker) -> Result<()> {
	match command {
		Command::Page { name, props } => tracker.page(&name, parse_pairs(&props)?),
		Command::Track { event, props } => tracker.track(&event, parse_pairs(&props)?),
		Command::Identify { user_id, traits } => {
			let outcome = tracker
				.identify(&user_id, parse_pairs(&traits)?)
				.with_context(|| format!("identify as '{user_id}' failed"))?;
			info!(user_id = %user_id, outcome = outcome.as_str(), "identify accepted");
		}
		Command::Reset => tracker.reset(),
		Command::Status => {
			let status = serde_json::json!({
				"distinct_id": tracker.identity().distinct_id(),
				"session_id": tracker.session_id().to_string(),
				"degraded": tracker.is_degraded(),
				"state": tracker.state(),
			});
			println!("{}", serde_json::to_string_pretty(&status)?);
		}
		Command::Scroll { depths } => {
			let start = Instant::now();
			let mut at = start;
			for depth in depths {
				report_milestones(tracker.observe_scroll(depth, at));
				at += SCROLL_SAMPLE_SPACING;
				report_milestones(tracker.poll_engagement(at));
			}
		}
		Command::Demo { user_id } => run_demo(tracker, &user_id)?,
	}
	Ok(())
}

fn report_milestones(milestones: Vec<clipforge_analytics::Milestone>) {
	for milestone in milestones {
		info!(milestone = ?milestone, event_name = milestone.event_name(), "milestone reached");
	}
}

/// Anonymous browsing, signup, usage up to the free export limit, upgrade,
/// engagement, logout.
fn run_demo(tracker: &mut Tracker, user_id: &str) -> Result<()> {
	tracker.page(
		"Home",
		Properties::new()
			.insert("utm_source", "newsletter")
			.insert("utm_campaign", "launch"),
	);
	tracker.track(
		catalog::FEATURE_USED,
		Properties::new().insert("featureName", "templates"),
	);
	tracker.track(
		catalog::TEMPLATE_SELECTED,
		Properties::new().insert("template", "product-launch"),
	);

	tracker.page("Signup", Properties::new());
	tracker.signed_up(
		user_id,
		Properties::new()
			.insert("name", "Demo User")
			.insert("plan", Plan::Free.as_str()),
		Properties::new().insert("method", "email"),
	)?;

	tracker.page("Editor", Properties::new());
	tracker.complete_onboarding_step("create_project");
	tracker.project_created(Properties::new().insert("template", "product-launch"));
	for _ in 0..3 {
		tracker.video_exported(Properties::new().insert("format", "mp4"));
	}
	tracker.upgrade_plan(Plan::Pro);

	let start = Instant::now();
	let mut at = start;
	for depth in [10.0, 30.0, 20.0, 60.0, 90.0] {
		report_milestones(tracker.observe_scroll(depth, at));
		at += SCROLL_SAMPLE_SPACING;
		report_milestones(tracker.poll_engagement(at));
	}
	for _ in 0..5 {
		report_milestones(tracker.record_interaction());
	}

	tracker.logged_out();
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn cli_definition_is_valid() {
		Args::command().debug_assert();
	}

	#[test]
	fn parses_repeated_props() {
		let args = Args::try_parse_from([
			"clipforge-track",
			"track",
			"CTA Clicked",
			"--prop",
			"cta=start_trial",
			"--prop",
			"position=2",
		])
		.unwrap();

		match args.command {
			Command::Track { event, props } => {
				assert_eq!(event, "CTA Clicked");
				assert_eq!(props.len(), 2);
			}
			other => panic!("unexpected command {other:?}"),
		}
	}

	#[test]
	fn scroll_requires_depths() {
		assert!(Args::try_parse_from(["clipforge-track", "scroll"]).is_err());
	}

	#[test]
	fn demo_runs_against_memory_transport() {
		let transport = clipforge_analytics::MemoryTransport::new();
		let mut tracker = Tracker::new(Arc::new(transport.clone()));

		run_demo(&mut tracker, "A7X9K").unwrap();

		let names = transport.event_names();
		assert!(names.iter().any(|n| n == catalog::SIGNED_UP));
		assert!(names.iter().any(|n| n == catalog::PLAN_UPGRADED));
		assert_eq!(names.last().map(String::as_str), Some(catalog::LOGGED_OUT));
		assert!(!tracker.identity().is_identified());
	}
}
