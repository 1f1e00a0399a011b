// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Canonical event names for the Clipforge taxonomy.

pub const SIGNED_UP: &str = "Signed Up";
pub const LOGGED_IN: &str = "Logged In";
pub const LOGGED_OUT: &str = "Logged Out";
pub const FEATURE_USED: &str = "Feature Used";
pub const TEMPLATE_SELECTED: &str = "Template Selected";
pub const CTA_CLICKED: &str = "CTA Clicked";
pub const PROJECT_CREATED: &str = "Project Created";
pub const VIDEO_EXPORTED: &str = "Video Exported";
pub const EXPORT_LIMIT_REACHED: &str = "Export Limit Reached";
pub const PLAN_UPGRADED: &str = "Plan Upgraded";
pub const ONBOARDING_STEP_COMPLETED: &str = "Onboarding Step Completed";
pub const SCROLL_DEPTH_REACHED: &str = "Scroll Depth Reached";
pub const TIME_ON_PAGE_REACHED: &str = "Time On Page Reached";
pub const ENGAGEMENT_THRESHOLD_REACHED: &str = "Engagement Threshold Reached";

pub const ALL: &[&str] = &[
	SIGNED_UP,
	LOGGED_IN,
	LOGGED_OUT,
	FEATURE_USED,
	TEMPLATE_SELECTED,
	CTA_CLICKED,
	PROJECT_CREATED,
	VIDEO_EXPORTED,
	EXPORT_LIMIT_REACHED,
	PLAN_UPGRADED,
	ONBOARDING_STEP_COMPLETED,
	SCROLL_DEPTH_REACHED,
	TIME_ON_PAGE_REACHED,
	ENGAGEMENT_THRESHOLD_REACHED,
];
