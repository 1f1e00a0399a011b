// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `KEY=VALUE` argument parsing.

use anyhow::{bail, Result};
use clipforge_analytics::Properties;
use serde_json::Value;

/// Parses one `KEY=VALUE` pair.
///
/// Values become booleans, null, or numbers when they read as such. Wrap a
/// value in double quotes to keep it a string.
pub fn parse_pair(raw: &str) -> Result<(String, Value)> {
	let Some((key, value)) = raw.split_once('=') else {
		bail!("expected KEY=VALUE, got '{raw}'");
	};
	let key = key.trim();
	if key.is_empty() {
		bail!("empty key in '{raw}'");
	}
	Ok((key.to_string(), infer_scalar(value)))
}

pub fn parse_pairs(raw: &[String]) -> Result<Properties> {
	raw
		.iter()
		.map(|pair| parse_pair(pair))
		.collect::<Result<Vec<_>>>()
		.map(|pairs| pairs.into_iter().collect())
}

fn infer_scalar(value: &str) -> Value {
	if let Some(quoted) = value
		.strip_prefix('"')
		.and_then(|rest| rest.strip_suffix('"'))
	{
		return Value::from(quoted);
	}

	match value {
		"true" => return Value::Bool(true),
		"false" => return Value::Bool(false),
		"null" => return Value::Null,
		_ => {}
	}

	if let Ok(int) = value.parse::<i64>() {
		return Value::from(int);
	}
	if let Ok(float) = value.parse::<f64>() {
		if float.is_finite() {
			return Value::from(float);
		}
	}
	Value::from(value)
}
