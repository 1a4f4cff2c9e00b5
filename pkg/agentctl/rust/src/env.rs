// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

/// Parse a shell-style defaults file (the kind init scripts source) into
/// key-value pairs. Later assignments override earlier ones.
///
/// Supports `KEY=VALUE`, `export KEY=VALUE`, double or single quoted values,
/// comments (#) and blank lines. Lines without `=` are skipped.
pub fn parse_defaults_file(path: &Path) -> Result<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading defaults file: {}", path.display()))?;
    Ok(parse_defaults(&contents))
}

pub fn parse_defaults(contents: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let assignment = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        if let Some((key, raw_val)) = assignment.split_once('=') {
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                continue;
            }
            vars.insert(key.to_string(), unquote(raw_val.trim()).to_string());
        }
    }
    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
