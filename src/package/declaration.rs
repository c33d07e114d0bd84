//! Parsing of the `enabled.json` declaration.

use crate::error::{Error, Result};

use super::dedup_preserving_order;

/// Parse the list of enabled mod names.
///
/// Accepts a JSON array of strings, or quoted names separated by commas
/// and/or newlines, optionally wrapped in `[` `]`. Duplicates are dropped,
/// keeping the first occurrence.
pub fn parse_enabled(content: &str) -> Result<Vec<String>> {
    if let Ok(names) = serde_json::from_str::<Vec<String>>(content) {
        return validate(names);
    }

    let mut body = content.trim();
    if let Some(inner) = body.strip_prefix('[') {
        body = inner
            .strip_suffix(']')
            .ok_or_else(|| Error::parse("enabled.json", "unterminated `[`"))?;
    }

    let mut names = Vec::new();
    for token in body.split([',', '\n']) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let name = token
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .filter(|t| !t.contains('"'))
            .ok_or_else(|| {
                Error::parse("enabled.json", format!("expected a quoted name, got `{}`", token))
            })?;
        names.push(name.to_string());
    }

    validate(names)
}

fn validate(names: Vec<String>) -> Result<Vec<String>> {
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(Error::parse("enabled.json", "empty mod name"));
    }
    Ok(dedup_preserving_order(names))
}
