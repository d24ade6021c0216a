//! Line parsing for the prompt boxes.
//!
//! Each non-blank line becomes one [`PromptEntry`]. A line may end with
//! `, weight: <number>` to set its emphasis; anything else is plain text with
//! weight 1.0. Parsing never fails.

use crate::models::prompt::PromptEntry;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static WEIGHT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),\s*weight:\s*([0-9.]+)\s*$").expect("weight suffix pattern is valid")
});

/// Splits `text` into prompt entries, one per non-blank line, in input order.
pub fn parse(text: &str) -> Vec<PromptEntry> {
    let entries: Vec<PromptEntry> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect();
    debug!(lines = entries.len(), "Parsed prompt text");
    entries
}

fn parse_line(line: &str) -> Option<PromptEntry> {
    let (text, weight) = match WEIGHT_SUFFIX.captures(line) {
        Some(caps) => {
            // Group 0 always exists on a match.
            let start = caps.get(0).map_or(line.len(), |m| m.start());
            let weight = caps.get(1).map_or(1.0, |m| leading_float(m.as_str()));
            (line[..start].trim(), weight)
        }
        None => (line.trim(), 1.0),
    };
    // ", weight: 2" alone leaves nothing to prompt with.
    if text.is_empty() {
        return None;
    }
    Some(PromptEntry::new(text, weight))
}

/// Reads the longest numeric prefix of a `[0-9.]+` capture. Unreadable,
/// zero and non-finite values fall back to 1.0.
fn leading_float(digits: &str) -> f64 {
    let end = digits.match_indices('.').nth(1).map_or(digits.len(), |(i, _)| i);
    match digits[..end].parse::<f64>() {
        Ok(weight) if weight.is_finite() && weight != 0.0 => weight,
        _ => 1.0,
    }
}

/// Rebuilds editable text from entries, writing the weight suffix only for
/// non-default weights.
pub fn to_editor_text(entries: &[PromptEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            if entry.has_default_weight() {
                entry.text.clone()
            } else {
                format!("{}, weight: {}", entry.text, entry.weight)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Encodes entries as the JSON array the backend node reads from its hidden
/// bundle slot.
pub fn to_bundle(entries: &[PromptEntry]) -> String {
    // Vec<PromptEntry> of plain strings and finite floats always serializes.
    serde_json::to_string(entries).unwrap_or_else(|_| "[]".to_string())
}

/// Decodes a bundle previously produced by [`to_bundle`].
pub fn from_bundle(bundle: &str) -> serde_json::Result<Vec<PromptEntry>> {
    serde_json::from_str(bundle)
}

/// Parses `text` and encodes the result in one step.
pub fn bundle_text(text: &str) -> String {
    to_bundle(&parse(text))
}
