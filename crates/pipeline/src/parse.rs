//! Channel filter and tokenizer
//!
//! A pure function from one raw log line plus the configured channel name
//! to the list of candidate item tokens.
//!
//! # Line convention
//!
//! Chat lines have the shape
//!
//! ```text
//! Berik tells Bids:1, 'Sword of Testing | Shield | 7'
//! ```
//!
//! A line belongs to the channel when the channel name occurs *strictly
//! after* the start of the line. A match at byte position 0 is the line's
//! speaker-name prefix coincidentally spelling the channel name, not
//! channel traffic; existing deployments depend on that exclusion, so it
//! must not be "fixed" here.
//!
//! The payload is everything after the first `, '` marker at or after the
//! channel occurrence, with a single trailing `'` removed. It is split on
//! `|`; tokens are trimmed and empty ones dropped.

/// Marker introducing the quoted message payload
const PAYLOAD_MARKER: &str = ", '";

/// Extract candidate tokens from a raw line.
///
/// Returns `None` when the line does not belong to the channel (no
/// occurrence, or an occurrence only at position 0). Returns an empty
/// vector for in-channel lines with no recognizable payload; malformed
/// lines are not an error.
pub fn extract_tokens(line: &str, channel: &str) -> Option<Vec<String>> {
    let pos = line.find(channel)?;
    if pos == 0 {
        return None;
    }

    let rest = &line[pos..];
    let payload = match rest.find(PAYLOAD_MARKER) {
        Some(marker) => &rest[marker + PAYLOAD_MARKER.len()..],
        // Degenerate line: in-channel but no quoted payload
        None => return Some(Vec::new()),
    };
    let payload = payload.strip_suffix('\'').unwrap_or(payload).trim();

    let tokens = payload
        .split('|')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();

    Some(tokens)
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
