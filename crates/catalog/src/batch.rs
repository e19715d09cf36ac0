//! The unit of delivery: one log line's worth of matched items

use serde::Serialize;

use crate::catalog::CatalogEntry;

/// Everything extracted from a single log line, after catalog matching.
///
/// This is the atomic unit handed to the broadcaster and the UI tap. When
/// the catalog has no entries yet (startup, fetch failure) the raw trimmed
/// tokens pass through unresolved so the pipeline still produces output.
///
/// Serializes as a single JSON array: entry objects when resolved, plain
/// strings when not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedBatch {
    /// Tokens that matched a catalog entry, in original token order
    Resolved(Vec<CatalogEntry>),
    /// Raw tokens passed through because no catalog was available
    Unresolved(Vec<String>),
}

impl ResolvedBatch {
    /// Number of items in the batch
    pub fn len(&self) -> usize {
        match self {
            Self::Resolved(entries) => entries.len(),
            Self::Unresolved(tokens) => tokens.len(),
        }
    }

    /// True when nothing survived matching
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item names, in batch order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let names: Vec<&str> = match self {
            Self::Resolved(entries) => entries.iter().map(|e| e.name.as_str()).collect(),
            Self::Unresolved(tokens) => tokens.iter().map(|t| t.as_str()).collect(),
        };
        names.into_iter()
    }

    /// Serialize to the wire representation: one JSON array
    pub fn to_wire(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
