//! Catalog matcher
//!
//! Resolves candidate tokens against the item catalog. Tokens with no
//! match are dropped silently; pipe-separated chat noise (player names,
//! bid amounts) is expected, not an error.

use bidwatch_catalog::{Catalog, ResolvedBatch};

/// Resolve tokens against the catalog, preserving token order.
///
/// With an empty catalog (startup, or every refresh has failed so far) the
/// raw tokens pass through unresolved so the pipeline still produces
/// output.
pub fn resolve_tokens(tokens: Vec<String>, catalog: &Catalog) -> ResolvedBatch {
    if catalog.is_empty() {
        return ResolvedBatch::Unresolved(tokens);
    }

    let entries = tokens
        .iter()
        .filter_map(|token| catalog.get(token).cloned())
        .collect();
    ResolvedBatch::Resolved(entries)
}

#[cfg(test)]
#[path = "matcher_test.rs"]
mod tests;
