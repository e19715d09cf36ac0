//! Bidwatch item catalog
//!
//! An in-memory, case-insensitive name → entry lookup table, refreshed in
//! the background from a JSON endpoint and shared with readers through an
//! atomic pointer swap.
//!
//! # Design
//!
//! - **Copy-on-write refresh**: a refresh builds a whole new [`Catalog`] and
//!   swaps it in via [`SharedCatalog`]; readers never observe a partially
//!   updated table.
//! - **First match wins**: case-insensitive name collisions keep the entry
//!   seen first.
//! - **Degraded mode**: an empty catalog is a valid state - consumers are
//!   expected to pass raw tokens through unresolved until a refresh lands.

mod batch;
mod catalog;
mod error;
mod fetch;

pub use batch::ResolvedBatch;
pub use catalog::{Catalog, CatalogEntry, SharedCatalog};
pub use error::{CatalogError, Result};
pub use fetch::{CatalogFetcher, DEFAULT_REFRESH_INTERVAL};
