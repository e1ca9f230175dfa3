//! Product Catalog
//!
//! Snapshot and filter types plus the gateway trait the storefront queries.
//! The concrete implementation lives in the `sheets` module; tests use
//! in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Point-in-time projection of a catalog row.
///
/// Captured into the session when a search runs and referenced by 1-based
/// index in later `agregar` commands. Never re-validated against live data,
/// so price and stock may go stale between search and add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    /// Empty string when the sheet cell is blank.
    pub brand: String,
    pub model: String,
    pub price: f64,
    pub stock: u32,
    /// Free-text feature blurb shown in result lists.
    pub feature: String,
}

/// Filter criteria for a catalog query. All provided fields are ANDed;
/// matching is case-insensitive substring containment per field.
#[derive(Debug, Clone, Default)]
pub struct ProductFilters {
    pub category: Option<String>,
    /// Matched against name, brand and model.
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub max_price: Option<f64>,
    pub in_stock_only: bool,
    /// Truncates the result set after filtering.
    pub limit: Option<usize>,
}

/// Read-side catalog interface.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Return the in-stock products matching `filters`.
    ///
    /// Callers treat an error as an empty result set; availability problems
    /// are never surfaced to the end user distinctly.
    async fn query(&self, filters: &ProductFilters) -> anyhow::Result<Vec<ProductSnapshot>>;
}
