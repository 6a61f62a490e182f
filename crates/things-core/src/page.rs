//! Offset-based pagination for registry queries.

use serde::{Deserialize, Serialize};

use crate::{Metadata, Thing};

/// Maximum number of things per page.
pub const MAX_LIMIT: u64 = 1000;

/// Default page size when the caller does not supply one.
const DEFAULT_LIMIT: u64 = 50;

/// Query parameters for paginated, owner-scoped listings.
///
/// Offset/limit semantics: skip `offset` matching records and return at most
/// `limit`. The optional filters narrow the match set before pagination is
/// applied; the reported total count reflects the filtered set, not the
/// returned slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageQuery {
    /// Number of records to skip.
    pub offset: u64,
    /// Maximum number of records to return.
    pub limit: u64,
    /// Case-insensitive name substring filter.
    pub name: Option<String>,
    /// Metadata containment filter: every entry must be present, with an
    /// equal value, in a matching thing's metadata.
    pub metadata: Option<Metadata>,
}

impl PageQuery {
    /// Creates a new query with clamped bounds and no filters.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_LIMIT),
            name: None,
            metadata: None,
        }
    }

    /// Sets the name substring filter.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the metadata containment filter.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns the effective limit, substituting the default for zero.
    pub fn effective_limit(&self) -> u64 {
        if self.limit == 0 {
            DEFAULT_LIMIT
        } else {
            self.limit.min(MAX_LIMIT)
        }
    }
}

/// A page of things together with its query envelope.
///
/// `total` counts every thing satisfying the query, independent of the
/// returned slice size. Ordering among returned things is defined by the
/// backing store's query execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Things in this page.
    pub things: Vec<Thing>,
    /// Offset the page was produced with.
    pub offset: u64,
    /// Limit the page was produced with.
    pub limit: u64,
    /// Total count of things matching the query across all pages.
    pub total: u64,
}

impl Page {
    /// Creates a new page.
    pub fn new(things: Vec<Thing>, offset: u64, limit: u64, total: u64) -> Self {
        Self {
            things,
            offset,
            limit,
            total,
        }
    }

    /// Creates an empty page for the given window.
    pub fn empty(offset: u64, limit: u64) -> Self {
        Self::new(Vec::new(), offset, limit, 0)
    }

    /// Returns whether there are more pages after this one.
    pub fn has_more(&self) -> bool {
        self.offset + (self.things.len() as u64) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_clamps_limit() {
        assert_eq!(PageQuery::new(0, 0).limit, 1);
        assert_eq!(PageQuery::new(0, 5000).limit, MAX_LIMIT);
        assert_eq!(PageQuery::new(10, 25).offset, 10);
    }

    #[test]
    fn effective_limit_substitutes_default() {
        let query = PageQuery {
            limit: 0,
            ..PageQuery::default()
        };
        assert_eq!(query.effective_limit(), 50);
    }

    #[test]
    fn page_has_more() {
        let things = vec![Thing::new("t1", "u1", "k1"), Thing::new("t2", "u1", "k2")];
        let page = Page::new(things, 0, 2, 5);
        assert!(page.has_more());

        let page = Page::new(vec![Thing::new("t5", "u1", "k5")], 4, 2, 5);
        assert!(!page.has_more());
    }
}
