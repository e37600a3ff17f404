//! List filtering and pagination.
//!
//! Lists use page-numbered offset pagination: `page` starts at 1 and the
//! offset is `(page - 1) * limit`. Optional time bounds narrow the list by
//! creation or last-update time and are all exclusive.

use serde::{Deserialize, Serialize};

use crate::db::schema::{CREATED_ON_COLUMN, LAST_UPDATED_ON_COLUMN, TableSchema};
use crate::db::sql::Select;

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: u8 = 20;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: u8 = 250;

/// Pagination and time bounds applied to a list query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilter {
    /// Page number, starting at 1 (default: 1)
    pub page: Option<u64>,
    /// Items per page (default: 20, max: 250)
    pub limit: Option<u8>,
    pub created_after: Option<u64>,
    pub created_before: Option<u64>,
    pub updated_after: Option<u64>,
    pub updated_before: Option<u64>,
}

impl QueryFilter {
    /// Get the page, defaulting to 1. Page 0 is treated as page 1.
    #[inline]
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the limit value, clamped between 1 and MAX_LIMIT.
    /// Defaults to DEFAULT_LIMIT if not specified or zero.
    #[inline]
    pub fn limit(&self) -> u8 {
        match self.limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(limit) => limit.min(MAX_LIMIT),
        }
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(u64::from(self.limit()))
    }

    pub(crate) fn apply(&self, mut select: Select, schema: &TableSchema) -> Select {
        if let Some(after) = self.created_after {
            select = select.where_gt(&schema.qualified(CREATED_ON_COLUMN), after);
        }
        if let Some(before) = self.created_before {
            select = select.where_lt(&schema.qualified(CREATED_ON_COLUMN), before);
        }
        if let Some(after) = self.updated_after {
            select = select.where_gt(&schema.qualified(LAST_UPDATED_ON_COLUMN), after);
        }
        if let Some(before) = self.updated_before {
            select = select.where_lt(&schema.qualified(LAST_UPDATED_ON_COLUMN), before);
        }

        select = select.limit(u64::from(self.limit()));
        if self.page() > 1 {
            select = select.offset(self.offset());
        }
        select
    }
}

/// One page of a filtered list together with the live-row total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u8,
    /// Number of live rows in the table, independent of the filter
    pub total_count: u64,
}
