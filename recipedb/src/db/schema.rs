//! Static table descriptors and ownership-chain resolution.
//!
//! Every entity table carries the same envelope (`id`, `created_on`,
//! `last_updated_on`, `archived_on`) plus its own data columns. Entities that
//! live beneath another entity name their ancestry root first: a recipe step
//! ingredient belongs to a recipe step, which belongs to a recipe. Reads walk
//! that chain with one join per ancestor and pin every link to the caller's
//! identifiers, so a row is only visible through its true owners.

use crate::db::sql::Select;

pub const ID_COLUMN: &str = "id";
pub const CREATED_ON_COLUMN: &str = "created_on";
pub const LAST_UPDATED_ON_COLUMN: &str = "last_updated_on";
pub const ARCHIVED_ON_COLUMN: &str = "archived_on";

/// One link in an ownership chain: the owning table and the column on the
/// owned table that points at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent {
    pub table: &'static str,
    pub foreign_key: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub table: &'static str,
    /// Data columns in scan order. When the entity has a parent, the direct
    /// ownership column comes last.
    pub columns: &'static [&'static str],
    /// Ancestors ordered root first.
    pub ancestors: &'static [Parent],
}

impl TableSchema {
    pub fn qualified(&self, column: &str) -> String {
        format!("{}.{}", self.table, column)
    }

    /// Column that links a row to its direct parent.
    pub fn owner_column(&self) -> Option<&'static str> {
        self.ancestors.last().map(|parent| parent.foreign_key)
    }

    /// `id`, the data columns, then the three timestamps, all table-qualified.
    pub fn select_columns(&self) -> Vec<String> {
        std::iter::once(ID_COLUMN)
            .chain(self.columns.iter().copied())
            .chain([CREATED_ON_COLUMN, LAST_UPDATED_ON_COLUMN, ARCHIVED_ON_COLUMN])
            .map(|column| self.qualified(column))
            .collect()
    }

    /// Sub-select counting every live row in the table.
    pub fn live_count_expression(&self) -> String {
        format!(
            "(SELECT COUNT({table}.{id}) FROM {table} WHERE {table}.{archived} IS NULL)",
            table = self.table,
            id = ID_COLUMN,
            archived = ARCHIVED_ON_COLUMN,
        )
    }

    /// Joins each ancestor and pins the chain.
    ///
    /// `chain` holds ancestor identifiers root first. For every link the
    /// child's foreign key and the parent's id must both equal the caller's
    /// identifier, and when `own_id` is given the row itself is pinned too.
    /// A chain shorter than the ancestry only pins the links it covers.
    pub fn constrain_ownership(&self, mut select: Select, chain: &[u64], own_id: Option<u64>) -> Select {
        let mut child = self.table;
        let mut child_id = own_id;

        for (index, parent) in self.ancestors.iter().enumerate().rev() {
            let foreign_key = format!("{child}.{}", parent.foreign_key);
            select = select.join(format!(
                "{parent_table} ON {foreign_key}={parent_table}.{ID_COLUMN}",
                parent_table = parent.table
            ));

            let parent_id = chain.get(index).copied();
            if let Some(parent_id) = parent_id {
                select = select.where_eq(&foreign_key, parent_id);
            }
            if let Some(id) = child_id {
                select = select.where_eq(&format!("{child}.{ID_COLUMN}"), id);
            }

            child = parent.table;
            child_id = parent_id;
        }

        if let Some(id) = child_id {
            select = select.where_eq(&format!("{child}.{ID_COLUMN}"), id);
        }
        select
    }
}
