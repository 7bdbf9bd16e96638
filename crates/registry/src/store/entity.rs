// Row contract shared by the Postgres and in-memory backends.
//
// Every column name an entity exposes is a `&'static str` chosen here, so
// filters and sort keys can never smuggle arbitrary identifiers into SQL.

use std::{cmp::Ordering, collections::BTreeMap, fmt::Display};

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow};

use super::{memory::MemoryTables, StoreError};

/// A bindable column value.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum SqlValue {
    Text(Option<String>),
    BigInt(Option<i64>),
    Timestamp(Option<DateTime<Utc>>),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(Some(value.to_owned()))
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(Some(value))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::BigInt(Some(value))
    }
}

impl From<Option<DateTime<Utc>>> for SqlValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        Self::Timestamp(value)
    }
}

/// Column/value pairs produced by an entity for inserts, updates and filters.
pub type Assignments = Vec<(&'static str, SqlValue)>;

/// Whether a write publishes immediately or waits for an explicit commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Commit {
    #[default]
    Now,
    Deferred,
}

/// Uninhabited change set for rows that are never updated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Immutable {}

/// A table-backed registry record.
pub trait Entity: for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static {
    type Id: Clone + Ord + Display + Send + Sync;
    /// Insert payload. Rows with generated keys receive them on insert.
    type New: Send;
    type Changes: Send;
    type Filter: Default + Send + Sync;
    type SortKey: Copy + Send + Sync;

    /// Human-readable name used in error messages.
    const NAME: &'static str;
    const TABLE: &'static str;
    const ID_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> &Self::Id;
    fn id_value(id: &Self::Id) -> SqlValue;
    fn insert_values(new: &Self::New) -> Assignments;
    fn change_values(changes: &Self::Changes) -> Assignments;
    fn filter_values(filter: &Self::Filter) -> Assignments;
    fn sort_column(key: Self::SortKey) -> &'static str;
    fn default_sort() -> Self::SortKey;

    /// Current value of one of [`Entity::COLUMNS`].
    fn column_value(&self, column: &str) -> SqlValue;

    // In-memory backend hooks.

    fn table(tables: &MemoryTables) -> &BTreeMap<Self::Id, Self>;
    fn table_mut(tables: &mut MemoryTables) -> &mut BTreeMap<Self::Id, Self>;
    fn materialize(new: Self::New, sequence: i64) -> Self;
    fn apply(&mut self, changes: Self::Changes);

    /// Foreign-key checks run before a row is inserted.
    fn check_references(_tables: &MemoryTables, _row: &Self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Dependent-row checks run before a row is deleted.
    fn check_dependents(_tables: &MemoryTables, _id: &Self::Id) -> Result<(), StoreError> {
        Ok(())
    }

    fn matches(&self, filter: &Self::Filter) -> bool {
        Self::filter_values(filter)
            .into_iter()
            .all(|(column, value)| self.column_value(column) == value)
    }

    fn compare_by(&self, other: &Self, key: Self::SortKey) -> Ordering {
        let column = Self::sort_column(key);
        self.column_value(column)
            .partial_cmp(&other.column_value(column))
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id().cmp(other.id()))
    }
}
