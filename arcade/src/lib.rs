//! Arcade: a small persistence abstraction.
//!
//! This crate holds the domain types and ports (traits) shared by every
//! storage backend, the query engine used to filter records, and the
//! adapters themselves. Keep process-level IO concerns (configuration,
//! logging setup, CLIs) out of this crate.
//!
//! # Example
//!
//! ```rust
//! use arcade::adapters::memory::InMemoryAdapter;
//! use arcade::{Adapter, Expression, Query, Storable};
//! use serde::{Deserialize, Serialize};
//! use uuid::Uuid;
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! struct Widget {
//!     uuid: Uuid,
//!     name: String,
//! }
//!
//! impl Storable for Widget {
//!     fn uuid(&self) -> Uuid {
//!         self.uuid
//!     }
//!     fn table_name(&self) -> &str {
//!         "widget"
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> arcade::Result<()> {
//! let adapter = InMemoryAdapter::new();
//! let widget = Widget { uuid: Uuid::new_v4(), name: "Test".into() };
//!
//! adapter.insert("widget", &widget).await?;
//! let query = Query::expression(Expression::equal("name", "Test"));
//! let widgets: Vec<Widget> = adapter.fetch("widget", Some(&query)).await?;
//! assert_eq!(widgets.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

pub mod adapters;
pub mod comparison;
pub mod expression;
pub mod options;
pub mod query;

#[cfg(test)]
pub(crate) mod fixtures;

pub use comparison::{Comparison, PredicateOperator};
pub use expression::Expression;
pub use options::{FetchOptions, Sort, SortDirection};
pub use query::Query;

/// A named partition of the store holding records of one logical type.
///
/// Implemented for plain strings so callers can pass `"widget"` directly;
/// an application will usually implement it on an enum of its tables.
pub trait Table: Send + Sync {
    fn name(&self) -> &str;
}

impl Table for str {
    fn name(&self) -> &str {
        self
    }
}

impl Table for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}

/// Capability every persisted entity satisfies.
///
/// Identity is the identifier: two records with the same `uuid` in the same
/// table are the same logical entity. The record is persisted through its
/// `serde` representation, which must serialize to a JSON object for query
/// expressions to see its fields.
pub trait Storable: Serialize + DeserializeOwned + Send + Sync {
    /// Stable unique identifier.
    fn uuid(&self) -> Uuid;

    /// Name of the table this record belongs to.
    fn table_name(&self) -> &str;
}

/// Storage port implemented by every backend.
///
/// Each operation resolves to exactly one value or fails; dependent calls are
/// composed by awaiting them in sequence.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Establish the backend connection. Idempotent.
    async fn connect(&self) -> Result<bool>;

    /// Release the backend connection. Does not discard stored data.
    async fn disconnect(&self) -> Result<bool>;

    /// Store a record, replacing any existing record with the same uuid.
    async fn insert<T: Table + ?Sized, S: Storable>(&self, table: &T, storable: &S) -> Result<bool>;

    /// Look up one record by uuid; `None` when absent.
    async fn find<T: Table + ?Sized, S: Storable>(
        &self,
        table: &T,
        uuid: Uuid,
    ) -> Result<Option<S>>;

    /// Return every record of `table` matching `query` (all records when
    /// `query` is `None`), shaped by `options`.
    async fn fetch_with<T: Table + ?Sized, S: Storable>(
        &self,
        table: &T,
        query: Option<&Query>,
        options: &FetchOptions,
    ) -> Result<Vec<S>>;

    /// Replace an existing record wholesale.
    ///
    /// Returns `AdapterError::NotFound` if no record with that uuid exists.
    async fn update<T: Table + ?Sized, S: Storable>(&self, table: &T, storable: &S) -> Result<bool>;

    /// Remove a record.
    ///
    /// Returns `true` if the record was deleted, `false` if it didn't exist.
    async fn delete<T: Table + ?Sized, S: Storable>(&self, table: &T, storable: &S) -> Result<bool>;

    /// Number of records matching `query` (all records when `None`).
    async fn count<T: Table + ?Sized>(&self, table: &T, query: Option<&Query>) -> Result<usize>;

    /// Unordered fetch of every matching record.
    async fn fetch<T: Table + ?Sized, S: Storable>(
        &self,
        table: &T,
        query: Option<&Query>,
    ) -> Result<Vec<S>> {
        self.fetch_with(table, query, &FetchOptions::default()).await
    }
}

/// Errors surfaced by adapters and the query engine.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("record {uuid} not found in table '{table}'")]
    NotFound { table: String, uuid: Uuid },
    #[error("type mismatch on field '{field}': cannot order {found} against {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("record belongs to table '{found}', not '{expected}'")]
    TableMismatch { expected: String, found: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, AdapterError>;

/// Reject empty table names and records filed under a different table.
pub(crate) fn check_table<T: Table + ?Sized, S: Storable>(table: &T, storable: &S) -> Result<()> {
    check_table_name(table)?;
    if storable.table_name() != table.name() {
        return Err(AdapterError::TableMismatch {
            expected: table.name().to_string(),
            found: storable.table_name().to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_table_name<T: Table + ?Sized>(table: &T) -> Result<()> {
    if table.name().is_empty() {
        return Err(AdapterError::Validation("empty table name".into()));
    }
    Ok(())
}

/// Return a short about/version line for binaries to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{}", pkg, ver)
}
