//! tscan-cache - the SQLite persistence layer behind the tree scanner's cache
//!
//! This crate provides an immutable SQL statement builder, a preview renderer
//! for logging statements with their values inlined, and a managed SQLite
//! connection that wraps each session in a single transaction.

pub mod builder;
pub mod cache_dir;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod logging;
pub mod operator;
pub mod value;

// Re-export main types
pub use builder::{
    sql_literal, IntoColumns, Join, OrderBy, Pagination, Predicate, PredicateSet, QueryBuilder,
    SortDirection, Statement, Target, Verb,
};
pub use cache_dir::{default_cache_dir, default_cache_file, resolve_cache_dir, CACHE_FILE_NAME};
pub use config::{CacheConfig, DisplayConfig, RuntimeConfig, SafetyConfig};
pub use connection::{CacheConnection, Exit};
pub use error::{Error, Result};
pub use executor::Cursor;
pub use logging::init_logging;
pub use operator::{IntoOperator, Operator};
pub use value::Value;

/// Start a SELECT of every column from `table`
pub fn select(table: &str) -> QueryBuilder {
    QueryBuilder::new().select(table)
}

/// Start an INSERT into `table`
pub fn insert(table: &str) -> QueryBuilder {
    QueryBuilder::new().insert(table)
}

/// Start an UPDATE of `table`
pub fn update(table: &str) -> QueryBuilder {
    QueryBuilder::new().update(table)
}

/// Start a DELETE from `table`
pub fn delete(table: &str) -> QueryBuilder {
    QueryBuilder::new().delete(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_points() {
        assert_eq!(select("t").build().unwrap().sql(), "SELECT * FROM t");
        assert_eq!(delete("t").build().unwrap().sql(), "DELETE FROM t");
        assert_eq!(insert("t").verb(), Some(Verb::Insert));
        assert_eq!(update("t").table(), Some("t"));
    }
}
