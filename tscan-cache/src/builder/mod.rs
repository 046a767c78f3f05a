//! Immutable query builder
//!
//! Every clause method takes `&self` and returns a fresh [`QueryBuilder`];
//! the receiver is never modified, so any intermediate builder can be kept
//! and branched from.

mod build;
mod clauses;
mod predicate;
mod preview;

pub use build::Statement;
pub use clauses::{IntoColumns, Join, OrderBy, Pagination, SortDirection, Target, Verb};
pub use predicate::{Predicate, PredicateSet};
pub use preview::sql_literal;

use crate::{Error, IntoOperator, Operator, Result, Value};

/// A SQL statement under construction
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryBuilder {
    target: Option<Target>,
    predicates: PredicateSet,
    values: Option<Vec<(String, Value)>>,
    assignments: Option<Vec<(String, Value)>>,
    joins: Option<Vec<Join>>,
    order_by: Option<Vec<OrderBy>>,
    pagination: Option<Pagination>,
    returning: Option<Vec<String>>,
}

impl QueryBuilder {
    /// Create a builder with no table bound
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&self, verb: Verb, table: &str, columns: Vec<String>) -> Self {
        Self {
            target: Some(Target {
                verb,
                table: table.to_string(),
                columns,
            }),
            ..self.clone()
        }
    }

    /// Bind `SELECT * FROM table`
    pub fn select(&self, table: &str) -> Self {
        self.bind(Verb::Select, table, Vec::new())
    }

    /// Bind `SELECT columns FROM table`; an empty column list selects `*`
    ///
    /// # Examples
    /// ```
    /// use tscan_cache::QueryBuilder;
    ///
    /// let query = QueryBuilder::new().select_columns("files", ("path", "size"));
    /// assert_eq!(query.build().unwrap().sql(), "SELECT path, size FROM files");
    /// ```
    pub fn select_columns<C>(&self, table: &str, columns: C) -> Self
    where
        C: IntoColumns,
    {
        self.bind(Verb::Select, table, columns.into_columns())
    }

    /// Bind `INSERT INTO table`
    pub fn insert(&self, table: &str) -> Self {
        self.bind(Verb::Insert, table, Vec::new())
    }

    /// Bind `UPDATE table`
    pub fn update(&self, table: &str) -> Self {
        self.bind(Verb::Update, table, Vec::new())
    }

    /// Bind `DELETE FROM table`
    pub fn delete(&self, table: &str) -> Self {
        self.bind(Verb::Delete, table, Vec::new())
    }

    fn require_table(&self) -> Result<&Target> {
        self.target.as_ref().ok_or_else(|| Error::missing_table(self))
    }

    /// Append a predicate under any registry operator.
    ///
    /// `operator` may be an [`Operator`] or its registry name / SQL token.
    /// The value is stored but never rendered for the nullness operators.
    ///
    /// # Examples
    /// ```
    /// use tscan_cache::{QueryBuilder, Operator};
    ///
    /// let query = QueryBuilder::new()
    ///     .select("files")
    ///     .predicate(Operator::GreaterThan, "size", 1024)?
    ///     .predicate("like", "path", "%.rs")?;
    /// assert_eq!(
    ///     query.build()?.sql(),
    ///     "SELECT * FROM files WHERE size > ? AND path LIKE ?"
    /// );
    /// # Ok::<(), tscan_cache::Error>(())
    /// ```
    pub fn predicate<O, V>(&self, operator: O, column: &str, value: V) -> Result<Self>
    where
        O: IntoOperator,
        V: Into<Value>,
    {
        self.require_table()?;
        let operator = operator.into_operator()?;
        Ok(Self {
            predicates: self.predicates.with(operator, column, value),
            ..self.clone()
        })
    }

    /// `column = value`
    pub fn equal(&self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::Equal, column, value)
    }

    /// `column <> value`
    pub fn not_equal(&self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::NotEqual, column, value)
    }

    /// `column > value`
    pub fn greater_than(&self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::GreaterThan, column, value)
    }

    /// `column < value`
    pub fn less_than(&self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::LessThan, column, value)
    }

    /// `column >= value`
    pub fn greater_than_or_equal(&self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::GreaterThanOrEqual, column, value)
    }

    /// `column <= value`
    pub fn less_than_or_equal(&self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::LessThanOrEqual, column, value)
    }

    /// `column LIKE value`
    pub fn like(&self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::Like, column, value)
    }

    /// `column NOT LIKE value`
    pub fn not_like(&self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::NotLike, column, value)
    }

    /// `column IN (?, …)`; the value must be an array, checked at build time.
    /// A `Vec<u8>` converts to bytes and binds one integer per byte.
    pub fn set_in(&self, column: &str, values: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::SetIn, column, values)
    }

    /// `column NOT IN (?, …)`; same value rules as [`set_in`](Self::set_in)
    pub fn set_not_in(&self, column: &str, values: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::SetNotIn, column, values)
    }

    /// `column IS NULL`; the value is stored but never rendered, pass `()`
    pub fn is_null(&self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::IsNull, column, value)
    }

    /// `column IS NOT NULL`; the value is stored but never rendered, pass `()`
    pub fn is_not_null(&self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicate(Operator::IsNotNull, column, value)
    }

    /// Merge predicate fragments into this builder.
    ///
    /// Fragments are merged left to right by operator: a fragment's non-empty
    /// group replaces the group already present for that operator.
    ///
    /// # Examples
    /// ```
    /// use tscan_cache::{QueryBuilder, PredicateSet, Operator};
    ///
    /// let hidden = PredicateSet::new().with(Operator::Like, "name", ".%");
    /// let query = QueryBuilder::new()
    ///     .delete("files")
    ///     .equal("root", "/tmp")?
    ///     .where_([hidden])?;
    /// assert_eq!(
    ///     query.build()?.sql(),
    ///     "DELETE FROM files WHERE root = ? AND name LIKE ?"
    /// );
    /// # Ok::<(), tscan_cache::Error>(())
    /// ```
    pub fn where_<I, P>(&self, fragments: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<PredicateSet>,
    {
        self.require_table()?;
        let predicates = fragments
            .into_iter()
            .fold(self.predicates.clone(), |acc, fragment| {
                acc.merged(fragment.as_ref())
            });
        Ok(Self {
            predicates,
            ..self.clone()
        })
    }

    /// Add INSERT values; a repeated column keeps its position and takes the new value
    pub fn values<I, K, V>(&self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.require_table()?;
        match upsert_all(self.values.as_deref(), values) {
            Some(values) => Ok(Self {
                values: Some(values),
                ..self.clone()
            }),
            None => Ok(self.clone()),
        }
    }

    /// Add UPDATE assignments; a repeated column keeps its position and takes the new value
    pub fn set<I, K, V>(&self, assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.require_table()?;
        match upsert_all(self.assignments.as_deref(), assignments) {
            Some(assignments) => Ok(Self {
                assignments: Some(assignments),
                ..self.clone()
            }),
            None => Ok(self.clone()),
        }
    }

    /// Append `JOIN table ON condition`
    pub fn join(&self, table: &str, condition: &str) -> Result<Self> {
        self.require_table()?;
        let mut joins = self.joins.clone().unwrap_or_default();
        joins.push(Join {
            table: table.to_string(),
            condition: condition.to_string(),
        });
        Ok(Self {
            joins: Some(joins),
            ..self.clone()
        })
    }

    /// Append an ORDER BY column
    pub fn order_by(&self, column: &str, direction: SortDirection) -> Result<Self> {
        self.require_table()?;
        let mut order_by = self.order_by.clone().unwrap_or_default();
        order_by.push(OrderBy {
            column: column.to_string(),
            direction,
        });
        Ok(Self {
            order_by: Some(order_by),
            ..self.clone()
        })
    }

    /// Set LIMIT, keeping any OFFSET already set
    pub fn limit(&self, limit: i64) -> Result<Self> {
        self.require_table()?;
        let limit = non_negative("Limit", limit)?;
        let pagination = Pagination {
            limit: Some(limit),
            ..self.pagination.unwrap_or_default()
        };
        Ok(Self {
            pagination: Some(pagination),
            ..self.clone()
        })
    }

    /// Set OFFSET, keeping any LIMIT already set
    pub fn offset(&self, offset: i64) -> Result<Self> {
        self.require_table()?;
        let offset = non_negative("Offset", offset)?;
        let pagination = Pagination {
            offset: Some(offset),
            ..self.pagination.unwrap_or_default()
        };
        Ok(Self {
            pagination: Some(pagination),
            ..self.clone()
        })
    }

    /// Append RETURNING columns
    pub fn returning<C>(&self, columns: C) -> Result<Self>
    where
        C: IntoColumns,
    {
        self.require_table()?;
        let columns = columns.into_columns();
        if columns.is_empty() {
            return Ok(self.clone());
        }
        let mut returning = self.returning.clone().unwrap_or_default();
        returning.extend(columns);
        Ok(Self {
            returning: Some(returning),
            ..self.clone()
        })
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn verb(&self) -> Option<Verb> {
        self.target.as_ref().map(|target| target.verb)
    }

    pub fn table(&self) -> Option<&str> {
        self.target.as_ref().map(|target| target.table.as_str())
    }

    pub fn predicates(&self) -> &PredicateSet {
        &self.predicates
    }

    pub fn values_data(&self) -> Option<&[(String, Value)]> {
        self.values.as_deref()
    }

    pub fn assignments(&self) -> Option<&[(String, Value)]> {
        self.assignments.as_deref()
    }

    pub fn joins(&self) -> Option<&[Join]> {
        self.joins.as_deref()
    }

    pub fn order_by_clauses(&self) -> Option<&[OrderBy]> {
        self.order_by.as_deref()
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.pagination.and_then(|p| p.limit)
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.pagination.and_then(|p| p.offset)
    }

    pub fn returning_columns(&self) -> Option<&[String]> {
        self.returning.as_deref()
    }
}

impl AsRef<PredicateSet> for QueryBuilder {
    fn as_ref(&self) -> &PredicateSet {
        &self.predicates
    }
}

/// Copy `existing` and upsert every pair into it. `None` when `pairs` is empty.
fn upsert_all<I, K, V>(existing: Option<&[(String, Value)]>, pairs: I) -> Option<Vec<(String, Value)>>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let mut pairs = pairs.into_iter().peekable();
    pairs.peek()?;
    let mut merged = existing.map(<[_]>::to_vec).unwrap_or_default();
    for (column, value) in pairs {
        let column: String = column.into();
        let value: Value = value.into();
        match merged.iter_mut().find(|(existing, _)| *existing == column) {
            Some(slot) => slot.1 = value,
            None => merged.push((column, value)),
        }
    }
    Some(merged)
}

fn non_negative(what: &str, n: i64) -> Result<u64> {
    u64::try_from(n).map_err(|_| Error::value_type(format!("{} must be a non-negative integer.", what)))
}
