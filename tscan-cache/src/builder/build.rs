//! SQL assembly

use std::fmt;

use super::{QueryBuilder, Verb};
use crate::{Error, Result, Value};

/// Finished SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }

    /// Number of `?` placeholders in the SQL text.
    ///
    /// A `?` inside a quoted literal or identifier (for example in a raw join
    /// condition) is not a placeholder and is not counted.
    pub fn placeholder_count(&self) -> usize {
        placeholder_offsets(&self.sql).len()
    }
}

/// Byte offsets of the `?` placeholders in `sql`, skipping quoted regions
pub(crate) fn placeholder_offsets(sql: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut quote: Option<char> = None;
    for (offset, ch) in sql.char_indices() {
        match quote {
            // A doubled quote closes and reopens, which keeps the state right
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '?' => offsets.push(offset),
                _ => {}
            },
        }
    }
    offsets
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl QueryBuilder {
    /// Render the builder into SQL and parameters.
    ///
    /// Clauses are emitted in a fixed order (JOIN, SET, VALUES, WHERE,
    /// ORDER BY, LIMIT/OFFSET, RETURNING) and parameters are collected in the
    /// same pass, so placeholders and parameters always line up. Clauses that
    /// do not apply to the bound verb are skipped.
    ///
    /// # Examples
    /// ```
    /// use tscan_cache::QueryBuilder;
    ///
    /// let (sql, params) = QueryBuilder::new()
    ///     .insert("t")
    ///     .values([("a", 1), ("b", 2)])?
    ///     .build()?
    ///     .into_parts();
    /// assert_eq!(sql, "INSERT INTO t (a, b) VALUES (?, ?)");
    /// assert_eq!(params.len(), 2);
    /// # Ok::<(), tscan_cache::Error>(())
    /// ```
    pub fn build(&self) -> Result<Statement> {
        let target = self.require_table()?;
        let verb = target.verb;
        let mut sql = target.prefix();
        let mut params = Vec::new();

        // JOIN clause
        if verb == Verb::Select {
            for join in self.joins.iter().flatten() {
                sql.push_str(&format!(" JOIN {} ON {}", join.table, join.condition));
            }
        }

        // SET clause
        if let Some(assignments) = self.assignments.as_ref().filter(|a| !a.is_empty()) {
            if verb == Verb::Update {
                let set_parts: Vec<String> = assignments
                    .iter()
                    .map(|(column, _)| format!("{} = ?", column))
                    .collect();
                sql.push_str(" SET ");
                sql.push_str(&set_parts.join(", "));
                params.extend(assignments.iter().map(|(_, value)| value.clone()));
            }
        }

        // VALUES clause
        if let Some(values) = self.values.as_ref().filter(|v| !v.is_empty()) {
            if verb == Verb::Insert {
                let columns: Vec<&str> = values.iter().map(|(column, _)| column.as_str()).collect();
                let placeholders = vec!["?"; values.len()];
                sql.push_str(&format!(
                    " ({}) VALUES ({})",
                    columns.join(", "),
                    placeholders.join(", ")
                ));
                params.extend(values.iter().map(|(_, value)| value.clone()));
            }
        }

        // WHERE clause
        if !self.predicates.is_empty() {
            let mut where_parts = Vec::with_capacity(self.predicates.len());
            for (operator, group) in self.predicates.iter() {
                for predicate in group {
                    if operator.is_nullness() {
                        where_parts.push(format!("{} {}", predicate.column, operator));
                    } else if operator.is_membership() {
                        let items = membership_items(operator.name(), &predicate.value)?;
                        let placeholders = vec!["?"; items.len()];
                        where_parts.push(format!(
                            "{} {} ({})",
                            predicate.column,
                            operator,
                            placeholders.join(", ")
                        ));
                        params.extend(items);
                    } else {
                        where_parts.push(format!("{} {} ?", predicate.column, operator));
                        params.push(predicate.value.clone());
                    }
                }
            }
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }

        // ORDER BY clause
        if let Some(order_by) = self.order_by.as_ref().filter(|o| !o.is_empty()) {
            if verb == Verb::Select {
                let order_parts: Vec<String> = order_by
                    .iter()
                    .map(|clause| format!("{} {}", clause.column, clause.direction))
                    .collect();
                sql.push_str(" ORDER BY ");
                sql.push_str(&order_parts.join(", "));
            }
        }

        // LIMIT / OFFSET clause
        if let (Some(pagination), Verb::Select) = (self.pagination, verb) {
            if let Some(limit) = pagination.limit {
                sql.push_str(&format!(" LIMIT {}", limit));
            }
            if let Some(offset) = pagination.offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        // RETURNING clause
        if let Some(returning) = self.returning.as_ref().filter(|r| !r.is_empty()) {
            if matches!(verb, Verb::Insert | Verb::Update) {
                sql.push_str(" RETURNING ");
                sql.push_str(&returning.join(", "));
            }
        }

        Ok(Statement { sql, params })
    }
}

/// Elements bound by a membership predicate, one parameter each.
///
/// Arrays expand element-wise. Bytes (what a `Vec<u8>` converts into) expand
/// to one integer per byte.
fn membership_items(operator: &str, value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Bytes(bytes) => Ok(bytes.iter().map(|b| Value::I32(i32::from(*b))).collect()),
        other => Err(Error::value_type(format!(
            "The '{}' operator requires a sequence value, got {}.",
            operator,
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Operator, PredicateSet, SortDirection};

    #[test]
    fn test_basic_select() {
        let stmt = QueryBuilder::new().select("t").build().unwrap();
        assert_eq!(stmt.sql(), "SELECT * FROM t");
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn test_where_follows_registry_order() {
        let stmt = QueryBuilder::new()
            .select("t")
            .like("b", "%x%")
            .unwrap()
            .equal("a", 1)
            .unwrap()
            .build()
            .unwrap();
        assert!(stmt.sql().ends_with("WHERE a = ? AND b LIKE ?"));
        assert_eq!(stmt.params(), [Value::I32(1), Value::from("%x%")]);
    }

    #[test]
    fn test_insert_values() {
        let stmt = QueryBuilder::new()
            .insert("t")
            .values([("a", 1), ("b", 2)])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(stmt.sql(), "INSERT INTO t (a, b) VALUES (?, ?)");
        assert_eq!(stmt.params(), [Value::I32(1), Value::I32(2)]);
    }

    #[test]
    fn test_limit_precedes_offset() {
        let stmt = QueryBuilder::new()
            .select("t")
            .order_by("a", SortDirection::Asc)
            .unwrap()
            .offset(5)
            .unwrap()
            .limit(10)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(stmt.sql(), "SELECT * FROM t ORDER BY a ASC LIMIT 10 OFFSET 5");
    }

    #[test]
    fn test_update_set_where_returning() {
        let stmt = QueryBuilder::new()
            .update("files")
            .set([("size", Value::from(10)), ("name", Value::from("a.txt"))])
            .unwrap()
            .equal("id", 7)
            .unwrap()
            .returning(("id", "size"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "UPDATE files SET size = ?, name = ? WHERE id = ? RETURNING id, size"
        );
        assert_eq!(
            stmt.params(),
            [Value::I32(10), Value::from("a.txt"), Value::I32(7)]
        );
    }

    #[test]
    fn test_membership_expands_each_element() {
        let stmt = QueryBuilder::new()
            .select("t")
            .set_in("id", vec![1, 2, 3])
            .unwrap()
            .set_not_in("kind", ["dir"])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM t WHERE id IN (?, ?, ?) AND kind NOT IN (?)"
        );
        assert_eq!(stmt.params().len(), 4);
        assert_eq!(stmt.placeholder_count(), 4);
    }

    #[test]
    fn test_membership_requires_sequence() {
        let query = QueryBuilder::new().select("t").set_in("id", 5).unwrap();
        assert!(matches!(query.build(), Err(Error::ValueType { .. })));
    }

    #[test]
    fn test_membership_expands_bytes() {
        let stmt = QueryBuilder::new()
            .select("t")
            .set_in("flag", vec![0u8, 1u8])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(stmt.sql(), "SELECT * FROM t WHERE flag IN (?, ?)");
        assert_eq!(stmt.params(), &[Value::I32(0), Value::I32(1)]);
    }

    #[test]
    fn test_quoted_question_marks_are_not_placeholders() {
        let stmt = QueryBuilder::new()
            .select("t")
            .join("u", "u.name = '?' AND u.\"a?b\" = t.id")
            .unwrap()
            .equal("a", 1)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(stmt.placeholder_count(), 1);
        assert_eq!(stmt.placeholder_count(), stmt.params().len());
        assert_eq!(placeholder_offsets("a = '?''?' AND b = ?"), vec![19]);
    }

    #[test]
    fn test_nullness_binds_nothing() {
        let stmt = QueryBuilder::new()
            .delete("t")
            .is_not_null("b", ())
            .unwrap()
            .is_null("a", "also ignored")
            .unwrap()
            .predicate(Operator::IsNull, "c", "ignored")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "DELETE FROM t WHERE a IS NULL AND c IS NULL AND b IS NOT NULL"
        );
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn test_incompatible_clauses_are_ignored() {
        let stmt = QueryBuilder::new()
            .delete("t")
            .join("u", "u.id = t.u_id")
            .unwrap()
            .order_by("a", SortDirection::Desc)
            .unwrap()
            .limit(1)
            .unwrap()
            .values([("a", 1)])
            .unwrap()
            .set([("b", 2)])
            .unwrap()
            .returning("id")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(stmt.sql(), "DELETE FROM t");
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn test_select_with_joins() {
        let stmt = QueryBuilder::new()
            .select_columns("files", ["files.path", "dirs.name"])
            .join("dirs", "dirs.id = files.dir_id")
            .unwrap()
            .join("roots", "roots.id = dirs.root_id")
            .unwrap()
            .greater_than("files.size", 0)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT files.path, dirs.name FROM files JOIN dirs ON dirs.id = files.dir_id \
             JOIN roots ON roots.id = dirs.root_id WHERE files.size > ?"
        );
    }

    #[test]
    fn test_placeholders_match_params_for_every_clause_mix() {
        let fragment = PredicateSet::new()
            .with(Operator::SetIn, "kind", vec!["file", "link"])
            .with(Operator::LessThanOrEqual, "depth", 3);
        let bases = [
            QueryBuilder::new().select("t"),
            QueryBuilder::new().insert("t"),
            QueryBuilder::new().update("t"),
            QueryBuilder::new().delete("t"),
        ];
        for base in bases {
            let query = base
                .join("u", "u.id = t.u_id")
                .unwrap()
                .set([("a", 1), ("b", 2)])
                .unwrap()
                .values([("c", 3)])
                .unwrap()
                .where_([fragment.clone()])
                .unwrap()
                .is_null("deleted_at", ())
                .unwrap()
                .not_equal("name", "x")
                .unwrap()
                .order_by("a", SortDirection::Desc)
                .unwrap()
                .limit(2)
                .unwrap()
                .offset(4)
                .unwrap()
                .returning("id")
                .unwrap();
            let stmt = query.build().unwrap();
            assert_eq!(stmt.placeholder_count(), stmt.params().len(), "{}", stmt);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let query = QueryBuilder::new()
            .select("t")
            .equal("a", 1)
            .unwrap()
            .set_in("b", vec![1, 2])
            .unwrap()
            .order_by("a", SortDirection::Asc)
            .unwrap();
        assert_eq!(query.build().unwrap(), query.build().unwrap());
    }
}
