//! Debug rendering of a statement with its parameters inlined.
//!
//! The output is for humans only; never execute it.

use super::build::placeholder_offsets;
use super::{QueryBuilder, Statement};
use crate::Value;

impl QueryBuilder {
    /// Build the statement and substitute literal values for its placeholders.
    ///
    /// Never fails: assembly errors are rendered as an inline SQL comment.
    ///
    /// # Examples
    /// ```
    /// use tscan_cache::QueryBuilder;
    ///
    /// let query = QueryBuilder::new().select("users").equal("name", "O'Brien")?;
    /// assert_eq!(query.preview(), "SELECT * FROM users WHERE name = 'O''Brien'");
    /// assert!(QueryBuilder::new().preview().starts_with("/* PREVIEW ERROR: MissingTable:"));
    /// # Ok::<(), tscan_cache::Error>(())
    /// ```
    pub fn preview(&self) -> String {
        match self.build() {
            Ok(statement) => statement.preview(),
            Err(err) => format!("/* PREVIEW ERROR: {}: {} */", err.kind(), err),
        }
    }
}

impl Statement {
    /// Substitute parameters into placeholders in order.
    ///
    /// Placeholders left over once the parameters run out stay as `?`, and a
    /// `?` inside a quoted literal is left alone.
    pub fn preview(&self) -> String {
        let sql = self.sql();
        let mut params = self.params().iter();
        let mut rendered = String::with_capacity(sql.len());
        let mut copied = 0;
        for offset in placeholder_offsets(sql) {
            rendered.push_str(&sql[copied..offset]);
            match params.next() {
                Some(value) => rendered.push_str(&sql_literal(value)),
                None => rendered.push('?'),
            }
            copied = offset + 1;
        }
        rendered.push_str(&sql[copied..]);
        rendered
    }
}

/// Render a value as a SQL literal
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::I32(i) => i.to_string(),
        Value::I64(i) => i.to_string(),
        Value::F32(f) => f.to_string(),
        Value::F64(f) => f.to_string(),
        Value::String(s) => quote(s),
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
            format!("X'{}'", hex)
        }
        Value::Json(json) => quote(&json.to_string()),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(sql_literal).collect();
            format!("({})", items.join(", "))
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
