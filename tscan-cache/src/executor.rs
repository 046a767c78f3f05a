//! Statement execution against a live connection

use rusqlite::{params_from_iter, Connection};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{Result, Statement, Value};

/// Per-scope cursor bookkeeping, owned by [`CacheConnection`](crate::CacheConnection)
#[derive(Debug)]
pub(crate) struct CursorState {
    rowcount: i64,
    last_insert_rowid: Option<i64>,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            rowcount: -1,
            last_insert_rowid: None,
        }
    }
}

/// Executes built statements on the scope's connection.
///
/// Borrowed from an open [`CacheConnection`](crate::CacheConnection); it can
/// not outlive the scope that produced it.
#[derive(Debug)]
pub struct Cursor<'c> {
    connection: &'c Connection,
    state: &'c mut CursorState,
}

impl<'c> Cursor<'c> {
    pub(crate) fn new(connection: &'c Connection, state: &'c mut CursorState) -> Self {
        Self { connection, state }
    }

    /// Run a statement that produces no rows and return the number of rows changed.
    ///
    /// Statements with a RETURNING clause produce rows; use the fetch methods for those.
    pub fn execute(&mut self, statement: &Statement) -> Result<usize> {
        debug!(sql = statement.sql(), params = statement.params().len(), "execute");
        let changed = self
            .connection
            .execute(statement.sql(), params_from_iter(statement.params()))?;
        self.state.rowcount = i64::try_from(changed).unwrap_or(i64::MAX);
        self.state.last_insert_rowid = Some(self.connection.last_insert_rowid());
        Ok(changed)
    }

    /// Fetch every row as raw values, in column order
    pub fn fetch_rows(&mut self, statement: &Statement) -> Result<Vec<Vec<Value>>> {
        let (_, rows) = self.query(statement)?;
        Ok(rows)
    }

    /// Fetch every row, decoding each into `T` by column name
    pub fn fetch_all<T>(&mut self, statement: &Statement) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let (columns, rows) = self.query(statement)?;
        rows.into_iter()
            .map(|row| decode_row(&columns, row))
            .collect()
    }

    /// Fetch the first row; no rows is an engine `QueryReturnedNoRows` error
    pub fn fetch_one<T>(&mut self, statement: &Statement) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.fetch_optional(statement)?
            .ok_or(crate::Error::Database(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Fetch the first row, if any
    pub fn fetch_optional<T>(&mut self, statement: &Statement) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let (columns, rows) = self.query(statement)?;
        rows.into_iter()
            .next()
            .map(|row| decode_row(&columns, row))
            .transpose()
    }

    /// Rows changed by the last write, or -1 when the last statement was a read
    pub fn rowcount(&self) -> i64 {
        self.state.rowcount
    }

    /// Row id of the most recent successful INSERT in this scope
    pub fn last_insert_rowid(&self) -> Option<i64> {
        self.state.last_insert_rowid
    }

    fn query(&mut self, statement: &Statement) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
        debug!(sql = statement.sql(), params = statement.params().len(), "query");
        let mut stmt = self.connection.prepare(statement.sql())?;
        let readonly = stmt.readonly();
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let rows = stmt
            .query_map(params_from_iter(statement.params()), |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<Vec<Vec<Value>>>>()?;

        if readonly {
            self.state.rowcount = -1;
        } else {
            self.state.rowcount = i64::try_from(self.connection.changes()).unwrap_or(i64::MAX);
            self.state.last_insert_rowid = Some(self.connection.last_insert_rowid());
        }
        Ok((columns, rows))
    }
}

fn decode_row<T>(columns: &[String], row: Vec<Value>) -> Result<T>
where
    T: DeserializeOwned,
{
    let object: serde_json::Map<String, serde_json::Value> = columns
        .iter()
        .cloned()
        .zip(row.iter().map(Value::to_json))
        .collect();
    Ok(serde_json::from_value(serde_json::Value::Object(object))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryBuilder;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Entry {
        id: i64,
        path: String,
        size: Option<i64>,
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE entries (id INTEGER PRIMARY KEY, path TEXT NOT NULL, size INTEGER);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_execute_and_fetch() {
        let conn = setup();
        let mut state = CursorState::default();
        let mut cursor = Cursor::new(&conn, &mut state);
        assert_eq!(cursor.rowcount(), -1);

        let insert = QueryBuilder::new()
            .insert("entries")
            .values([("path", Value::from("/a")), ("size", Value::from(10))])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(cursor.execute(&insert).unwrap(), 1);
        assert_eq!(cursor.rowcount(), 1);
        assert_eq!(cursor.last_insert_rowid(), Some(1));

        let select = QueryBuilder::new()
            .select_columns("entries", ("id", "path", "size"))
            .equal("path", "/a")
            .unwrap()
            .build()
            .unwrap();
        let entries: Vec<Entry> = cursor.fetch_all(&select).unwrap();
        assert_eq!(
            entries,
            [Entry {
                id: 1,
                path: "/a".to_string(),
                size: Some(10)
            }]
        );
        assert_eq!(cursor.rowcount(), -1);
    }

    #[test]
    fn test_fetch_rows_and_optional() {
        let conn = setup();
        conn.execute_batch("INSERT INTO entries (path) VALUES ('/x'), ('/y');")
            .unwrap();
        let mut state = CursorState::default();
        let mut cursor = Cursor::new(&conn, &mut state);

        let select = QueryBuilder::new()
            .select_columns("entries", ("path", "size"))
            .order_by("path", crate::SortDirection::Desc)
            .unwrap()
            .build()
            .unwrap();
        let rows = cursor.fetch_rows(&select).unwrap();
        assert_eq!(
            rows,
            [
                vec![Value::from("/y"), Value::Null],
                vec![Value::from("/x"), Value::Null]
            ]
        );

        let missing = QueryBuilder::new()
            .select("entries")
            .equal("path", "/nope")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(cursor.fetch_optional::<Entry>(&missing).unwrap(), None);
        assert!(matches!(
            cursor.fetch_one::<Entry>(&missing),
            Err(crate::Error::Database(rusqlite::Error::QueryReturnedNoRows))
        ));
    }

    #[test]
    fn test_insert_returning() {
        let conn = setup();
        let mut state = CursorState::default();
        let mut cursor = Cursor::new(&conn, &mut state);

        let insert = QueryBuilder::new()
            .insert("entries")
            .values([("path", "/r")])
            .unwrap()
            .returning("id")
            .unwrap()
            .build()
            .unwrap();
        let rows = cursor.fetch_rows(&insert).unwrap();
        assert_eq!(rows, [vec![Value::I64(1)]]);
        assert_eq!(cursor.rowcount(), 1);
    }

    #[test]
    fn test_membership_binds_each_element() {
        let conn = setup();
        conn.execute_batch("INSERT INTO entries (path) VALUES ('/a'), ('/b'), ('/c');")
            .unwrap();
        let mut state = CursorState::default();
        let mut cursor = Cursor::new(&conn, &mut state);

        let select = QueryBuilder::new()
            .select_columns("entries", "path")
            .set_in("path", vec!["/a", "/c"])
            .unwrap()
            .build()
            .unwrap();
        let rows = cursor.fetch_rows(&select).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
