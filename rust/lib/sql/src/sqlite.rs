use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path)
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        // WAL for concurrent readers; foreign keys drive cascading deletes.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let mut columns = Vec::with_capacity(column_names.len());
                for (i, name) in column_names.iter().enumerate() {
                    columns.push((name.clone(), row_value_at(row, i)?));
                }
                Ok(Row { columns })
            })
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
        }
        Ok(result)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let affected = conn.execute(sql, param_refs.as_slice())?;

        Ok(affected as u64)
    }

    fn exec_batch(&self, sql: &str) -> Result<(), SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

/// Extract a Value from a rusqlite row at a given column index,
/// following the column's storage class.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Value> {
    use rusqlite::types::ValueRef;

    Ok(match row.get_ref(idx)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec_batch(
                "CREATE TABLE parent (id TEXT PRIMARY KEY, name TEXT NOT NULL UNIQUE, weight REAL);
                 CREATE TABLE child (
                     id TEXT PRIMARY KEY,
                     parent_id TEXT NOT NULL REFERENCES parent(id) ON DELETE CASCADE
                 );",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_exec_and_query() {
        let store = store();
        let n = store
            .exec(
                "INSERT INTO parent (id, name, weight) VALUES (?1, ?2, ?3)",
                &["p1".into(), "alpha".into(), Value::Real(1.5)],
            )
            .unwrap();
        assert_eq!(n, 1);

        let rows = store
            .query("SELECT id, name, weight FROM parent WHERE id = ?1", &["p1".into()])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("name"), Some("alpha"));
        assert_eq!(rows[0].get_f64("weight"), Some(1.5));
    }

    #[test]
    fn test_unique_violation_is_distinguished() {
        let store = store();
        store
            .exec("INSERT INTO parent (id, name) VALUES ('p1', 'alpha')", &[])
            .unwrap();
        let err = store
            .exec("INSERT INTO parent (id, name) VALUES ('p2', 'alpha')", &[])
            .unwrap_err();
        assert!(err.is_unique_violation(), "got {err:?}");

        let err = store
            .exec("INSERT INTO parent (id, name) VALUES ('p1', 'beta')", &[])
            .unwrap_err();
        assert!(err.is_unique_violation(), "got {err:?}");
    }

    #[test]
    fn test_foreign_keys_cascade() {
        let store = store();
        store
            .exec_batch(
                "INSERT INTO parent (id, name) VALUES ('p1', 'alpha');
                 INSERT INTO child (id, parent_id) VALUES ('c1', 'p1');",
            )
            .unwrap();

        let err = store
            .exec("INSERT INTO child (id, parent_id) VALUES ('c2', 'missing')", &[])
            .unwrap_err();
        assert!(!err.is_unique_violation());

        store.exec("DELETE FROM parent WHERE id = 'p1'", &[]).unwrap();
        let rows = store.query("SELECT COUNT(*) AS cnt FROM child", &[]).unwrap();
        assert_eq!(rows[0].get_i64("cnt"), Some(0));
    }

    #[test]
    fn test_aggregate_integer_widens_to_f64() {
        let store = store();
        store
            .exec_batch("CREATE TABLE nums (n INTEGER); INSERT INTO nums VALUES (2), (3);")
            .unwrap();
        let rows = store
            .query("SELECT SUM(n) AS total, MAX(n) AS top FROM nums WHERE n > 10", &[])
            .unwrap();
        assert!(matches!(rows[0].get("total"), Some(Value::Null)));

        let rows = store.query("SELECT SUM(n) AS total FROM nums", &[]).unwrap();
        assert_eq!(rows[0].get_f64("total"), Some(5.0));
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.sqlite");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.exec_batch("CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('x');").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let rows = store.query("SELECT v FROM t", &[]).unwrap();
        assert_eq!(rows[0].get_str("v"), Some("x"));
    }
}
