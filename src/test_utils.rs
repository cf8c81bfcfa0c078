/// # Test Utilities Module
///
/// Shared fixtures for the unit tests:
/// - Prefixed in-memory databases with the `items` sample table
/// - Error assertions for `QuerykitError` variants
/// - A connection that counts the statements it receives

use crate::core::db::{Connection, ConnectionResult, Database, SqliteConnection};
use crate::core::{Row, Value};
use crate::grammar::SqliteGrammar;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Once;

/// Prefix every fixture database uses.
pub const TEST_PREFIX: &str = "pre_";

/// Installs a tracing subscriber writing through the test harness, once.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Creates `pre_items(id, name, value)` holding Banana 123.4, Apple -10,
/// Pen NULL and Bottle 0, on a SQLite grammar database prefixed `pre_`.
pub fn items_database() -> Database {
    init_tracing();
    let database = Database::with_grammar(
        SqliteConnection::open_in_memory().expect("in-memory database"),
        SqliteGrammar::new(),
        TEST_PREFIX,
    );
    database
        .statement(
            &format!(
                "CREATE TABLE {}(id INTEGER PRIMARY KEY ASC, name TEXT, value NUMERIC)",
                database.add_table_prefix("items")
            ),
            &[],
        )
        .expect("create items table");
    database
        .insert(
            &format!(
                "INSERT INTO {} (name, value) VALUES (?, ?), (?, ?), (?, ?), (?, ?)",
                database.add_table_prefix("items")
            ),
            &[
                Value::from("Banana"),
                Value::from(123.4),
                Value::from("Apple"),
                Value::from(-10),
                Value::from("Pen"),
                Value::Null,
                Value::from("Bottle"),
                Value::from(0),
            ],
        )
        .expect("insert sample items");
    database
}

/// Wraps a SQLite connection and counts every call that reaches it.
#[derive(Debug)]
pub struct CountingConnection {
    inner: SqliteConnection,
    calls: Rc<Cell<usize>>,
}

impl CountingConnection {
    /// Returns the connection and a handle reading its call count.
    pub fn new(inner: SqliteConnection) -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            CountingConnection {
                inner,
                calls: Rc::clone(&calls),
            },
            calls,
        )
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl Connection for CountingConnection {
    fn select(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<Vec<Row>> {
        self.tick();
        self.inner.select(sql, bindings)
    }

    fn execute(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<usize> {
        self.tick();
        self.inner.execute(sql, bindings)
    }

    fn insert_get_id(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<i64> {
        self.tick();
        self.inner.insert_get_id(sql, bindings)
    }

    fn statement(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<()> {
        self.tick();
        self.inner.statement(sql, bindings)
    }
}

/// Asserts a result failed with the given `QuerykitError` variant.
#[macro_export]
macro_rules! assert_querykit_error {
    ($result:expr, $variant:ident, $context:expr) => {
        match $result {
            Err($crate::core::QuerykitError::$variant { .. }) => {}
            Ok(ref value) => panic!(
                "Expected {} error but got Ok({:?}) in {}",
                stringify!($variant),
                value,
                $context
            ),
            Err(other) => panic!(
                "Expected {} but got {:?} in {}",
                stringify!($variant),
                other,
                $context
            ),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_connection() {
        let (connection, calls) = CountingConnection::new(SqliteConnection::open_in_memory().unwrap());
        let database = Database::new(connection);
        database.select("SELECT 1", &[]).unwrap();
        database.statement("CREATE TABLE t (id INTEGER)", &[]).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_items_fixture() {
        let database = items_database();
        assert_eq!(database.table_prefix(), TEST_PREFIX);
        let rows = database.select("SELECT name FROM pre_items ORDER BY id", &[]).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2]["name"], Value::from("Pen"));
    }
}
