/// Connection Management Module
///
/// This module defines the connection contract the database facade executes
/// raw SQL through, and the SQLite implementation of it.

use crate::core::error::BoxError;
use crate::core::value::{Row, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::params_from_iter;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Errors raised by a connection implementation.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The bound values do not fit the statement (count, type, name)
    #[error("{message}")]
    InvalidArgument {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// The driver failed to prepare or execute a statement
    #[error("{0}")]
    Execution(#[source] rusqlite::Error),

    /// The connection could not be established
    #[error("{message}")]
    Connect {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Anything a connection implementation raises that is none of the above
    #[error(transparent)]
    Other(BoxError),
}

/// Result type returned by [`Connection`] implementations.
pub type ConnectionResult<T> = std::result::Result<T, ConnectionError>;

/// Raw SQL execution primitives.
///
/// Every method takes the SQL text and the values for its placeholders in
/// order. Implementations only execute; error translation happens in
/// [`Database`](crate::Database).
pub trait Connection: fmt::Debug {
    /// Runs a query and returns every row.
    fn select(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<Vec<Row>>;

    /// Runs a statement and returns the number of affected rows.
    fn execute(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<usize>;

    /// Runs an insert and returns the generated identifier.
    fn insert_get_id(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<i64>;

    /// Runs arbitrary SQL with no result (DDL, transaction control).
    fn statement(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<()>;

    /// Runs a query and returns the first row, `None` when there is none.
    fn select_first(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<Option<Row>> {
        Ok(self.select(sql, bindings)?.into_iter().next())
    }

    /// Runs an insert and returns the number of inserted rows.
    fn insert(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<usize> {
        self.execute(sql, bindings)
    }

    /// Runs an update and returns the number of affected rows.
    fn update(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<usize> {
        self.execute(sql, bindings)
    }

    /// Runs a delete and returns the number of affected rows.
    fn delete(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<usize> {
        self.execute(sql, bindings)
    }
}

static DSN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):(.*)$").expect("valid DSN pattern"));

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern"));

/// Connection parameters taken from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConnectParams<'a> {
    pub dsn: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub options: &'a BTreeMap<String, String>,
}

/// Opens a connection for the given DSN.
///
/// The scheme before the first `:` picks the driver. Only `sqlite` is
/// bundled; other schemes fail with [`ConnectionError::Connect`].
pub fn connect(params: ConnectParams<'_>) -> ConnectionResult<Box<dyn Connection>> {
    let captures = DSN_PATTERN.captures(params.dsn).ok_or_else(|| ConnectionError::Connect {
        message: format!("malformed DSN \"{}\": missing driver scheme", params.dsn),
        source: None,
    })?;
    let scheme = captures[1].to_ascii_lowercase();
    let target = captures.get(2).map_or("", |m| m.as_str());

    match scheme.as_str() {
        "sqlite" => {
            if params.username.is_some() || params.password.is_some() {
                debug!("SQLite ignores the configured username and password");
            }
            let connection = SqliteConnection::open(target)?;
            connection.apply_options(params.options)?;
            Ok(Box::new(connection))
        }
        "mysql" | "pgsql" | "postgres" | "postgresql" => Err(ConnectionError::Connect {
            message: format!("no bundled connector for the \"{}\" scheme", scheme),
            source: None,
        }),
        _ => Err(ConnectionError::Connect {
            message: format!("unsupported DSN \"{}\"", params.dsn),
            source: None,
        }),
    }
}

/// Sorts a driver error into the connection error kinds.
pub(crate) fn classify(err: rusqlite::Error) -> ConnectionError {
    match &err {
        rusqlite::Error::InvalidParameterCount(..)
        | rusqlite::Error::InvalidParameterName(_)
        | rusqlite::Error::ToSqlConversionFailure(_) => ConnectionError::InvalidArgument {
            message: format!("invalid bound values: {}", err),
            source: Some(err),
        },
        _ => ConnectionError::Execution(err),
    }
}

/// Connection backed by a single `rusqlite` handle.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    path: Option<String>,
}

impl SqliteConnection {
    /// Opens a SQLite database.
    ///
    /// # Arguments
    ///
    /// * `target` - `:memory:`, a file path, or `//path` (URL form)
    pub fn open(target: &str) -> ConnectionResult<Self> {
        let target = target.strip_prefix("//").unwrap_or(target);
        if target.is_empty() {
            return Err(ConnectionError::Connect {
                message: "SQLite DSN has no database path".to_string(),
                source: None,
            });
        }

        let conn = if target == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(target)
        }
        .map_err(|e| ConnectionError::Connect {
            message: format!("failed to open SQLite database \"{}\": {}", target, e),
            source: Some(e),
        })?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| ConnectionError::Connect {
                message: format!("failed to initialize SQLite database: {}", e),
                source: Some(e),
            })?;

        debug!("Opened SQLite database {}", target);
        Ok(SqliteConnection {
            conn,
            path: (target != ":memory:").then(|| target.to_string()),
        })
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> ConnectionResult<Self> {
        Self::open(":memory:")
    }

    /// Wraps an already opened `rusqlite` connection.
    pub fn from_raw(conn: rusqlite::Connection) -> Self {
        let path = conn.path().filter(|p| !p.is_empty()).map(String::from);
        SqliteConnection { conn, path }
    }

    /// Path of the database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Applies driver options as `PRAGMA key = value`.
    fn apply_options(&self, options: &BTreeMap<String, String>) -> ConnectionResult<()> {
        for (key, value) in options {
            if !IDENTIFIER_PATTERN.is_match(key) {
                return Err(ConnectionError::Connect {
                    message: format!("invalid SQLite option name \"{}\"", key),
                    source: None,
                });
            }
            let result = match value.parse::<i64>() {
                Ok(number) => self.conn.pragma_update(None, key, number),
                Err(_) => self.conn.pragma_update(None, key, value),
            };
            result.map_err(|e| ConnectionError::Connect {
                message: format!("failed to apply SQLite option \"{}\": {}", key, e),
                source: Some(e),
            })?;
        }
        Ok(())
    }
}

/// Reads the current row into a [`Row`] keyed by column name.
fn read_row(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Row> {
    let mut values = Row::with_capacity(columns.len());
    for (i, name) in columns.iter().enumerate() {
        values.insert(name.clone(), Value::from(row.get_ref(i)?));
    }
    Ok(values)
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

impl Connection for SqliteConnection {
    fn select(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql).map_err(classify)?;
        let columns = column_names(&stmt);

        let rows = stmt
            .query_map(params_from_iter(bindings.iter()), |row| read_row(row, &columns))
            .map_err(classify)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(classify)?;

        Ok(rows)
    }

    // Steps only once, later rows are never evaluated.
    fn select_first(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<Option<Row>> {
        let mut stmt = self.conn.prepare(sql).map_err(classify)?;
        let columns = column_names(&stmt);

        let mut rows = stmt.query(params_from_iter(bindings.iter())).map_err(classify)?;
        match rows.next().map_err(classify)? {
            Some(row) => Ok(Some(read_row(row, &columns).map_err(classify)?)),
            None => Ok(None),
        }
    }

    fn execute(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<usize> {
        self.conn
            .execute(sql, params_from_iter(bindings.iter()))
            .map_err(classify)
    }

    fn insert_get_id(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<i64> {
        self.execute(sql, bindings)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn statement(&self, sql: &str, bindings: &[Value]) -> ConnectionResult<()> {
        if bindings.is_empty() {
            return self.conn.execute_batch(sql).map_err(classify);
        }

        // Any rows the statement yields are stepped through and discarded.
        let mut stmt = self.conn.prepare(sql).map_err(classify)?;
        let mut rows = stmt.query(params_from_iter(bindings.iter())).map_err(classify)?;
        while rows.next().map_err(classify)?.is_some() {}
        Ok(())
    }
}
