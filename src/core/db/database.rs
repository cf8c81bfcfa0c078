/// Database Module
///
/// The facade application code talks to: raw SQL execution with error
/// translation, and the factory for [`Query`] objects.

use crate::builder::{Clauses, TableRef, TablePrefixer};
use crate::config::DatabaseConfig;
use crate::core::db::connection::{self, ConnectParams, Connection, ConnectionResult};
use crate::core::db::query::Query;
use crate::core::error::{translate, Statement};
use crate::core::value::{Row, Value};
use crate::core::Result;
use crate::grammar::{create_grammar, CommonGrammar, Grammar};
use std::fmt;
use tracing::{debug, error, info};

/// A connection, a grammar and a table prefix.
///
/// The prefix is fixed at construction; build a new database to change it.
pub struct Database {
    connection: Box<dyn Connection>,
    grammar: Box<dyn Grammar>,
    prefixer: TablePrefixer,
}

impl Database {
    /// Opens a connection and selects a grammar from the configuration.
    ///
    /// # Errors
    ///
    /// Returns `QuerykitError::Database` if the connection cannot be
    /// established (unknown scheme, malformed DSN, driver failure).
    pub fn create(config: &DatabaseConfig) -> Result<Self> {
        let connection = connection::connect(ConnectParams {
            dsn: &config.dsn,
            username: config.username.as_deref(),
            password: config.password.as_deref(),
            options: &config.options,
        })
        .map_err(|e| translate(e, None))?;

        let driver = config.resolved_driver();
        info!("Created database with the {} grammar", driver.name());
        Ok(Database {
            connection,
            grammar: create_grammar(driver),
            prefixer: TablePrefixer::new(config.prefix.clone()),
        })
    }

    /// Wraps an existing connection with the common grammar and no prefix.
    pub fn new<C: Connection + 'static>(connection: C) -> Self {
        Self::with_grammar(connection, CommonGrammar::new(), "")
    }

    /// Wraps an existing connection with an explicit grammar and prefix.
    pub fn with_grammar<C, G, P>(connection: C, grammar: G, prefix: P) -> Self
    where
        C: Connection + 'static,
        G: Grammar + 'static,
        P: Into<String>,
    {
        Database {
            connection: Box::new(connection),
            grammar: Box::new(grammar),
            prefixer: TablePrefixer::new(prefix),
        }
    }

    pub fn connection(&self) -> &dyn Connection {
        self.connection.as_ref()
    }

    pub fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    pub fn prefixer(&self) -> &TablePrefixer {
        &self.prefixer
    }

    pub fn table_prefix(&self) -> &str {
        self.prefixer.prefix()
    }

    /// Returns `prefix + table`.
    pub fn add_table_prefix(&self, table: &str) -> String {
        self.prefixer.add_table_prefix(table)
    }

    /// Starts a query against `table`. The prefix is added when the query is
    /// compiled.
    pub fn table<T: Into<TableRef>>(&self, table: T) -> Query<'_> {
        Query::new(self).from_table(table)
    }

    /// Runs a select and returns every row.
    pub fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, bindings, |c| c.select(sql, bindings))
    }

    /// Runs a select and returns the first row, `None` when nothing matches.
    pub fn select_first(&self, sql: &str, bindings: &[Value]) -> Result<Option<Row>> {
        self.run(sql, bindings, |c| c.select_first(sql, bindings))
    }

    /// Runs an insert and returns the number of inserted rows.
    pub fn insert(&self, sql: &str, bindings: &[Value]) -> Result<usize> {
        self.run(sql, bindings, |c| c.insert(sql, bindings))
    }

    /// Runs an insert and returns the generated identifier.
    pub fn insert_get_id(&self, sql: &str, bindings: &[Value]) -> Result<i64> {
        self.run(sql, bindings, |c| c.insert_get_id(sql, bindings))
    }

    /// Runs an update and returns the number of affected rows.
    pub fn update(&self, sql: &str, bindings: &[Value]) -> Result<usize> {
        self.run(sql, bindings, |c| c.update(sql, bindings))
    }

    /// Runs a delete and returns the number of affected rows.
    pub fn delete(&self, sql: &str, bindings: &[Value]) -> Result<usize> {
        self.run(sql, bindings, |c| c.delete(sql, bindings))
    }

    /// Runs arbitrary SQL (DDL, transaction control) with no result.
    pub fn statement(&self, sql: &str, bindings: &[Value]) -> Result<()> {
        self.run(sql, bindings, |c| c.statement(sql, bindings))
    }

    fn run<T, F>(&self, sql: &str, bindings: &[Value], execute: F) -> Result<T>
    where
        F: FnOnce(&dyn Connection) -> ConnectionResult<T>,
    {
        debug!("Executing SQL ({} bound values): {}", bindings.len(), sql);
        execute(self.connection.as_ref()).map_err(|e| {
            error!("Statement failed: {}", e);
            translate(
                e,
                Some(Statement {
                    sql,
                    values: bindings,
                }),
            )
        })
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("connection", &self.connection)
            .field("grammar", &self.grammar)
            .field("prefix", &self.prefixer.prefix())
            .finish()
    }
}
