//! SQL grammars
//!
//! A grammar turns a [`QueryBuilder`] into SQL text plus the ordered values
//! for its placeholders. The shared compilation lives in `compiler`; each
//! dialect only overrides identifier quoting, placeholders, limit syntax and
//! the clauses it allows on writes.

mod compiler;
pub mod common;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use common::CommonGrammar;
pub use mysql::MySqlGrammar;
pub use postgres::PostgresGrammar;
pub use sqlite::SqliteGrammar;

use crate::builder::QueryBuilder;
use crate::core::error::BoxError;
use crate::core::value::Value;
use compiler::Compiler;
use std::fmt;
use thiserror::Error;

/// Errors raised while compiling a query.
#[derive(Error, Debug)]
pub enum CompileError {
    /// A clause argument is malformed (unknown operator, empty identifier)
    #[error("{0}")]
    InvalidArgument(String),

    /// The clauses do not form a valid statement for this dialect
    #[error("{0}")]
    InvalidQuery(String),

    /// Raised by third-party grammars for anything else
    #[error(transparent)]
    Other(BoxError),
}

/// SQL text plus its bound values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

/// Largest `LIMIT` or `OFFSET` a grammar emits. Databases read both as
/// signed 64-bit integers.
pub const MAX_ROW_COUNT: u64 = i64::MAX as u64;

/// Rejects a `LIMIT` or `OFFSET` above [`MAX_ROW_COUNT`].
pub fn check_row_count(clause: &str, count: Option<u64>) -> Result<(), CompileError> {
    match count {
        Some(count) if count > MAX_ROW_COUNT => Err(CompileError::InvalidArgument(format!(
            "{} {} exceeds the maximum of {}",
            clause, count, MAX_ROW_COUNT
        ))),
        _ => Ok(()),
    }
}

/// Database dialects with a bundled grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// Dialect-neutral SQL
    Common,
    MySql,
    Sqlite,
    Postgres,
}

impl Driver {
    /// Resolves a configured driver name, case-insensitively. Unknown or
    /// missing names fall back to [`Driver::Common`].
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("mysql") | Some("mariadb") => Driver::MySql,
            Some("sqlite") | Some("sqlite3") => Driver::Sqlite,
            Some("postgres") | Some("postgresql") | Some("pgsql") => Driver::Postgres,
            _ => Driver::Common,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Driver::Common => "common",
            Driver::MySql => "mysql",
            Driver::Sqlite => "sqlite",
            Driver::Postgres => "postgres",
        }
    }
}

/// Creates the grammar for a driver.
pub fn create_grammar(driver: Driver) -> Box<dyn Grammar> {
    match driver {
        Driver::Common => Box::new(CommonGrammar::new()),
        Driver::MySql => Box::new(MySqlGrammar::new()),
        Driver::Sqlite => Box::new(SqliteGrammar::new()),
        Driver::Postgres => Box::new(PostgresGrammar::new()),
    }
}

/// Dialect-specific SQL generation.
pub trait Grammar: fmt::Debug {
    /// The dialect this grammar targets.
    fn dialect(&self) -> Driver;

    /// Quotes an identifier, handling `table.column` and `*`.
    fn quote_identifier(&self, identifier: &str) -> String;

    /// Placeholder for the bound value at `position` (1-based).
    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    /// Generates the `LIMIT`/`OFFSET` tail, with a leading space when not empty.
    ///
    /// The default requires a limit whenever an offset is set.
    fn compile_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Result<String, CompileError> {
        check_row_count("LIMIT", limit)?;
        check_row_count("OFFSET", offset)?;
        match (limit, offset) {
            (None, None) => Ok(String::new()),
            (Some(limit), None) => Ok(format!(" LIMIT {}", limit)),
            (Some(limit), Some(offset)) => Ok(format!(" LIMIT {} OFFSET {}", limit, offset)),
            (None, Some(_)) => Err(CompileError::InvalidQuery(format!(
                "the {} grammar does not support an offset without a limit",
                self.dialect().name()
            ))),
        }
    }

    /// Whether `ORDER BY` and `LIMIT` are allowed on updates and deletes.
    fn supports_ordered_writes(&self) -> bool {
        false
    }

    fn compile_select(&self, query: &QueryBuilder) -> Result<CompiledQuery, CompileError> {
        let mut compiler = Compiler::new(self);
        let sql = compiler.select(query)?;
        Ok(compiler.finish(sql))
    }

    fn compile_update(&self, query: &QueryBuilder) -> Result<CompiledQuery, CompileError> {
        let mut compiler = Compiler::new(self);
        let sql = compiler.update(query)?;
        Ok(compiler.finish(sql))
    }

    fn compile_delete(&self, query: &QueryBuilder) -> Result<CompiledQuery, CompileError> {
        let mut compiler = Compiler::new(self);
        let sql = compiler.delete(query)?;
        Ok(compiler.finish(sql))
    }
}

/// Wraps each dot-separated part of `identifier` in `quote`, doubling any
/// embedded quote characters. `*` parts are left bare.
pub fn quote_with(identifier: &str, quote: char) -> String {
    identifier
        .split('.')
        .map(|part| {
            if part == "*" {
                part.to_string()
            } else {
                let escaped = part.replace(quote, &format!("{}{}", quote, quote));
                format!("{}{}{}", quote, escaped, quote)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
