//! Querykit
//!
//! A thin database access layer: raw SQL execution with consistent error
//! translation, a fluent query builder compiled by per-dialect grammars, and
//! table prefixing applied at compile time.
//!
//! ```no_run
//! use querykit::prelude::*;
//!
//! let database = Database::create(&DatabaseConfig::new("sqlite::memory:").prefix("app_"))?;
//! database.statement("CREATE TABLE app_items (id INTEGER PRIMARY KEY, name TEXT)", &[])?;
//! let rows = database.table("items").where_eq("name", "Pen").get()?;
//! # Ok::<(), querykit::QuerykitError>(())
//! ```

// Core infrastructure modules
pub mod core;

// Query construction and compilation
pub mod builder;
pub mod grammar;

pub mod config;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod test_utils;

pub use crate::builder::{Clauses, QueryBuilder, Raw};
pub use crate::config::{load_config, DatabaseConfig};
pub use crate::core::db::{Database, Query};
pub use crate::core::{QuerykitError, Result, Row, Value};

/// Common imports for application code.
pub mod prelude {
    pub use crate::builder::{Clauses, Column, Direction, Expr, QueryBuilder, Raw};
    pub use crate::config::DatabaseConfig;
    pub use crate::core::db::{Database, Query};
    pub use crate::core::{QuerykitError, Result, Row, Value};
}
