//! SQLite grammar
//!
//! Double-quoted identifiers, `?` placeholders. SQLite needs a `LIMIT`
//! whenever an `OFFSET` is given and, as built by default, rejects
//! `ORDER BY`/`LIMIT` on updates and deletes.

use super::{quote_with, Driver, Grammar};

/// SQLite grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGrammar;

impl SqliteGrammar {
    /// Create a new SQLite grammar
    pub fn new() -> Self {
        Self
    }
}

impl Grammar for SqliteGrammar {
    fn dialect(&self) -> Driver {
        Driver::Sqlite
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_with(identifier, '"')
    }
}
