//! MySQL grammar
//!
//! Backtick-quoted identifiers, `?` placeholders. MySQL accepts `ORDER BY`
//! and `LIMIT` (without offset) on updates and deletes.

use super::{quote_with, Driver, Grammar};

/// MySQL / MariaDB grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlGrammar;

impl MySqlGrammar {
    /// Create a new MySQL grammar
    pub fn new() -> Self {
        Self
    }
}

impl Grammar for MySqlGrammar {
    fn dialect(&self) -> Driver {
        Driver::MySql
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_with(identifier, '`')
    }

    fn supports_ordered_writes(&self) -> bool {
        true
    }
}
