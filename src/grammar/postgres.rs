//! PostgreSQL grammar
//!
//! Double-quoted identifiers and numbered `$n` placeholders. An `OFFSET` may
//! appear without a `LIMIT`.

use super::{check_row_count, quote_with, CompileError, Driver, Grammar};

/// PostgreSQL grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresGrammar;

impl PostgresGrammar {
    /// Create a new PostgreSQL grammar
    pub fn new() -> Self {
        Self
    }
}

impl Grammar for PostgresGrammar {
    fn dialect(&self) -> Driver {
        Driver::Postgres
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_with(identifier, '"')
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn compile_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Result<String, CompileError> {
        check_row_count("LIMIT", limit)?;
        check_row_count("OFFSET", offset)?;

        let mut sql = String::new();
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        Ok(sql)
    }
}
