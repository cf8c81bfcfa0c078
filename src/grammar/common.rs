//! Dialect-neutral grammar
//!
//! Standard SQL with double-quoted identifiers and `?` placeholders. Used when
//! no driver is configured or the configured one is not recognized.

use super::{quote_with, Driver, Grammar};

/// Common grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonGrammar;

impl CommonGrammar {
    /// Create a new common grammar
    pub fn new() -> Self {
        Self
    }
}

impl Grammar for CommonGrammar {
    fn dialect(&self) -> Driver {
        Driver::Common
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_with(identifier, '"')
    }
}
