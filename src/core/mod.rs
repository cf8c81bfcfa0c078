/// Core Module for Querykit
///
/// This module contains the pieces every query runs through: the database
/// facade and its connections, the error hierarchy, and the value model
/// shared by bindings and result rows.

pub mod db;
pub mod error;
pub mod value;

// Re-export commonly used types for convenience
pub use error::{QuerykitError, Result};
pub use value::{Row, Value};
