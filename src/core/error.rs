/// Querykit Error Module
///
/// This module defines the error hierarchy exposed to application code and the
/// single routine that translates collaborator errors (grammar compile errors
/// and connection errors) into it.
use crate::core::db::connection::ConnectionError;
use crate::core::value::{render_values, Value};
use crate::grammar::CompileError;
use thiserror::Error;

/// Boxed error used for chained causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for every public operation of the crate.
///
/// Recognized collaborator errors are rewrapped with the original kept as
/// `source()`. Anything else arrives as [`QuerykitError::Other`] untouched.
#[derive(Error, Debug)]
pub enum QuerykitError {
    /// The database rejected or failed to execute a statement, or the
    /// connection could not be established.
    #[error("{}", database_message(.message, .query.as_deref(), .values))]
    Database {
        message: String,
        query: Option<String>,
        values: Vec<Value>,
        #[source]
        source: Option<BoxError>,
    },

    /// The accumulated query cannot be compiled by the grammar.
    #[error("{message}")]
    IncorrectQuery {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The caller supplied a malformed argument.
    #[error("{message}")]
    InvalidArgument {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// An operation produced a value its contract forbids.
    #[error("{message}")]
    InvalidReturnValue {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// An error no translation rule recognizes, passed through unchanged.
    #[error(transparent)]
    Other(BoxError),
}

/// Type alias for Result to use QuerykitError as the error type.
pub type Result<T> = std::result::Result<T, QuerykitError>;

impl QuerykitError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        QuerykitError::InvalidArgument {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn invalid_return_value(message: impl Into<String>) -> Self {
        QuerykitError::InvalidReturnValue {
            message: message.into(),
            source: None,
        }
    }

    /// The failing SQL text, for execution errors that carry one.
    pub fn query(&self) -> Option<&str> {
        match self {
            QuerykitError::Database { query, .. } => query.as_deref(),
            _ => None,
        }
    }

    /// The values bound to the failing statement. Empty for other kinds.
    pub fn values(&self) -> &[Value] {
        match self {
            QuerykitError::Database { values, .. } => values,
            _ => &[],
        }
    }
}

fn database_message(message: &str, query: Option<&str>, values: &[Value]) -> String {
    match query {
        Some(query) => format!(
            "{}; SQL query: ({}); bound values: {}",
            message,
            query,
            render_values(values)
        ),
        None => message.to_string(),
    }
}

/// A raw error coming from one of the two collaborators.
#[derive(Debug)]
pub(crate) enum Failure {
    Compile(CompileError),
    Connection(ConnectionError),
}

impl From<CompileError> for Failure {
    fn from(err: CompileError) -> Self {
        Failure::Compile(err)
    }
}

impl From<ConnectionError> for Failure {
    fn from(err: ConnectionError) -> Self {
        Failure::Connection(err)
    }
}

/// The statement that was running when a failure happened.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Statement<'a> {
    pub sql: &'a str,
    pub values: &'a [Value],
}

/// Translates a collaborator error, applying in order: argument errors,
/// query validity errors, execution errors, pass-through.
pub(crate) fn translate(failure: impl Into<Failure>, statement: Option<Statement<'_>>) -> QuerykitError {
    match failure.into() {
        Failure::Compile(err @ CompileError::InvalidArgument(_)) => QuerykitError::InvalidArgument {
            message: err.to_string(),
            source: Some(Box::new(err)),
        },
        Failure::Connection(err @ ConnectionError::InvalidArgument { .. }) => {
            QuerykitError::InvalidArgument {
                message: err.to_string(),
                source: Some(Box::new(err)),
            }
        }
        Failure::Compile(err @ CompileError::InvalidQuery(_)) => QuerykitError::IncorrectQuery {
            message: err.to_string(),
            source: Some(Box::new(err)),
        },
        Failure::Connection(err @ (ConnectionError::Execution(_) | ConnectionError::Connect { .. })) => {
            QuerykitError::Database {
                message: err.to_string(),
                query: statement.map(|s| s.sql.to_string()),
                values: statement.map(|s| s.values.to_vec()).unwrap_or_default(),
                source: Some(Box::new(err)),
            }
        }
        Failure::Compile(CompileError::Other(err)) | Failure::Connection(ConnectionError::Other(err)) => {
            QuerykitError::Other(err)
        }
    }
}
