/// Database Module
///
/// The database layer is split into three concerns:
/// - **Connection** (`connection.rs`): the raw execution contract and the
///   SQLite implementation of it
/// - **Database** (`database.rs`): the facade that owns a connection, a
///   grammar and a table prefix, and translates errors
/// - **Query** (`query.rs`): builder state bound to a database, with the
///   execution methods
///
/// ## Error Handling
///
/// Every public operation returns the crate-wide `QuerykitError`.
pub mod connection;
pub mod database;
pub mod query;

pub use connection::{connect, ConnectParams, Connection, ConnectionError, ConnectionResult, SqliteConnection};
pub use database::Database;
pub use query::Query;
