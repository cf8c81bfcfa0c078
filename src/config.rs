use crate::core::{QuerykitError, Result};
use crate::grammar::Driver;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Database configuration, usually parsed from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Dialect name selecting the grammar (`mysql`, `sqlite`, `postgres`, ...)
    pub driver: Option<String>,
    /// Connection string, e.g. `sqlite::memory:`. `dns` is accepted as well.
    #[serde(alias = "dns")]
    pub dsn: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Driver-specific options. SQLite applies each entry as a PRAGMA.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// String prepended to every table name
    #[serde(default)]
    pub prefix: String,
}

impl DatabaseConfig {
    /// Creates a configuration with only a DSN set.
    pub fn new<S: Into<String>>(dsn: S) -> Self {
        DatabaseConfig {
            dsn: dsn.into(),
            ..Self::default()
        }
    }

    pub fn driver<S: Into<String>>(mut self, driver: S) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn credentials<U: Into<String>, P: Into<String>>(mut self, username: U, password: P) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn option<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The dialect the configured driver name resolves to.
    pub fn resolved_driver(&self) -> Driver {
        Driver::from_name(self.driver.as_deref())
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| QuerykitError::InvalidArgument {
            message: format!("invalid database configuration: {}", e),
            source: Some(Box::new(e)),
        })
    }
}

/// Loads a database configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = querykit::config::load_config("database.toml").expect("Failed to load config");
/// let database = querykit::Database::create(&config).expect("Failed to connect");
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DatabaseConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| QuerykitError::InvalidArgument {
        message: format!("cannot read configuration file {}: {}", path.display(), e),
        source: Some(Box::new(e)),
    })?;
    DatabaseConfig::from_toml_str(&content)
}
