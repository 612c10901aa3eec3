use crate::error::{AppError, AppResult};
use crate::query::Rdbms;
use url::Url;

/// Connection settings for one user database
#[derive(Debug, Clone)]
pub struct DatabaseBackendConfig {
    /// Database family; decides paging syntax and the connection test query
    pub rdbms: Rdbms,

    /// Connection URL
    /// Examples:
    /// - PostgreSQL: "postgres://localhost/users"
    /// - MySQL: "mysql://localhost:3306/users"
    /// - SQLite: "sqlite:./users.db" or "sqlite::memory:"
    pub connection_url: String,

    /// Injected into the URL when set
    pub user: Option<String>,
    pub password: Option<String>,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout: u64,
}

impl DatabaseBackendConfig {
    pub fn new(rdbms: Rdbms, connection_url: String) -> Self {
        Self {
            rdbms,
            connection_url,
            user: None,
            password: None,
            max_connections: 10,
            connection_timeout: 30,
        }
    }

    /// In-memory SQLite database, one shared connection
    pub fn memory_sqlite() -> Self {
        Self::new(Rdbms::Sqlite, "sqlite::memory:".to_string()).with_max_connections(1)
    }

    pub fn with_credentials(mut self, user: Option<String>, password: Option<String>) -> Self {
        self.user = user.filter(|u| !u.is_empty());
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_connection_timeout(mut self, timeout_seconds: u64) -> Self {
        self.connection_timeout = timeout_seconds;
        self
    }

    pub fn is_memory_database(&self) -> bool {
        self.rdbms == Rdbms::Sqlite && self.connection_url.contains(":memory:")
    }

    /// Families with a driver linked into this build
    pub fn is_executable(&self) -> bool {
        matches!(self.rdbms, Rdbms::PostgreSql | Rdbms::MySql | Rdbms::Sqlite)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.connection_url.is_empty() {
            return Err("Connection URL cannot be empty".to_string());
        }

        if self.max_connections == 0 {
            return Err("Max connections must be greater than 0".to_string());
        }

        let scheme = self
            .connection_url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();
        let schemes = self.rdbms.url_schemes();
        if !schemes.contains(&scheme.as_str()) {
            return Err(format!(
                "{} connection URL must start with one of: {}",
                self.rdbms,
                schemes
                    .iter()
                    .map(|s| format!("'{}:'", s))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        Ok(())
    }

    /// URL handed to the driver, with configured credentials applied
    pub fn connect_url(&self) -> AppResult<String> {
        if self.user.is_none() && self.password.is_none() {
            return Ok(self.connection_url.clone());
        }
        if self.rdbms == Rdbms::Sqlite {
            return Err(AppError::Configuration(
                "SQLite connections do not take a user or password".to_string(),
            ));
        }

        let mut url = Url::parse(&self.connection_url)
            .map_err(|e| AppError::Configuration(format!("Invalid connection URL: {}", e)))?;
        if let Some(user) = &self.user {
            url.set_username(user).map_err(|_| {
                AppError::Configuration("Connection URL cannot carry a user".to_string())
            })?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password)).map_err(|_| {
                AppError::Configuration("Connection URL cannot carry a password".to_string())
            })?;
        }
        Ok(url.to_string())
    }
}

impl Default for DatabaseBackendConfig {
    fn default() -> Self {
        Self::memory_sqlite()
    }
}
