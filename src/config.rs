use crate::backend::database::DatabaseBackendConfig;
use crate::error::{AppError, AppResult};
use crate::password::HashEngine;
use crate::query::{ColumnMapping, QueryTemplateSet, RawTemplates, Rdbms};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref ENV_VAR: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").unwrap();
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub realms: Vec<RealmConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// One configured user directory
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RealmConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queries: QueriesConfig,
    #[serde(default)]
    pub allow_delete: bool,
    #[serde(default)]
    pub allow_overwrite: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub rdbms: Rdbms,
    pub url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    30
}

/// Administrator SQL; blank count and find-by queries derive from `base`
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct QueriesConfig {
    pub base: String,
    pub count: String,
    pub find_by_id: String,
    pub find_by_username: String,
    pub find_by_email: String,
    pub columns_mapping: Vec<String>,
    pub find_password_hash: String,
    pub hash_function: String,
    pub update_password: String,
}

impl Default for QueriesConfig {
    fn default() -> Self {
        Self {
            base: "select {columns} from users where {filters}".to_string(),
            count: String::new(),
            find_by_id: String::new(),
            find_by_username: String::new(),
            find_by_email: String::new(),
            columns_mapping: [
                "id=my_id_column",
                "username=my_username_column",
                "firstName=my_first_name_column",
                "lastName=my_last_name_column",
                "email=my_email_column",
                "locale=my_locale_column",
                "EMAIL_VERIFIED=my_email_verified_column",
                "ENABLED=my_enabled_column",
                "CREATED_TIMESTAMP=my_created_timestamp_column",
            ]
            .iter()
            .map(|entry| entry.to_string())
            .collect(),
            find_password_hash: "select hash_pwd from users where \"username\" = ?".to_string(),
            hash_function: "SHA-1".to_string(),
            update_password: String::new(),
        }
    }
}

fn optional(template: &str) -> Option<String> {
    Some(template.to_string()).filter(|t| !t.trim().is_empty())
}

impl RealmConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn backend_config(&self) -> DatabaseBackendConfig {
        DatabaseBackendConfig::new(self.database.rdbms, self.database.url.clone())
            .with_credentials(self.database.user.clone(), self.database.password.clone())
            .with_max_connections(self.database.max_connections)
            .with_connection_timeout(self.database.connection_timeout)
    }

    /// Compile the realm's templates; an unknown hash function fails here
    pub fn query_templates(&self) -> AppResult<QueryTemplateSet> {
        let queries = &self.queries;
        let hash_engine = HashEngine::from_name(&queries.hash_function)?;

        let raw = RawTemplates {
            base: queries.base.clone(),
            count: optional(&queries.count),
            find_by_id: optional(&queries.find_by_id),
            find_by_username: optional(&queries.find_by_username),
            find_by_email: optional(&queries.find_by_email),
            find_password_hash: queries.find_password_hash.clone(),
            update_password: optional(&queries.update_password),
        };

        Ok(QueryTemplateSet::new(
            raw,
            ColumnMapping::parse(&queries.columns_mapping),
            hash_engine,
            self.database.rdbms,
            self.allow_delete,
            self.allow_overwrite,
        ))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::Configuration("Realm id cannot be empty".to_string()));
        }
        self.backend_config()
            .validate()
            .map_err(|e| AppError::Configuration(format!("Realm {}: {}", self.id, e)))?;
        self.query_templates().map_err(|e| match e {
            AppError::Configuration(message) => {
                AppError::Configuration(format!("Realm {}: {}", self.id, message))
            }
            e => e,
        })?;
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, String> {
        let path = config_path.as_ref();

        if !path.exists() {
            return Err(format!("Configuration file not found: {}", path.display()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        Self::from_yaml(&content)
            .map_err(|e| format!("Failed to load config file {}: {}", path.display(), e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        let expanded = Self::expand_env_vars(content)?;
        let app_config: AppConfig =
            serde_yaml::from_str(&expanded).map_err(|e| format!("Invalid YAML: {}", e))?;

        app_config.validate().map_err(|e| e.to_string())?;
        Ok(app_config)
    }

    /// Zero-config mode: one realm on an empty in-memory SQLite database
    ///
    /// A placeholder. The default queries name a `users` table the database
    /// does not have, so reads answer empty.
    pub fn default_config() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            realms: vec![RealmConfig {
                id: "default".to_string(),
                name: Some("In-memory users".to_string()),
                database: DatabaseConfig {
                    rdbms: Rdbms::Sqlite,
                    url: "sqlite::memory:".to_string(),
                    user: None,
                    password: None,
                    max_connections: 1,
                    connection_timeout: default_connection_timeout(),
                },
                queries: QueriesConfig::default(),
                allow_delete: false,
                allow_overwrite: false,
            }],
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.realms.is_empty() {
            return Err(AppError::Configuration(
                "Configuration must contain at least one realm".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for realm in &self.realms {
            if !seen.insert(realm.id.as_str()) {
                return Err(AppError::Configuration(format!(
                    "Duplicate realm id: {}",
                    realm.id
                )));
            }
            realm.validate()?;
        }
        Ok(())
    }

    pub fn find_realm(&self, id: &str) -> Option<&RealmConfig> {
        self.realms.iter().find(|realm| realm.id == id)
    }

    /// Expand `${VAR}` and `${VAR:-default}` references
    fn expand_env_vars(content: &str) -> Result<String, String> {
        let mut expanded = String::with_capacity(content.len());
        let mut last = 0;

        for caps in ENV_VAR.captures_iter(content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = match (std::env::var(name.as_str()), caps.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.as_str().to_string(),
                (Err(_), None) => {
                    return Err(format!(
                        "Environment variable {} not found and no default provided",
                        name.as_str()
                    ))
                }
            };
            expanded.push_str(&content[last..whole.start()]);
            expanded.push_str(&value);
            last = whole.end();
        }

        expanded.push_str(&content[last..]);
        Ok(expanded)
    }
}
