#![allow(dead_code)]

use axum::Router;
use sql_user_directory::backend::ConnectionSource;
use sql_user_directory::config::{AppConfig, DatabaseConfig, QueriesConfig, RealmConfig, ServerConfig};
use sql_user_directory::password::HashEngine;
use sql_user_directory::provider::ProviderRegistry;
use sql_user_directory::query::Rdbms;
use sql_user_directory::resource;
use std::sync::Arc;

pub const HASH_FUNCTION: &str = "SHA-256";

/// Realm with write-back and deletes enabled
pub const ACME: &str = "acme";
/// Realm without an update template
pub const LEGACY: &str = "legacy";

/// (id, login, first name, last name, email, password)
pub const USERS: [(i64, &str, &str, &str, Option<&str>, Option<&str>); 4] = [
    (1, "ALICE", "Alice", "Anderson", Some("alice@example.com"), Some("alice-secret")),
    (2, "BOB_1", "Bob", "Brown", Some("bob@example.com"), Some("bob-secret")),
    (3, "BOBBY", "Robert", "Bobson", None, None),
    (4, "CAROL", "Carol", "Bob%", Some("carol@example.com"), Some("carol-secret")),
];

pub fn test_realm(id: &str, update_password: &str, allow_delete: bool) -> RealmConfig {
    RealmConfig {
        id: id.to_string(),
        name: Some(format!("{} users", id)),
        database: DatabaseConfig {
            rdbms: Rdbms::Sqlite,
            url: "sqlite::memory:".to_string(),
            user: None,
            password: None,
            max_connections: 1,
            connection_timeout: 5,
        },
        queries: QueriesConfig {
            columns_mapping: vec![
                "id=user_id".to_string(),
                "username=login".to_string(),
                "firstName=first_name".to_string(),
                "lastName=last_name".to_string(),
                "email=mail".to_string(),
            ],
            find_password_hash: "select hash_pwd from users where login = ?".to_string(),
            hash_function: HASH_FUNCTION.to_string(),
            update_password: update_password.to_string(),
            ..QueriesConfig::default()
        },
        allow_delete,
        allow_overwrite: false,
    }
}

pub fn create_test_app_config() -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        realms: vec![
            test_realm(ACME, "update users set hash_pwd = ? where login = ?", true),
            test_realm(LEGACY, "", false),
        ],
    }
}

/// Create the users table through the realm's own pool and fill it
pub async fn seed_realm(
    registry: &ProviderRegistry,
    realm_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let instance = registry.get_or_configure(realm_id).await?;
    let engine = HashEngine::from_name(HASH_FUNCTION)?;
    let mut conn = instance.data_source().acquire().await?;

    conn.execute(
        "create table users (
            user_id integer primary key,
            login text not null,
            first_name text,
            last_name text,
            mail text,
            hash_pwd text
        )",
        &[],
    )
    .await?;

    for (id, login, first_name, last_name, email, password) in USERS {
        let hash = password.map(|p| engine.hash(p)).transpose()?;
        conn.execute(
            "insert into users (user_id, login, first_name, last_name, mail, hash_pwd) values (?, ?, ?, ?, ?, ?)",
            &[
                id.to_string(),
                login.to_string(),
                first_name.to_string(),
                last_name.to_string(),
                email.unwrap_or_default().to_string(),
                hash.unwrap_or_default(),
            ],
        )
        .await?;
    }

    // the connection layer binds strings only
    conn.execute("update users set mail = null where mail = ''", &[])
        .await?;
    conn.execute("update users set hash_pwd = null where hash_pwd = ''", &[])
        .await?;
    Ok(())
}

/// Registry over in-memory SQLite realms, seeded with `USERS`
pub async fn setup_test_registry() -> Result<Arc<ProviderRegistry>, Box<dyn std::error::Error>> {
    let registry = Arc::new(ProviderRegistry::new(&create_test_app_config()));
    seed_realm(&registry, ACME).await?;
    seed_realm(&registry, LEGACY).await?;
    Ok(registry)
}

pub async fn setup_test_app() -> Result<Router, Box<dyn std::error::Error>> {
    let registry = setup_test_registry().await?;
    Ok(resource::router(registry))
}
