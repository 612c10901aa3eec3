use super::config::DatabaseBackendConfig;
use crate::backend::{ConnectionSource, DirectoryConnection, SqlRow};
use crate::error::{AppError, AppResult};
use crate::query::Rdbms;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::{MySql, MySqlPool, MySqlRow};
use sqlx::pool::{PoolConnection, PoolOptions};
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use sqlx::{Column, ColumnIndex, Database, Decode, Encode, Row, Type};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Native pool for one of the linked database families
#[derive(Clone)]
enum DirectoryPool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl DirectoryPool {
    async fn connect(config: &DatabaseBackendConfig) -> AppResult<Self> {
        let url = config.connect_url()?;
        let pool = match config.rdbms {
            Rdbms::PostgreSql => pool_options::<Postgres>(config)
                .connect(&url)
                .await
                .map(Self::Postgres),
            Rdbms::MySql => pool_options::<MySql>(config)
                .connect(&url)
                .await
                .map(Self::MySql),
            Rdbms::Sqlite => pool_options::<Sqlite>(config)
                .connect(&url)
                .await
                .map(Self::Sqlite),
            other => {
                return Err(AppError::Configuration(format!(
                    "No database driver available for {}",
                    other
                )))
            }
        };
        pool.map_err(|e| AppError::Database(format!("Failed to connect to {}: {}", config.rdbms, e)))
    }

    async fn acquire(&self) -> Result<PooledConnection, sqlx::Error> {
        Ok(match self {
            Self::Postgres(pool) => PooledConnection::Postgres(pool.acquire().await?),
            Self::MySql(pool) => PooledConnection::MySql(pool.acquire().await?),
            Self::Sqlite(pool) => PooledConnection::Sqlite(pool.acquire().await?),
        })
    }

    async fn close(&self) {
        match self {
            Self::Postgres(pool) => pool.close().await,
            Self::MySql(pool) => pool.close().await,
            Self::Sqlite(pool) => pool.close().await,
        }
    }
}

/// Pool settings shared by every family
///
/// An in-memory SQLite database lives only as long as its connection, so
/// those pools never retire idle or aged connections.
fn pool_options<DB: Database>(config: &DatabaseBackendConfig) -> PoolOptions<DB> {
    let options = PoolOptions::<DB>::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout))
        .test_before_acquire(true);
    if config.is_memory_database() {
        options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options
    }
}

struct ActivePool {
    name: String,
    pool: DirectoryPool,
    rdbms: Rdbms,
}

/// Swappable sqlx pool for one configured directory
///
/// `configure` validates a new pool before publishing it. The pool it
/// replaces is closed on a background task, so checked-out connections finish
/// their work first.
#[derive(Default)]
pub struct DataSourceProvider {
    active: RwLock<Option<ActivePool>>,
}

impl DataSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open, test and publish a pool for `config`
    pub async fn configure(&self, realm_name: &str, config: &DatabaseBackendConfig) -> AppResult<()> {
        config
            .validate()
            .map_err(|e| AppError::Configuration(format!("Invalid database config: {}", e)))?;
        if !config.is_executable() {
            return Err(AppError::Configuration(format!(
                "No database driver available for {}",
                config.rdbms
            )));
        }

        let name = format!(
            "{} {}",
            realm_name,
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f")
        );
        let pool = DirectoryPool::connect(config).await?;

        if let Err(e) = Self::test_connection(&pool, config.rdbms).await {
            pool.close().await;
            return Err(e);
        }

        info!(pool = %name, rdbms = %config.rdbms, "Data source configured");

        let previous = self.active.write().await.replace(ActivePool {
            name,
            pool,
            rdbms: config.rdbms,
        });
        if let Some(previous) = previous {
            Self::close_in_background(previous);
        }
        Ok(())
    }

    async fn test_connection(pool: &DirectoryPool, rdbms: Rdbms) -> AppResult<()> {
        let conn = pool
            .acquire()
            .await
            .map_err(|e| AppError::Database(format!("Failed to acquire connection: {}", e)))?;
        let mut conn = SqlxConnection { conn, rdbms };
        conn.fetch_all(rdbms.test_query(), &[])
            .await
            .map_err(|e| AppError::Database(format!("Connection test query failed: {}", e)))?;
        Ok(())
    }

    pub async fn is_configured(&self) -> bool {
        self.active.read().await.is_some()
    }

    pub async fn rdbms(&self) -> Option<Rdbms> {
        self.active.read().await.as_ref().map(|active| active.rdbms)
    }

    /// Close the current pool, waiting for checked-out connections
    pub async fn close(&self) {
        let previous = self.active.write().await.take();
        if let Some(previous) = previous {
            previous.pool.close().await;
            info!(pool = %previous.name, "Data source closed");
        }
    }

    fn close_in_background(previous: ActivePool) {
        tokio::spawn(async move {
            previous.pool.close().await;
            info!(pool = %previous.name, "Replaced data source closed");
        });
    }
}

#[async_trait]
impl ConnectionSource for DataSourceProvider {
    async fn acquire(&self) -> AppResult<Box<dyn DirectoryConnection>> {
        let (pool, rdbms) = {
            let active = self.active.read().await;
            let active = active
                .as_ref()
                .ok_or_else(|| AppError::Unavailable("No data source configured".to_string()))?;
            (active.pool.clone(), active.rdbms)
        };

        let conn = pool.acquire().await.map_err(|e| match e {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                AppError::Unavailable(format!("Failed to acquire connection: {}", e))
            }
            e => AppError::Database(format!("Failed to acquire connection: {}", e)),
        })?;

        Ok(Box::new(SqlxConnection { conn, rdbms }))
    }
}

enum PooledConnection {
    Postgres(PoolConnection<Postgres>),
    MySql(PoolConnection<MySql>),
    Sqlite(PoolConnection<Sqlite>),
}

struct SqlxConnection {
    conn: PooledConnection,
    rdbms: Rdbms,
}

fn bind_params<'q, DB>(
    query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    params: &[String],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    String: Encode<'q, DB> + Type<DB>,
{
    params
        .iter()
        .fold(query, |query, param| query.bind(param.clone()))
}

#[async_trait]
impl DirectoryConnection for SqlxConnection {
    async fn fetch_all(&mut self, sql: &str, params: &[String]) -> AppResult<Vec<SqlRow>> {
        let sql = self.rdbms.bind_markers(sql);
        let rows = match &mut self.conn {
            PooledConnection::Postgres(conn) => bind_params::<Postgres>(sqlx::query(&sql), params)
                .fetch_all(&mut **conn)
                .await
                .map(|rows| rows.iter().map(|row| to_sql_row(row, pg_value)).collect::<Vec<_>>()),
            PooledConnection::MySql(conn) => bind_params::<MySql>(sqlx::query(&sql), params)
                .fetch_all(&mut **conn)
                .await
                .map(|rows| rows.iter().map(|row| to_sql_row(row, mysql_value)).collect()),
            PooledConnection::Sqlite(conn) => bind_params::<Sqlite>(sqlx::query(&sql), params)
                .fetch_all(&mut **conn)
                .await
                .map(|rows| rows.iter().map(|row| to_sql_row(row, sqlite_value)).collect()),
        }
        .map_err(|e| AppError::Database(format!("Query failed: {}", e)))?;
        debug!(rows = rows.len(), "Fetched rows");
        Ok(rows)
    }

    async fn execute(&mut self, sql: &str, params: &[String]) -> AppResult<u64> {
        let sql = self.rdbms.bind_markers(sql);
        let affected = match &mut self.conn {
            PooledConnection::Postgres(conn) => bind_params::<Postgres>(sqlx::query(&sql), params)
                .execute(&mut **conn)
                .await
                .map(|result| result.rows_affected()),
            PooledConnection::MySql(conn) => bind_params::<MySql>(sqlx::query(&sql), params)
                .execute(&mut **conn)
                .await
                .map(|result| result.rows_affected()),
            PooledConnection::Sqlite(conn) => bind_params::<Sqlite>(sqlx::query(&sql), params)
                .execute(&mut **conn)
                .await
                .map(|result| result.rows_affected()),
        }
        .map_err(|e| AppError::Database(format!("Statement failed: {}", e)))?;
        Ok(affected)
    }
}

/// `None` when the column is not of type `T`, `Some(None)` for SQL NULL
fn decode_text<'r, R, T>(row: &'r R, index: usize) -> Option<Option<String>>
where
    R: Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database> + ToString,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .map(|value| value.map(|v| v.to_string()))
}

fn decode_bytes<'r, R>(row: &'r R, index: usize) -> Option<Option<String>>
where
    R: Row,
    usize: ColumnIndex<R>,
    Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    row.try_get::<Option<Vec<u8>>, _>(index)
        .ok()
        .map(|value| value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

fn pg_value(row: &PgRow, index: usize) -> Option<Option<String>> {
    decode_text::<_, String>(row, index)
        .or_else(|| decode_text::<_, i64>(row, index))
        .or_else(|| decode_text::<_, i32>(row, index))
        .or_else(|| decode_text::<_, i16>(row, index))
        .or_else(|| decode_text::<_, f64>(row, index))
        .or_else(|| decode_text::<_, f32>(row, index))
        .or_else(|| decode_text::<_, bool>(row, index))
        .or_else(|| decode_text::<_, Decimal>(row, index))
        .or_else(|| decode_text::<_, DateTime<Utc>>(row, index))
        .or_else(|| decode_text::<_, NaiveDateTime>(row, index))
        .or_else(|| decode_text::<_, NaiveDate>(row, index))
        .or_else(|| decode_text::<_, NaiveTime>(row, index))
        .or_else(|| decode_text::<_, Uuid>(row, index))
        .or_else(|| decode_text::<_, serde_json::Value>(row, index))
        .or_else(|| decode_bytes(row, index))
}

fn mysql_value(row: &MySqlRow, index: usize) -> Option<Option<String>> {
    decode_text::<_, String>(row, index)
        .or_else(|| decode_text::<_, i64>(row, index))
        .or_else(|| decode_text::<_, u64>(row, index))
        .or_else(|| decode_text::<_, f64>(row, index))
        .or_else(|| decode_text::<_, f32>(row, index))
        .or_else(|| decode_text::<_, Decimal>(row, index))
        .or_else(|| decode_text::<_, NaiveDateTime>(row, index))
        .or_else(|| decode_text::<_, DateTime<Utc>>(row, index))
        .or_else(|| decode_text::<_, NaiveDate>(row, index))
        .or_else(|| decode_text::<_, NaiveTime>(row, index))
        .or_else(|| decode_text::<_, serde_json::Value>(row, index))
        .or_else(|| decode_bytes(row, index))
}

/// SQLite checks the stored value's type, not the declared column type
fn sqlite_value(row: &SqliteRow, index: usize) -> Option<Option<String>> {
    decode_text::<_, String>(row, index)
        .or_else(|| decode_text::<_, i64>(row, index))
        .or_else(|| decode_text::<_, f64>(row, index))
        .or_else(|| decode_bytes(row, index))
}

/// Stringify every selected column; undecodable columns are logged and left
/// empty
fn to_sql_row<R>(row: &R, decode: fn(&R, usize) -> Option<Option<String>>) -> SqlRow
where
    R: Row,
    usize: ColumnIndex<R>,
{
    let mut sql_row = SqlRow::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode(row, index).unwrap_or_else(|| {
            warn!(column = column.name(), "Skipping column with unsupported type");
            None
        });
        sql_row.push(column.name(), value);
    }
    sql_row
}
