//! sqlx-backed connection source
//!
//! Each family runs on its native sqlx driver; PostgreSQL, MySQL and SQLite
//! are linked in. Other families are accepted by the query layer for
//! paging but rejected here at configuration time.

pub mod config;
pub mod data_source;

pub use config::DatabaseBackendConfig;
pub use data_source::DataSourceProvider;
