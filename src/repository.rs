//! Directory operations over one configured user database
//!
//! Every operation checks out its own connection and returns it on all exit
//! paths. Read operations come in two forms: `try_*` keeps outages
//! distinguishable as `Err`, the plain form logs the failure and answers with
//! an empty result.

use crate::backend::{ConnectionSource, SqlRow, UserRecord};
use crate::error::{AppError, AppResult};
use crate::query::{compile, paginate, CompiledQuery, Pageable, QueryTemplateSet, SearchCriteria};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct UserRepository {
    source: Arc<dyn ConnectionSource>,
    queries: Arc<QueryTemplateSet>,
}

impl UserRepository {
    pub fn new(source: Arc<dyn ConnectionSource>, queries: Arc<QueryTemplateSet>) -> Self {
        Self { source, queries }
    }

    pub fn queries(&self) -> &QueryTemplateSet {
        &self.queries
    }

    async fn query_rows(
        &self,
        sql: &str,
        params: &[String],
        pageable: Option<&Pageable>,
    ) -> AppResult<Vec<SqlRow>> {
        let sql = paginate(sql, pageable, self.queries.rdbms());
        info!(query = %sql, params = ?params, "Executing query");

        let mut conn = self.source.acquire().await?;
        let rows = conn.fetch_all(&sql, params).await?;
        debug!(rows = rows.len(), "Query returned rows");
        Ok(rows)
    }

    async fn query_records(
        &self,
        sql: &str,
        params: &[String],
        pageable: Option<&Pageable>,
    ) -> AppResult<Vec<UserRecord>> {
        let rows = self.query_rows(sql, params, pageable).await?;
        Ok(rows.into_iter().map(SqlRow::into_record).collect())
    }

    async fn query_first(&self, sql: &str, value: &str) -> AppResult<Option<UserRecord>> {
        let records = self.query_records(sql, &[value.to_string()], None).await?;
        Ok(records.into_iter().next())
    }

    fn compile_search(&self, criteria: &SearchCriteria) -> CompiledQuery {
        compile(self.queries.base_query(), self.queries.columns(), criteria)
    }

    pub async fn try_get_all_users(&self) -> AppResult<Vec<UserRecord>> {
        let compiled = self.compile_search(&SearchCriteria::new());
        self.query_records(&compiled.query, compiled.params(), None)
            .await
    }

    pub async fn try_get_users_count(&self, criteria: &SearchCriteria) -> AppResult<i64> {
        let rows = if criteria.is_empty() {
            self.query_rows(self.queries.count_query(), &[], None).await?
        } else {
            let compiled = self.compile_search(criteria);
            let sql = format!("select count(*) from ({}) count_result", compiled.query);
            self.query_rows(&sql, compiled.params(), None).await?
        };

        let count = rows.first().and_then(SqlRow::first).unwrap_or("0");
        count
            .trim()
            .parse::<f64>()
            .map(|n| n as i64)
            .map_err(|_| AppError::Database(format!("Count query returned '{}'", count)))
    }

    pub async fn try_find_user_by_id(&self, id: &str) -> AppResult<Option<UserRecord>> {
        self.query_first(self.queries.find_by_id(), id).await
    }

    pub async fn try_find_user_by_username(&self, username: &str) -> AppResult<Option<UserRecord>> {
        self.query_first(self.queries.find_by_username(), username)
            .await
    }

    pub async fn try_find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        self.query_first(self.queries.find_by_email(), email).await
    }

    pub async fn try_find_users(
        &self,
        criteria: &SearchCriteria,
        pageable: Option<&Pageable>,
    ) -> AppResult<Vec<UserRecord>> {
        let compiled = self.compile_search(criteria);
        self.query_records(&compiled.query, compiled.params(), pageable)
            .await
    }

    pub async fn get_all_users(&self) -> Vec<UserRecord> {
        collapse("get_all_users", self.try_get_all_users().await)
    }

    pub async fn get_users_count(&self, criteria: &SearchCriteria) -> i64 {
        collapse("get_users_count", self.try_get_users_count(criteria).await)
    }

    pub async fn find_user_by_id(&self, id: &str) -> Option<UserRecord> {
        collapse("find_user_by_id", self.try_find_user_by_id(id).await)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Option<UserRecord> {
        collapse(
            "find_user_by_username",
            self.try_find_user_by_username(username).await,
        )
    }

    pub async fn find_user_by_email(&self, email: &str) -> Option<UserRecord> {
        collapse("find_user_by_email", self.try_find_user_by_email(email).await)
    }

    pub async fn find_users(
        &self,
        criteria: &SearchCriteria,
        pageable: Option<&Pageable>,
    ) -> Vec<UserRecord> {
        collapse("find_users", self.try_find_users(criteria, pageable).await)
    }

    /// Stored hash for `username`; lookup failures read as no hash
    async fn find_password_hash(&self, username: &str) -> Option<String> {
        let sql = self.queries.find_password_hash();
        info!(query = %sql, "Looking up password hash");

        let lookup = async {
            let mut conn = self.source.acquire().await?;
            conn.fetch_all(sql, &[username.to_string()]).await
        };
        match lookup.await {
            Ok(rows) => rows
                .first()
                .and_then(SqlRow::first)
                .filter(|hash| !hash.is_empty())
                .map(str::to_string),
            Err(e) => {
                error!(error = %e, "Password hash lookup failed");
                None
            }
        }
    }

    /// Check `password` against the stored hash for `username`
    ///
    /// A missing hash is `Ok(false)`. A stored hash that cannot be parsed is
    /// an error.
    pub async fn validate_credentials(&self, username: &str, password: &str) -> AppResult<bool> {
        let Some(stored) = self.find_password_hash(username).await else {
            debug!("No stored password hash");
            return Ok(false);
        };
        self.queries
            .hash_engine()
            .verify_blocking(&stored, password)
            .await
    }

    /// Hash `password` and write it with the update template
    ///
    /// Returns whether any row changed; `NotSupported` when no update
    /// template is configured.
    pub async fn update_credentials(&self, username: &str, password: &str) -> AppResult<bool> {
        let sql = self.queries.update_password().ok_or_else(|| {
            AppError::NotSupported("Password updates are not configured".to_string())
        })?;
        let hash = self.queries.hash_engine().hash_blocking(password).await?;

        info!(query = %sql, "Updating password hash");
        let mut conn = self.source.acquire().await?;
        let updated = conn.execute(sql, &[hash, username.to_string()]).await?;
        if updated == 0 {
            warn!("Password update changed no rows");
        }
        Ok(updated > 0)
    }

    /// Whether the host may delete users; no database write happens here
    pub fn remove_user(&self) -> bool {
        self.queries.allow_delete()
    }

    pub fn allow_overwrite(&self) -> bool {
        self.queries.allow_overwrite()
    }
}

fn collapse<T: Default>(operation: &str, result: AppResult<T>) -> T {
    result.unwrap_or_else(|e| {
        error!(operation, error = %e, "Directory read failed, returning empty result");
        T::default()
    })
}
