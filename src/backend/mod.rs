use crate::error::AppResult;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub mod database;

/// One result row per column label, with the label as reported by the driver
pub type UserRecord = BTreeMap<String, String>;

/// A fetched row in select-list order
///
/// Values are stringified by the driver; `None` marks SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlRow {
    columns: Vec<(String, Option<String>)>,
}

impl SqlRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, value: Option<String>) {
        self.columns.push((label.into(), value));
    }

    pub fn with(mut self, label: impl Into<String>, value: Option<&str>) -> Self {
        self.push(label, value.map(str::to_string));
        self
    }

    /// Value of the first selected column
    pub fn first(&self) -> Option<&str> {
        self.columns.first().and_then(|(_, v)| v.as_deref())
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(l, _)| l == label)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Every non-null column keyed by its label
    pub fn into_record(self) -> UserRecord {
        self.columns
            .into_iter()
            .filter_map(|(label, value)| value.map(|v| (label, v)))
            .collect()
    }
}

/// Supplier of live connections to a user database
///
/// Implementations own pooling and driver selection. `acquire` fails with
/// `AppError::Unavailable` when no data source is configured.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    async fn acquire(&self) -> AppResult<Box<dyn DirectoryConnection>>;
}

/// A checked-out connection; returned to its source when dropped
///
/// SQL reaches this layer with `?` markers and string parameters bound in
/// array order.
#[async_trait]
pub trait DirectoryConnection: Send {
    async fn fetch_all(&mut self, sql: &str, params: &[String]) -> AppResult<Vec<SqlRow>>;

    /// Run a statement, returning the number of affected rows
    async fn execute(&mut self, sql: &str, params: &[String]) -> AppResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_into_record_drops_nulls() {
        let row = SqlRow::new()
            .with("id", Some("1"))
            .with("EMAIL", None)
            .with("username", Some("alice"));

        assert_eq!(row.len(), 3);
        assert_eq!(row.first(), Some("1"));
        assert_eq!(row.get("EMAIL"), None);

        let record = row.into_record();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("username").map(String::as_str), Some("alice"));
        assert!(!record.contains_key("EMAIL"));
    }

    #[test]
    fn test_empty_row() {
        let row = SqlRow::new();
        assert!(row.is_empty());
        assert_eq!(row.first(), None);
    }
}
