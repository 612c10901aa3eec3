use super::dialect::Rdbms;

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pageable {
    pub index: u64,
    pub size: u64,
}

impl Pageable {
    pub fn new(index: u64, size: u64) -> Self {
        Self { index, size }
    }

    /// Rows skipped before this page
    pub fn offset(&self) -> u64 {
        self.index.saturating_mul(self.size)
    }
}

/// Rewrite a compiled query into the dialect's paged form
///
/// Without a pageable the query is returned unchanged. Paging values are
/// integers inlined by the dialect, so the bound parameters stay aligned with
/// the query's `?` markers.
pub fn paginate(query: &str, pageable: Option<&Pageable>, rdbms: Rdbms) -> String {
    match pageable {
        None => query.to_string(),
        Some(page) => {
            let query = query.trim_end().trim_end_matches(';').trim_end();
            rdbms.paginate(query, page.offset(), page.size)
        }
    }
}
