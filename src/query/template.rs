use super::columns::ColumnMapping;
use super::dialect::Rdbms;
use super::search::{self, SearchCriteria, EMAIL, ID, USERNAME};
use crate::password::HashEngine;

pub const COLUMNS: &str = "columns";
pub const FILTERS: &str = "filters";

/// Replace `{name}` with `value` while keeping `{{name}}` as a literal `{name}`
pub fn substitute(template: &str, name: &str, value: &str) -> String {
    let escaped = format!("{{{{{}}}}}", name);
    let token = format!("{{{}}}", name);
    let sentinel = format!("\u{1}{}\u{1}", name);

    template
        .replace(&escaped, &sentinel)
        .replace(&token, value)
        .replace(&sentinel, &token)
}

/// True when the template has a `{name}` placeholder outside `{{name}}` escapes
pub fn has_placeholder(template: &str, name: &str) -> bool {
    let escaped = format!("{{{{{}}}}}", name);
    let token = format!("{{{}}}", name);
    template.replace(&escaped, "").contains(&token)
}

/// Expand `{columns}` with an explicit list, or with every mapped attribute
/// as `column AS attribute` when the list is empty
pub fn render_columns(template: &str, mapping: &ColumnMapping, columns: &[&str]) -> String {
    let column_list = if columns.is_empty() {
        mapping
            .iter()
            .map(|(attribute, column)| format!("{} AS {}", column, attribute))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        columns.join(", ")
    };

    substitute(template, COLUMNS, &column_list)
}

fn blank(template: &Option<String>) -> bool {
    template.as_ref().map_or(true, |t| t.trim().is_empty())
}

/// Administrator-supplied SQL, as configured
#[derive(Debug, Clone, Default)]
pub struct RawTemplates {
    pub base: String,
    pub count: Option<String>,
    pub find_by_id: Option<String>,
    pub find_by_username: Option<String>,
    pub find_by_email: Option<String>,
    pub find_password_hash: String,
    pub update_password: Option<String>,
}

/// Compiled, immutable query set for one configured directory
///
/// Fixed queries are rendered once at construction; blank count and find-by
/// templates are derived from the base query.
#[derive(Debug, Clone)]
pub struct QueryTemplateSet {
    raw: RawTemplates,
    columns: ColumnMapping,
    hash_engine: HashEngine,
    rdbms: Rdbms,
    allow_delete: bool,
    allow_overwrite: bool,
    base_query: String,
    count_query: String,
    find_by_id: String,
    find_by_username: String,
    find_by_email: String,
}

impl QueryTemplateSet {
    pub fn new(
        raw: RawTemplates,
        columns: ColumnMapping,
        hash_engine: HashEngine,
        rdbms: Rdbms,
        allow_delete: bool,
        allow_overwrite: bool,
    ) -> Self {
        let base_query = render_columns(&raw.base, &columns, &[]);

        let count_query = if blank(&raw.count) {
            render_columns(&raw.base, &columns, &["count(*)"])
        } else {
            render_columns(raw.count.as_deref().unwrap_or_default(), &columns, &[])
        };
        let count_query = search::compile(&count_query, &columns, &SearchCriteria::new()).query;

        let find_by = |template: &Option<String>, attribute: &str| {
            if blank(template) {
                let criteria = SearchCriteria::new().exact(true).attribute(attribute, "");
                search::compile(&base_query, &columns, &criteria).query
            } else {
                render_columns(template.as_deref().unwrap_or_default(), &columns, &[])
            }
        };
        let find_by_id = find_by(&raw.find_by_id, ID);
        let find_by_username = find_by(&raw.find_by_username, USERNAME);
        let find_by_email = find_by(&raw.find_by_email, EMAIL);

        Self {
            raw,
            columns,
            hash_engine,
            rdbms,
            allow_delete,
            allow_overwrite,
            base_query,
            count_query,
            find_by_id,
            find_by_username,
            find_by_email,
        }
    }

    /// Base query with every mapped column; `{filters}` still unresolved
    pub fn base_query(&self) -> &str {
        &self.base_query
    }

    /// Base query with an explicit select list
    pub fn base_query_with(&self, columns: &[&str]) -> String {
        render_columns(&self.raw.base, &self.columns, columns)
    }

    pub fn count_query(&self) -> &str {
        &self.count_query
    }

    pub fn find_by_id(&self) -> &str {
        &self.find_by_id
    }

    pub fn find_by_username(&self) -> &str {
        &self.find_by_username
    }

    pub fn find_by_email(&self) -> &str {
        &self.find_by_email
    }

    pub fn find_password_hash(&self) -> &str {
        &self.raw.find_password_hash
    }

    /// Password update statement, absent when updates are disabled
    pub fn update_password(&self) -> Option<&str> {
        self.raw
            .update_password
            .as_deref()
            .filter(|sql| !sql.trim().is_empty())
    }

    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    pub fn hash_engine(&self) -> &HashEngine {
        &self.hash_engine
    }

    pub fn rdbms(&self) -> Rdbms {
        self.rdbms
    }

    pub fn allow_delete(&self) -> bool {
        self.allow_delete
    }

    pub fn allow_overwrite(&self) -> bool {
        self.allow_overwrite
    }
}
