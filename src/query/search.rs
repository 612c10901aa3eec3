//! Search criteria to SQL filter compilation
//!
//! Criteria are either attribute/value pairs (AND-ed) or a single free-text
//! keyword matched against the searchable attributes (OR-ed). Every
//! comparison runs on `UPPER(column)`, and values are always bound as
//! positional `?` parameters, never inlined.

use super::columns::ColumnMapping;
use super::template::{has_placeholder, substitute, FILTERS};
use std::collections::{BTreeMap, HashMap};

/// Free-text keyword control key
pub const SEARCH: &str = "search";
/// Exactness control key, `"true"` or `"false"`
pub const EXACT: &str = "exact";

pub const ID: &str = "id";
pub const USERNAME: &str = "username";
pub const FIRST_NAME: &str = "firstName";
pub const LAST_NAME: &str = "lastName";
pub const EMAIL: &str = "email";

/// Attributes matched by a free-text search
pub const SEARCHABLE_ATTRIBUTES: [&str; 4] = [USERNAME, FIRST_NAME, LAST_NAME, EMAIL];

const SELECT_ALL: &str = "1=1";
const SELECT_NONE: &str = "1=0";
const LIKE_ESCAPE: char = '!';

/// Unordered search request: control keys plus attribute filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    entries: HashMap<String, String>,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, keyword: &str) -> Self {
        self.entries.insert(SEARCH.to_string(), keyword.to_string());
        self
    }

    pub fn exact(mut self, exact: bool) -> Self {
        self.entries.insert(EXACT.to_string(), exact.to_string());
        self
    }

    pub fn attribute(mut self, attribute: &str, value: &str) -> Self {
        self.entries.insert(attribute.to_string(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_control_key(key: &str) -> bool {
        key == SEARCH || key == EXACT
    }

    fn control(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn is_exact(&self) -> bool {
        self.control(EXACT)
            .map_or(false, |v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter(|(k, _)| !Self::is_control_key(k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for SearchCriteria {
    fn from(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchCriteria {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// SQL with `?` markers and the values to bind, in marker order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub query: String,
    /// `None` when the query has no markers to bind
    pub params: Option<Vec<String>>,
}

impl CompiledQuery {
    fn without_params(query: String) -> Self {
        Self {
            query,
            params: None,
        }
    }

    pub fn params(&self) -> &[String] {
        self.params.as_deref().unwrap_or_default()
    }
}

/// Compile criteria into the `{filters}` placeholder of a query template
pub fn compile(template: &str, columns: &ColumnMapping, criteria: &SearchCriteria) -> CompiledQuery {
    let select_all = || CompiledQuery::without_params(substitute(template, FILTERS, SELECT_ALL));

    if criteria.is_empty() || columns.is_empty() || !has_placeholder(template, FILTERS) {
        return select_all();
    }

    let is_free_text = criteria.control(SEARCH).is_some();
    let is_attribute_search = criteria.attributes().next().is_some();
    if !is_free_text && !is_attribute_search {
        return select_all();
    }

    let exact = criteria.is_exact();

    // Sorted by column so clause order and parameter order agree
    let mut bound: BTreeMap<&str, &str> = BTreeMap::new();
    if is_attribute_search {
        for (attribute, value) in criteria.attributes() {
            if let Some(column) = columns.column(attribute) {
                bound.insert(column, value);
            }
        }
    } else {
        let keyword = criteria.control(SEARCH).unwrap_or_default();
        if keyword.trim().is_empty() || keyword.trim() == "*" {
            return select_all();
        }
        for (attribute, column) in columns.iter() {
            if SEARCHABLE_ATTRIBUTES.contains(&attribute) {
                bound.insert(column, keyword);
            }
        }
    }

    if bound.is_empty() {
        return CompiledQuery::without_params(substitute(template, FILTERS, SELECT_NONE));
    }

    let condition = build_condition(&bound, exact, is_attribute_search);
    let params = bound
        .values()
        .map(|value| {
            if exact {
                value.to_string()
            } else {
                like_pattern(value)
            }
        })
        .collect();

    CompiledQuery {
        query: substitute(template, FILTERS, &condition),
        params: Some(params),
    }
}

fn build_condition(bound: &BTreeMap<&str, &str>, exact: bool, is_attribute_search: bool) -> String {
    let comparator = if exact { "=" } else { "LIKE" };
    let combinator = if is_attribute_search { "AND" } else { "OR" };
    let escape = if exact {
        String::new()
    } else {
        format!("ESCAPE '{}'", LIKE_ESCAPE)
    };

    bound
        .keys()
        .map(|column| format!(" UPPER({}) {} ? {} ", column, comparator, escape))
        .collect::<Vec<_>>()
        .join(combinator)
}

/// Upper-case a value, escape LIKE metacharacters and wrap it for substring match
pub fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.to_uppercase().chars() {
        if matches!(c, '!' | '%' | '_' | '[') {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "select * from users where {filters}";

    fn mapping() -> ColumnMapping {
        ColumnMapping::parse([
            "id=user_id",
            "username=u_name",
            "firstName=given",
            "lastName=family",
            "email=mail",
            "locale=lang",
        ])
    }

    #[test]
    fn test_empty_criteria_selects_all() {
        let compiled = compile(BASE, &mapping(), &SearchCriteria::new());
        assert_eq!(compiled.query, "select * from users where 1=1");
        assert_eq!(compiled.params, None);
    }

    #[test]
    fn test_empty_mapping_selects_all() {
        let criteria = SearchCriteria::new().attribute("id", "1");
        let compiled = compile(BASE, &ColumnMapping::default(), &criteria);
        assert_eq!(compiled.query, "select * from users where 1=1");
        assert_eq!(compiled.params, None);
    }

    #[test]
    fn test_template_without_filters_is_unchanged() {
        let criteria = SearchCriteria::new().attribute("id", "1");
        let compiled = compile("select * from users", &mapping(), &criteria);
        assert_eq!(compiled.query, "select * from users");
        assert_eq!(compiled.params, None);
    }

    #[test]
    fn test_only_control_keys_selects_all() {
        let criteria = SearchCriteria::new().exact(true);
        let compiled = compile(BASE, &mapping(), &criteria);
        assert_eq!(compiled.query, "select * from users where 1=1");
    }

    #[test]
    fn test_unmatched_attributes_select_none() {
        let criteria = SearchCriteria::new().attribute("phone", "555");
        let compiled = compile(BASE, &mapping(), &criteria);
        assert_eq!(compiled.query, "select * from users where 1=0");
        assert_eq!(compiled.params, None);
    }

    #[test]
    fn test_wildcard_keywords_select_all() {
        for keyword in ["", "*", "  *  ", "   "] {
            let criteria = SearchCriteria::new().keyword(keyword);
            let compiled = compile(BASE, &mapping(), &criteria);
            assert_eq!(compiled.query, "select * from users where 1=1", "{:?}", keyword);
            assert_eq!(compiled.params, None);
        }
    }

    #[test]
    fn test_exact_attribute_search() {
        let mapping = ColumnMapping::parse(["id=user_id"]);
        let criteria = SearchCriteria::new().attribute("id", "42").exact(true);
        let compiled = compile(BASE, &mapping, &criteria);

        assert_eq!(compiled.query, "select * from users where  UPPER(user_id) = ?  ");
        assert_eq!(compiled.params, Some(vec!["42".to_string()]));
    }

    #[test]
    fn test_exact_values_are_passed_raw() {
        let criteria = SearchCriteria::new().attribute("username", "bob_%").exact(true);
        let compiled = compile(BASE, &mapping(), &criteria);
        assert_eq!(compiled.params, Some(vec!["bob_%".to_string()]));
    }

    #[test]
    fn test_fuzzy_free_text_search() {
        let mapping = ColumnMapping::parse(["username=u_name"]);
        let criteria = SearchCriteria::new().keyword("bob_1");
        let compiled = compile(BASE, &mapping, &criteria);

        assert_eq!(
            compiled.query,
            "select * from users where  UPPER(u_name) LIKE ? ESCAPE '!' "
        );
        assert_eq!(compiled.params, Some(vec!["%BOB!_1%".to_string()]));
    }

    #[test]
    fn test_free_text_uses_searchable_columns_sorted() {
        let criteria = SearchCriteria::new().keyword("ann");
        let compiled = compile(BASE, &mapping(), &criteria);

        assert_eq!(
            compiled.query,
            "select * from users where  UPPER(family) LIKE ? ESCAPE '!' OR UPPER(given) LIKE ? ESCAPE '!' OR UPPER(mail) LIKE ? ESCAPE '!' OR UPPER(u_name) LIKE ? ESCAPE '!' "
        );
        assert_eq!(compiled.params.unwrap(), vec!["%ANN%"; 4]);
    }

    #[test]
    fn test_attribute_search_is_anded_in_column_order() {
        let criteria = SearchCriteria::new()
            .attribute("username", "bob")
            .attribute("email", "example.com")
            .attribute("unknown", "ignored");
        let compiled = compile(BASE, &mapping(), &criteria);

        assert_eq!(
            compiled.query,
            "select * from users where  UPPER(mail) LIKE ? ESCAPE '!' AND UPPER(u_name) LIKE ? ESCAPE '!' "
        );
        assert_eq!(
            compiled.params,
            Some(vec!["%EXAMPLE.COM%".to_string(), "%BOB%".to_string()])
        );
    }

    #[test]
    fn test_attribute_mode_wins_over_keyword() {
        let criteria = SearchCriteria::new()
            .keyword("ignored")
            .attribute("locale", "en")
            .exact(true);
        let compiled = compile(BASE, &mapping(), &criteria);

        assert_eq!(compiled.query, "select * from users where  UPPER(lang) = ?  ");
        assert_eq!(compiled.params, Some(vec!["en".to_string()]));
    }

    #[test]
    fn test_exact_flag_parsing() {
        let fuzzy = SearchCriteria::new().attribute("id", "7").attribute(EXACT, "yes");
        assert!(compile(BASE, &mapping(), &fuzzy).query.contains("LIKE"));

        let exact = SearchCriteria::new().attribute("id", "7").attribute(EXACT, "TRUE");
        assert!(compile(BASE, &mapping(), &exact).query.contains("UPPER(user_id) = ?"));
    }

    #[test]
    fn test_escaped_filters_survive() {
        let template = "select '{{filters}}' as tpl from users where {filters}";
        let criteria = SearchCriteria::new().attribute("id", "1").exact(true);
        let compiled = compile(template, &mapping(), &criteria);
        assert_eq!(
            compiled.query,
            "select '{filters}' as tpl from users where  UPPER(user_id) = ?  "
        );

        let compiled = compile("select '{{filters}}' from users", &mapping(), &criteria);
        assert_eq!(compiled.query, "select '{filters}' from users");
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("a!b%c_d[e"), "%A!!B!%C!_D![E%");
        assert_eq!(like_pattern("straße"), "%STRASSE%");
    }

    #[test]
    fn test_criteria_from_map() {
        let criteria: SearchCriteria = [("search", "bob"), ("exact", "false")].into_iter().collect();
        let compiled = compile(BASE, &mapping(), &criteria);
        assert_eq!(compiled.params().len(), 4);
    }
}
