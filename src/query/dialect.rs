use crate::error::AppError;
use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;

lazy_static! {
    static ref ORDER_BY: Regex = Regex::new(r"(?i)\border\s+by\b").unwrap();
}

/// Relational database family of a configured directory
///
/// Decides paging syntax, bind-marker style and the connection test query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Rdbms {
    PostgreSql,
    MySql,
    Sqlite,
    Oracle,
    SqlServer,
    Db2,
}

impl Rdbms {
    pub const ALL: [Rdbms; 6] = [
        Rdbms::PostgreSql,
        Rdbms::MySql,
        Rdbms::Sqlite,
        Rdbms::Oracle,
        Rdbms::SqlServer,
        Rdbms::Db2,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Rdbms::PostgreSql => "postgresql",
            Rdbms::MySql => "mysql",
            Rdbms::Sqlite => "sqlite",
            Rdbms::Oracle => "oracle",
            Rdbms::SqlServer => "sqlserver",
            Rdbms::Db2 => "db2",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Rdbms::PostgreSql => "PostgreSQL 12+",
            Rdbms::MySql => "MySQL 8+",
            Rdbms::Sqlite => "SQLite 3",
            Rdbms::Oracle => "Oracle 19+",
            Rdbms::SqlServer => "MS SQL Server 2012+",
            Rdbms::Db2 => "DB2 10+",
        }
    }

    /// Query used to validate a freshly opened connection
    pub fn test_query(&self) -> &'static str {
        match self {
            Rdbms::Oracle => "SELECT 1 FROM DUAL",
            Rdbms::Db2 => "SELECT 1 FROM SYSIBM.SYSDUMMY1",
            _ => "SELECT 1",
        }
    }

    /// Connection URL schemes accepted for this family
    pub fn url_schemes(&self) -> &'static [&'static str] {
        match self {
            Rdbms::PostgreSql => &["postgres", "postgresql"],
            Rdbms::MySql => &["mysql", "mariadb"],
            Rdbms::Sqlite => &["sqlite"],
            Rdbms::Oracle => &["oracle"],
            Rdbms::SqlServer => &["mssql", "sqlserver"],
            Rdbms::Db2 => &["db2"],
        }
    }

    /// Paging clause appended for `offset`/`limit`
    pub fn paginate(&self, query: &str, offset: u64, limit: u64) -> String {
        match self {
            Rdbms::PostgreSql | Rdbms::Sqlite => {
                format!("{} LIMIT {} OFFSET {}", query, limit, offset)
            }
            Rdbms::MySql => format!("{} LIMIT {}, {}", query, offset, limit),
            Rdbms::Oracle | Rdbms::Db2 => format!(
                "{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                query, offset, limit
            ),
            Rdbms::SqlServer => {
                // OFFSET/FETCH is only valid after ORDER BY
                let order = if ORDER_BY.is_match(&top_level(query)) {
                    ""
                } else {
                    " ORDER BY (SELECT NULL)"
                };
                format!(
                    "{}{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                    query, order, offset, limit
                )
            }
        }
    }

    /// Rewrite `?` markers into the family's native bind syntax
    pub fn bind_markers(&self, query: &str) -> String {
        match self {
            Rdbms::PostgreSql => numbered_markers(query),
            _ => query.to_string(),
        }
    }
}

impl std::fmt::Display for Rdbms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl FromStr for Rdbms {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Rdbms::ALL
            .iter()
            .find(|rdbms| {
                rdbms.key().eq_ignore_ascii_case(value)
                    || rdbms.description().eq_ignore_ascii_case(value)
            })
            .copied()
            .ok_or_else(|| AppError::Configuration(format!("Unsupported RDBMS: {}", value)))
    }
}

impl TryFrom<String> for Rdbms {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rdbms> for String {
    fn from(rdbms: Rdbms) -> Self {
        rdbms.key().to_string()
    }
}

/// Rebuild SQL text char by char; `visit` sees each character with its
/// parenthesis depth and whether it sits inside a quoted literal or identifier
fn scan(query: &str, mut visit: impl FnMut(char, usize, bool) -> String) -> String {
    let mut out = String::with_capacity(query.len());
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    for c in query.chars() {
        let quoted = match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                true
            }
            None => {
                match c {
                    '\'' | '"' => quote = Some(c),
                    '(' => depth += 1,
                    ')' => depth = depth.saturating_sub(1),
                    _ => {}
                }
                quote.is_some()
            }
        };
        out.push_str(&visit(c, depth, quoted));
    }

    out
}

fn numbered_markers(query: &str) -> String {
    let mut index = 0;
    scan(query, |c, _, quoted| {
        if c == '?' && !quoted {
            index += 1;
            format!("${}", index)
        } else {
            c.to_string()
        }
    })
}

/// Query text with parenthesized sections and literals blanked out
fn top_level(query: &str) -> String {
    scan(query, |c, depth, quoted| {
        if quoted || depth > 0 || c == ')' {
            " ".to_string()
        } else {
            c.to_string()
        }
    })
}
