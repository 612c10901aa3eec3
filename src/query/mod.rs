//! Query compilation for administrator-defined SQL
//!
//! ```text
//! configuration ─► ColumnMapping + RawTemplates ─► QueryTemplateSet (once)
//! request       ─► SearchCriteria ─► search::compile ─► pagination::paginate
//! ```
//!
//! Placeholders: `{columns}` and `{filters}` are substituted, `{{columns}}`
//! and `{{filters}}` are emitted as literals, `?` marks a bound parameter.

pub mod columns;
pub mod dialect;
pub mod pagination;
pub mod search;
pub mod template;

pub use columns::ColumnMapping;
pub use dialect::Rdbms;
pub use pagination::{paginate, Pageable};
pub use search::{compile, CompiledQuery, SearchCriteria};
pub use template::{render_columns, QueryTemplateSet, RawTemplates};
