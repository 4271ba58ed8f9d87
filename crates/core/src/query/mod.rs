//! List query translation.
//!
//! Every list endpoint accepts `sort_by`, `sort_order`, `filter`, `limit` and
//! `page` as raw strings. [`QueryTranslator`] screens them for SQL keywords,
//! parses the filter grammar and falls back to safe defaults, producing a
//! [`ListDescriptor`] that the catalog store executes.

pub mod screen;
mod translator;
mod types;

pub use screen::{contains_sql_keywords, find_sql_keyword};
pub use translator::{parse_filter, FilterParseError, QueryTranslator};
pub use types::{FilterMap, ListDescriptor, RawListParams, SortDirection};
