//! Translation of raw list parameters into a [`ListDescriptor`].

use thiserror::Error;
use tracing::{debug, warn};

use super::screen::contains_sql_keywords;
use super::types::{FilterMap, ListDescriptor, RawListParams, SortDirection};
use crate::config::QueryConfig;

/// Malformed filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("filter group {group:?} has no ':' separator")]
    MissingSeparator { group: String },
    #[error("filter group {group:?} has an empty field name")]
    EmptyField { group: String },
}

/// Parses `field:v1,v2|other:v3` into a field → values map.
///
/// Empty groups are skipped, values are trimmed and empty values dropped,
/// repeated fields append to the same list.
pub fn parse_filter(raw: &str) -> Result<FilterMap, FilterParseError> {
    let mut filters = FilterMap::new();

    for group in raw.split('|') {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }

        let (field, values) =
            group
                .split_once(':')
                .ok_or_else(|| FilterParseError::MissingSeparator {
                    group: group.to_string(),
                })?;

        let field = field.trim();
        if field.is_empty() {
            return Err(FilterParseError::EmptyField {
                group: group.to_string(),
            });
        }

        filters.entry(field.to_string()).or_default().extend(
            values
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        );
    }

    Ok(filters)
}

/// Screens and normalizes list request parameters.
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    default_limit: u32,
    max_limit: u32,
}

impl QueryTranslator {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            default_limit: config.default_limit.max(1),
            max_limit: config.max_limit.max(1),
        }
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    pub fn translate(&self, raw: &RawListParams) -> ListDescriptor {
        ListDescriptor {
            sort_field: self.sort_field(raw.sort_by.as_deref()),
            sort_direction: raw.sort_order.as_deref().and_then(|order| {
                let direction = SortDirection::parse(order);
                if direction.is_none() {
                    debug!(sort_order = order, "Ignoring unrecognised sort order");
                }
                direction
            }),
            filters: self.filters(raw.filter.as_deref()),
            limit: self.limit(raw.limit.as_deref()),
            page: Self::page(raw.page.as_deref()),
        }
    }

    fn sort_field(&self, raw: Option<&str>) -> Option<String> {
        let field = raw.map(str::trim).filter(|f| !f.is_empty())?;
        if contains_sql_keywords(field) {
            warn!(sort_by = field, "Dropping sort field rejected by SQL screen");
            return None;
        }
        Some(field.to_string())
    }

    fn filters(&self, raw: Option<&str>) -> FilterMap {
        let Some(raw) = raw.filter(|f| !f.trim().is_empty()) else {
            return FilterMap::new();
        };

        if contains_sql_keywords(raw) {
            warn!(filter = raw, "Dropping filter clause rejected by SQL screen");
            return FilterMap::new();
        }

        match parse_filter(raw) {
            Ok(filters) => filters,
            Err(e) => {
                warn!(filter = raw, error = %e, "Dropping malformed filter clause");
                FilterMap::new()
            }
        }
    }

    /// `0`, negative or non-numeric limits use the default; large ones are capped.
    fn limit(&self, raw: Option<&str>) -> u32 {
        match raw.and_then(|l| l.trim().parse::<u32>().ok()) {
            Some(0) | None => self.default_limit,
            Some(limit) => limit.min(self.max_limit),
        }
    }

    fn page(raw: Option<&str>) -> u32 {
        raw.and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
    }
}

impl Default for QueryTranslator {
    fn default() -> Self {
        Self::new(&QueryConfig::default())
    }
}
