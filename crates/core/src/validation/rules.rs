//! Field-level rules shared by create and update validation.

use chrono::NaiveDate;

use super::FieldError;
use crate::catalog::Difficulty;
use crate::query::find_sql_keyword;

pub const TITLE_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 5000;
pub const SUB_DIRECTION_MAX: usize = 128;
pub const LANGUAGE_MIN: usize = 2;
pub const LANGUAGE_MAX: usize = 32;
pub const URL_MAX: usize = 2048;

/// Trimmed value, or `Missing` when absent or blank.
pub fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, FieldError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FieldError::missing(field))
}

pub fn length(field: &str, value: &str, min: usize, max: usize) -> Result<(), FieldError> {
    let len = value.chars().count();
    if len < min {
        Err(FieldError::invalid(
            field,
            format!("must be at least {} characters", min),
        ))
    } else if len > max {
        Err(FieldError::invalid(
            field,
            format!("must be at most {} characters", max),
        ))
    } else {
        Ok(())
    }
}

/// Rejects free text carrying SQL keywords.
pub fn free_text(field: &str, value: &str) -> Result<(), FieldError> {
    match find_sql_keyword(value) {
        Some(keyword) => Err(FieldError::invalid(
            field,
            format!("contains forbidden SQL keyword '{}'", keyword),
        )),
        None => Ok(()),
    }
}

/// Length bounds plus the SQL screen.
pub fn text(field: &str, value: &str, min: usize, max: usize) -> Result<(), FieldError> {
    length(field, value, min, max)?;
    free_text(field, value)
}

pub fn positive_id(field: &str, id: i64) -> Result<i64, FieldError> {
    if id > 0 {
        Ok(id)
    } else {
        Err(FieldError::invalid(field, "must be a positive integer"))
    }
}

pub fn parse_id(field: &str, raw: &str) -> Result<i64, FieldError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| FieldError::invalid(field, "must be a positive integer"))
        .and_then(|id| positive_id(field, id))
}

pub fn parse_difficulty(field: &str, raw: &str) -> Result<Difficulty, FieldError> {
    Difficulty::parse(raw)
        .ok_or_else(|| FieldError::invalid(field, "must be one of junior, middle, senior"))
}

/// `YYYY-MM-DD`.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| FieldError::invalid(field, "must be a date formatted YYYY-MM-DD"))
}

/// Absolute `http`/`https` URL with a host.
pub fn http_url(field: &str, value: &str) -> Result<(), FieldError> {
    length(field, value, 1, URL_MAX)?;

    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(|| FieldError::invalid(field, "must start with http:// or https://"))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(FieldError::invalid(field, "must be a valid URL"));
    }
    Ok(())
}

/// Comma-separated tag ids; blanks are skipped and duplicates dropped.
pub fn parse_tag_ids(field: &str, raw: &str) -> Result<Vec<i64>, FieldError> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = parse_id(field, part)
            .map_err(|_| FieldError::invalid(field, format!("invalid tag id {:?}", part)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

pub fn tag_ids(field: &str, ids: &[i64]) -> Result<(), FieldError> {
    match ids.iter().find(|id| **id <= 0) {
        Some(id) => Err(FieldError::invalid(field, format!("invalid tag id {}", id))),
        None => Ok(()),
    }
}

/// Ratings are finite values in [1, 5].
pub fn rating(field: &str, value: f64) -> Result<f64, FieldError> {
    if value.is_finite() && (1.0..=5.0).contains(&value) {
        Ok(value)
    } else {
        Err(FieldError::invalid(field, "must be a number between 1 and 5"))
    }
}
