//! SQL keyword screen applied to untrusted free text.
//!
//! Values are checked as given, then with every non-letter character
//! removed (so `a*&(lter` and `dr op` are caught), and finally segment by
//! segment with the same stripping. Segments are split on whitespace and the
//! filter grammar separators.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static SQL_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(alter|create|delete|drop|exec(ute)?|insert( +into)?|merge|select|update|union( +all)?)\b",
    )
    .expect("SQL keyword pattern is valid")
});

fn letters_only(value: &str) -> String {
    value.chars().filter(|c| c.is_alphabetic()).collect()
}

fn letter_segments(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(|c: char| c.is_whitespace() || matches!(c, '|' | ',' | ':' | ';'))
        .map(letters_only)
}

/// Returns true when `value` contains a screened SQL keyword.
pub fn contains_sql_keywords(value: &str) -> bool {
    find_sql_keyword(value).is_some()
}

/// Returns the keyword found in `value`, if any, for diagnostics.
pub fn find_sql_keyword(value: &str) -> Option<String> {
    if let Some(m) = SQL_KEYWORDS.find(value) {
        return Some(m.as_str().to_lowercase());
    }
    if let Some(m) = SQL_KEYWORDS.find(&letters_only(value)) {
        return Some(m.as_str().to_lowercase());
    }
    letter_segments(value).find_map(|segment| {
        SQL_KEYWORDS
            .find(&segment)
            .map(|m| m.as_str().to_lowercase())
    })
}
