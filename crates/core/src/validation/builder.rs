//! Typed builder turning raw create-form fields into a [`NewItem`].

use std::collections::BTreeMap;

use super::rules::{self, DESCRIPTION_MAX, LANGUAGE_MAX, LANGUAGE_MIN, SUB_DIRECTION_MAX, TITLE_MAX};
use super::{FieldError, ValidationErrors};
use crate::catalog::{ContentType, NewItem};

/// Text fields a create form may carry.
pub const FORM_FIELDS: [&str; 10] = [
    "title",
    "direction_id",
    "sub_direction",
    "difficulty",
    "author_id",
    "edition_date",
    "description",
    "language",
    "web_url",
    "tags",
];

/// Collects raw form fields for one content type and validates them together.
///
/// Blank values count as absent. Fields a content type does not carry and
/// names that are not form fields at all are reported alongside missing and
/// malformed values.
#[derive(Debug, Clone)]
pub struct NewItemBuilder {
    content_type: ContentType,
    fields: BTreeMap<String, String>,
    unknown: Vec<String>,
}

impl NewItemBuilder {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            fields: BTreeMap::new(),
            unknown: Vec::new(),
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Record a raw field. Later values for the same name replace earlier ones.
    pub fn field(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        if FORM_FIELDS.contains(&name) {
            self.fields.insert(name.to_string(), value.into());
        } else if !self.unknown.iter().any(|n| n == name) {
            self.unknown.push(name.to_string());
        }
        self
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.field(name, value);
        self
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn build(self) -> Result<NewItem, ValidationErrors> {
        let ct = self.content_type;
        let mut errors = ValidationErrors::new();

        for name in &self.unknown {
            errors.push(FieldError::unknown(name.as_str()));
        }

        let title = errors.collect(
            rules::required("title", self.get("title"))
                .and_then(|t| rules::text("title", t, 1, TITLE_MAX).map(|_| t)),
        );

        let direction_id = errors.collect(
            rules::required("direction_id", self.get("direction_id"))
                .and_then(|raw| rules::parse_id("direction_id", raw)),
        );

        let difficulty = errors.collect(
            rules::required("difficulty", self.get("difficulty"))
                .and_then(|raw| rules::parse_difficulty("difficulty", raw)),
        );

        let language = errors.collect(
            rules::required("language", self.get("language"))
                .and_then(|l| rules::text("language", l, LANGUAGE_MIN, LANGUAGE_MAX).map(|_| l)),
        );

        let author_id = match self.get("author_id") {
            Some(raw) => errors.collect(rules::parse_id("author_id", raw).map(Some)),
            None if ct.requires_author() => {
                errors.push(FieldError::missing("author_id"));
                None
            }
            None => Some(None),
        };

        let edition_date = match self.get("edition_date") {
            Some(_) if !ct.supports_edition_date() => {
                errors.push(FieldError::unsupported("edition_date"));
                None
            }
            Some(raw) => errors.collect(rules::parse_date("edition_date", raw).map(Some)),
            None => Some(None),
        };

        let sub_direction = match self.get("sub_direction") {
            Some(s) => errors.collect(
                rules::text("sub_direction", s, 1, SUB_DIRECTION_MAX).map(|_| Some(s.to_string())),
            ),
            None => Some(None),
        };

        let description = match self.get("description") {
            Some(d) => errors.collect(
                rules::text("description", d, 0, DESCRIPTION_MAX).map(|_| d.to_string()),
            ),
            None => Some(String::new()),
        };

        let web_url = match self.get("web_url") {
            Some(u) => errors.collect(rules::http_url("web_url", u).map(|_| Some(u.to_string()))),
            None => Some(None),
        };

        let tags = match self.get("tags") {
            Some(raw) => errors.collect(rules::parse_tag_ids("tags", raw)),
            None => Some(Vec::new()),
        };

        match (
            title,
            direction_id,
            difficulty,
            language,
            author_id,
            edition_date,
            sub_direction,
            description,
            web_url,
            tags,
        ) {
            (
                Some(title),
                Some(direction_id),
                Some(difficulty),
                Some(language),
                Some(author_id),
                Some(edition_date),
                Some(sub_direction),
                Some(description),
                Some(web_url),
                Some(tags),
            ) if errors.is_empty() => Ok(NewItem {
                content_type: ct,
                title: title.to_string(),
                direction_id,
                sub_direction,
                difficulty,
                author_id,
                edition_date,
                description,
                language: language.to_string(),
                web_url,
                tags,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Difficulty;
    use crate::validation::FieldErrorKind;
    use chrono::NaiveDate;

    fn go_basics() -> NewItemBuilder {
        NewItemBuilder::new(ContentType::Book)
            .with("title", "Go Basics")
            .with("direction_id", "1")
            .with("difficulty", "junior")
            .with("author_id", "2")
            .with("language", "en")
    }

    #[test]
    fn test_minimal_book() {
        let item = go_basics().build().unwrap();
        assert_eq!(item.content_type, ContentType::Book);
        assert_eq!(item.title, "Go Basics");
        assert_eq!(item.direction_id, 1);
        assert_eq!(item.difficulty, Difficulty::Junior);
        assert_eq!(item.author_id, Some(2));
        assert_eq!(item.description, "");
        assert!(item.tags.is_empty());
        assert_eq!(item.web_url, None);
    }

    #[test]
    fn test_full_book() {
        let item = go_basics()
            .with("sub_direction", "languages")
            .with("edition_date", "2019-07-01")
            .with("description", "A gentle start")
            .with("web_url", "https://go.dev")
            .with("tags", "3, 4")
            .build()
            .unwrap();
        assert_eq!(item.edition_date, NaiveDate::from_ymd_opt(2019, 7, 1));
        assert_eq!(item.sub_direction.as_deref(), Some("languages"));
        assert_eq!(item.web_url.as_deref(), Some("https://go.dev"));
        assert_eq!(item.tags, vec![3, 4]);
    }

    #[test]
    fn test_book_requires_author() {
        let mut builder = NewItemBuilder::new(ContentType::Book);
        builder
            .field("title", "Go Basics")
            .field("direction_id", "1")
            .field("difficulty", "junior")
            .field("language", "en");
        let errors = builder.build().unwrap_err();
        assert_eq!(errors.errors(), &[FieldError::missing("author_id")]);
    }

    #[test]
    fn test_article_author_optional() {
        let item = NewItemBuilder::new(ContentType::Article)
            .with("title", "Ownership explained")
            .with("direction_id", "1")
            .with("difficulty", "middle")
            .with("language", "en")
            .with("edition_date", "2023-01-05")
            .build()
            .unwrap();
        assert_eq!(item.author_id, None);
        assert!(item.edition_date.is_some());
    }

    #[test]
    fn test_edition_date_unsupported_for_media() {
        for ct in [ContentType::Audio, ContentType::Video] {
            let errors = NewItemBuilder::new(ct)
                .with("title", "Talk")
                .with("direction_id", "1")
                .with("difficulty", "senior")
                .with("language", "en")
                .with("edition_date", "2023-01-05")
                .build()
                .unwrap_err();
            assert_eq!(errors.errors(), &[FieldError::unsupported("edition_date")]);
        }
    }

    #[test]
    fn test_errors_are_aggregated() {
        let errors = NewItemBuilder::new(ContentType::Book)
            .with("title", "DROP TABLE books")
            .with("direction_id", "abc")
            .with("difficulty", "guru")
            .with("web_url", "ftp://nope")
            .with("colour", "blue")
            .build()
            .unwrap_err();

        for field in [
            "colour",
            "title",
            "direction_id",
            "difficulty",
            "language",
            "author_id",
            "web_url",
        ] {
            assert!(errors.has(field), "expected error for {}", field);
        }
        assert_eq!(errors.errors()[0].kind, FieldErrorKind::Unknown);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let item = go_basics()
            .with("description", "   ")
            .with("web_url", "")
            .build()
            .unwrap();
        assert_eq!(item.description, "");
        assert_eq!(item.web_url, None);
    }

    #[test]
    fn test_description_screened() {
        let errors = go_basics()
            .with("description", "Alter *&^* Table ")
            .build()
            .unwrap_err();
        assert!(errors.has("description"));
    }
}
