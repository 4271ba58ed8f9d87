use super::rules::{self, DESCRIPTION_MAX, LANGUAGE_MAX, LANGUAGE_MIN, SUB_DIRECTION_MAX, TITLE_MAX};
use super::{FieldError, ValidationErrors};
use crate::catalog::{ContentType, MetadataUpdate};

impl MetadataUpdate {
    /// Apply the create-form rules to every supplied field.
    pub fn validate(&self, content_type: ContentType) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.collect(rules::positive_id("id", self.id));

        if let Some(ref title) = self.title {
            errors.collect(rules::text("title", title.trim(), 1, TITLE_MAX));
        }
        if let Some(direction_id) = self.direction_id {
            errors.collect(rules::positive_id("direction_id", direction_id));
        }
        if let Some(ref sub_direction) = self.sub_direction {
            errors.collect(rules::text(
                "sub_direction",
                sub_direction.trim(),
                1,
                SUB_DIRECTION_MAX,
            ));
        }
        if let Some(author_id) = self.author_id {
            errors.collect(rules::positive_id("author_id", author_id));
        }
        if self.edition_date.is_some() && !content_type.supports_edition_date() {
            errors.push(FieldError::unsupported("edition_date"));
        }
        if let Some(ref description) = self.description {
            errors.collect(rules::text("description", description, 0, DESCRIPTION_MAX));
        }
        if let Some(ref language) = self.language {
            errors.collect(rules::text(
                "language",
                language.trim(),
                LANGUAGE_MIN,
                LANGUAGE_MAX,
            ));
        }
        if let Some(ref web_url) = self.web_url {
            errors.collect(rules::http_url("web_url", web_url));
        }
        if let Some(ref tags) = self.tags {
            errors.collect(rules::tag_ids("tags", tags));
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_valid_partial_update() {
        let update = MetadataUpdate {
            id: 1,
            title: Some("Go Basics".to_string()),
            tags: Some(vec![1, 2]),
            ..Default::default()
        };
        assert!(update.validate(ContentType::Book).is_ok());
    }

    #[test]
    fn test_id_required() {
        let errors = MetadataUpdate::default()
            .validate(ContentType::Book)
            .unwrap_err();
        assert!(errors.has("id"));
    }

    #[test]
    fn test_sql_in_text_fields_rejected() {
        let update = MetadataUpdate {
            id: 1,
            title: Some("union all".to_string()),
            description: Some("a*&(lter".to_string()),
            ..Default::default()
        };
        let errors = update.validate(ContentType::Article).unwrap_err();
        assert!(errors.has("title"));
        assert!(errors.has("description"));
    }

    #[test]
    fn test_edition_date_rules_per_type() {
        let update = MetadataUpdate {
            id: 1,
            edition_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..Default::default()
        };
        assert!(update.validate(ContentType::Article).is_ok());
        assert!(update.validate(ContentType::Video).is_err());
    }

    #[test]
    fn test_blank_title_rejected() {
        let update = MetadataUpdate {
            id: 1,
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(update.validate(ContentType::Book).is_err());
    }

    #[test]
    fn test_bad_ids_and_url() {
        let update = MetadataUpdate {
            id: 1,
            direction_id: Some(0),
            tags: Some(vec![3, -1]),
            web_url: Some("javascript:alert(1)".to_string()),
            ..Default::default()
        };
        let errors = update.validate(ContentType::Book).unwrap_err();
        assert!(errors.has("direction_id"));
        assert!(errors.has("tags"));
        assert!(errors.has("web_url"));
    }
}
