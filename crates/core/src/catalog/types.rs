//! Types for the learning-resource catalog.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of catalog item. Each kind has its own table, tag link table and
/// asset directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Book,
    Article,
    Audio,
    Video,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Book,
        ContentType::Article,
        ContentType::Audio,
        ContentType::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Book => "book",
            ContentType::Article => "article",
            ContentType::Audio => "audio",
            ContentType::Video => "video",
        }
    }

    /// Collection name, used for routes, table names and asset directories.
    pub fn plural(&self) -> &'static str {
        match self {
            ContentType::Book => "books",
            ContentType::Article => "articles",
            ContentType::Audio => "audios",
            ContentType::Video => "videos",
        }
    }

    /// Capitalized name used in response messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ContentType::Book => "Book",
            ContentType::Article => "Article",
            ContentType::Audio => "Audio",
            ContentType::Video => "Video",
        }
    }

    pub(crate) fn table(&self) -> &'static str {
        self.plural()
    }

    pub(crate) fn tag_table(&self) -> &'static str {
        match self {
            ContentType::Book => "book_tags",
            ContentType::Article => "article_tags",
            ContentType::Audio => "audio_tags",
            ContentType::Video => "video_tags",
        }
    }

    pub fn requires_author(&self) -> bool {
        matches!(self, ContentType::Book)
    }

    pub fn supports_edition_date(&self) -> bool {
        matches!(self, ContentType::Book | ContentType::Article)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown content type: {0}")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    /// Accepts both the singular and the collection name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|ct| s.eq_ignore_ascii_case(ct.as_str()) || s.eq_ignore_ascii_case(ct.plural()))
            .ok_or_else(|| UnknownContentType(s.to_string()))
    }
}

/// Target audience level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Junior,
    Middle,
    Senior,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Junior, Difficulty::Middle, Difficulty::Senior];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Junior => "junior",
            Difficulty::Middle => "middle",
            Difficulty::Senior => "senior",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Difficulty::ALL
            .into_iter()
            .find(|d| raw.eq_ignore_ascii_case(d.as_str()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Difficulty {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Difficulty {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Difficulty::parse(raw).ok_or_else(|| FromSqlError::Other(format!("bad difficulty {raw:?}").into()))
    }
}

/// A tag attached to catalog items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Category an item belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Direction {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub full_name: String,
}

/// One catalog entry as stored and served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
    pub direction_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_direction: Option<String>,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition_date: Option<NaiveDate>,
    /// Running mean of submitted ratings, 0.0 until the first one.
    pub rating: f64,
    pub rating_count: i64,
    pub description: String,
    /// Filename of the primary asset; `None` when no file was uploaded.
    pub local_url: Option<String>,
    /// Filename of the cover image; `None` when no image was uploaded.
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    pub language: String,
    pub tags: Vec<Tag>,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Validated fields of an item about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub content_type: ContentType,
    pub title: String,
    pub direction_id: i64,
    pub sub_direction: Option<String>,
    pub difficulty: Difficulty,
    pub author_id: Option<i64>,
    pub edition_date: Option<NaiveDate>,
    pub description: String,
    pub language: String,
    pub web_url: Option<String>,
    pub tags: Vec<i64>,
}

/// Asset filenames recorded with a new row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPointers {
    pub local_url: Option<String>,
    pub image_url: Option<String>,
}

/// Metadata-only partial update. Asset pointers are not part of this type,
/// and unknown JSON fields (such as `local_url`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub direction_id: Option<i64>,
    #[serde(default)]
    pub sub_direction: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(default)]
    pub edition_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    /// Replaces the item's tag set when present.
    #[serde(default)]
    pub tags: Option<Vec<i64>>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.direction_id.is_none()
            && self.sub_direction.is_none()
            && self.difficulty.is_none()
            && self.author_id.is_none()
            && self.edition_date.is_none()
            && self.description.is_none()
            && self.language.is_none()
            && self.web_url.is_none()
            && self.tags.is_none()
    }
}

/// One page of a list query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemPage {
    pub items: Vec<CatalogItem>,
    pub total_pages: u64,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Foreign key or uniqueness violation, caused by the request.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
