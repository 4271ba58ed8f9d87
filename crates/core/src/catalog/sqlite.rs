//! SQLite-backed catalog store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, ToSql};
use tracing::{debug, warn};

use super::{
    AssetPointers, CatalogError, CatalogItem, CatalogStore, ContentType, ItemPage, MetadataUpdate,
    NewItem, Tag,
};
use crate::query::{FilterMap, ListDescriptor, SortDirection};

const ITEM_COLUMNS: &str = "id, title, direction_id, sub_direction, difficulty, author_id, \
     edition_date, rating, rating_count, description, local_url, image_url, web_url, language, \
     download_count, created_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed catalog holding every content type and the reference tables.
pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

/// Map a rusqlite error, keeping constraint violations apart from real
/// database failures.
pub(super) fn db_err(e: rusqlite::Error) -> CatalogError {
    match &e {
        rusqlite::Error::SqliteFailure(err, msg) if err.code == ErrorCode::ConstraintViolation => {
            CatalogError::Constraint(msg.clone().unwrap_or_else(|| e.to_string()))
        }
        _ => CatalogError::Database(e.to_string()),
    }
}

fn not_found(content_type: ContentType, id: i64) -> CatalogError {
    CatalogError::NotFound(format!("{} {}", content_type, id))
}

/// Column backing a sortable field name.
fn sort_column(field: &str) -> Option<&'static str> {
    match field {
        "id" => Some("id"),
        "title" => Some("title"),
        "rating" => Some("rating"),
        "download_count" => Some("download_count"),
        "created_at" => Some("created_at"),
        "edition_date" => Some("edition_date"),
        "difficulty" => Some("difficulty"),
        "language" => Some("language"),
        _ => None,
    }
}

impl SqliteCatalogStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Internal("catalog connection lock poisoned".to_string()))
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS directions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            "#,
        )
        .map_err(db_err)?;

        for content_type in ContentType::ALL {
            conn.execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    direction_id INTEGER NOT NULL REFERENCES directions(id),
                    sub_direction TEXT,
                    difficulty TEXT NOT NULL,
                    author_id INTEGER REFERENCES authors(id),
                    edition_date TEXT,
                    rating REAL NOT NULL DEFAULT 0,
                    rating_sum REAL NOT NULL DEFAULT 0,
                    rating_count INTEGER NOT NULL DEFAULT 0,
                    description TEXT NOT NULL DEFAULT '',
                    local_url TEXT,
                    image_url TEXT,
                    web_url TEXT,
                    language TEXT NOT NULL,
                    download_count INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_{table}_direction ON {table}(direction_id);

                CREATE TABLE IF NOT EXISTS {tags} (
                    item_id INTEGER NOT NULL REFERENCES {table}(id) ON DELETE CASCADE,
                    tag_id INTEGER NOT NULL REFERENCES tags(id),
                    PRIMARY KEY (item_id, tag_id)
                );
                "#,
                table = content_type.table(),
                tags = content_type.tag_table(),
            ))
            .map_err(db_err)?;
        }

        Ok(())
    }

    fn row_to_item(content_type: ContentType, row: &rusqlite::Row) -> rusqlite::Result<CatalogItem> {
        let edition_date: Option<String> = row.get(6)?;
        let created_at_str: String = row.get(15)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(15, Type::Text, Box::new(e))
            })?;
        let edition_date = edition_date
            .map(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
            })?;

        Ok(CatalogItem {
            id: row.get(0)?,
            content_type,
            title: row.get(1)?,
            direction_id: row.get(2)?,
            sub_direction: row.get(3)?,
            difficulty: row.get(4)?,
            author_id: row.get(5)?,
            edition_date,
            rating: row.get(7)?,
            rating_count: row.get(8)?,
            description: row.get(9)?,
            local_url: row.get(10)?,
            image_url: row.get(11)?,
            web_url: row.get(12)?,
            language: row.get(13)?,
            tags: Vec::new(), // Loaded separately
            download_count: row.get(14)?,
            created_at,
        })
    }

    fn load_tags(
        conn: &Connection,
        content_type: ContentType,
        id: i64,
    ) -> Result<Vec<Tag>, CatalogError> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT t.id, t.name FROM tags t JOIN {} lt ON lt.tag_id = t.id
                 WHERE lt.item_id = ? ORDER BY t.id",
                content_type.tag_table()
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![id], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(db_err)?;

        let mut tags = Vec::new();
        for row in rows {
            tags.push(row.map_err(db_err)?);
        }
        Ok(tags)
    }

    fn insert_tags(
        conn: &Connection,
        content_type: ContentType,
        id: i64,
        tags: &[i64],
    ) -> Result<(), CatalogError> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (item_id, tag_id) VALUES (?, ?)",
            content_type.tag_table()
        );
        for tag_id in tags {
            conn.execute(&sql, params![id, tag_id]).map_err(db_err)?;
        }
        Ok(())
    }

    fn build_where_clause(
        content_type: ContentType,
        filters: &FilterMap,
    ) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        for (field, values) in filters {
            if values.is_empty() {
                continue;
            }
            let placeholders = vec!["?"; values.len()].join(", ");

            let condition = match field.as_str() {
                "direction" => format!("direction_id IN ({})", placeholders),
                "sub_direction" => format!("sub_direction IN ({})", placeholders),
                "difficulty" => format!("difficulty IN ({})", placeholders),
                "author" => format!("author_id IN ({})", placeholders),
                "language" => format!("language IN ({})", placeholders),
                "tag" => format!(
                    "EXISTS (SELECT 1 FROM {tags} lt WHERE lt.item_id = {table}.id AND lt.tag_id IN ({placeholders}))",
                    tags = content_type.tag_table(),
                    table = content_type.table(),
                    placeholders = placeholders,
                ),
                other => {
                    warn!(content_type = %content_type, field = other, "Ignoring unknown filter field");
                    continue;
                }
            };

            conditions.push(condition);
            // Difficulty is stored lowercase
            let lowercase = field == "difficulty";
            for value in values {
                let value = if lowercase {
                    value.to_lowercase()
                } else {
                    value.clone()
                };
                params.push(Box::new(value));
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn order_clause(content_type: ContentType, descriptor: &ListDescriptor) -> String {
        let Some(field) = descriptor.sort_field.as_deref() else {
            return "ORDER BY id ASC".to_string();
        };

        match sort_column(field) {
            Some(column) => {
                let direction = descriptor.sort_direction.unwrap_or(SortDirection::Asc);
                format!("ORDER BY {} {}, id ASC", column, direction.as_sql())
            }
            None => {
                warn!(content_type = %content_type, sort_by = field, "Ignoring unknown sort field");
                "ORDER BY id ASC".to_string()
            }
        }
    }

    /// Run a single-row UPDATE, reporting NotFound when no row matched.
    fn update_one(
        &self,
        content_type: ContentType,
        id: i64,
        set_clause: &str,
        value: &dyn ToSql,
    ) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                &format!("UPDATE {} SET {} WHERE id = ?", content_type.table(), set_clause),
                params![value, id],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(not_found(content_type, id));
        }
        Ok(())
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn insert(&self, item: &NewItem, assets: &AssetPointers) -> Result<i64, CatalogError> {
        let content_type = item.content_type;
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        tx.execute(
            &format!(
                "INSERT INTO {} (title, direction_id, sub_direction, difficulty, author_id, edition_date,
                                 description, local_url, image_url, web_url, language, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                content_type.table()
            ),
            params![
                &item.title,
                item.direction_id,
                &item.sub_direction,
                item.difficulty,
                item.author_id,
                item.edition_date.map(|d| d.format(DATE_FORMAT).to_string()),
                &item.description,
                &assets.local_url,
                &assets.image_url,
                &item.web_url,
                &item.language,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        let id = tx.last_insert_rowid();
        Self::insert_tags(&tx, content_type, id, &item.tags)?;
        tx.commit().map_err(db_err)?;

        debug!(content_type = %content_type, id, "Inserted catalog row");
        Ok(id)
    }

    fn get(&self, content_type: ContentType, id: i64) -> Result<CatalogItem, CatalogError> {
        let conn = self.lock()?;

        let mut item = conn
            .query_row(
                &format!("SELECT {} FROM {} WHERE id = ?", ITEM_COLUMNS, content_type.table()),
                params![id],
                |row| Self::row_to_item(content_type, row),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => not_found(content_type, id),
                _ => db_err(e),
            })?;

        item.tags = Self::load_tags(&conn, content_type, id)?;
        Ok(item)
    }

    fn exists(&self, content_type: ContentType, id: i64) -> Result<bool, CatalogError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?", content_type.table()),
                params![id],
                |_| Ok(()),
            )
            .optional()
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    fn list(
        &self,
        content_type: ContentType,
        descriptor: &ListDescriptor,
    ) -> Result<ItemPage, CatalogError> {
        let conn = self.lock()?;
        let table = content_type.table();
        let limit = descriptor.limit.max(1);

        let (where_clause, params) = Self::build_where_clause(content_type, &descriptor.filters);
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {} {}", table, where_clause),
                param_refs.as_slice(),
                |row| row.get(0),
            )
            .map_err(db_err)?;

        let sql = format!(
            "SELECT {} FROM {} {} {} LIMIT ? OFFSET ?",
            ITEM_COLUMNS,
            table,
            where_clause,
            Self::order_clause(content_type, descriptor)
        );

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;

        let limit_param = i64::from(limit);
        let offset_param = descriptor.offset() as i64;
        let mut all_params = param_refs;
        all_params.push(&limit_param);
        all_params.push(&offset_param);

        let rows = stmt
            .query_map(all_params.as_slice(), |row| Self::row_to_item(content_type, row))
            .map_err(db_err)?;

        let mut items = Vec::new();
        for row in rows {
            let mut item = row.map_err(db_err)?;
            item.tags = Self::load_tags(&conn, content_type, item.id)?;
            items.push(item);
        }

        Ok(ItemPage {
            items,
            total_pages: (total.max(0) as u64).div_ceil(u64::from(limit)),
        })
    }

    fn update_metadata(
        &self,
        content_type: ContentType,
        update: &MetadataUpdate,
    ) -> Result<(), CatalogError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref title) = update.title {
            sets.push("title = ?");
            params.push(Box::new(title.clone()));
        }
        if let Some(direction_id) = update.direction_id {
            sets.push("direction_id = ?");
            params.push(Box::new(direction_id));
        }
        if let Some(ref sub_direction) = update.sub_direction {
            sets.push("sub_direction = ?");
            params.push(Box::new(sub_direction.clone()));
        }
        if let Some(difficulty) = update.difficulty {
            sets.push("difficulty = ?");
            params.push(Box::new(difficulty));
        }
        if let Some(author_id) = update.author_id {
            sets.push("author_id = ?");
            params.push(Box::new(author_id));
        }
        if let Some(edition_date) = update.edition_date {
            sets.push("edition_date = ?");
            params.push(Box::new(edition_date.format(DATE_FORMAT).to_string()));
        }
        if let Some(ref description) = update.description {
            sets.push("description = ?");
            params.push(Box::new(description.clone()));
        }
        if let Some(ref language) = update.language {
            sets.push("language = ?");
            params.push(Box::new(language.clone()));
        }
        if let Some(ref web_url) = update.web_url {
            sets.push("web_url = ?");
            params.push(Box::new(web_url.clone()));
        }

        if sets.is_empty() {
            let found = tx
                .query_row(
                    &format!("SELECT 1 FROM {} WHERE id = ?", content_type.table()),
                    params![update.id],
                    |_| Ok(()),
                )
                .optional()
                .map_err(db_err)?;
            if found.is_none() {
                return Err(not_found(content_type, update.id));
            }
        } else {
            params.push(Box::new(update.id));
            let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let changed = tx
                .execute(
                    &format!(
                        "UPDATE {} SET {} WHERE id = ?",
                        content_type.table(),
                        sets.join(", ")
                    ),
                    param_refs.as_slice(),
                )
                .map_err(db_err)?;
            if changed == 0 {
                return Err(not_found(content_type, update.id));
            }
        }

        if let Some(ref tags) = update.tags {
            tx.execute(
                &format!("DELETE FROM {} WHERE item_id = ?", content_type.tag_table()),
                params![update.id],
            )
            .map_err(db_err)?;
            Self::insert_tags(&tx, content_type, update.id, tags)?;
        }

        tx.commit().map_err(db_err)
    }

    fn set_local_url(
        &self,
        content_type: ContentType,
        id: i64,
        local_url: Option<&str>,
    ) -> Result<(), CatalogError> {
        self.update_one(content_type, id, "local_url = ?", &local_url)
    }

    fn set_image_url(
        &self,
        content_type: ContentType,
        id: i64,
        image_url: Option<&str>,
    ) -> Result<(), CatalogError> {
        self.update_one(content_type, id, "image_url = ?", &image_url)
    }

    fn rate(&self, content_type: ContentType, id: i64, rating: f64) -> Result<f64, CatalogError> {
        let conn = self.lock()?;

        // Right-hand sides see the pre-update row, so one statement keeps
        // sum, count and mean consistent.
        conn.query_row(
            &format!(
                "UPDATE {} SET rating_sum = rating_sum + ?1,
                               rating_count = rating_count + 1,
                               rating = (rating_sum + ?1) / (rating_count + 1)
                 WHERE id = ?2
                 RETURNING rating",
                content_type.table()
            ),
            params![rating, id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => not_found(content_type, id),
            _ => db_err(e),
        })
    }

    fn bump_download_count(&self, content_type: ContentType, id: i64) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                &format!(
                    "UPDATE {} SET download_count = download_count + 1 WHERE id = ?",
                    content_type.table()
                ),
                params![id],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(not_found(content_type, id));
        }
        Ok(())
    }

    fn delete(&self, content_type: ContentType, id: i64) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                &format!("DELETE FROM {} WHERE id = ?", content_type.table()),
                params![id],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(not_found(content_type, id));
        }
        Ok(())
    }

    fn count(&self, content_type: ContentType) -> Result<u64, CatalogError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", content_type.table()),
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count.max(0) as u64)
    }
}
