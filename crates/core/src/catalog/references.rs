//! Directions, authors and tags.

use rusqlite::params;

use super::sqlite::db_err;
use super::{Author, CatalogError, Direction, ReferenceStore, SqliteCatalogStore, Tag};

impl ReferenceStore for SqliteCatalogStore {
    fn list_directions(&self) -> Result<Vec<Direction>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name FROM directions ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Direction {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn create_direction(&self, name: &str) -> Result<Direction, CatalogError> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO directions (name) VALUES (?)", params![name])
            .map_err(db_err)?;
        Ok(Direction {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn list_authors(&self) -> Result<Vec<Author>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, full_name FROM authors ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Author {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                })
            })
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn create_author(&self, full_name: &str) -> Result<Author, CatalogError> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO authors (full_name) VALUES (?)", params![full_name])
            .map_err(db_err)?;
        Ok(Author {
            id: conn.last_insert_rowid(),
            full_name: full_name.to_string(),
        })
    }

    fn list_tags(&self) -> Result<Vec<Tag>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name FROM tags ORDER BY name")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn create_tag(&self, name: &str) -> Result<Tag, CatalogError> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO tags (name) VALUES (?)", params![name])
            .map_err(db_err)?;
        Ok(Tag {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }
}
