//! Category model
//!
//! Product categories ("Protein", "Vegetables", ...).

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// A product category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// How a product refers to its category on the wire
///
/// Upstream records carry either the full `{id, name}` object, a bare id
/// or just the name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Full(Category),
    Id(i64),
    Name(String),
}

impl CategoryRef {
    /// Display name, when the reference carries one
    pub fn name(&self) -> Option<&str> {
        match self {
            CategoryRef::Full(c) => Some(c.name.as_str()),
            CategoryRef::Name(n) => Some(n.as_str()),
            CategoryRef::Id(_) => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            CategoryRef::Full(c) => Some(c.id),
            CategoryRef::Id(id) => Some(*id),
            CategoryRef::Name(_) => None,
        }
    }
}

impl Category {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }

    /// Create a new category
    pub fn create(conn: &Connection, name: &str) -> DbResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::Validation("Category name is required".to_string()));
        }

        conn.execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound { entity: "Category", id })
    }

    /// Get a category by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT id, name FROM categories WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Find a category by exact (case-insensitive) name
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, name FROM categories WHERE name = ?1 COLLATE NOCASE")?;

        match stmt.query_row([name.trim()], Self::from_row) {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get or create a category by name
    pub fn get_or_create(conn: &Connection, name: &str) -> DbResult<Self> {
        match Self::get_by_name(conn, name)? {
            Some(category) => Ok(category),
            None => Self::create(conn, name),
        }
    }

    /// List all categories ordered by name
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name COLLATE NOCASE")?;

        let categories = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Rename a category
    pub fn update(conn: &Connection, id: i64, name: &str) -> DbResult<Option<Self>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::Validation("Category name is required".to_string()));
        }

        conn.execute(
            "UPDATE categories SET name = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![name, id],
        )?;

        Self::get_by_id(conn, id)
    }

    /// Number of products in a category
    pub fn product_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM products WHERE category_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a category; its products become uncategorized
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;

    #[test]
    fn test_create_and_rename() {
        let conn = test_conn();
        let cat = Category::create(&conn, " Protein ").unwrap();
        assert_eq!(cat.name, "Protein");

        let renamed = Category::update(&conn, cat.id, "Proteins").unwrap().unwrap();
        assert_eq!(renamed.name, "Proteins");
        assert!(Category::create(&conn, "   ").is_err());
    }

    #[test]
    fn test_get_or_create_is_case_insensitive() {
        let conn = test_conn();
        let a = Category::get_or_create(&conn, "Fats").unwrap();
        let b = Category::get_or_create(&conn, "fats").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(Category::list(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_category_ref_shapes() {
        let full: CategoryRef = serde_json::from_str(r#"{"id": 5, "name": "Protein"}"#).unwrap();
        assert_eq!(full.name(), Some("Protein"));
        assert_eq!(full.id(), Some(5));

        let id: CategoryRef = serde_json::from_str("3").unwrap();
        assert_eq!(id, CategoryRef::Id(3));

        let name: CategoryRef = serde_json::from_str(r#""Carbs""#).unwrap();
        assert_eq!(name.name(), Some("Carbs"));
    }
}
