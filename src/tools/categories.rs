//! Category MCP Tools

use serde::Serialize;
use tracing::{debug, info};

use crate::db::Database;
use crate::models::Category;

/// Category with its product count
#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    pub product_count: i64,
}

/// Response for list_categories
#[derive(Debug, Serialize)]
pub struct ListCategoriesResponse {
    pub categories: Vec<CategorySummary>,
    pub total: usize,
}

/// Response for delete_category
#[derive(Debug, Serialize)]
pub struct DeleteCategoryResponse {
    pub success: bool,
    pub deleted_id: i64,
    /// Products left without a category
    pub products_uncategorized: i64,
}

/// Add a new category
pub fn add_category(db: &Database, name: &str) -> Result<Category, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Category::get_by_name(&conn, name)
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err(format!("Category already exists: {}", name.trim()));
    }

    let category = Category::create(&conn, name)
        .map_err(|e| format!("Failed to create category: {}", e))?;

    info!(id = category.id, name = %category.name, "category created");
    Ok(category)
}

/// List all categories with product counts
pub fn list_categories(db: &Database) -> Result<ListCategoriesResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let categories = Category::list(&conn)
        .map_err(|e| format!("Failed to list categories: {}", e))?;

    let mut summaries = Vec::with_capacity(categories.len());
    for category in categories {
        let product_count = Category::product_count(&conn, category.id)
            .map_err(|e| format!("Failed to count products: {}", e))?;
        summaries.push(CategorySummary {
            id: category.id,
            name: category.name,
            product_count,
        });
    }

    debug!(count = summaries.len(), "categories listed");
    let total = summaries.len();
    Ok(ListCategoriesResponse { categories: summaries, total })
}

/// Rename a category
pub fn update_category(db: &Database, id: i64, name: &str) -> Result<Option<Category>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = Category::update(&conn, id, name)
        .map_err(|e| format!("Failed to update category: {}", e))?;

    if updated.is_some() {
        info!(id, name = name.trim(), "category renamed");
    }
    Ok(updated)
}

/// Delete a category; its products stay, uncategorized
pub fn delete_category(db: &Database, id: i64) -> Result<DeleteCategoryResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Category::get_by_id(&conn, id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Category not found with id: {}", id));
    }

    let products_uncategorized = Category::product_count(&conn, id)
        .map_err(|e| format!("Failed to count products: {}", e))?;

    Category::delete(&conn, id).map_err(|e| format!("Failed to delete category: {}", e))?;

    info!(id, products_uncategorized, "category deleted");
    Ok(DeleteCategoryResponse {
        success: true,
        deleted_id: id,
        products_uncategorized,
    })
}
