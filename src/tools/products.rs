//! Product MCP Tools
//!
//! Tools for managing the product catalog.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::models::{Product, ProductCreate, ProductSort, ProductUpdate, ProductUsage};

/// Summary of a product for list results
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub calories_per_100: f64,
    pub protein_per_100: f64,
    pub carbs_per_100: f64,
    pub fat_per_100: f64,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            category: p.category.as_ref().and_then(|c| c.name()).map(str::to_string),
            calories_per_100: p.calories_per_100,
            protein_per_100: p.protein_per_100,
            carbs_per_100: p.carbs_per_100,
            fat_per_100: p.fat_per_100,
        }
    }
}

/// Full product detail with usage information
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub used_in_meals: Vec<String>,
    pub loose_in_day_plans: Vec<i64>,
}

/// Response for list_products
#[derive(Debug, Serialize)]
pub struct ListProductsResponse {
    pub items: Vec<ProductSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for delete_product blocked
#[derive(Debug, Serialize)]
pub struct DeleteProductBlockedResponse {
    pub error: String,
    pub used_in_meals: Vec<String>,
    pub loose_in_day_plans: Vec<i64>,
}

/// Response for successful delete_product
#[derive(Debug, Serialize)]
pub struct DeleteProductSuccessResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Add a new product
pub fn add_product(db: &Database, data: ProductCreate) -> Result<Product, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let product = Product::create(&conn, &data)
        .map_err(|e| format!("Failed to create product: {}", e))?;

    info!(id = product.id, name = %product.name, "product created");
    Ok(product)
}

/// Get a product by ID with usage information
pub fn get_product(db: &Database, id: i64) -> Result<Option<ProductDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let product = Product::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get product: {}", e))?;

    match product {
        Some(product) => {
            let ProductUsage { meals, day_plan_ids } = Product::usage(&conn, id)
                .map_err(|e| format!("Failed to get product usage: {}", e))?;

            Ok(Some(ProductDetail {
                product,
                used_in_meals: meals,
                loose_in_day_plans: day_plan_ids,
            }))
        }
        None => Ok(None),
    }
}

/// List products with search, category filter, sorting and pagination
pub fn list_products(
    db: &Database,
    query: Option<&str>,
    category: Option<&str>,
    sort_by: &str,
    limit: i64,
    offset: i64,
) -> Result<ListProductsResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);
    let sort = ProductSort::parse(sort_by);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let products = Product::list(&conn, query, category, sort, limit, offset)
        .map_err(|e| format!("Failed to list products: {}", e))?;

    let total = Product::count(&conn, query, category)
        .map_err(|e| format!("Failed to count products: {}", e))?;

    debug!(returned = products.len(), total, "products listed");

    Ok(ListProductsResponse {
        items: products.iter().map(ProductSummary::from).collect(),
        total,
        limit,
        offset,
    })
}

/// Update a product; meals and day plans pick the change up on next read
pub fn update_product(db: &Database, id: i64, data: ProductUpdate) -> Result<Product, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = Product::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update product: {}", e))?;

    match updated {
        Some(product) => {
            info!(id, name = %product.name, "product updated");
            Ok(product)
        }
        None => Err(format!("Product not found with id: {}", id)),
    }
}

/// Delete a product (blocked while any meal or day plan uses it)
pub fn delete_product(
    db: &Database,
    id: i64,
) -> Result<Result<DeleteProductSuccessResponse, DeleteProductBlockedResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let product = Product::get_by_id(&conn, id)
        .map_err(|e| format!("Database error: {}", e))?;
    if product.is_none() {
        return Err(format!("Product not found with id: {}", id));
    }

    let usage = Product::usage(&conn, id)
        .map_err(|e| format!("Failed to check usage: {}", e))?;

    if !usage.is_empty() {
        warn!(id, meals = usage.meals.len(), day_plans = usage.day_plan_ids.len(), "product delete blocked");
        return Ok(Err(DeleteProductBlockedResponse {
            error: format!(
                "Cannot delete product: used in {} meal(s) and {} day plan(s)",
                usage.meals.len(),
                usage.day_plan_ids.len()
            ),
            used_in_meals: usage.meals,
            loose_in_day_plans: usage.day_plan_ids,
        }));
    }

    Product::delete(&conn, id).map_err(|e| format!("Failed to delete product: {}", e))?;

    info!(id, "product deleted");
    Ok(Ok(DeleteProductSuccessResponse {
        success: true,
        deleted_id: id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use crate::models::{MealComposition, MealCreate, MealItemInput};

    fn test_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(migrations::run_migrations).unwrap();
        db
    }

    fn salmon() -> ProductCreate {
        ProductCreate {
            name: "Salmon".to_string(),
            calories_per_100: 206.0,
            protein_per_100: 22.0,
            fat_per_100: 13.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_list_sorted_by_protein() {
        let db = test_db();
        add_product(&db, salmon()).unwrap();
        add_product(
            &db,
            ProductCreate {
                name: "Broccoli".to_string(),
                calories_per_100: 55.0,
                protein_per_100: 3.7,
                carbs_per_100: 11.2,
                fat_per_100: 0.6,
                ..Default::default()
            },
        )
        .unwrap();

        let resp = list_products(&db, None, None, "protein", 50, 0).unwrap();
        assert_eq!(resp.total, 2);
        assert_eq!(resp.items[0].name, "Salmon");

        let resp = list_products(&db, Some("broc"), None, "name", 50, 0).unwrap();
        assert_eq!(resp.items.len(), 1);
    }

    #[test]
    fn test_delete_blocked_while_in_meal() {
        let db = test_db();
        let product = add_product(&db, salmon()).unwrap();
        db.with_conn(|conn| {
            MealComposition::create(
                conn,
                &MealCreate {
                    name: "Salmon dinner".to_string(),
                    items: vec![MealItemInput { product_id: product.id, weight: Some(180.0) }],
                    ..Default::default()
                },
            )
        })
        .unwrap();

        let blocked = delete_product(&db, product.id).unwrap().unwrap_err();
        assert_eq!(blocked.used_in_meals, vec!["Salmon dinner".to_string()]);

        let detail = get_product(&db, product.id).unwrap().unwrap();
        assert_eq!(detail.used_in_meals.len(), 1);
    }

    #[test]
    fn test_delete_unused_product() {
        let db = test_db();
        let product = add_product(&db, salmon()).unwrap();
        let ok = delete_product(&db, product.id).unwrap().unwrap();
        assert!(ok.success);
        assert!(get_product(&db, product.id).unwrap().is_none());
    }
}
