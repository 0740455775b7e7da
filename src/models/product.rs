//! Product model
//!
//! The atomic nutritional record: macros per 100g.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{DbError, DbResult};
use crate::nutrition::normalize::{self, MacroField};
use super::{Category, CategoryRef};

/// A product with nutritional facts per 100g
///
/// Serializes under canonical names; deserializes from any of the
/// historical field names (see [`crate::nutrition::normalize`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub calories_per_100: f64,
    pub protein_per_100: f64,
    pub carbs_per_100: f64,
    pub fat_per_100: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar_per_100: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber_per_100: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt_per_100: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<Map<String, Value>> for Product {
    fn from(map: Map<String, Value>) -> Self {
        let category = map
            .get("category")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value::<CategoryRef>(v.clone()).ok());

        Self {
            id: normalize::lenient_id(&map, &["id"]),
            name: normalize::lenient_string(&map, &["name"]).unwrap_or_default(),
            calories_per_100: normalize::macro_per_100(&map, MacroField::Calories),
            protein_per_100: normalize::macro_per_100(&map, MacroField::Protein),
            carbs_per_100: normalize::macro_per_100(&map, MacroField::Carbs),
            fat_per_100: normalize::macro_per_100(&map, MacroField::Fat),
            sugar_per_100: normalize::optional_nutrient(&map, &["sugarPer100", "sugar"]),
            fiber_per_100: normalize::optional_nutrient(&map, &["fiberPer100", "fiber"]),
            salt_per_100: normalize::optional_nutrient(&map, &["saltPer100", "salt"]),
            category,
            reference_weight: normalize::first_number(&map, &["referenceWeight", "weight"]),
            unit: normalize::lenient_string(&map, &["unit"]),
            description: normalize::lenient_string(&map, &["description"]),
        }
    }
}

/// Data for creating a product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub category_id: Option<i64>,
    pub calories_per_100: f64,
    pub protein_per_100: f64,
    pub carbs_per_100: f64,
    pub fat_per_100: f64,
    pub sugar_per_100: Option<f64>,
    pub fiber_per_100: Option<f64>,
    pub salt_per_100: Option<f64>,
    pub reference_weight: Option<f64>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

/// Data for updating a product; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    /// Leave the product uncategorized (ignored when `category_id` is given)
    #[serde(default)]
    pub clear_category: bool,
    pub calories_per_100: Option<f64>,
    pub protein_per_100: Option<f64>,
    pub carbs_per_100: Option<f64>,
    pub fat_per_100: Option<f64>,
    pub sugar_per_100: Option<f64>,
    pub fiber_per_100: Option<f64>,
    pub salt_per_100: Option<f64>,
    pub reference_weight: Option<f64>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

/// Sort key for product listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Name,
    Calories,
    Protein,
}

impl ProductSort {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "calories" | "kcal" | "kcalper100" => ProductSort::Calories,
            "protein" | "proteins" => ProductSort::Protein,
            _ => ProductSort::Name,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            ProductSort::Name => "p.name COLLATE NOCASE ASC",
            ProductSort::Calories => "p.calories_per_100 DESC, p.name COLLATE NOCASE ASC",
            ProductSort::Protein => "p.protein_per_100 DESC, p.name COLLATE NOCASE ASC",
        }
    }
}

/// Where a product is referenced
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductUsage {
    pub meals: Vec<String>,
    pub day_plan_ids: Vec<i64>,
}

impl ProductUsage {
    pub fn is_empty(&self) -> bool {
        self.meals.is_empty() && self.day_plan_ids.is_empty()
    }
}

const SELECT_PRODUCT: &str = r#"
    SELECT p.*, c.name AS category_name
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

fn check_macros(values: &[Option<f64>]) -> DbResult<()> {
    if values.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(DbError::Validation(
            "Nutrition values must be non-negative numbers".to_string(),
        ));
    }
    Ok(())
}

impl Product {
    /// Build a product from a joined row (`SELECT_PRODUCT`)
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let category_id: Option<i64> = row.get("category_id")?;
        let category_name: Option<String> = row.get("category_name")?;
        let category = match (category_id, category_name) {
            (Some(id), Some(name)) => Some(CategoryRef::Full(Category { id, name })),
            (Some(id), None) => Some(CategoryRef::Id(id)),
            _ => None,
        };

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            calories_per_100: row.get("calories_per_100")?,
            protein_per_100: row.get("protein_per_100")?,
            carbs_per_100: row.get("carbs_per_100")?,
            fat_per_100: row.get("fat_per_100")?,
            sugar_per_100: row.get("sugar_per_100")?,
            fiber_per_100: row.get("fiber_per_100")?,
            salt_per_100: row.get("salt_per_100")?,
            category,
            reference_weight: row.get("reference_weight")?,
            unit: row.get("unit")?,
            description: row.get("description")?,
        })
    }

    /// Insert a new product
    pub fn create(conn: &Connection, data: &ProductCreate) -> DbResult<Self> {
        if data.name.trim().is_empty() {
            return Err(DbError::Validation("Product name is required".to_string()));
        }
        check_macros(&[
            Some(data.calories_per_100),
            Some(data.protein_per_100),
            Some(data.carbs_per_100),
            Some(data.fat_per_100),
            data.sugar_per_100,
            data.fiber_per_100,
            data.salt_per_100,
        ])?;
        if let Some(category_id) = data.category_id {
            if Category::get_by_id(conn, category_id)?.is_none() {
                return Err(DbError::NotFound { entity: "Category", id: category_id });
            }
        }

        conn.execute(
            r#"
            INSERT INTO products (
                name, category_id,
                calories_per_100, protein_per_100, carbs_per_100, fat_per_100,
                sugar_per_100, fiber_per_100, salt_per_100,
                reference_weight, unit, description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                data.name.trim(),
                data.category_id,
                data.calories_per_100,
                data.protein_per_100,
                data.carbs_per_100,
                data.fat_per_100,
                data.sugar_per_100,
                data.fiber_per_100,
                data.salt_per_100,
                data.reference_weight,
                data.unit,
                data.description,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound { entity: "Product", id })
    }

    /// Get a product by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let sql = format!("{} WHERE p.id = ?1", SELECT_PRODUCT);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row([id], Self::from_row) {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Find a product by exact (case-insensitive) name
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let sql = format!("{} WHERE p.name = ?1 COLLATE NOCASE LIMIT 1", SELECT_PRODUCT);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row([name.trim()], Self::from_row) {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List products with optional name search and category filter
    pub fn list(
        conn: &Connection,
        query: Option<&str>,
        category: Option<&str>,
        sort: ProductSort,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Self>> {
        let mut sql = format!("{} WHERE 1=1", SELECT_PRODUCT);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(q) = query.filter(|q| !q.trim().is_empty()) {
            params_vec.push(Box::new(format!("%{}%", q.trim())));
            sql.push_str(&format!(" AND p.name LIKE ?{}", params_vec.len()));
        }

        if let Some(cat) = category.filter(|c| !c.trim().is_empty()) {
            params_vec.push(Box::new(cat.trim().to_string()));
            sql.push_str(&format!(" AND c.name = ?{} COLLATE NOCASE", params_vec.len()));
        }

        sql.push_str(&format!(" ORDER BY {}", sort.order_by()));

        params_vec.push(Box::new(limit));
        sql.push_str(&format!(" LIMIT ?{}", params_vec.len()));

        params_vec.push(Box::new(offset));
        sql.push_str(&format!(" OFFSET ?{}", params_vec.len()));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let products = stmt
            .query_map(params_refs.as_slice(), Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    /// Count products matching the same filters as [`Product::list`]
    pub fn count(conn: &Connection, query: Option<&str>, category: Option<&str>) -> DbResult<i64> {
        let mut sql = String::from(
            "SELECT COUNT(*) FROM products p LEFT JOIN categories c ON c.id = p.category_id WHERE 1=1",
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(q) = query.filter(|q| !q.trim().is_empty()) {
            params_vec.push(Box::new(format!("%{}%", q.trim())));
            sql.push_str(&format!(" AND p.name LIKE ?{}", params_vec.len()));
        }

        if let Some(cat) = category.filter(|c| !c.trim().is_empty()) {
            params_vec.push(Box::new(cat.trim().to_string()));
            sql.push_str(&format!(" AND c.name = ?{} COLLATE NOCASE", params_vec.len()));
        }

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let count: i64 = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    /// Update a product
    pub fn update(conn: &Connection, id: i64, data: &ProductUpdate) -> DbResult<Option<Self>> {
        check_macros(&[
            data.calories_per_100,
            data.protein_per_100,
            data.carbs_per_100,
            data.fat_per_100,
            data.sugar_per_100,
            data.fiber_per_100,
            data.salt_per_100,
        ])?;
        if let Some(category_id) = data.category_id {
            if Category::get_by_id(conn, category_id)?.is_none() {
                return Err(DbError::NotFound { entity: "Category", id: category_id });
            }
        }

        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident, $col:expr) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        if let Some(ref name) = data.name {
            if name.trim().is_empty() {
                return Err(DbError::Validation("Product name is required".to_string()));
            }
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        add_update!(category_id, "category_id");
        if data.clear_category && data.category_id.is_none() {
            updates.push("category_id = NULL".to_string());
        }
        add_update!(calories_per_100, "calories_per_100");
        add_update!(protein_per_100, "protein_per_100");
        add_update!(carbs_per_100, "carbs_per_100");
        add_update!(fat_per_100, "fat_per_100");
        add_update!(sugar_per_100, "sugar_per_100");
        add_update!(fiber_per_100, "fiber_per_100");
        add_update!(salt_per_100, "salt_per_100");
        add_update!(reference_weight, "reference_weight");
        add_update!(unit, "unit");
        add_update!(description, "description");

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE products SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Meals and day plans that reference this product
    pub fn usage(conn: &Connection, id: i64) -> DbResult<ProductUsage> {
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT m.name FROM meals m
            INNER JOIN products_in_meal pim ON pim.meal_id = m.id
            WHERE pim.product_id = ?1
            ORDER BY m.name
            "#,
        )?;
        let meals = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT DISTINCT day_id FROM loose_products_in_day WHERE product_id = ?1 ORDER BY day_id",
        )?;
        let day_plan_ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ProductUsage { meals, day_plan_ids })
    }

    /// Delete a product
    ///
    /// Returns Ok(true) if deleted, Ok(false) if not found. Fails with a
    /// foreign key error while meals or loose attachments still use it.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;

    fn chicken() -> ProductCreate {
        ProductCreate {
            name: "Chicken Breast".to_string(),
            calories_per_100: 165.0,
            protein_per_100: 31.0,
            fat_per_100: 3.6,
            ..Default::default()
        }
    }

    #[test]
    fn test_deserialize_backend_names() {
        let p: Product = serde_json::from_str(
            r#"{"id": 1, "name": "Rice", "kcalPer100": 130, "proteins": 2.7,
                "carbohydrates": 28, "fat": 0.3, "sugar": 0.1,
                "category": {"id": 3, "name": "Carbs"}, "weight": 100, "unit": "g"}"#,
        )
        .unwrap();
        assert_eq!(p.calories_per_100, 130.0);
        assert_eq!(p.protein_per_100, 2.7);
        assert_eq!(p.carbs_per_100, 28.0);
        assert_eq!(p.fat_per_100, 0.3);
        assert_eq!(p.sugar_per_100, Some(0.1));
        assert_eq!(p.category.as_ref().and_then(|c| c.name()), Some("Carbs"));
        assert_eq!(p.reference_weight, Some(100.0));
    }

    #[test]
    fn test_canonical_round_trip() {
        let p = Product {
            id: 4,
            name: "Salmon".to_string(),
            calories_per_100: 206.0,
            protein_per_100: 22.0,
            fat_per_100: 13.0,
            ..Default::default()
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["caloriesPer100"], 206.0);
        let back: Product = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_missing_macros_default_to_zero() {
        let p: Product = serde_json::from_str(r#"{"id": 9, "name": "Mystery", "protein": null}"#).unwrap();
        assert_eq!(p.protein_per_100, 0.0);
        assert_eq!(p.calories_per_100, 0.0);
        assert!(p.category.is_none());
    }

    #[test]
    fn test_create_list_and_filter() {
        let conn = test_conn();
        let protein = Category::create(&conn, "Protein").unwrap();

        Product::create(&conn, &ProductCreate { category_id: Some(protein.id), ..chicken() }).unwrap();
        Product::create(
            &conn,
            &ProductCreate {
                name: "Brown Rice".to_string(),
                calories_per_100: 216.0,
                protein_per_100: 5.0,
                carbs_per_100: 45.0,
                fat_per_100: 1.8,
                ..Default::default()
            },
        )
        .unwrap();

        let by_cal = Product::list(&conn, None, None, ProductSort::Calories, 50, 0).unwrap();
        assert_eq!(by_cal[0].name, "Brown Rice");

        let in_protein = Product::list(&conn, None, Some("protein"), ProductSort::Name, 50, 0).unwrap();
        assert_eq!(in_protein.len(), 1);
        assert_eq!(in_protein[0].category.as_ref().and_then(|c| c.name()), Some("Protein"));

        assert_eq!(Product::count(&conn, Some("rice"), None).unwrap(), 1);
    }

    #[test]
    fn test_update_is_partial() {
        let conn = test_conn();
        let p = Product::create(&conn, &chicken()).unwrap();
        let updated = Product::update(
            &conn,
            p.id,
            &ProductUpdate { fat_per_100: Some(2.0), ..Default::default() },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.fat_per_100, 2.0);
        assert_eq!(updated.protein_per_100, 31.0);
    }

    #[test]
    fn test_update_clears_category() {
        let conn = test_conn();
        let protein = Category::create(&conn, "Protein").unwrap();
        let p = Product::create(&conn, &ProductCreate { category_id: Some(protein.id), ..chicken() }).unwrap();
        assert!(p.category.is_some());

        let kept = Product::update(
            &conn,
            p.id,
            &ProductUpdate { name: Some("Chicken".to_string()), ..Default::default() },
        )
        .unwrap()
        .unwrap();
        assert_eq!(kept.category.as_ref().and_then(|c| c.name()), Some("Protein"));

        let cleared = Product::update(
            &conn,
            p.id,
            &ProductUpdate { clear_category: true, ..Default::default() },
        )
        .unwrap()
        .unwrap();
        assert!(cleared.category.is_none());
        assert_eq!(cleared.name, "Chicken");
    }

    #[test]
    fn test_rejects_negative_macros() {
        let conn = test_conn();
        let result = Product::create(&conn, &ProductCreate { fat_per_100: -1.0, ..chicken() });
        assert!(matches!(result, Err(DbError::Validation(_))));
    }
}
