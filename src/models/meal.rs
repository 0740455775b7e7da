//! Meal model
//!
//! A meal is a named list of products with gram weights. Reads return
//! a [`MealComposition`]: the meal with full product snapshots embedded.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{DbError, DbResult};
use crate::nutrition::normalize;
use super::Product;

/// One product in a meal, with its portion in grams
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct MealLineItem {
    pub product: Product,
    #[serde(rename = "weight")]
    pub weight_grams: f64,
}

impl MealLineItem {
    pub fn new(product: Product, weight_grams: f64) -> Self {
        Self { product, weight_grams }
    }
}

impl From<Map<String, Value>> for MealLineItem {
    fn from(map: Map<String, Value>) -> Self {
        let product = match map.get("product") {
            Some(Value::Object(p)) => Product::from(p.clone()),
            _ => Product::default(),
        };
        let weight = normalize::first_number(&map, &["weight", "weightGrams"]);

        Self {
            product,
            weight_grams: normalize::line_item_weight(weight),
        }
    }
}

/// A meal with its line items resolved to product snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct MealComposition {
    pub id: i64,
    pub name: String,
    #[serde(rename = "recipe", skip_serializing_if = "Option::is_none")]
    pub recipe_text: Option<String>,
    #[serde(rename = "productsInMeal")]
    pub line_items: Vec<MealLineItem>,
}

impl From<Map<String, Value>> for MealComposition {
    fn from(map: Map<String, Value>) -> Self {
        // null or non-array productsInMeal is an empty meal; non-object entries are skipped
        let line_items = match map.get("productsInMeal") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(m) => Some(MealLineItem::from(m.clone())),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            id: normalize::lenient_id(&map, &["id"]),
            name: normalize::lenient_string(&map, &["name"]).unwrap_or_default(),
            recipe_text: normalize::lenient_string(&map, &["recipe"]),
            line_items,
        }
    }
}

/// A product reference when composing a meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealItemInput {
    pub product_id: i64,
    /// Grams; absent or zero means 100
    pub weight: Option<f64>,
}

/// Data for creating a meal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealCreate {
    pub name: String,
    pub recipe: Option<String>,
    #[serde(default)]
    pub items: Vec<MealItemInput>,
}

/// Data for updating a meal; `items`, when given, replaces every line item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealUpdate {
    pub name: Option<String>,
    pub recipe: Option<String>,
    pub items: Option<Vec<MealItemInput>>,
}

/// Lightweight listing row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealSummary {
    pub id: i64,
    pub name: String,
    pub item_count: i64,
}

impl MealSummary {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            item_count: row.get("item_count")?,
        })
    }
}

impl MealComposition {
    /// Insert a meal and its line items
    pub fn create(conn: &Connection, data: &MealCreate) -> DbResult<Self> {
        if data.name.trim().is_empty() {
            return Err(DbError::Validation("Meal name is required".to_string()));
        }
        check_products(conn, &data.items)?;

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO meals (name, recipe) VALUES (?1, ?2)",
            params![data.name.trim(), data.recipe],
        )?;
        let id = tx.last_insert_rowid();
        insert_items(&tx, id, &data.items)?;
        tx.commit()?;

        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound { entity: "Meal", id })
    }

    /// Get a meal with product snapshots, line items in stored order
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT id, name, recipe FROM meals WHERE id = ?1")?;

        let meal = match stmt.query_row([id], |row| {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
                recipe_text: row.get("recipe")?,
                line_items: Vec::new(),
            })
        }) {
            Ok(meal) => meal,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut stmt = conn.prepare(
            "SELECT product_id, weight FROM products_in_meal WHERE meal_id = ?1 ORDER BY position, id",
        )?;
        let rows = stmt
            .query_map([id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut line_items = Vec::with_capacity(rows.len());
        for (product_id, weight) in rows {
            let product = Product::get_by_id(conn, product_id)?
                .ok_or(DbError::NotFound { entity: "Product", id: product_id })?;
            line_items.push(MealLineItem::new(product, weight));
        }

        Ok(Some(Self { line_items, ..meal }))
    }

    /// List meals with optional name search
    pub fn list(
        conn: &Connection,
        query: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<MealSummary>> {
        let mut sql = String::from(
            r#"
            SELECT m.id, m.name, COUNT(pim.id) AS item_count
            FROM meals m
            LEFT JOIN products_in_meal pim ON pim.meal_id = m.id
            WHERE 1=1
            "#,
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(q) = query.filter(|q| !q.trim().is_empty()) {
            params_vec.push(Box::new(format!("%{}%", q.trim())));
            sql.push_str(&format!(" AND m.name LIKE ?{}", params_vec.len()));
        }

        sql.push_str(" GROUP BY m.id ORDER BY m.name COLLATE NOCASE");

        params_vec.push(Box::new(limit));
        sql.push_str(&format!(" LIMIT ?{}", params_vec.len()));

        params_vec.push(Box::new(offset));
        sql.push_str(&format!(" OFFSET ?{}", params_vec.len()));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let meals = stmt
            .query_map(params_refs.as_slice(), MealSummary::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(meals)
    }

    /// Update a meal's name, recipe and/or line items
    pub fn update(conn: &Connection, id: i64, data: &MealUpdate) -> DbResult<Option<Self>> {
        if !Self::exists(conn, id)? {
            return Ok(None);
        }
        if let Some(ref name) = data.name {
            if name.trim().is_empty() {
                return Err(DbError::Validation("Meal name is required".to_string()));
            }
        }
        if let Some(ref items) = data.items {
            check_products(conn, items)?;
        }

        let tx = conn.unchecked_transaction()?;

        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        if let Some(ref recipe) = data.recipe {
            updates.push(format!("recipe = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(recipe.clone()));
        }

        updates.push("updated_at = datetime('now')".to_string());
        let sql = format!(
            "UPDATE meals SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        tx.execute(&sql, params_refs.as_slice())?;

        if let Some(ref items) = data.items {
            tx.execute("DELETE FROM products_in_meal WHERE meal_id = ?1", [id])?;
            insert_items(&tx, id, items)?;
        }

        tx.commit()?;

        Self::get_by_id(conn, id)
    }

    fn exists(conn: &Connection, id: i64) -> DbResult<bool> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM meals WHERE id = ?1", [id], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Count meals matching the search
    pub fn count(conn: &Connection, query: Option<&str>) -> DbResult<i64> {
        let count: i64 = match query.filter(|q| !q.trim().is_empty()) {
            Some(q) => conn.query_row(
                "SELECT COUNT(*) FROM meals WHERE name LIKE ?1",
                [format!("%{}%", q.trim())],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM meals", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    /// Number of day plans with this meal in any slot
    pub fn day_plan_usage_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM meals_in_day
            WHERE breakfast_meal_id = ?1 OR second_breakfast_meal_id = ?1
               OR lunch_meal_id = ?1 OR afternoon_snack_meal_id = ?1
               OR dinner_meal_id = ?1 OR supper_meal_id = ?1
            "#,
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a meal; day plan slots holding it become empty
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM meals WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

fn check_products(conn: &Connection, items: &[MealItemInput]) -> DbResult<()> {
    for item in items {
        if Product::get_by_id(conn, item.product_id)?.is_none() {
            return Err(DbError::NotFound { entity: "Product", id: item.product_id });
        }
    }
    Ok(())
}

fn insert_items(conn: &Connection, meal_id: i64, items: &[MealItemInput]) -> DbResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO products_in_meal (meal_id, product_id, weight, position) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, item) in items.iter().enumerate() {
        stmt.execute(params![
            meal_id,
            item.product_id,
            normalize::line_item_weight(item.weight),
            position as i64,
        ])?;
    }
    Ok(())
}
