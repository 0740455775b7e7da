//! Loose product model
//!
//! Products attached directly to a day plan, outside any meal.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{DbError, DbResult};
use crate::nutrition::normalize;
use super::{DayComposition, Product};

/// A product eaten on a day outside of its meals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct LooseProductAttachment {
    pub id: i64,
    pub day_id: i64,
    pub product: Product,
    #[serde(rename = "weight")]
    pub weight_grams: f64,
}

impl LooseProductAttachment {
    pub fn new(product: Product, weight_grams: f64) -> Self {
        Self { product, weight_grams, ..Default::default() }
    }
}

impl From<Map<String, Value>> for LooseProductAttachment {
    fn from(map: Map<String, Value>) -> Self {
        let product = match map.get("product") {
            Some(Value::Object(p)) => Product::from(p.clone()),
            _ => Product::default(),
        };
        let weight = normalize::first_number(&map, &["weight", "weightGrams"]);

        Self {
            id: normalize::lenient_id(&map, &["id"]),
            day_id: normalize::lenient_id(&map, &["dayId", "day_id"]),
            product,
            weight_grams: normalize::loose_weight(weight),
        }
    }
}

/// Data for attaching a loose product to a day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LooseProductCreate {
    pub day_id: i64,
    pub product_id: i64,
    /// Grams; absent means 100, negative means 0
    pub weight: Option<f64>,
}

/// Data for editing a loose product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LooseProductUpdate {
    pub product_id: Option<i64>,
    pub weight: Option<f64>,
}

impl LooseProductAttachment {
    fn resolve(conn: &Connection, row: &LooseRow) -> DbResult<Self> {
        let product = Product::get_by_id(conn, row.product_id)?
            .ok_or(DbError::NotFound { entity: "Product", id: row.product_id })?;

        Ok(Self {
            id: row.id,
            day_id: row.day_id,
            product,
            weight_grams: row.weight,
        })
    }

    /// Attach a product to a day
    pub fn create(conn: &Connection, data: &LooseProductCreate) -> DbResult<Self> {
        if DayComposition::get_by_id(conn, data.day_id)?.is_none() {
            return Err(DbError::NotFound { entity: "Day plan", id: data.day_id });
        }
        if Product::get_by_id(conn, data.product_id)?.is_none() {
            return Err(DbError::NotFound { entity: "Product", id: data.product_id });
        }

        conn.execute(
            "INSERT INTO loose_products_in_day (day_id, product_id, weight) VALUES (?1, ?2, ?3)",
            params![data.day_id, data.product_id, normalize::loose_weight(data.weight)],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound { entity: "Loose product", id })
    }

    /// Get a loose product by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, day_id, product_id, weight FROM loose_products_in_day WHERE id = ?1",
        )?;

        match stmt.query_row([id], LooseRow::from_row) {
            Ok(row) => Ok(Some(Self::resolve(conn, &row)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All loose products of a day, oldest first
    pub fn list_for_day(conn: &Connection, day_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, day_id, product_id, weight FROM loose_products_in_day WHERE day_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map([day_id], LooseRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter().map(|row| Self::resolve(conn, row)).collect()
    }

    /// Change the product or weight of a loose product
    pub fn update(conn: &Connection, id: i64, data: &LooseProductUpdate) -> DbResult<Option<Self>> {
        if let Some(product_id) = data.product_id {
            if Product::get_by_id(conn, product_id)?.is_none() {
                return Err(DbError::NotFound { entity: "Product", id: product_id });
            }
        }

        let tx = conn.unchecked_transaction()?;
        if let Some(product_id) = data.product_id {
            tx.execute(
                "UPDATE loose_products_in_day SET product_id = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![product_id, id],
            )?;
        }

        if let Some(weight) = data.weight {
            tx.execute(
                "UPDATE loose_products_in_day SET weight = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![normalize::loose_weight(Some(weight)), id],
            )?;
        }
        tx.commit()?;

        Self::get_by_id(conn, id)
    }

    /// Detach a loose product
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM loose_products_in_day WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

/// Raw table row before the product snapshot is resolved
struct LooseRow {
    id: i64,
    day_id: i64,
    product_id: i64,
    weight: f64,
}

impl LooseRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            day_id: row.get("day_id")?,
            product_id: row.get("product_id")?,
            weight: row.get("weight")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;
    use crate::models::{DayPlanCreate, ProductCreate};

    fn setup(conn: &Connection) -> (DayComposition, Product) {
        let day = DayComposition::create(
            conn,
            &DayPlanCreate { name: "Monday".to_string(), ..Default::default() },
        )
        .unwrap();
        let product = Product::create(
            conn,
            &ProductCreate {
                name: "Avocado".to_string(),
                calories_per_100: 160.0,
                protein_per_100: 2.0,
                carbs_per_100: 8.5,
                fat_per_100: 14.7,
                ..Default::default()
            },
        )
        .unwrap();
        (day, product)
    }

    #[test]
    fn test_deserialize_backend_loose_product() {
        let loose: LooseProductAttachment = serde_json::from_str(
            r#"{"id": 5, "dayId": 2, "product": {"id": 1, "name": "Apple", "kcal": 52}}"#,
        )
        .unwrap();
        assert_eq!(loose.day_id, 2);
        assert_eq!(loose.weight_grams, 100.0);
        assert_eq!(loose.product.calories_per_100, 52.0);

        let zero: LooseProductAttachment =
            serde_json::from_str(r#"{"id": 6, "dayId": 2, "product": {}, "weight": 0}"#).unwrap();
        assert_eq!(zero.weight_grams, 0.0);
    }

    #[test]
    fn test_attach_list_and_update() {
        let conn = test_conn();
        let (day, avocado) = setup(&conn);

        let first = LooseProductAttachment::create(
            &conn,
            &LooseProductCreate { day_id: day.id, product_id: avocado.id, weight: None },
        )
        .unwrap();
        assert_eq!(first.weight_grams, 100.0);

        LooseProductAttachment::create(
            &conn,
            &LooseProductCreate { day_id: day.id, product_id: avocado.id, weight: Some(-10.0) },
        )
        .unwrap();

        let listed = LooseProductAttachment::list_for_day(&conn, day.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].weight_grams, 0.0);

        let updated = LooseProductAttachment::update(
            &conn,
            first.id,
            &LooseProductUpdate { weight: Some(50.0), ..Default::default() },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.weight_grams, 50.0);
    }

    #[test]
    fn test_update_product_and_weight_together() {
        let conn = test_conn();
        let (day, avocado) = setup(&conn);
        let apple = Product::create(
            &conn,
            &ProductCreate { name: "Apple".to_string(), calories_per_100: 52.0, ..Default::default() },
        )
        .unwrap();
        let loose = LooseProductAttachment::create(
            &conn,
            &LooseProductCreate { day_id: day.id, product_id: avocado.id, weight: Some(30.0) },
        )
        .unwrap();

        let updated = LooseProductAttachment::update(
            &conn,
            loose.id,
            &LooseProductUpdate { product_id: Some(apple.id), weight: Some(120.0) },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.product.name, "Apple");
        assert_eq!(updated.weight_grams, 120.0);

        // an unknown product rejects the whole edit, weight included
        let result = LooseProductAttachment::update(
            &conn,
            loose.id,
            &LooseProductUpdate { product_id: Some(9999), weight: Some(5.0) },
        );
        assert!(matches!(result, Err(DbError::NotFound { entity: "Product", .. })));
        let unchanged = LooseProductAttachment::get_by_id(&conn, loose.id).unwrap().unwrap();
        assert_eq!(unchanged.weight_grams, 120.0);
        assert_eq!(unchanged.product.id, apple.id);
    }

    #[test]
    fn test_day_delete_cascades() {
        let conn = test_conn();
        let (day, avocado) = setup(&conn);
        LooseProductAttachment::create(
            &conn,
            &LooseProductCreate { day_id: day.id, product_id: avocado.id, weight: Some(30.0) },
        )
        .unwrap();
        assert_eq!(Product::usage(&conn, avocado.id).unwrap().day_plan_ids, vec![day.id]);

        DayComposition::delete(&conn, day.id).unwrap();
        assert!(LooseProductAttachment::list_for_day(&conn, day.id).unwrap().is_empty());
        assert!(Product::delete(&conn, avocado.id).unwrap());
    }

    #[test]
    fn test_unknown_day_rejected() {
        let conn = test_conn();
        let (_, avocado) = setup(&conn);
        let result = LooseProductAttachment::create(
            &conn,
            &LooseProductCreate { day_id: 77, product_id: avocado.id, weight: None },
        );
        assert!(matches!(result, Err(DbError::NotFound { entity: "Day plan", id: 77 })));
    }
}
