//! Meal MCP Tools
//!
//! Meals are returned with their totals recomputed from the current
//! product snapshots.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::models::{MealComposition, MealCreate, MealUpdate};
use crate::nutrition::{aggregate_meal, scale_product, MacroTotals};

/// One line item with its contribution
#[derive(Debug, Serialize)]
pub struct MealLineDetail {
    pub product_id: i64,
    pub product_name: String,
    pub weight_grams: f64,
    pub totals: MacroTotals,
}

/// Full meal detail response
#[derive(Debug, Serialize)]
pub struct MealDetail {
    pub id: i64,
    pub name: String,
    pub recipe: Option<String>,
    pub items: Vec<MealLineDetail>,
    /// Rounded for display
    pub display: MacroTotals,
    pub totals: MacroTotals,
    pub used_in_day_plans: i64,
}

impl MealDetail {
    pub fn from_meal(meal: MealComposition, used_in_day_plans: i64) -> Self {
        let totals = aggregate_meal(&meal);
        let items = meal
            .line_items
            .iter()
            .map(|item| MealLineDetail {
                product_id: item.product.id,
                product_name: item.product.name.clone(),
                weight_grams: item.weight_grams,
                totals: scale_product(&item.product, item.weight_grams),
            })
            .collect();

        Self {
            id: meal.id,
            name: meal.name,
            recipe: meal.recipe_text,
            items,
            display: totals.rounded(),
            totals,
            used_in_day_plans,
        }
    }
}

/// Summary of a meal for list results
#[derive(Debug, Serialize)]
pub struct MealSummaryWithTotals {
    pub id: i64,
    pub name: String,
    pub item_count: usize,
    pub totals: MacroTotals,
}

/// Response for list_meals
#[derive(Debug, Serialize)]
pub struct ListMealsResponse {
    pub items: Vec<MealSummaryWithTotals>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for delete_meal
#[derive(Debug, Serialize)]
pub struct DeleteMealResponse {
    pub success: bool,
    pub deleted_id: i64,
    /// Day plans whose slot holding this meal was emptied
    pub day_plans_affected: i64,
}

/// Create a meal
pub fn create_meal(db: &Database, data: MealCreate) -> Result<MealDetail, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let meal = MealComposition::create(&conn, &data)
        .map_err(|e| format!("Failed to create meal: {}", e))?;

    info!(id = meal.id, name = %meal.name, items = meal.line_items.len(), "meal created");
    Ok(MealDetail::from_meal(meal, 0))
}

/// Get a meal with per-item contributions and totals
pub fn get_meal(db: &Database, id: i64) -> Result<Option<MealDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let meal = MealComposition::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get meal: {}", e))?;

    match meal {
        Some(meal) => {
            let used = MealComposition::day_plan_usage_count(&conn, id)
                .map_err(|e| format!("Failed to get meal usage: {}", e))?;
            Ok(Some(MealDetail::from_meal(meal, used)))
        }
        None => Ok(None),
    }
}

/// Computed total a meal listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TotalsSort {
    Calories,
    Protein,
}

impl TotalsSort {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "calories" | "kcal" => Some(Self::Calories),
            "protein" | "proteins" => Some(Self::Protein),
            _ => None,
        }
    }

    fn key(&self, totals: &MacroTotals) -> f64 {
        match self {
            Self::Calories => totals.calories,
            Self::Protein => totals.protein,
        }
    }
}

/// List meals with totals
///
/// Sorting by `calories` or `protein` orders every matching meal by
/// computed totals, highest first, before the page is cut.
pub fn list_meals(
    db: &Database,
    query: Option<&str>,
    sort_by: &str,
    limit: i64,
    offset: i64,
) -> Result<ListMealsResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);
    let sort = TotalsSort::parse(sort_by);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    // totals are not stored, so a totals sort has to see every match (LIMIT -1)
    let (sql_limit, sql_offset) = if sort.is_some() { (-1, 0) } else { (limit, offset) };
    let summaries = MealComposition::list(&conn, query, sql_limit, sql_offset)
        .map_err(|e| format!("Failed to list meals: {}", e))?;
    let total = MealComposition::count(&conn, query)
        .map_err(|e| format!("Failed to count meals: {}", e))?;

    let mut items = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let meal = MealComposition::get_by_id(&conn, summary.id)
            .map_err(|e| format!("Failed to load meal {}: {}", summary.id, e))?;
        if let Some(meal) = meal {
            items.push(MealSummaryWithTotals {
                id: meal.id,
                item_count: meal.line_items.len(),
                totals: aggregate_meal(&meal),
                name: meal.name,
            });
        }
    }

    if let Some(sort) = sort {
        // stable sort keeps name order among equal totals
        items.sort_by(|a, b| sort.key(&b.totals).total_cmp(&sort.key(&a.totals)));
        items = items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
    }

    debug!(returned = items.len(), total, "meals listed");

    Ok(ListMealsResponse { items, total, limit, offset })
}

/// Update a meal
pub fn update_meal(db: &Database, id: i64, data: MealUpdate) -> Result<MealDetail, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = MealComposition::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update meal: {}", e))?;

    match updated {
        Some(meal) => {
            let used = MealComposition::day_plan_usage_count(&conn, id)
                .map_err(|e| format!("Failed to get meal usage: {}", e))?;
            info!(id, items = meal.line_items.len(), "meal updated");
            Ok(MealDetail::from_meal(meal, used))
        }
        None => Err(format!("Meal not found with id: {}", id)),
    }
}

/// Delete a meal; day plan slots holding it become empty
pub fn delete_meal(db: &Database, id: i64) -> Result<DeleteMealResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let day_plans_affected = MealComposition::day_plan_usage_count(&conn, id)
        .map_err(|e| format!("Failed to get meal usage: {}", e))?;

    let deleted = MealComposition::delete(&conn, id)
        .map_err(|e| format!("Failed to delete meal: {}", e))?;
    if !deleted {
        return Err(format!("Meal not found with id: {}", id));
    }

    if day_plans_affected > 0 {
        warn!(id, day_plans_affected, "deleted meal was planned; slots emptied");
    }
    info!(id, "meal deleted");

    Ok(DeleteMealResponse {
        success: true,
        deleted_id: id,
        day_plans_affected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use crate::models::{MealItemInput, Product, ProductCreate};

    fn test_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(migrations::run_migrations).unwrap();
        db
    }

    fn add(db: &Database, name: &str, kcal: f64, protein: f64, carbs: f64, fat: f64) -> i64 {
        db.with_conn(|conn| {
            Product::create(
                conn,
                &ProductCreate {
                    name: name.to_string(),
                    calories_per_100: kcal,
                    protein_per_100: protein,
                    carbs_per_100: carbs,
                    fat_per_100: fat,
                    ..Default::default()
                },
            )
        })
        .unwrap()
        .id
    }

    #[test]
    fn test_meal_detail_totals() {
        let db = test_db();
        let chicken = add(&db, "Chicken Breast", 165.0, 31.0, 0.0, 3.6);
        let rice = add(&db, "Brown Rice", 216.0, 5.0, 45.0, 1.8);

        let detail = create_meal(
            &db,
            MealCreate {
                name: "Chicken & rice".to_string(),
                recipe: Some("Cook rice, grill chicken.".to_string()),
                items: vec![
                    MealItemInput { product_id: chicken, weight: Some(150.0) },
                    MealItemInput { product_id: rice, weight: Some(0.0) },
                ],
            },
        )
        .unwrap();

        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[1].weight_grams, 100.0);
        assert!((detail.totals.calories - (247.5 + 216.0)).abs() < 0.001);
        assert!((detail.totals.protein - (46.5 + 5.0)).abs() < 0.001);
        assert_eq!(detail.display.calories, 464.0);
        assert_eq!(detail.display.fat, 7.2);
    }

    #[test]
    fn test_list_meals_sorted_by_calories() {
        let db = test_db();
        let broccoli = add(&db, "Broccoli", 55.0, 3.7, 11.2, 0.6);
        let salmon = add(&db, "Salmon", 206.0, 22.0, 0.0, 13.0);

        for (name, product_id) in [("Greens", broccoli), ("Fish", salmon)] {
            create_meal(
                &db,
                MealCreate {
                    name: name.to_string(),
                    items: vec![MealItemInput { product_id, weight: None }],
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let by_name = list_meals(&db, None, "name", 50, 0).unwrap();
        assert_eq!(by_name.items[0].name, "Fish");

        let by_kcal = list_meals(&db, None, "calories", 50, 0).unwrap();
        assert_eq!(by_kcal.items[0].name, "Fish");
        assert_eq!(by_kcal.items[1].totals.calories, 55.0);
    }

    #[test]
    fn test_calorie_sort_spans_pages() {
        let db = test_db();
        let apple = add(&db, "Apple", 50.0, 0.3, 14.0, 0.2);
        let pasta = add(&db, "Pasta", 800.0, 25.0, 150.0, 6.0);

        for (name, product_id) in [("Apple slices", apple), ("Zucchini pasta", pasta)] {
            create_meal(
                &db,
                MealCreate {
                    name: name.to_string(),
                    items: vec![MealItemInput { product_id, weight: None }],
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let first = list_meals(&db, None, "calories", 1, 0).unwrap();
        assert_eq!(first.total, 2);
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].name, "Zucchini pasta");

        let second = list_meals(&db, None, "calories", 1, 1).unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].name, "Apple slices");

        let by_name = list_meals(&db, None, "name", 1, 0).unwrap();
        assert_eq!(by_name.items[0].name, "Apple slices");
    }

    #[test]
    fn test_product_edit_flows_into_meal() {
        let db = test_db();
        let salmon = add(&db, "Salmon", 206.0, 22.0, 0.0, 13.0);
        let meal = create_meal(
            &db,
            MealCreate {
                name: "Fish".to_string(),
                items: vec![MealItemInput { product_id: salmon, weight: Some(200.0) }],
                ..Default::default()
            },
        )
        .unwrap();

        db.with_conn(|conn| {
            Product::update(
                conn,
                salmon,
                &crate::models::ProductUpdate { calories_per_100: Some(100.0), ..Default::default() },
            )
        })
        .unwrap();

        let detail = get_meal(&db, meal.id).unwrap().unwrap();
        assert_eq!(detail.totals.calories, 200.0);
    }
}
