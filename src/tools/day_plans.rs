//! Day Plan MCP Tools
//!
//! Day plans and their loose products. Totals are computed by fetching
//! the day plan and its loose products separately, then handing both to
//! the aggregator.

use serde::Serialize;
use tracing::{debug, info};

use crate::db::Database;
use crate::models::{
    DayComposition, DayPlanCreate, DayPlanUpdate, LooseProductAttachment, LooseProductCreate,
    LooseProductUpdate,
};
use crate::nutrition::{aggregate_day, day_breakdown, scale_product, DayMacroBreakdown, MacroTotals};

/// Full day plan detail response
#[derive(Debug, Serialize)]
pub struct DayPlanDetail {
    pub id: i64,
    pub name: String,
    pub for_5_days: bool,
    pub breakdown: DayMacroBreakdown,
    /// Rounded for display
    pub display: MacroTotals,
    pub totals: MacroTotals,
}

impl DayPlanDetail {
    pub fn build(day: &DayComposition, loose: &[LooseProductAttachment]) -> Self {
        let breakdown = day_breakdown(day, loose);
        let totals = breakdown.totals;

        Self {
            id: day.id,
            name: day.name.clone(),
            for_5_days: day.for_5_days,
            breakdown,
            display: totals.rounded(),
            totals,
        }
    }
}

/// Summary of a day plan for list results
#[derive(Debug, Serialize)]
pub struct DayPlanSummary {
    pub id: i64,
    pub name: String,
    pub for_5_days: bool,
    pub filled_slots: usize,
    pub loose_products: usize,
    pub totals: MacroTotals,
}

/// Response for list_day_plans
#[derive(Debug, Serialize)]
pub struct ListDayPlansResponse {
    pub items: Vec<DayPlanSummary>,
    pub limit: i64,
    pub offset: i64,
}

/// Response for delete_day_plan
#[derive(Debug, Serialize)]
pub struct DeleteDayPlanResponse {
    pub success: bool,
    pub deleted_id: i64,
    pub loose_products_removed: usize,
}

/// A loose product with its contribution
#[derive(Debug, Serialize)]
pub struct LooseProductDetail {
    pub id: i64,
    pub day_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub weight_grams: f64,
    pub totals: MacroTotals,
}

impl From<&LooseProductAttachment> for LooseProductDetail {
    fn from(loose: &LooseProductAttachment) -> Self {
        Self {
            id: loose.id,
            day_id: loose.day_id,
            product_id: loose.product.id,
            product_name: loose.product.name.clone(),
            weight_grams: loose.weight_grams,
            totals: scale_product(&loose.product, loose.weight_grams),
        }
    }
}

/// Response for list_loose_products
#[derive(Debug, Serialize)]
pub struct ListLooseProductsResponse {
    pub day_id: i64,
    pub items: Vec<LooseProductDetail>,
    pub totals: MacroTotals,
}

/// Response for remove_loose_product
#[derive(Debug, Serialize)]
pub struct RemoveLooseProductResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Load a day plan and its loose products
fn load_day(db: &Database, id: i64) -> Result<Option<(DayComposition, Vec<LooseProductAttachment>)>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let day = DayComposition::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get day plan: {}", e))?;

    match day {
        Some(day) => {
            let loose = LooseProductAttachment::list_for_day(&conn, id)
                .map_err(|e| format!("Failed to get loose products: {}", e))?;
            Ok(Some((day, loose)))
        }
        None => Ok(None),
    }
}

/// Create a day plan
pub fn create_day_plan(db: &Database, data: DayPlanCreate) -> Result<DayPlanDetail, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let day = DayComposition::create(&conn, &data)
        .map_err(|e| format!("Failed to create day plan: {}", e))?;

    info!(id = day.id, name = %day.name, filled_slots = day.filled_slots(), "day plan created");
    Ok(DayPlanDetail::build(&day, &[]))
}

/// Get a day plan with per-slot breakdown
pub fn get_day_plan(db: &Database, id: i64) -> Result<Option<DayPlanDetail>, String> {
    let loaded = load_day(db, id)?;
    debug!(id, found = loaded.is_some(), "day plan fetched");
    Ok(loaded.map(|(day, loose)| DayPlanDetail::build(&day, &loose)))
}

/// List day plans with totals
///
/// `sort_by = "calories"` orders every matching day plan by computed
/// totals, highest first, before the page is cut.
pub fn list_day_plans(
    db: &Database,
    query: Option<&str>,
    sort_by: &str,
    limit: i64,
    offset: i64,
) -> Result<ListDayPlansResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let by_calories = matches!(sort_by.to_lowercase().as_str(), "calories" | "kcal");

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let (sql_limit, sql_offset) = if by_calories { (-1, 0) } else { (limit, offset) };
    let days = DayComposition::list(&conn, query, sql_limit, sql_offset)
        .map_err(|e| format!("Failed to list day plans: {}", e))?;

    let mut items = Vec::with_capacity(days.len());
    for day in days {
        let loose = LooseProductAttachment::list_for_day(&conn, day.id)
            .map_err(|e| format!("Failed to get loose products: {}", e))?;
        items.push(DayPlanSummary {
            id: day.id,
            name: day.name.clone(),
            for_5_days: day.for_5_days,
            filled_slots: day.filled_slots(),
            loose_products: loose.len(),
            totals: aggregate_day(&day, &loose),
        });
    }

    if by_calories {
        items.sort_by(|a, b| b.totals.calories.total_cmp(&a.totals.calories));
        items = items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
    }

    debug!(returned = items.len(), "day plans listed");
    Ok(ListDayPlansResponse { items, limit, offset })
}

/// Update a day plan
pub fn update_day_plan(db: &Database, id: i64, data: DayPlanUpdate) -> Result<DayPlanDetail, String> {
    {
        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        let updated = DayComposition::update(&conn, id, &data)
            .map_err(|e| format!("Failed to update day plan: {}", e))?;
        if updated.is_none() {
            return Err(format!("Day plan not found with id: {}", id));
        }
    }

    info!(id, slots_changed = data.slots.len(), "day plan updated");

    let (day, loose) = load_day(db, id)?.ok_or_else(|| format!("Day plan not found with id: {}", id))?;
    Ok(DayPlanDetail::build(&day, &loose))
}

/// Delete a day plan together with its loose products
pub fn delete_day_plan(db: &Database, id: i64) -> Result<DeleteDayPlanResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let loose = LooseProductAttachment::list_for_day(&conn, id)
        .map_err(|e| format!("Failed to get loose products: {}", e))?;

    let deleted = DayComposition::delete(&conn, id)
        .map_err(|e| format!("Failed to delete day plan: {}", e))?;
    if !deleted {
        return Err(format!("Day plan not found with id: {}", id));
    }

    info!(id, loose_products_removed = loose.len(), "day plan deleted");
    Ok(DeleteDayPlanResponse {
        success: true,
        deleted_id: id,
        loose_products_removed: loose.len(),
    })
}

/// Attach a loose product to a day plan
pub fn add_loose_product(db: &Database, data: LooseProductCreate) -> Result<LooseProductDetail, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let loose = LooseProductAttachment::create(&conn, &data)
        .map_err(|e| format!("Failed to add loose product: {}", e))?;

    info!(id = loose.id, day_id = loose.day_id, product_id = loose.product.id, "loose product added");
    Ok(LooseProductDetail::from(&loose))
}

/// List the loose products of a day plan
pub fn list_loose_products(db: &Database, day_id: i64) -> Result<ListLooseProductsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let loose = LooseProductAttachment::list_for_day(&conn, day_id)
        .map_err(|e| format!("Failed to list loose products: {}", e))?;

    let items: Vec<LooseProductDetail> = loose.iter().map(LooseProductDetail::from).collect();
    let totals = items.iter().map(|i| i.totals).sum();

    Ok(ListLooseProductsResponse { day_id, items, totals })
}

/// Change the product or weight of a loose product
pub fn update_loose_product(
    db: &Database,
    id: i64,
    data: LooseProductUpdate,
) -> Result<LooseProductDetail, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = LooseProductAttachment::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update loose product: {}", e))?;

    match updated {
        Some(loose) => {
            info!(id, weight = loose.weight_grams, "loose product updated");
            Ok(LooseProductDetail::from(&loose))
        }
        None => Err(format!("Loose product not found with id: {}", id)),
    }
}

/// Detach a loose product from its day plan
pub fn remove_loose_product(db: &Database, id: i64) -> Result<RemoveLooseProductResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = LooseProductAttachment::delete(&conn, id)
        .map_err(|e| format!("Failed to remove loose product: {}", e))?;
    if !deleted {
        return Err(format!("Loose product not found with id: {}", id));
    }

    info!(id, "loose product removed");
    Ok(RemoveLooseProductResponse { success: true, deleted_id: id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use crate::models::{MealComposition, MealCreate, MealItemInput, Product, ProductCreate, SlotAssignment};
    use crate::nutrition::MealSlot;

    fn test_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(migrations::run_migrations).unwrap();
        db
    }

    /// Product A = {200, 20, 10, 5} per 100g and a meal with 150g of it
    fn setup(db: &Database) -> (i64, i64) {
        db.with_conn(|conn| {
            let a = Product::create(
                conn,
                &ProductCreate {
                    name: "A".to_string(),
                    calories_per_100: 200.0,
                    protein_per_100: 20.0,
                    carbs_per_100: 10.0,
                    fat_per_100: 5.0,
                    ..Default::default()
                },
            )?;
            let meal = MealComposition::create(
                conn,
                &MealCreate {
                    name: "A bowl".to_string(),
                    items: vec![MealItemInput { product_id: a.id, weight: Some(150.0) }],
                    ..Default::default()
                },
            )?;
            Ok((a.id, meal.id))
        })
        .unwrap()
    }

    #[test]
    fn test_reference_day_through_store() {
        let db = test_db();
        let (product_id, meal_id) = setup(&db);

        let day = create_day_plan(
            &db,
            DayPlanCreate {
                name: "Monday".to_string(),
                for_5_days: true,
                slots: vec![SlotAssignment {
                    slot: MealSlot::Lunch,
                    meal_id: Some(meal_id),
                    factor: Some(2.0),
                    clear: false,
                }],
            },
        )
        .unwrap();
        assert_eq!(day.totals, MacroTotals::new(600.0, 60.0, 30.0, 15.0));

        let loose = add_loose_product(
            &db,
            LooseProductCreate { day_id: day.id, product_id, weight: Some(50.0) },
        )
        .unwrap();
        assert_eq!(loose.totals, MacroTotals::new(100.0, 10.0, 5.0, 2.5));

        let detail = get_day_plan(&db, day.id).unwrap().unwrap();
        assert_eq!(detail.totals, MacroTotals::new(700.0, 70.0, 35.0, 17.5));
        assert_eq!(detail.breakdown.slots.len(), 1);
        assert_eq!(detail.breakdown.slots[0].slot, MealSlot::Lunch);
        assert_eq!(detail.breakdown.loose_totals, loose.totals);
    }

    #[test]
    fn test_factor_edit_is_clamped() {
        let db = test_db();
        let (_, meal_id) = setup(&db);
        let day = create_day_plan(
            &db,
            DayPlanCreate {
                name: "Tuesday".to_string(),
                slots: vec![SlotAssignment {
                    slot: MealSlot::Breakfast,
                    meal_id: Some(meal_id),
                    factor: None,
                    clear: false,
                }],
                ..Default::default()
            },
        )
        .unwrap();

        let updated = update_day_plan(
            &db,
            day.id,
            DayPlanUpdate {
                slots: vec![SlotAssignment {
                    slot: MealSlot::Breakfast,
                    meal_id: None,
                    factor: Some(50.0),
                    clear: false,
                }],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.breakdown.slots[0].factor, 10.0);
        assert_eq!(updated.totals.calories, 3000.0);
    }

    #[test]
    fn test_loose_product_lifecycle() {
        let db = test_db();
        let (product_id, _) = setup(&db);
        let day = create_day_plan(
            &db,
            DayPlanCreate { name: "Snacks".to_string(), ..Default::default() },
        )
        .unwrap();
        assert!(day.totals.is_zero());

        let loose = add_loose_product(
            &db,
            LooseProductCreate { day_id: day.id, product_id, weight: None },
        )
        .unwrap();
        assert_eq!(loose.weight_grams, 100.0);

        let updated = update_loose_product(
            &db,
            loose.id,
            LooseProductUpdate { weight: Some(0.0), ..Default::default() },
        )
        .unwrap();
        assert!(updated.totals.is_zero());

        let listed = list_loose_products(&db, day.id).unwrap();
        assert_eq!(listed.items.len(), 1);

        remove_loose_product(&db, loose.id).unwrap();
        assert!(list_loose_products(&db, day.id).unwrap().items.is_empty());
        assert!(remove_loose_product(&db, loose.id).is_err());
    }

    #[test]
    fn test_list_and_delete_day_plans() {
        let db = test_db();
        let (product_id, meal_id) = setup(&db);
        let light = create_day_plan(
            &db,
            DayPlanCreate { name: "Easy".to_string(), ..Default::default() },
        )
        .unwrap();
        create_day_plan(
            &db,
            DayPlanCreate {
                name: "Heavy".to_string(),
                slots: vec![SlotAssignment {
                    slot: MealSlot::Dinner,
                    meal_id: Some(meal_id),
                    factor: Some(1.0),
                    clear: false,
                }],
                ..Default::default()
            },
        )
        .unwrap();
        add_loose_product(&db, LooseProductCreate { day_id: light.id, product_id, weight: Some(10.0) })
            .unwrap();

        let listed = list_day_plans(&db, None, "calories", 50, 0).unwrap();
        assert_eq!(listed.items[0].name, "Heavy");
        assert_eq!(listed.items[1].loose_products, 1);

        // "Easy" sorts first by name; the calorie sort still puts "Heavy" on page one
        let first_page = list_day_plans(&db, None, "calories", 1, 0).unwrap();
        assert_eq!(first_page.items.len(), 1);
        assert_eq!(first_page.items[0].name, "Heavy");
        let second_page = list_day_plans(&db, None, "calories", 1, 1).unwrap();
        assert_eq!(second_page.items[0].name, "Easy");

        let deleted = delete_day_plan(&db, light.id).unwrap();
        assert_eq!(deleted.loose_products_removed, 1);
        assert!(get_day_plan(&db, light.id).unwrap().is_none());
    }
}
