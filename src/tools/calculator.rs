//! Macro calculator tools
//!
//! Run the aggregator over snapshots supplied by the caller, without
//! touching the database. Any historical field names are accepted.

use serde::Serialize;
use serde_json::Value;

use crate::models::{DayComposition, LooseProductAttachment, MealComposition, Product};
use crate::nutrition::normalize::{self, DEFAULT_WEIGHT_GRAMS};
use crate::nutrition::{aggregate_meal, day_breakdown, scale_product, DayMacroBreakdown, MacroTotals};

/// Response for calculate_product_macros
#[derive(Debug, Serialize)]
pub struct ProductMacrosResponse {
    pub product: Product,
    pub weight_grams: f64,
    pub display: MacroTotals,
    pub totals: MacroTotals,
}

/// Response for calculate_meal_macros
#[derive(Debug, Serialize)]
pub struct MealMacrosResponse {
    pub name: String,
    pub item_count: usize,
    pub display: MacroTotals,
    pub totals: MacroTotals,
}

/// Response for calculate_day_macros
#[derive(Debug, Serialize)]
pub struct DayMacrosResponse {
    pub name: String,
    pub breakdown: DayMacroBreakdown,
    pub display: MacroTotals,
    pub totals: MacroTotals,
}

fn parse<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, String> {
    if !value.is_object() {
        return Err(format!("{} must be a JSON object", what));
    }
    serde_json::from_value(value).map_err(|e| format!("Invalid {}: {}", what, e))
}

/// Macros of a weight of a product record
///
/// A missing weight means the default 100g portion.
pub fn calculate_product_macros(product: Value, weight_grams: Option<f64>) -> Result<ProductMacrosResponse, String> {
    let product: Product = parse(product, "product")?;
    let weight_grams = weight_grams.unwrap_or(DEFAULT_WEIGHT_GRAMS);
    let totals = scale_product(&product, weight_grams);

    Ok(ProductMacrosResponse {
        product,
        weight_grams,
        display: totals.rounded(),
        totals,
    })
}

/// Totals of a meal record (`productsInMeal: [{product, weight}]`)
pub fn calculate_meal_macros(meal: Value) -> Result<MealMacrosResponse, String> {
    let meal: MealComposition = parse(meal, "meal")?;
    let totals = aggregate_meal(&meal);

    Ok(MealMacrosResponse {
        name: meal.name,
        item_count: meal.line_items.len(),
        display: totals.rounded(),
        totals,
    })
}

/// Totals of a day record plus its loose products
pub fn calculate_day_macros(day: Value, loose_products: Vec<Value>) -> Result<DayMacrosResponse, String> {
    let day: DayComposition = parse(day, "day plan")?;

    let loose = loose_products
        .into_iter()
        .enumerate()
        .map(|(i, v)| parse::<LooseProductAttachment>(v, &format!("loose product #{}", i)))
        .collect::<Result<Vec<_>, _>>()?;

    let breakdown = day_breakdown(&day, &loose);
    let totals = breakdown.totals;

    Ok(DayMacrosResponse {
        name: day.name,
        breakdown,
        display: totals.rounded(),
        totals,
    })
}

/// Lenient weight argument: numbers or numeric strings
pub fn weight_arg(value: Option<&Value>) -> Option<f64> {
    value.and_then(normalize::lenient_number)
}
