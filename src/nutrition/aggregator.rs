//! Macro aggregation
//!
//! Pure functions from already-fetched snapshots to [`MacroTotals`]:
//! product → meal → day. Nothing here fails; missing data contributes
//! zero.

use serde::Serialize;

use crate::models::{DayComposition, LooseProductAttachment, MealComposition, Product};
use super::macros::MacroTotals;
use super::normalize::DEFAULT_WEIGHT_GRAMS;
use super::slots::{effective_factor, MealSlot};

/// Macros of `weight_grams` of a product
///
/// Scales the per-100g values linearly. A NaN or infinite weight counts as
/// the default 100g portion; a negative weight counts as 0.
pub fn scale_product(product: &Product, weight_grams: f64) -> MacroTotals {
    let weight = if !weight_grams.is_finite() {
        DEFAULT_WEIGHT_GRAMS
    } else if weight_grams < 0.0 {
        0.0
    } else {
        weight_grams
    };

    per_100(product).scale(weight / 100.0)
}

fn per_100(product: &Product) -> MacroTotals {
    MacroTotals::new(
        finite_or_zero(product.calories_per_100),
        finite_or_zero(product.protein_per_100),
        finite_or_zero(product.carbs_per_100),
        finite_or_zero(product.fat_per_100),
    )
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { 0.0 }
}

/// Sum of every line item of a meal
pub fn aggregate_meal(meal: &MealComposition) -> MacroTotals {
    meal.line_items
        .iter()
        .map(|item| scale_product(&item.product, item.weight_grams))
        .sum()
}

/// Total for a day: each filled slot's meal times its factor, plus loose products
pub fn aggregate_day(day: &DayComposition, loose: &[LooseProductAttachment]) -> MacroTotals {
    let slots: MacroTotals = day
        .slots()
        .filter_map(|(_, slot)| {
            slot.meal
                .as_ref()
                .map(|meal| aggregate_meal(meal) * effective_factor(slot.factor))
        })
        .sum();

    slots + aggregate_loose(loose)
}

/// Sum of loose products only
pub fn aggregate_loose(loose: &[LooseProductAttachment]) -> MacroTotals {
    loose
        .iter()
        .map(|item| scale_product(&item.product, item.weight_grams))
        .sum()
}

/// One filled slot in a [`DayMacroBreakdown`]
#[derive(Debug, Clone, Serialize)]
pub struct SlotContribution {
    pub slot: MealSlot,
    pub label: &'static str,
    pub meal_id: i64,
    pub meal_name: String,
    pub factor: f64,
    /// Meal totals before the factor
    pub meal_totals: MacroTotals,
    /// Meal totals times the factor
    pub totals: MacroTotals,
}

/// One loose product in a [`DayMacroBreakdown`]
#[derive(Debug, Clone, Serialize)]
pub struct LooseContribution {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub weight_grams: f64,
    pub totals: MacroTotals,
}

/// Day totals itemized per slot and per loose product
#[derive(Debug, Clone, Serialize)]
pub struct DayMacroBreakdown {
    pub slots: Vec<SlotContribution>,
    pub loose: Vec<LooseContribution>,
    pub loose_totals: MacroTotals,
    pub totals: MacroTotals,
}

/// Itemized version of [`aggregate_day`]; `totals` equals its result
pub fn day_breakdown(day: &DayComposition, loose: &[LooseProductAttachment]) -> DayMacroBreakdown {
    let slots: Vec<SlotContribution> = day
        .slots()
        .filter_map(|(slot, entry)| {
            let meal = entry.meal.as_ref()?;
            let factor = effective_factor(entry.factor);
            let meal_totals = aggregate_meal(meal);
            Some(SlotContribution {
                slot,
                label: slot.label(),
                meal_id: meal.id,
                meal_name: meal.name.clone(),
                factor,
                meal_totals,
                totals: meal_totals * factor,
            })
        })
        .collect();

    let loose: Vec<LooseContribution> = loose
        .iter()
        .map(|item| LooseContribution {
            id: item.id,
            product_id: item.product.id,
            product_name: item.product.name.clone(),
            weight_grams: item.weight_grams,
            totals: scale_product(&item.product, item.weight_grams),
        })
        .collect();

    let loose_totals: MacroTotals = loose.iter().map(|l| l.totals).sum();
    let totals = slots.iter().map(|s| s.totals).sum::<MacroTotals>() + loose_totals;

    DayMacroBreakdown { slots, loose, loose_totals, totals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DaySlot, MealLineItem};

    fn close(a: &MacroTotals, b: &MacroTotals) -> bool {
        (a.calories - b.calories).abs() < 0.001
            && (a.protein - b.protein).abs() < 0.001
            && (a.carbs - b.carbs).abs() < 0.001
            && (a.fat - b.fat).abs() < 0.001
    }

    fn product_a() -> Product {
        Product {
            id: 1,
            name: "A".to_string(),
            calories_per_100: 200.0,
            protein_per_100: 20.0,
            carbs_per_100: 10.0,
            fat_per_100: 5.0,
            ..Default::default()
        }
    }

    fn broccoli() -> Product {
        Product {
            id: 3,
            name: "Broccoli".to_string(),
            calories_per_100: 55.0,
            protein_per_100: 3.7,
            carbs_per_100: 11.2,
            fat_per_100: 0.6,
            ..Default::default()
        }
    }

    fn meal(items: Vec<MealLineItem>) -> MealComposition {
        MealComposition { id: 10, name: "M".to_string(), recipe_text: None, line_items: items }
    }

    #[test]
    fn test_scale_at_100_is_per_100() {
        let p = product_a();
        assert_eq!(scale_product(&p, 100.0), MacroTotals::new(200.0, 20.0, 10.0, 5.0));
    }

    #[test]
    fn test_scale_at_zero_is_zero() {
        assert!(scale_product(&product_a(), 0.0).is_zero());
        assert!(scale_product(&product_a(), -50.0).is_zero());
    }

    #[test]
    fn test_scale_is_linear() {
        let p = broccoli();
        for w in [1.0, 37.5, 100.0, 250.0] {
            let once = scale_product(&p, w) * 2.0;
            let twice = scale_product(&p, 2.0 * w);
            assert!(close(&once, &twice), "weight {}", w);
        }
    }

    #[test]
    fn test_nan_weight_uses_default_portion() {
        assert_eq!(scale_product(&product_a(), f64::NAN), scale_product(&product_a(), 100.0));
    }

    #[test]
    fn test_empty_meal_is_zero() {
        assert!(aggregate_meal(&meal(vec![])).is_zero());
    }

    #[test]
    fn test_meal_ignores_item_order() {
        let items = vec![
            MealLineItem::new(product_a(), 150.0),
            MealLineItem::new(broccoli(), 80.0),
            MealLineItem::new(product_a(), 20.0),
        ];
        let mut reversed = items.clone();
        reversed.reverse();

        assert!(close(&aggregate_meal(&meal(items)), &aggregate_meal(&meal(reversed))));
    }

    #[test]
    fn test_empty_day_is_zero() {
        assert!(aggregate_day(&DayComposition::default(), &[]).is_zero());
    }

    #[test]
    fn test_single_slot_times_factor_plus_loose() {
        let m = meal(vec![MealLineItem::new(broccoli(), 200.0)]);
        let mut day = DayComposition::default();
        day.afternoon_snack = DaySlot::with_meal(m.clone(), 0.75);
        let loose = vec![LooseProductAttachment::new(product_a(), 30.0)];

        let expected = aggregate_meal(&m) * 0.75 + scale_product(&product_a(), 30.0);
        assert!(close(&aggregate_day(&day, &loose), &expected));
    }

    #[test]
    fn test_reference_day() {
        let line = MealLineItem::new(product_a(), 150.0);
        assert_eq!(scale_product(&line.product, line.weight_grams), MacroTotals::new(300.0, 30.0, 15.0, 7.5));

        let mut day = DayComposition::default();
        day.lunch = DaySlot::with_meal(meal(vec![line]), 2.0);
        let loose = vec![LooseProductAttachment::new(product_a(), 50.0)];

        assert_eq!(aggregate_loose(&loose), MacroTotals::new(100.0, 10.0, 5.0, 2.5));
        assert!(close(&aggregate_day(&day, &loose), &MacroTotals::new(700.0, 70.0, 35.0, 17.5)));
    }

    #[test]
    fn test_zero_or_bad_factor_counts_as_one() {
        let m = meal(vec![MealLineItem::new(product_a(), 100.0)]);
        for factor in [0.0, -1.0, f64::NAN] {
            let mut day = DayComposition::default();
            day.breakfast = DaySlot::with_meal(m.clone(), factor);
            assert_eq!(aggregate_day(&day, &[]), aggregate_meal(&m));
        }
    }

    #[test]
    fn test_missing_protein_contributes_zero() {
        let raw: Product = serde_json::from_str(
            r#"{"id": 7, "name": "Oil", "kcalPer100": 884, "fat": 100}"#,
        )
        .unwrap();
        let totals = scale_product(&raw, 10.0);
        assert_eq!(totals.protein, 0.0);
        assert!(!totals.protein.is_nan());
        assert!((totals.calories - 88.4).abs() < 0.001);
    }

    #[test]
    fn test_aggregation_is_repeatable() {
        let mut day = DayComposition::default();
        day.dinner = DaySlot::with_meal(meal(vec![MealLineItem::new(broccoli(), 300.0)]), 1.5);
        let loose = vec![LooseProductAttachment::new(broccoli(), 40.0)];
        assert_eq!(aggregate_day(&day, &loose), aggregate_day(&day, &loose));
    }

    #[test]
    fn test_breakdown_matches_aggregate() {
        let mut day = DayComposition::default();
        day.breakfast = DaySlot::with_meal(meal(vec![MealLineItem::new(product_a(), 120.0)]), 1.25);
        day.supper = DaySlot::with_meal(meal(vec![MealLineItem::new(broccoli(), 90.0)]), 0.0);
        let loose = vec![
            LooseProductAttachment::new(broccoli(), 50.0),
            LooseProductAttachment::new(product_a(), 0.0),
        ];

        let breakdown = day_breakdown(&day, &loose);
        assert_eq!(breakdown.slots.len(), 2);
        assert_eq!(breakdown.slots[0].slot, MealSlot::Breakfast);
        assert_eq!(breakdown.slots[1].factor, 1.0);
        assert_eq!(breakdown.loose.len(), 2);
        assert!(breakdown.loose[1].totals.is_zero());
        assert!(close(&breakdown.totals, &aggregate_day(&day, &loose)));
    }
}
