//! Field-name normalization for upstream nutrition records
//!
//! Product records reach us with macro fields under several historical
//! names. Every lookup goes through this module so the arithmetic in the
//! aggregator only ever sees canonical per-100g values.
//!
//! Preference order, first present numeric value wins:
//!
//! | field    | per-100 names                          | bare names                | fallback       |
//! |----------|----------------------------------------|---------------------------|----------------|
//! | calories | `caloriesPer100`, `kcalPer100`         | `calories`, `kcal`        | 0              |
//! | protein  | `proteinPer100`, `proteinsPer100`      | `protein`, `proteins`     | 0              |
//! | carbs    | `carbsPer100`, `carbohydratesPer100`   | `carbohydrates`, `carbs`  | `sugarAndCarb`, then 0 |
//! | fat      | `fatPer100`, `fatsPer100`              | `fat`, `fats`             | 0              |
//!
//! A value is "present" when it is a finite number or a string that parses
//! as one. An explicit `0` is present and stops the search. Negative values
//! are clamped to 0.

use serde_json::{Map, Value};

/// Default portion, in grams, when a weight is missing
pub const DEFAULT_WEIGHT_GRAMS: f64 = 100.0;

/// The four macros the aggregator works with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroField {
    Calories,
    Protein,
    Carbs,
    Fat,
}

impl MacroField {
    pub const ALL: [MacroField; 4] = [
        MacroField::Calories,
        MacroField::Protein,
        MacroField::Carbs,
        MacroField::Fat,
    ];

    /// Candidate key groups, highest priority first
    pub fn preference(&self) -> &'static [&'static [&'static str]] {
        match self {
            MacroField::Calories => &[&["caloriesPer100", "kcalPer100"], &["calories", "kcal"]],
            MacroField::Protein => &[&["proteinPer100", "proteinsPer100"], &["protein", "proteins"]],
            MacroField::Carbs => &[
                &["carbsPer100", "carbohydratesPer100"],
                &["carbohydrates", "carbs"],
                &["sugarAndCarb"],
            ],
            MacroField::Fat => &[&["fatPer100", "fatsPer100"], &["fat", "fats"]],
        }
    }
}

/// Interpret a JSON value as a finite number
///
/// Numeric strings are accepted; anything else (null, bool, objects,
/// unparsable text, NaN) is treated as absent.
pub fn lenient_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// First present numeric value among `keys`
pub fn first_number(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| map.get(*k).and_then(lenient_number))
}

/// Resolve one macro's per-100g value from a raw product record
pub fn macro_per_100(map: &Map<String, Value>, field: MacroField) -> f64 {
    field
        .preference()
        .iter()
        .find_map(|group| first_number(map, group))
        .map(non_negative)
        .unwrap_or(0.0)
}

/// Resolve an optional nutrient (sugar, fiber, salt); negatives clamp to 0
pub fn optional_nutrient(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    first_number(map, keys).map(non_negative)
}

/// Integer identifier; accepts numbers and numeric strings, defaults to 0
pub fn lenient_id(map: &Map<String, Value>, keys: &[&str]) -> i64 {
    keys.iter()
        .find_map(|k| match map.get(*k)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
        .unwrap_or(0)
}

/// First non-null string among `keys`
pub fn lenient_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match map.get(*k)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Weight of a meal line item: absent or zero means the default portion
pub fn line_item_weight(raw: Option<f64>) -> f64 {
    match raw {
        Some(w) if w.is_finite() && w != 0.0 => non_negative(w),
        _ => DEFAULT_WEIGHT_GRAMS,
    }
}

/// Weight of a loose attachment: absent means the default portion, zero stays zero
pub fn loose_weight(raw: Option<f64>) -> f64 {
    match raw {
        Some(w) if w.is_finite() => non_negative(w),
        _ => DEFAULT_WEIGHT_GRAMS,
    }
}

fn non_negative(value: f64) -> f64 {
    if value > 0.0 { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_per_100_name_wins_over_bare() {
        let m = obj(json!({"proteinsPer100": 12.0, "proteins": 31.0}));
        assert_eq!(macro_per_100(&m, MacroField::Protein), 12.0);
    }

    #[test]
    fn test_bare_name_used_when_per_100_absent() {
        let m = obj(json!({"kcalPer100": null, "kcal": 90}));
        assert_eq!(macro_per_100(&m, MacroField::Calories), 90.0);
    }

    #[test]
    fn test_carbs_fall_back_to_sugar_and_carb() {
        let m = obj(json!({"sugarAndCarb": 14.5}));
        assert_eq!(macro_per_100(&m, MacroField::Carbs), 14.5);

        let m = obj(json!({"carbohydrates": 3.0, "sugarAndCarb": 14.5}));
        assert_eq!(macro_per_100(&m, MacroField::Carbs), 3.0);
    }

    #[test]
    fn test_explicit_zero_is_present() {
        let m = obj(json!({"fatPer100": 0, "fat": 9}));
        assert_eq!(macro_per_100(&m, MacroField::Fat), 0.0);
    }

    #[test]
    fn test_missing_and_garbage_become_zero() {
        let m = obj(json!({"protein": "lots", "fat": {"x": 1}, "calories": true}));
        for field in MacroField::ALL {
            assert_eq!(macro_per_100(&m, field), 0.0);
        }
    }

    #[test]
    fn test_numeric_strings_and_negatives() {
        let m = obj(json!({"calories": " 120.5 ", "fat": -3}));
        assert_eq!(macro_per_100(&m, MacroField::Calories), 120.5);
        assert_eq!(macro_per_100(&m, MacroField::Fat), 0.0);
    }

    #[test]
    fn test_lenient_id() {
        assert_eq!(lenient_id(&obj(json!({"id": 7})), &["id"]), 7);
        assert_eq!(lenient_id(&obj(json!({"id": "12"})), &["id"]), 12);
        assert_eq!(lenient_id(&obj(json!({})), &["id"]), 0);
    }

    #[test]
    fn test_line_item_weight_defaults() {
        assert_eq!(line_item_weight(None), 100.0);
        assert_eq!(line_item_weight(Some(0.0)), 100.0);
        assert_eq!(line_item_weight(Some(f64::NAN)), 100.0);
        assert_eq!(line_item_weight(Some(150.0)), 150.0);
        assert_eq!(line_item_weight(Some(-20.0)), 0.0);
    }

    #[test]
    fn test_loose_weight_keeps_zero() {
        assert_eq!(loose_weight(None), 100.0);
        assert_eq!(loose_weight(Some(0.0)), 0.0);
        assert_eq!(loose_weight(Some(-5.0)), 0.0);
        assert_eq!(loose_weight(Some(50.0)), 50.0);
    }
}
