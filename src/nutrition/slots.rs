//! Meal slots of a day plan
//!
//! The six fixed roles a day plan can fill, in display order, plus the
//! portion factor rules that apply to them.

use serde::{Deserialize, Serialize};

/// Factor applied when a slot has no usable factor
pub const DEFAULT_FACTOR: f64 = 1.0;
/// Lowest factor accepted when a factor is edited
pub const MIN_FACTOR: f64 = 0.1;
/// Highest factor accepted when a factor is edited
pub const MAX_FACTOR: f64 = 10.0;

/// One of the six meal roles of a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MealSlot {
    Breakfast,
    SecondBreakfast,
    Lunch,
    AfternoonSnack,
    Dinner,
    Supper,
}

impl MealSlot {
    /// All slots in display order
    pub const ALL: [MealSlot; 6] = [
        MealSlot::Breakfast,
        MealSlot::SecondBreakfast,
        MealSlot::Lunch,
        MealSlot::AfternoonSnack,
        MealSlot::Dinner,
        MealSlot::Supper,
    ];

    /// Wire key of the slot's meal
    pub fn key(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::SecondBreakfast => "secondBreakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::AfternoonSnack => "afternoonSnack",
            MealSlot::Dinner => "dinner",
            MealSlot::Supper => "supper",
        }
    }

    /// Wire key of the slot's portion factor
    pub fn factor_key(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "factorBreakfast",
            MealSlot::SecondBreakfast => "factorSecondBreakfast",
            MealSlot::Lunch => "factorLunch",
            MealSlot::AfternoonSnack => "factorAfternoonSnack",
            MealSlot::Dinner => "factorDinner",
            MealSlot::Supper => "factorSupper",
        }
    }

    /// Column prefix used by the store (`<prefix>_meal_id`, `factor_<prefix>`)
    pub fn column(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::SecondBreakfast => "second_breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::AfternoonSnack => "afternoon_snack",
            MealSlot::Dinner => "dinner",
            MealSlot::Supper => "supper",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "Breakfast",
            MealSlot::SecondBreakfast => "Second breakfast",
            MealSlot::Lunch => "Lunch",
            MealSlot::AfternoonSnack => "Afternoon snack",
            MealSlot::Dinner => "Dinner",
            MealSlot::Supper => "Supper",
        }
    }

    /// 1-based position in the day
    pub fn display_order(&self) -> u8 {
        match self {
            MealSlot::Breakfast => 1,
            MealSlot::SecondBreakfast => 2,
            MealSlot::Lunch => 3,
            MealSlot::AfternoonSnack => 4,
            MealSlot::Dinner => 5,
            MealSlot::Supper => 6,
        }
    }

    /// Parse a wire key or store column name
    pub fn from_key(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.key().eq_ignore_ascii_case(s) || slot.column() == s)
    }
}

impl std::fmt::Display for MealSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Factor used by aggregation: missing, zero, negative or NaN means 1.0
pub fn effective_factor(factor: f64) -> f64 {
    if factor.is_finite() && factor > 0.0 {
        factor
    } else {
        DEFAULT_FACTOR
    }
}

/// Factor accepted on edit: clamped into [0.1, 10], unparsable means 1.0
pub fn clamp_factor(factor: f64) -> f64 {
    if factor.is_finite() && factor != 0.0 {
        factor.clamp(MIN_FACTOR, MAX_FACTOR)
    } else {
        DEFAULT_FACTOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_order_matches_all() {
        for (i, slot) in MealSlot::ALL.iter().enumerate() {
            assert_eq!(slot.display_order() as usize, i + 1);
        }
    }

    #[test]
    fn test_from_key() {
        assert_eq!(MealSlot::from_key("secondBreakfast"), Some(MealSlot::SecondBreakfast));
        assert_eq!(MealSlot::from_key("afternoon_snack"), Some(MealSlot::AfternoonSnack));
        assert_eq!(MealSlot::from_key("SUPPER"), Some(MealSlot::Supper));
        assert_eq!(MealSlot::from_key("elevenses"), None);
    }

    #[test]
    fn test_serde_uses_wire_keys() {
        let json = serde_json::to_string(&MealSlot::AfternoonSnack).unwrap();
        assert_eq!(json, "\"afternoonSnack\"");
    }

    #[test]
    fn test_effective_factor() {
        assert_eq!(effective_factor(2.0), 2.0);
        assert_eq!(effective_factor(0.0), 1.0);
        assert_eq!(effective_factor(-1.0), 1.0);
        assert_eq!(effective_factor(f64::NAN), 1.0);
    }

    #[test]
    fn test_clamp_factor() {
        assert_eq!(clamp_factor(0.01), MIN_FACTOR);
        assert_eq!(clamp_factor(25.0), MAX_FACTOR);
        assert_eq!(clamp_factor(-3.0), MIN_FACTOR);
        assert_eq!(clamp_factor(1.5), 1.5);
        assert_eq!(clamp_factor(0.0), 1.0);
        assert_eq!(clamp_factor(f64::INFINITY), 1.0);
    }
}
