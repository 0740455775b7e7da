//! Macro-nutrient totals
//!
//! The result type of every aggregation: calories plus the three gram macros.

use serde::{Deserialize, Serialize};

/// Calories (kcal) and gram macros for some amount of food
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64, // grams
    pub carbs: f64,   // grams
    pub fat: f64,     // grams
}

impl MacroTotals {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self { calories, protein, carbs, fat }
    }

    /// Scale every field by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories: self.calories * multiplier,
            protein: self.protein * multiplier,
            carbs: self.carbs * multiplier,
            fat: self.fat * multiplier,
        }
    }

    /// Element-wise sum
    pub fn add(&self, other: &MacroTotals) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fat: self.fat + other.fat,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.calories == 0.0 && self.protein == 0.0 && self.carbs == 0.0 && self.fat == 0.0
    }

    /// Presentation copy: whole kcal, grams to one decimal
    pub fn rounded(&self) -> Self {
        Self {
            calories: self.calories.round(),
            protein: round_to_tenth(self.protein),
            carbs: round_to_tenth(self.carbs),
            fat: round_to_tenth(self.fat),
        }
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl std::ops::Add for MacroTotals {
    type Output = MacroTotals;

    fn add(self, other: MacroTotals) -> MacroTotals {
        MacroTotals::add(&self, &other)
    }
}

impl std::ops::AddAssign for MacroTotals {
    fn add_assign(&mut self, other: MacroTotals) {
        *self = MacroTotals::add(self, &other);
    }
}

impl std::ops::Mul<f64> for MacroTotals {
    type Output = MacroTotals;

    fn mul(self, multiplier: f64) -> MacroTotals {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for MacroTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(MacroTotals::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_of_nothing_is_zero() {
        let total: MacroTotals = Vec::new().into_iter().sum();
        assert!(total.is_zero());
    }

    #[test]
    fn test_add_and_scale() {
        let a = MacroTotals::new(100.0, 10.0, 5.0, 2.0);
        let b = MacroTotals::new(50.0, 1.0, 1.0, 1.0);
        assert_eq!(a + b, MacroTotals::new(150.0, 11.0, 6.0, 3.0));
        assert_eq!(a * 2.0, MacroTotals::new(200.0, 20.0, 10.0, 4.0));

        let mut c = a;
        c += b;
        assert_eq!(c, a + b);
    }

    #[test]
    fn test_rounded() {
        let m = MacroTotals::new(312.6, 30.04, 15.06, 7.449);
        assert_eq!(m.rounded(), MacroTotals::new(313.0, 30.0, 15.1, 7.4));
    }
}
