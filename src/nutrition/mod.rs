//! Nutrition calculation module
//!
//! Field normalization, meal slots and the product → meal → day
//! aggregation. Pure and synchronous; no I/O.

pub mod aggregator;
pub mod macros;
pub mod normalize;
pub mod slots;

pub use aggregator::{
    aggregate_day, aggregate_loose, aggregate_meal, day_breakdown, scale_product,
    DayMacroBreakdown, LooseContribution, SlotContribution,
};
pub use macros::MacroTotals;
pub use slots::MealSlot;
