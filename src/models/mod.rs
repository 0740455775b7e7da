//! Data models
//!
//! Rust structs representing store entities and the snapshots handed to
//! the aggregator.

mod category;
mod day_plan;
mod loose_product;
mod meal;
mod product;

pub use category::{Category, CategoryRef};
pub use day_plan::{
    DayComposition, DayPlanCreate, DayPlanRecord, DayPlanUpdate, DaySlot, SlotAssignment,
};
pub use loose_product::{LooseProductAttachment, LooseProductCreate, LooseProductUpdate};
pub use meal::{MealComposition, MealCreate, MealItemInput, MealLineItem, MealSummary, MealUpdate};
pub use product::{Product, ProductCreate, ProductSort, ProductUpdate, ProductUsage};
