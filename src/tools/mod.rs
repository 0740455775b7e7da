//! Diet Planner Tools module
//!
//! MCP tool implementations: catalog, meals, day plans and calculators.

pub mod calculator;
pub mod categories;
pub mod day_plans;
pub mod meals;
pub mod products;
pub mod status;
