//! Diet Planner Status Tool
//!
//! Runtime status of the service plus the planner instructions for
//! assistants.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::{migrations, Database};

/// Day planning instructions for AI assistants
pub const PLANNER_INSTRUCTIONS: &str = r#"
# Diet Planner Instructions

This guide explains how to build meals and day plans with the Diet Planner tools.

## Overview

1. **Products** - Nutritional facts per 100 g (calories, protein, carbs, fat)
2. **Meals** - A named list of products, each with a weight in grams
3. **Day plans** - Six meal slots, each with a portion factor, plus loose products

Totals are never stored. Every `get_*` / `list_*` tool recomputes them from
the current products, so editing a product immediately changes every meal
and day plan that uses it.

---

## Products

- Store every value **per 100 g**. Convert package values first:
  `(value / package_grams) * 100`.
- Missing values are treated as 0. Negative values are rejected.
- Use categories (`add_category`, `category_id`) to keep the catalog
  filterable: `list_products` accepts `category`, `query` and
  `sort_by` (`name`, `calories`, `protein`).
- A product cannot be deleted while a meal or a day plan uses it.
  `delete_product` reports where it is used.

## Meals

- `create_meal` takes `items: [{product_id, weight}]`.
- A missing or zero weight means **100 g**.
- `update_meal` with `items` replaces every line item.
- Deleting a meal empties the day plan slots that held it.

## Day plans

Slots, in order: `breakfast`, `secondBreakfast`, `lunch`,
`afternoonSnack`, `dinner`, `supper`.

- Each slot holds at most one meal and a **factor** (portion multiplier).
- Factors are clamped to **0.1 – 10** when set. A factor of 1 means the meal
  as composed; 0.5 means half of it.
- Use `slots: [{slot, meal_id, factor}]` on create and update. Pass
  `clear: true` to empty a slot.
- `for_5_days` marks a plan meant to repeat over a work week.

## Loose products

Products eaten outside any meal (a snack, a drink) are attached to a day
plan with `add_loose_product {day_id, product_id, weight}`.

- Missing weight means 100 g; a weight of 0 is kept and counts as nothing.
- Deleting a day plan removes its loose products.

## Totals

Day total = Σ over filled slots (meal total × factor) + Σ loose products.

`get_day_plan` returns the per-slot breakdown. Calories are displayed as
whole kcal and grams with one decimal; the unrounded values are included
as `totals`.

## Calculators

`calculate_product_macros`, `calculate_meal_macros` and
`calculate_day_macros` work on JSON you pass in, without touching the
database. Any of the historical field names are accepted
(`kcalPer100`, `proteins`, `carbohydrates`, `sugarAndCarb`, ...).
"#;

/// Runtime status of the Diet Planner service
#[derive(Debug, Clone, Serialize)]
pub struct DietPlanStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,

    /// Process information
    pub started_at: String,
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    started_at: DateTime<Utc>,
    database_path: PathBuf,
}

impl StatusTracker {
    /// Create a new status tracker
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            started_at: Utc::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self, db: &Database) -> DietPlanStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let schema_version = db.with_conn(migrations::get_schema_version).ok();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        DietPlanStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version,
            started_at: self.started_at.to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
