//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- CATEGORIES
        -- ============================================
        CREATE TABLE categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- PRODUCTS
        -- Nutritional facts per 100g
        -- ============================================
        CREATE TABLE products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,

            calories_per_100 REAL NOT NULL DEFAULT 0,  -- kcal
            protein_per_100 REAL NOT NULL DEFAULT 0,   -- grams
            carbs_per_100 REAL NOT NULL DEFAULT 0,     -- grams
            fat_per_100 REAL NOT NULL DEFAULT 0,       -- grams
            sugar_per_100 REAL,
            fiber_per_100 REAL,
            salt_per_100 REAL,

            -- Display only
            reference_weight REAL,
            unit TEXT,
            description TEXT,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_products_name ON products(name);
        CREATE INDEX idx_products_category ON products(category_id);

        -- ============================================
        -- MEALS
        -- ============================================
        CREATE TABLE meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            recipe TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_meals_name ON meals(name);

        -- ============================================
        -- PRODUCTS IN MEAL
        -- Line items: which product, how many grams
        -- ============================================
        CREATE TABLE products_in_meal (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE RESTRICT,
            weight REAL NOT NULL DEFAULT 100,
            position INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX idx_products_in_meal_meal ON products_in_meal(meal_id);
        CREATE INDEX idx_products_in_meal_product ON products_in_meal(product_id);

        -- ============================================
        -- MEALS IN DAY
        -- Day plans: six optional slots with portion factors
        -- ============================================
        CREATE TABLE meals_in_day (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            for_5_days INTEGER NOT NULL DEFAULT 0,

            breakfast_meal_id INTEGER REFERENCES meals(id) ON DELETE SET NULL,
            second_breakfast_meal_id INTEGER REFERENCES meals(id) ON DELETE SET NULL,
            lunch_meal_id INTEGER REFERENCES meals(id) ON DELETE SET NULL,
            afternoon_snack_meal_id INTEGER REFERENCES meals(id) ON DELETE SET NULL,
            dinner_meal_id INTEGER REFERENCES meals(id) ON DELETE SET NULL,
            supper_meal_id INTEGER REFERENCES meals(id) ON DELETE SET NULL,

            factor_breakfast REAL NOT NULL DEFAULT 1.0,
            factor_second_breakfast REAL NOT NULL DEFAULT 1.0,
            factor_lunch REAL NOT NULL DEFAULT 1.0,
            factor_afternoon_snack REAL NOT NULL DEFAULT 1.0,
            factor_dinner REAL NOT NULL DEFAULT 1.0,
            factor_supper REAL NOT NULL DEFAULT 1.0,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_meals_in_day_name ON meals_in_day(name);

        -- ============================================
        -- LOOSE PRODUCTS IN DAY
        -- Kept apart from the day record, keyed by day id
        -- ============================================
        CREATE TABLE loose_products_in_day (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            day_id INTEGER NOT NULL REFERENCES meals_in_day(id) ON DELETE CASCADE,
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE RESTRICT,
            weight REAL NOT NULL DEFAULT 100,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_loose_products_day ON loose_products_in_day(day_id);
        CREATE INDEX idx_loose_products_product ON loose_products_in_day(product_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
