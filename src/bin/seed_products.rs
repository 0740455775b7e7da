//! Utility to seed the product catalog with a few demo products

use dietplan::config::AppConfig;
use dietplan::db::{migrations, Database};
use dietplan::models::{Category, Product, ProductCreate};

/// (name, category, kcal, protein, carbs, fat) per 100g
const DEMO_PRODUCTS: &[(&str, &str, f64, f64, f64, f64)] = &[
    ("Chicken Breast", "Protein", 165.0, 31.0, 0.0, 3.6),
    ("Brown Rice", "Carbs", 216.0, 5.0, 45.0, 1.8),
    ("Broccoli", "Vegetables", 55.0, 3.7, 11.2, 0.6),
    ("Salmon", "Protein", 206.0, 22.0, 0.0, 13.0),
    ("Avocado", "Fats", 160.0, 2.0, 8.5, 14.7),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    let db_path = config.database_path;
    println!("Database path: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(&db_path)?;

    // Run migrations
    database.with_conn(migrations::run_migrations)?;

    database.with_conn(|conn| {
        for &(name, category, kcal, protein, carbs, fat) in DEMO_PRODUCTS {
            if Product::get_by_name(conn, name)?.is_some() {
                println!("  skip   {} (exists)", name);
                continue;
            }

            let category = Category::get_or_create(conn, category)?;
            let product = Product::create(
                conn,
                &ProductCreate {
                    name: name.to_string(),
                    category_id: Some(category.id),
                    calories_per_100: kcal,
                    protein_per_100: protein,
                    carbs_per_100: carbs,
                    fat_per_100: fat,
                    reference_weight: Some(100.0),
                    unit: Some("g".to_string()),
                    ..Default::default()
                },
            )?;
            println!("  added  {} (#{}, {})", product.name, product.id, category.name);
        }
        Ok(())
    })?;

    Ok(())
}
