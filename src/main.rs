//! Diet Planner
//!
//! An MCP server for product catalogs, meals and daily meal plans.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dietplan::build_info;
use dietplan::config::AppConfig;
use dietplan::db::{migrations, Database};
use dietplan::mcp::DietPlanService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter)?)
        .with_writer(std::io::stderr)
        .init();

    let db_path = config.database_path.clone();

    // Print startup banner to stderr
    build_info::print_startup_banner(&db_path);
    eprintln!("Starting MCP server on stdio...");

    // Ensure data directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    let database = Database::new(&db_path)?;

    // Run migrations
    database.with_conn(|conn| {
        migrations::run_migrations(conn)?;
        let version = migrations::get_schema_version(conn)?;
        info!(version, build = %build_info::BuildInfo::current().summary(), "database ready");
        Ok(())
    })?;

    let service = DietPlanService::new(db_path, database);

    // Start the MCP server
    let server = service.serve((stdin(), stdout())).await?;

    // Wait for the server to complete
    server.waiting().await?;

    Ok(())
}
