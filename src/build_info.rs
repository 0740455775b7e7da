//! Build information module
//!
//! What this binary was compiled as and which data layout it expects.
//! `build.rs` stamps the build number and timestamp; the schema and slot
//! counts come from the crate itself so the banner and `dietplan_status`
//! agree with what the migrations will create.

use std::path::Path;

use serde::Serialize;

use crate::db::migrations::SCHEMA_VERSION;
use crate::nutrition::MealSlot;

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Build timestamp in ISO 8601 format
pub const BUILD_TIMESTAMP: &str = match option_env!("DIETPLAN_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

/// Build number stamped by build.rs; 0 when built without it
pub fn build_number() -> u64 {
    option_env!("DIETPLAN_BUILD_NUMBER")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

/// Build and data-layout information for serialization
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub profile: &'static str,
    /// Schema version the migrations bring a database up to
    pub schema_version: i32,
    pub meal_slots: usize,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            build_number: build_number(),
            build_timestamp: BUILD_TIMESTAMP,
            profile: if cfg!(debug_assertions) { "debug" } else { "release" },
            schema_version: SCHEMA_VERSION,
            meal_slots: MealSlot::ALL.len(),
        }
    }

    /// One-line summary used in logs
    pub fn summary(&self) -> String {
        format!(
            "{} v{} build {} ({}, schema v{})",
            self.name, self.version, self.build_number, self.profile, self.schema_version
        )
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::current()
    }
}

/// Print the startup banner to stderr
pub fn print_startup_banner(database_path: &Path) {
    let info = BuildInfo::current();
    eprintln!("===============================================");
    eprintln!("  Diet Planner");
    eprintln!("  Version: {} | Build: {} | {}", info.version, info.build_number, info.profile);
    eprintln!("  Compiled: {}", info.build_timestamp);
    eprintln!("  Schema: v{} | Meal slots: {}", info.schema_version, info.meal_slots);
    eprintln!("  Database: {}", database_path.display());
    eprintln!("===============================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_tracks_schema_and_slots() {
        let info = BuildInfo::current();
        assert_eq!(info.schema_version, SCHEMA_VERSION);
        assert_eq!(info.meal_slots, 6);
        assert_eq!(info.name, "dietplan");
    }

    #[test]
    fn test_summary() {
        let info = BuildInfo {
            build_number: 7,
            profile: "release",
            ..BuildInfo::current()
        };
        assert_eq!(
            info.summary(),
            format!("dietplan v{} build 7 (release, schema v{})", VERSION, SCHEMA_VERSION)
        );
    }
}
