//! Runtime configuration
//!
//! Everything comes from environment variables with sensible defaults.

use std::path::{Path, PathBuf};

/// Default tracing directive when neither `DIETPLAN_LOG` nor `RUST_LOG` is set
pub const DEFAULT_LOG_DIRECTIVE: &str = "dietplan=info";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_path = std::env::var("DIETPLAN_DATABASE_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let log_filter = std::env::var("DIETPLAN_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_DIRECTIVE.to_string());

        Self { database_path, log_filter }
    }
}

/// `<project root>/data/dietplan.db`, where the project root is the
/// directory above `target/{debug,release}` when run from a cargo build
pub fn default_database_path() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    database_path_under(&project_root(exe_dir))
}

fn project_root(mut path: PathBuf) -> PathBuf {
    // cargo bins land in target/release or target/debug (seed binaries too)
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }
    path
}

fn database_path_under(root: &Path) -> PathBuf {
    root.join("data").join("dietplan.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_root_skips_target_dir() {
        let root = project_root(PathBuf::from("/work/dietplan/target/release"));
        assert_eq!(root, PathBuf::from("/work/dietplan"));

        let installed = project_root(PathBuf::from("/usr/local/bin"));
        assert_eq!(installed, PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn test_database_path_under_root() {
        assert_eq!(
            database_path_under(Path::new("/srv")),
            PathBuf::from("/srv/data/dietplan.db")
        );
    }
}
