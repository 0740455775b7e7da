//! Diet Planner Library
//!
//! Nutrition aggregation (product → meal → day) plus the SQLite store and
//! MCP tools built around it.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
