mod repository;

pub use repository::*;

/// SQL migration for the initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for assignment links
pub const MIGRATION_002_ASSIGNMENTS: &str = include_str!("migrations/002_assignments.sql");
