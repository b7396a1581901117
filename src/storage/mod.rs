mod repository;

pub use repository::*;

/// SQL migration for vehicles, permits and fuel expenses
pub const MIGRATION_001_FLEET: &str = include_str!("migrations/001_fleet.sql");

/// SQL migration for the generic document store
pub const MIGRATION_002_DOCUMENTS: &str = include_str!("migrations/002_documents.sql");
