//! Versioned schema migrations: registration, pending-set computation,
//! and transactional application.

pub mod registry;
pub mod runner;

pub use registry::{Migration, MigrationRegistry};
pub use runner::{AppliedMigration, Migrator};
