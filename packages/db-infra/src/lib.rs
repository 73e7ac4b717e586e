//! Shared database configuration and migration infrastructure.
//! Used by the backend and the migration CLI.

pub mod config;
pub mod error;
pub mod infra;

pub use config::db::{
    build_descriptor, validate_db_config, validate_test_database_url, ConnectionDescriptor,
    DbKind, MigrationLocator, RuntimeEnv,
};
pub use config::env::{EnvFileStatus, ResolvedEnv};
pub use error::DbInfraError;
pub use infra::db::core::{
    build_admin_pool, connect, orchestrate_migration, orchestrate_migration_internal,
    sanitize_db_url, schema_status, MigrationSettings, SchemaStatus,
};
