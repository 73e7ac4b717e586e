pub mod core;

pub use core::{
    build_admin_pool, connect, orchestrate_migration, orchestrate_migration_internal,
    sanitize_db_url, schema_status, MigrationSettings, SchemaStatus,
};
