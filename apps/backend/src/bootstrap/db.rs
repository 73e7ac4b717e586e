use std::sync::Arc;

use db_infra::{
    build_descriptor, connect, schema_status, ConnectionDescriptor, ResolvedEnv, SchemaStatus,
};
use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Builds the descriptor from `env`, connects, and checks the schema.
/// This is the only place the application creates a descriptor.
pub async fn build_state(env: &ResolvedEnv) -> Result<AppState, AppError> {
    let descriptor = Arc::new(build_descriptor(env)?);
    let conn = bootstrap_db(&descriptor).await?;
    Ok(AppState::new(descriptor, conn))
}

/// Connects to the database described by `descriptor`.
/// This function does NOT run any migrations.
pub async fn bootstrap_db(
    descriptor: &ConnectionDescriptor,
) -> Result<DatabaseConnection, AppError> {
    let conn = connect(descriptor).await?;
    ensure_schema_ready(&conn).await?;
    Ok(conn)
}

/// Reports whether all migrations are applied.
///
/// Never creates or alters tables: the schema only changes through the
/// migration tool. A lagging schema is logged, not fatal.
pub async fn ensure_schema_ready(conn: &DatabaseConnection) -> Result<SchemaStatus, AppError> {
    let status = schema_status(conn).await?;

    if status.is_current() {
        info!(applied = status.applied, "schema=current");
    } else {
        warn!(
            applied = status.applied,
            expected = status.expected,
            pending = status.pending(),
            "schema=behind; run `migration up` to apply pending migrations"
        );
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_state_without_url_fails_before_connecting() {
        let env = ResolvedEnv::from_vars([("APP_ENV", "development")]);
        let err = build_state(&env).await.unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
