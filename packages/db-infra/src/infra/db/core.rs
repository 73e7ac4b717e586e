use std::time::{Duration, Instant};

use migration::{
    count_applied_migrations, get_latest_migration_version, migrate, MigrationCommand, Migrator,
    MigratorTrait,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{error, info, trace, warn};

use crate::config::db::{validate_db_config, ConnectionDescriptor, RuntimeEnv};
use crate::config::env::ResolvedEnv;
use crate::error::DbInfraError;

const DEFAULT_BODY_TIMEOUT_MS: u64 = 120_000;

/// Knobs for a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSettings {
    pub runtime_env: RuntimeEnv,
    pub body_timeout: Duration,
}

impl MigrationSettings {
    pub fn new(runtime_env: RuntimeEnv) -> Self {
        Self {
            runtime_env,
            body_timeout: Duration::from_millis(DEFAULT_BODY_TIMEOUT_MS),
        }
    }

    /// Reads `MIGRATE_TIMEOUT_MS` from the resolved environment.
    pub fn from_env(env: &ResolvedEnv, runtime_env: RuntimeEnv) -> Self {
        let timeout_ms = env.get_parsed_or("MIGRATE_TIMEOUT_MS", DEFAULT_BODY_TIMEOUT_MS);
        Self {
            runtime_env,
            body_timeout: Duration::from_millis(timeout_ms),
        }
    }
}

/// Applied vs defined migrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatus {
    pub applied: usize,
    pub expected: usize,
    pub latest: Option<String>,
    pub expected_latest: Option<String>,
}

impl SchemaStatus {
    /// True when every defined migration has been applied, last one included.
    pub fn is_current(&self) -> bool {
        self.applied == self.expected
            && self.expected_latest.is_some()
            && self.latest == self.expected_latest
    }

    pub fn pending(&self) -> usize {
        self.expected.saturating_sub(self.applied)
    }
}

/// Opens the application connection described by `descriptor`.
///
/// Single attempt; pooling and retry policy belong to the caller.
pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<DatabaseConnection, DbInfraError> {
    let mut opt = ConnectOptions::new(descriptor.connection_uri());
    opt.sqlx_logging(descriptor.verbose_logging());

    info!(
        "db=connect engine={} url={} verbose={}",
        descriptor.engine_kind().as_str(),
        sanitize_db_url(descriptor.connection_uri()),
        descriptor.verbose_logging()
    );

    Database::connect(opt)
        .await
        .map_err(|e| DbInfraError::Connect {
            message: format!(
                "failed to connect to {}: {e}",
                sanitize_db_url(descriptor.connection_uri())
            ),
        })
}

/// Single-connection pool used for migrations.
pub async fn build_admin_pool(
    descriptor: &ConnectionDescriptor,
) -> Result<DatabaseConnection, DbInfraError> {
    let mut opt = ConnectOptions::new(descriptor.connection_uri());
    opt.min_connections(1)
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(2))
        .sqlx_logging(descriptor.verbose_logging());

    Database::connect(opt)
        .await
        .map_err(|e| DbInfraError::Connect {
            message: format!("failed to connect to Postgres (admin pool): {e}"),
        })
}

/// Sanitize database URL by masking the password.
/// Used for logging and error messages.
pub fn sanitize_db_url(url: &str) -> String {
    let Some(at) = url.rfind('@') else {
        return url.to_string();
    };
    let (auth_part, host_part) = url.split_at(at);
    let user_start = auth_part.find("://").map(|i| i + 3).unwrap_or(0);

    match auth_part[user_start..].find(':') {
        Some(colon) => format!("{}:***{}", &auth_part[..user_start + colon], host_part),
        None => url.to_string(),
    }
}

/// Reads the migration bookkeeping table without creating it. A missing
/// table counts as nothing applied.
pub async fn schema_status(conn: &DatabaseConnection) -> Result<SchemaStatus, DbInfraError> {
    let defined = Migrator::migrations();
    let expected = defined.len();
    let expected_latest = defined.last().map(|m| m.name().to_string());

    let applied = count_applied_migrations(conn)
        .await
        .map_err(|e| DbInfraError::migration(format!("failed to count applied migrations: {e}")))?;
    let latest = get_latest_migration_version(conn)
        .await
        .map_err(|e| DbInfraError::migration(format!("failed to get applied migrations: {e}")))?;

    trace!(applied, latest = ?latest, expected, "schema=status");

    Ok(SchemaStatus {
        applied,
        expected,
        latest,
        expected_latest,
    })
}

pub async fn orchestrate_migration(
    descriptor: &ConnectionDescriptor,
    settings: MigrationSettings,
    command: MigrationCommand,
) -> Result<(), DbInfraError> {
    validate_db_config(descriptor, settings.runtime_env)?;

    let admin_pool = build_admin_pool(descriptor).await?;

    orchestrate_migration_internal(&admin_pool, descriptor, settings, command).await
}

pub async fn orchestrate_migration_internal(
    pool: &DatabaseConnection,
    descriptor: &ConnectionDescriptor,
    settings: MigrationSettings,
    command: MigrationCommand,
) -> Result<(), DbInfraError> {
    info!(
        "migrate=start cmd={} env={:?} engine={} url={} locator={}",
        command,
        settings.runtime_env,
        descriptor.engine_kind().as_str(),
        sanitize_db_url(descriptor.connection_uri()),
        descriptor.migration_locator()
    );

    if !command.is_mutating() {
        migrate(pool, command)
            .await
            .map_err(|e| DbInfraError::migration(format!("migration execution failed: {e}")))?;
        info!("migrate=done");
        return Ok(());
    }

    if matches!(command, MigrationCommand::Up) && schema_status(pool).await?.is_current() {
        info!("migrate=skipped up_to_date=true");
        return Ok(());
    }

    let start = Instant::now();
    let result = run_with_timeout(pool, command, settings.body_timeout).await;
    if let Err(ref e) = result {
        error!(
            elapsed_ms = start.elapsed().as_millis(),
            error = %e,
            "migrate=failed"
        );
        return result;
    }

    info!(
        migrator = "ran",
        env = ?settings.runtime_env,
        elapsed_ms = start.elapsed().as_millis()
    );

    verify_post_migration(pool, command, settings.runtime_env).await?;

    info!("migrate=done");
    Ok(())
}

async fn run_with_timeout(
    pool: &DatabaseConnection,
    command: MigrationCommand,
    body_timeout: Duration,
) -> Result<(), DbInfraError> {
    let pool_clone = pool.clone();
    let mut migration_task = tokio::spawn(async move { migrate(&pool_clone, command).await });

    tokio::select! {
        biased;

        task_result = &mut migration_task => {
            match task_result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(DbInfraError::migration(format!(
                    "migration execution failed: {e}"
                ))),
                Err(join_err) if join_err.is_panic() => Err(DbInfraError::migration(
                    "migration task panicked during execution",
                )),
                Err(_) => Err(DbInfraError::migration(
                    "migration task was aborted before completion",
                )),
            }
        }
        _ = tokio::time::sleep(body_timeout) => {
            migration_task.abort();
            let _ = migration_task.await;
            warn!(
                timeout_ms = body_timeout.as_millis(),
                "Migration body timeout - task aborted"
            );
            Err(DbInfraError::migration(format!(
                "migration body execution timed out after {}ms",
                body_timeout.as_millis()
            )))
        }
    }
}

async fn verify_post_migration(
    pool: &DatabaseConnection,
    command: MigrationCommand,
    runtime_env: RuntimeEnv,
) -> Result<(), DbInfraError> {
    let status = schema_status(pool).await?;
    info!(
        migrate = "counts",
        expected_count = status.expected,
        applied_count = status.applied
    );

    match command {
        MigrationCommand::Reset if status.applied != 0 => {
            Err(DbInfraError::migration(format!(
                "Migration verification failed: reset should leave 0 migrations applied, but {} were found (env={runtime_env:?})",
                status.applied
            )))
        }
        MigrationCommand::Up | MigrationCommand::Fresh | MigrationCommand::Refresh
            if status.applied != status.expected =>
        {
            Err(DbInfraError::migration(format!(
                "Migration verification failed: expected {} migrations, but {} were applied (env={runtime_env:?})",
                status.expected, status.applied
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    use super::*;

    #[test]
    fn test_sanitize_db_url_masks_password() {
        assert_eq!(
            sanitize_db_url("postgres://u:p@h/db"),
            "postgres://u:***@h/db"
        );
        assert_eq!(
            sanitize_db_url("postgresql://movie:p@ss@db:5432/movies"),
            "postgresql://movie:***@db:5432/movies"
        );
    }

    #[test]
    fn test_sanitize_db_url_without_password() {
        for url in [
            "postgresql://movie@db:5432/movies",
            "postgresql://db:5432/movies",
            "not-a-url",
        ] {
            assert_eq!(sanitize_db_url(url), url);
        }
    }

    #[test]
    fn test_schema_status_is_current() {
        let current = SchemaStatus {
            applied: 1,
            expected: 1,
            latest: Some("m20250101_000001_init".to_string()),
            expected_latest: Some("m20250101_000001_init".to_string()),
        };
        assert!(current.is_current());
        assert_eq!(current.pending(), 0);

        let behind = SchemaStatus {
            applied: 0,
            latest: None,
            ..current.clone()
        };
        assert!(!behind.is_current());
        assert_eq!(behind.pending(), 1);

        let diverged = SchemaStatus {
            latest: Some("m20240101_000001_other".to_string()),
            ..current
        };
        assert!(!diverged.is_current());
    }

    #[test]
    fn test_migration_settings_from_env() {
        let env = ResolvedEnv::from_vars([("MIGRATE_TIMEOUT_MS", "5000")]);
        let settings = MigrationSettings::from_env(&env, RuntimeEnv::Test);
        assert_eq!(settings.body_timeout, Duration::from_millis(5000));
        assert_eq!(settings.runtime_env, RuntimeEnv::Test);

        let empty = ResolvedEnv::from_vars(std::iter::empty::<(String, String)>());
        let defaults = MigrationSettings::from_env(&empty, RuntimeEnv::Prod);
        assert_eq!(defaults, MigrationSettings::new(RuntimeEnv::Prod));
    }

    #[tokio::test]
    async fn test_schema_status_leaves_unmigrated_database_untouched() {
        let has_table = |exists: bool| {
            BTreeMap::from([("has_table".to_string(), Value::Bool(Some(exists)))])
        };
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[has_table(false)], [has_table(false)]])
            .into_connection();

        let status = schema_status(&conn).await.unwrap();
        assert_eq!(status.applied, 0);
        assert_eq!(status.latest, None);
        assert_eq!(status.expected, 1);
        assert!(!status.is_current());

        let log = conn.into_transaction_log();
        assert_eq!(log.len(), 2, "only the table lookups run: {log:?}");
        assert!(
            !format!("{log:?}").contains("CREATE"),
            "schema check must not issue DDL: {log:?}"
        );
    }
}
