use std::fmt;
use std::str::FromStr;

pub use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;
pub use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseConnection};

mod m20250101_000001_init; // keep filename + module name in sync

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250101_000001_init::Migration)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationCommand {
    Up,
    Down,
    Fresh,
    Reset,
    Refresh,
    Status,
}

impl MigrationCommand {
    pub const CHOICES: &'static str = "up | down | fresh | reset | refresh | status";

    pub fn as_str(self) -> &'static str {
        match self {
            MigrationCommand::Up => "up",
            MigrationCommand::Down => "down",
            MigrationCommand::Fresh => "fresh",
            MigrationCommand::Reset => "reset",
            MigrationCommand::Refresh => "refresh",
            MigrationCommand::Status => "status",
        }
    }

    /// Whether the command changes the schema.
    pub fn is_mutating(self) -> bool {
        !matches!(self, MigrationCommand::Status)
    }
}

impl fmt::Display for MigrationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(MigrationCommand::Up),
            "down" => Ok(MigrationCommand::Down),
            "fresh" => Ok(MigrationCommand::Fresh),
            "reset" => Ok(MigrationCommand::Reset),
            "refresh" => Ok(MigrationCommand::Refresh),
            "status" => Ok(MigrationCommand::Status),
            other => Err(format!(
                "Unknown command: {other}. Use: {}",
                MigrationCommand::CHOICES
            )),
        }
    }
}

/// Names of every migration the runner knows about, oldest first.
pub fn defined_migration_names() -> Vec<String> {
    Migrator::migrations()
        .iter()
        .map(|m| m.name().to_string())
        .collect()
}

/// Runs a migration command against an already connected database.
/// Used by both the CLI and the backend orchestration.
pub async fn migrate(db: &DatabaseConnection, command: MigrationCommand) -> Result<(), DbErr> {
    let db_info_before = get_db_diagnostics(db).await?;

    tracing::info!("▶ cmd={command}  profile={}", db_info_before.profile);
    tracing::info!("▶ connected to DB: {}", db_info_before.name);
    tracing::info!(
        "▶ BEFORE: runner has {} migration(s) defined, {} applied",
        db_info_before.defined_migrations_count,
        db_info_before.mig_count
    );

    let result = match command {
        MigrationCommand::Up => Migrator::up(db, None).await,
        MigrationCommand::Down => Migrator::down(db, None).await,
        MigrationCommand::Fresh => Migrator::fresh(db).await,
        MigrationCommand::Reset => Migrator::reset(db).await,
        MigrationCommand::Refresh => Migrator::refresh(db).await,
        MigrationCommand::Status => Migrator::status(db).await,
    };

    match result {
        Ok(()) => {
            if command.is_mutating() {
                let db_info_after = get_db_diagnostics(db).await?;
                tracing::info!(
                    "▶ AFTER: runner has {} migration(s) defined, {} applied",
                    db_info_after.defined_migrations_count,
                    db_info_after.mig_count
                );
            }
            tracing::info!("✅ {command} OK for {}", db_info_before.name);
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ {command} failed for {}: {e}", db_info_before.name);
            Err(e)
        }
    }
}

#[derive(Debug)]
struct DbDiagnostics {
    profile: String,
    name: String,
    mig_count: usize,
    defined_migrations_count: usize,
}

async fn get_db_diagnostics(db: &DatabaseConnection) -> Result<DbDiagnostics, DbErr> {
    let backend = db.get_database_backend();
    let profile = format!("{backend:?}");

    let name = match backend {
        sea_orm_migration::sea_orm::DatabaseBackend::Postgres => {
            let stmt = Statement::from_string(
                backend,
                String::from("select current_database() as name"),
            );
            match db.query_one(stmt).await? {
                Some(row) => row.try_get("", "name")?,
                None => "<unknown>".to_string(),
            }
        }
        _ => "<unsupported>".to_string(),
    };

    let applied_migrations_count = count_applied_migrations(db).await.unwrap_or(0);

    Ok(DbDiagnostics {
        profile,
        name,
        mig_count: applied_migrations_count,
        defined_migrations_count: Migrator::migrations().len(),
    })
}

/// Name of the bookkeeping table kept by the migrator.
pub const MIGRATION_TABLE: &str = "seaql_migrations";

/// Whether the bookkeeping table exists.
///
/// `Migrator::get_applied_migrations` creates the table on first use, so
/// read-only callers must check this first.
pub async fn migration_table_exists(db: &DatabaseConnection) -> Result<bool, DbErr> {
    SchemaManager::new(db).has_table(MIGRATION_TABLE).await
}

/// Count the migrations that have been applied to the database.
/// Returns 0 if the migration table doesn't exist yet.
pub async fn count_applied_migrations(db: &DatabaseConnection) -> Result<usize, DbErr> {
    if !migration_table_exists(db).await? {
        return Ok(0);
    }
    Ok(Migrator::get_applied_migrations(db).await?.len())
}

/// Version string of the latest applied migration, if any.
/// Returns `None` if the migration table doesn't exist yet.
pub async fn get_latest_migration_version(
    db: &DatabaseConnection,
) -> Result<Option<String>, DbErr> {
    if !migration_table_exists(db).await? {
        return Ok(None);
    }
    Ok(Migrator::get_applied_migrations(db)
        .await?
        .last()
        .map(|m| m.name().to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm_migration::sea_orm::{DatabaseBackend, MockDatabase, Value};

    use super::*;

    fn has_table_row(exists: bool) -> BTreeMap<String, Value> {
        BTreeMap::from([("has_table".to_string(), Value::Bool(Some(exists)))])
    }

    #[test]
    fn test_parse_every_command() {
        for cmd in [
            MigrationCommand::Up,
            MigrationCommand::Down,
            MigrationCommand::Fresh,
            MigrationCommand::Reset,
            MigrationCommand::Refresh,
            MigrationCommand::Status,
        ] {
            assert_eq!(cmd.as_str().parse::<MigrationCommand>(), Ok(cmd));
        }
    }

    #[test]
    fn test_parse_unknown_command_lists_choices() {
        let err = "sideways".parse::<MigrationCommand>().unwrap_err();
        assert!(err.contains("sideways"));
        assert!(err.contains(MigrationCommand::CHOICES));
    }

    #[test]
    fn test_only_status_is_read_only() {
        assert!(!MigrationCommand::Status.is_mutating());
        assert!(MigrationCommand::Up.is_mutating());
        assert!(MigrationCommand::Reset.is_mutating());
    }

    #[test]
    fn test_defined_migrations_are_ordered() {
        let names = defined_migration_names();
        assert_eq!(names, vec!["m20250101_000001_init".to_string()]);

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn test_unmigrated_database_reports_nothing_applied() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[has_table_row(false)], [has_table_row(false)]])
            .into_connection();

        assert_eq!(count_applied_migrations(&db).await.unwrap(), 0);
        assert_eq!(get_latest_migration_version(&db).await.unwrap(), None);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("CREATE TABLE"), "unexpected DDL: {log}");
    }
}
