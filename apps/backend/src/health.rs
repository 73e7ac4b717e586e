use actix_web::{web, HttpResponse};
use db_infra::schema_status;
use serde::Serialize;

use crate::state::AppState;
use crate::AppError;

#[derive(Debug, Serialize)]
pub struct DbHealth {
    pub engine: &'static str,
    pub database: Option<String>,
    pub applied_migrations: usize,
    pub expected_migrations: usize,
    pub schema_current: bool,
    pub entities: Vec<String>,
}

async fn health() -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().body("ok"))
}

async fn db_health(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let db = state
        .db()
        .ok_or_else(|| AppError::db_unavailable("no database connection attached".to_string()))?;

    db.ping()
        .await
        .map_err(|e| AppError::db_unavailable(format!("ping failed: {e}")))?;

    let status = schema_status(db).await?;
    let descriptor = &state.descriptor;

    Ok(HttpResponse::Ok().json(DbHealth {
        engine: descriptor.engine_kind().as_str(),
        database: descriptor.database_name().map(str::to_string),
        applied_migrations: status.applied,
        expected_migrations: status.expected,
        schema_current: status.is_current(),
        entities: descriptor
            .schema_entities()
            .iter()
            .map(|e| e.table_name.clone())
            .collect(),
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/health/db", web::get().to(db_health));
}
