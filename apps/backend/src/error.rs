use actix_web::error::ResponseError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use db_infra::DbInfraError;
use serde::Serialize;
use thiserror::Error;

#[derive(Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {detail}")]
    Config { detail: String },
    #[error("Database error: {detail}")]
    Db { detail: String },
    #[error("Database unavailable: {detail}")]
    DbUnavailable { detail: String },
    #[error("Internal error: {detail}")]
    Internal { detail: String },
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Config { .. } => "CONFIG_ERROR",
            AppError::Db { .. } => "DB_ERROR",
            AppError::DbUnavailable { .. } => "DB_UNAVAILABLE",
            AppError::Internal { .. } => "INTERNAL",
        }
    }

    fn detail(&self) -> &str {
        match self {
            AppError::Config { detail }
            | AppError::Db { detail }
            | AppError::DbUnavailable { detail }
            | AppError::Internal { detail } => detail,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DbUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config { .. } | AppError::Db { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn config(detail: String) -> Self {
        Self::Config { detail }
    }

    pub fn db(detail: String) -> Self {
        Self::Db { detail }
    }

    pub fn db_unavailable(detail: String) -> Self {
        Self::DbUnavailable { detail }
    }

    pub fn internal(detail: String) -> Self {
        Self::Internal { detail }
    }

    fn humanize_code(code: &str) -> String {
        code.split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<DbInfraError> for AppError {
    fn from(e: DbInfraError) -> Self {
        match e {
            DbInfraError::MissingConnectionString { .. } => AppError::config(e.to_string()),
            DbInfraError::Config { message } => AppError::config(message),
            DbInfraError::Connect { message } => AppError::db_unavailable(message),
            DbInfraError::Migration { message } => AppError::db(message),
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        AppError::db(format!("db error: {e}"))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        let code = self.code();

        let problem_details = ProblemDetails {
            type_: format!("https://movies.local/errors/{code}"),
            title: Self::humanize_code(code),
            status: status.as_u16(),
            detail: self.detail().to_string(),
            code: code.to_string(),
        };

        HttpResponse::build(status)
            .content_type("application/problem+json")
            .json(problem_details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_maps_to_config_error() {
        let err: AppError = DbInfraError::MissingConnectionString {
            var: "DATABASE_URL",
        }
        .into();
        assert!(matches!(err, AppError::Config { .. }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = err.to_string();
        assert!(message.contains("DATABASE_URL"));
        assert_eq!(message.matches("Configuration error").count(), 1, "{message}");
    }

    #[test]
    fn test_infra_config_error_is_prefixed_once() {
        let err: AppError = DbInfraError::config("bad value").into();
        assert_eq!(err.to_string(), "Configuration error: bad value");
        assert_eq!(err.detail(), "bad value");
    }

    #[test]
    fn test_connect_failure_is_unavailable() {
        let err: AppError = DbInfraError::Connect {
            message: "refused".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "DB_UNAVAILABLE");
    }

    #[test]
    fn test_humanize_code() {
        assert_eq!(AppError::humanize_code("DB_UNAVAILABLE"), "Db Unavailable");
        assert_eq!(AppError::humanize_code("CONFIG_ERROR"), "Config Error");
    }
}
