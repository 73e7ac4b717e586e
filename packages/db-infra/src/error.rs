use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbInfraError {
    #[error(
        "required environment variable '{var}' is not set. \
         Check that the .env file in the working directory defines it, or export it in the environment"
    )]
    MissingConnectionString { var: &'static str },
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("Connection error: {message}")]
    Connect { message: String },
    #[error("Migration error: {message}")]
    Migration { message: String },
}

impl DbInfraError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }
}
