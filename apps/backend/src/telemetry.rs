use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,actix_web=info,sqlx=warn,sea_orm=warn";

/// Installs the global subscriber.
///
/// Runs before the `.env` file is read so that env-file warnings are
/// captured; only the ambient `RUST_LOG` and `APP_ENV` are consulted.
/// Output is JSON except in development, where it is human readable.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let development = std::env::var("APP_ENV").as_deref() == Ok("development");

    let registry = tracing_subscriber::registry().with(env_filter);

    if development {
        registry
            .with(fmt::layer().with_target(false).compact())
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_ansi(false)
                    .json(),
            )
            .init();
    }
}
