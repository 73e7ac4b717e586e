use clap::{Parser, ValueEnum};
use db_infra::{
    build_descriptor, orchestrate_migration, MigrationSettings, ResolvedEnv, RuntimeEnv,
};
use migration::MigrationCommand;
use tracing::{info, warn};

#[derive(Clone, ValueEnum)]
enum Env {
    Prod,
    Test,
}

#[derive(Parser)]
#[command(name = "migration-cli")]
#[command(about = "Movie tracker database migration tool")]
struct Args {
    /// Migration command to run: up | down | fresh | reset | refresh | status
    command: String,

    /// Runtime environment; `test` requires a database named `*_test`
    #[arg(short, long, value_enum, default_value = "prod")]
    env: Env,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_env_filter("migration=info,db_infra=info,sqlx=warn")
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version also land here
            let code = if e.use_stderr() { 2 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let command = match args.command.parse::<MigrationCommand>() {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let runtime_env = match args.env {
        Env::Prod => RuntimeEnv::Prod,
        Env::Test => RuntimeEnv::Test,
    };

    let env = ResolvedEnv::from_process();
    let descriptor = match build_descriptor(&env) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let locator = descriptor.migration_locator();
    match std::env::current_dir().map(|cwd| locator.discover(&cwd)) {
        Ok(Ok(units)) => info!(locator = %locator, units = units.len(), "migration units discovered"),
        // Normal for installed binaries; the migrator is compiled in.
        _ => warn!(locator = %locator, "migration directory not found from the working directory"),
    }

    let settings = MigrationSettings::from_env(&env, runtime_env);
    if let Err(e) = orchestrate_migration(&descriptor, settings, command).await {
        eprintln!("❌ Migration failed: {e}");
        std::process::exit(1);
    }
}
