use actix_web::{web, App, HttpServer};
use backend::bootstrap::build_state;
use backend::routes;
use db_infra::ResolvedEnv;
use tracing::info;

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Process environment first, then `<cwd>/.env` for anything unset.
    let env = ResolvedEnv::from_process();

    let host = env.get("BACKEND_HOST").unwrap_or("0.0.0.0").to_string();
    let port = match env.get("BACKEND_PORT") {
        None => 3001,
        Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
            eprintln!("❌ BACKEND_PORT must be a valid port number");
            std::process::exit(1);
        }),
    };

    let app_state = match build_state(&env).await {
        Ok(state) => state,
        Err(e) => {
            eprintln!("❌ Failed to build application state: {e}");
            std::process::exit(1);
        }
    };

    info!(host = %host, port, "backend=starting");
    println!("🚀 Starting movie tracker backend on http://{}:{}", host, port);

    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
