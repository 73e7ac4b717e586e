#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod bootstrap;
pub mod error;
pub mod health;
pub mod routes;
pub mod state;

pub use bootstrap::{bootstrap_db, build_state};
pub use error::AppError;
pub use state::AppState;

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    backend_test_support::test_logging::init();
}
