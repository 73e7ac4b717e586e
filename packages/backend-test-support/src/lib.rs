//! Shared test utilities: logging initialization and `.env` fixtures.

pub mod env_fixture;
pub mod test_logging;

pub use env_fixture::EnvFixture;
