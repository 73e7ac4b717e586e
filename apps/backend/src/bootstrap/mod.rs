pub mod db;

pub use db::{bootstrap_db, build_state, ensure_schema_ready};
