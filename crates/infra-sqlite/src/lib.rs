// Netloc Infrastructure - SQLite Adapter
// Implements: LocationCache

mod connection;
mod error;
mod location_cache;
mod migration;

pub use connection::create_pool;
pub use location_cache::SqliteLocationCache;
pub use migration::run_migrations;

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
