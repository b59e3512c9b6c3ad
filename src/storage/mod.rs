//! Database access: users, generations, leads, orders, sessions and incidents

pub mod db;
pub mod generations;
pub mod incidents;
pub mod leads;
pub mod migrations;
pub mod orders;
pub mod sessions;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
pub use sessions::{InMemorySessionStore, SessionStore, SqliteSessionStore};
