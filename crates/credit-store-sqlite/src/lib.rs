//! SQLite backend for the credit store.
//!
//! [`Database`] owns an r2d2 pool of rusqlite connections and hands out
//! [`Session`]s, each one transaction on one connection. Sessions implement
//! [`UnitOfWork`](credit_core::store::UnitOfWork). Blocking work can be moved
//! off the async runtime with [`Database::call`].

mod config;
mod database;
mod encode;
mod schema;
mod session;

pub mod error;

pub use config::{IN_MEMORY, StoreConfig};
pub use database::{Database, HealthReport, HealthStatus, PoolStatus};
pub use error::{Error, Result};
pub use schema::{SCHEMA_VERSION, SchemaManager, SchemaObject, TABLES, TeardownConfirmation};
pub use session::Session;

#[cfg(test)]
mod tests;
