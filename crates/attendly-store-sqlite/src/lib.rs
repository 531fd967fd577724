//! SQLite backend for Attendly provisioning.
//!
//! [`SqliteStore`] stands in for the hosted relational store (profile and
//! invitation tables) and [`SqliteIdentities`] for the hosted identity
//! provider. Both wrap [`tokio_rusqlite`] so all database access runs on a
//! dedicated thread without blocking the async runtime.

mod encode;
mod identity;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use identity::SqliteIdentities;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
