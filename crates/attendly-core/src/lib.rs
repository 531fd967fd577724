//! Core types and trait definitions for Attendly account provisioning.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! orchestrator talks to its three collaborators (identity provider,
//! relational store, mail sender) only through the traits in [`store`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod identity;
pub mod invite;
pub mod mail;
pub mod profile;
pub mod role;
pub mod store;

pub use error::{Error, Result};
