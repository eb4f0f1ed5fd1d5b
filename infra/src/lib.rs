//! # Muse Infrastructure
//!
//! Concrete implementations of the core repository interfaces.
//! Currently MySQL-backed via SQLx.

pub mod database;

pub use database::{create_pool, MySqlTokenRepository};
