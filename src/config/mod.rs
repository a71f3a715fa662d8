//! Configuration module for packsmith
//!
//! Provides types and parsing for `packsmith.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
