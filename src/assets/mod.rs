//! Asset classification and discovery
//!
//! Source trees are walked once per build. Every regular file becomes an
//! [`AssetRecord`] tagged with a semantic [`AssetKind`] decided purely from
//! its relative path.

pub mod classify;
pub mod discovery;

pub use classify::*;
pub use discovery::*;
