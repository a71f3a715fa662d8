//! Packsmith - multi-version resource pack builder
//!
//! This library provides functionality to:
//! - Discover and classify pack assets from a shared tree plus per-version overrides
//! - Compose legacy grid atlases from per-file textures, and slice them back out
//! - Build, package, and deploy one artifact per configured game version
//! - Watch sources and rebuild only the affected versions

pub mod assets;
pub mod atlas;
pub mod build;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod package;
pub mod project;
pub mod transform;
pub mod watch;
