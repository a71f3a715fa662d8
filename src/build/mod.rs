//! Build pipeline module for packsmith
//!
//! Turns the shared asset tree into one output directory and artifact per
//! profile.
//!
//! # Overview
//!
//! The build system consists of:
//! - **Pipeline**: discover, filter, transform and reconcile one profile
//! - **Queue**: debounce build requests and keep one build per profile in flight
//! - **Results**: per-profile outcomes and multi-profile summaries
//!
//! # Example
//!
//! ```ignore
//! use packsmith::build::Pipeline;
//! use packsmith::project::Project;
//!
//! let project = Project::load(None)?;
//! let pipeline = Pipeline::new(project);
//! let outcome = pipeline.build("b1.7.3");
//! println!("{} files processed", outcome.result.processed.len());
//! ```

pub mod context;
pub mod pipeline;
pub mod queue;
pub mod result;

pub use context::*;
pub use pipeline::*;
pub use queue::*;
pub use result::*;
