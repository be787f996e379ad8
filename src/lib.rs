//! mkgraph - minimal build orchestrator
//!
//! Targets are declared with dependencies and an optional action; running a
//! target rebuilds whatever in its dependency closure is stale, launching
//! independent targets concurrently.

pub mod core;
pub mod engine;
pub mod error;
pub mod makefile;

// Re-exports
pub use crate::core::{Action, Done, Graph, KeySet, Target};
pub use engine::{Engine, Report};
pub use error::{BoxError, MakeError};
pub use makefile::{Makefile, ShellAction};

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
