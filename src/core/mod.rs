//! Core engine - target graph, staleness, scheduling and execution

pub mod action;
mod executor;
mod graph;
mod keyset;
mod scheduler;
pub mod stamp;

pub use action::{Action, Done};
pub use executor::{Executor, TargetEvent};
pub use graph::{Graph, Target};
pub use keyset::KeySet;
pub use scheduler::Scheduler;
