//! Error types surfaced by the build engine

use thiserror::Error;

/// Opaque error produced by a user-supplied action
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can end a `rule` or `run` call
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MakeError {
    /// Caller passed something the engine cannot use (empty identifier, relative cwd)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No rule registered for the requested target
    #[error("no rule to make target '{0}'")]
    UnknownTarget(String),

    /// The requested target's closure contains a cycle
    #[error("circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    /// The action for `target` reported failure
    #[error("action for '{target}' failed")]
    Action {
        target: String,
        #[source]
        source: BoxError,
    },

    /// A file target's action succeeded but the file is still missing
    #[error("file target '{0}' does not exist after its action is performed")]
    PostconditionViolation(String),

    /// An action signalled completion more than once
    #[error("completion signalled twice for target '{0}'")]
    DoubleCompletion(String),

    /// Actions that will never signal completion
    #[error("target(s) '{}' did not signal completion", .0.join(","))]
    IncompleteAction(Vec<String>),

    /// Looking up a target's modification time failed
    #[error("cannot stat '{target}'")]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// The process working directory could not be determined
    #[error("cannot determine the current working directory")]
    WorkingDirectory(#[source] std::io::Error),

    /// Nothing is running or runnable, yet the requested target is unfulfilled
    #[error("scheduler stalled before '{0}' was fulfilled")]
    Stalled(String),
}
