//! Modification-time stamps and the rebuild rule

use crate::error::MakeError;
use std::io::ErrorKind;
use std::time::SystemTime;

/// Marker that starts a phony (non-file) identifier
pub const PHONY_PREFIX: char = ':';

pub fn is_phony(target: &str) -> bool {
    target.starts_with(PHONY_PREFIX)
}

/// Modification time of `target`.
///
/// Phony targets and files that do not exist have no stamp.
pub async fn stamp(target: &str) -> Result<Option<SystemTime>, MakeError> {
    if is_phony(target) {
        return Ok(None);
    }
    match tokio::fs::metadata(target).await {
        Ok(meta) => meta.modified().map(Some).map_err(|source| MakeError::Io {
            target: target.to_string(),
            source,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(MakeError::Io {
            target: target.to_string(),
            source,
        }),
    }
}

/// Whether a file target exists on disk right now. Phony targets always do.
pub async fn exists(target: &str) -> Result<bool, MakeError> {
    if is_phony(target) {
        return Ok(true);
    }
    match tokio::fs::metadata(target).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(MakeError::Io {
            target: target.to_string(),
            source,
        }),
    }
}

/// Decide whether a target's action must run.
///
/// A target without dependencies always runs. Otherwise it runs when it has
/// no stamp, when any dependency has no stamp, or when any dependency is
/// strictly newer.
pub fn needs_rebuild(target: Option<SystemTime>, dependencies: &[Option<SystemTime>]) -> bool {
    let Some(target) = target else {
        return true;
    };
    if dependencies.is_empty() {
        return true;
    }
    dependencies.iter().any(|dep| match dep {
        None => true,
        Some(dep) => *dep > target,
    })
}
