//! Target graph - rule registration, identifier resolution and closure walk

use super::action::{self, Action};
use super::keyset::KeySet;
use super::stamp::is_phony;
use crate::error::MakeError;
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// One node of the graph
#[derive(Clone)]
pub struct Target {
    pub depends_on: KeySet,
    pub action: Arc<dyn Action>,
    /// Dependencies in the order they were first declared
    order: Vec<String>,
}

impl Target {
    /// Dependencies in declaration order
    pub fn dependencies(&self) -> &[String] {
        &self.order
    }

    fn add_dependency(&mut self, dep: String) {
        if !self.depends_on.have(&dep) {
            self.depends_on.add(dep.clone());
            self.order.push(dep);
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self {
            depends_on: KeySet::new(),
            action: action::noop(),
            order: Vec::new(),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("dependencies", &self.order)
            .finish_non_exhaustive()
    }
}

/// Target table keyed by canonical identifier
#[derive(Debug, Clone)]
pub struct Graph {
    targets: HashMap<String, Target>,
    cwd: PathBuf,
}

impl Graph {
    /// Create an empty graph resolving file targets against `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Result<Self, MakeError> {
        let mut graph = Self {
            targets: HashMap::new(),
            cwd: PathBuf::new(),
        };
        graph.set_cwd(cwd)?;
        Ok(graph)
    }

    /// Empty graph rooted at the process working directory
    pub fn from_current_dir() -> Result<Self, MakeError> {
        let cwd = std::env::current_dir().map_err(MakeError::WorkingDirectory)?;
        Self::new(cwd)
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Change the base directory. Existing identifiers keep their old resolution.
    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) -> Result<(), MakeError> {
        let cwd = cwd.into();
        if !cwd.is_absolute() {
            return Err(MakeError::InvalidArgument(format!(
                "working directory must be an absolute path, got '{}'",
                cwd.display()
            )));
        }
        self.cwd = cwd;
        Ok(())
    }

    /// Canonical form of an identifier: phony names pass through, file names
    /// become absolute paths under the working directory
    pub fn canonical(&self, id: &str) -> String {
        if is_phony(id) {
            return id.to_string();
        }
        resolve(&self.cwd, id).to_string_lossy().into_owned()
    }

    /// Register or extend a rule.
    ///
    /// Dependencies are unioned into any earlier registration, keeping first
    /// declaration order; the action is replaced only when one is given.
    pub fn rule(
        &mut self,
        target: &str,
        dependencies: &[&str],
        action: Option<Arc<dyn Action>>,
    ) -> Result<(), MakeError> {
        if target.is_empty() {
            return Err(MakeError::InvalidArgument(
                "target must be a non-empty string".to_string(),
            ));
        }
        if let Some(pos) = dependencies.iter().position(|d| d.is_empty()) {
            return Err(MakeError::InvalidArgument(format!(
                "dependency #{} of '{}' is an empty string",
                pos, target
            )));
        }

        let target = self.canonical(target);
        let dependencies: Vec<String> = dependencies.iter().map(|d| self.canonical(d)).collect();

        for dep in &dependencies {
            self.targets.entry(dep.clone()).or_default();
        }
        let record = self.targets.entry(target).or_default();
        for dep in dependencies {
            record.add_dependency(dep);
        }
        if let Some(action) = action {
            record.action = action;
        }
        Ok(())
    }

    /// Get target by canonical identifier
    pub fn get_target(&self, id: &str) -> Option<&Target> {
        self.targets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.targets.contains_key(id)
    }

    /// Every target needed to build `target`, the target itself included.
    ///
    /// Iterative depth-first walk; fails with `CircularDependency` if it
    /// reaches a target that is still being expanded.
    pub fn closure(&self, target: &str) -> Result<KeySet, MakeError> {
        if !self.contains(target) {
            return Err(MakeError::UnknownTarget(target.to_string()));
        }

        let mut expanded = KeySet::new();
        let mut expanding = KeySet::new();
        // (target, index of the next dependency to visit)
        let mut stack: Vec<(&str, usize)> = vec![(target, 0)];
        expanding.add(target);

        while let Some(&(current, next)) = stack.last() {
            let deps = self
                .targets
                .get(current)
                .map(Target::dependencies)
                .unwrap_or(&[]);

            let Some(dep) = deps.get(next) else {
                stack.pop();
                expanding.remove(current);
                expanded.add(current);
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let dep = dep.as_str();
            if expanded.have(dep) {
                continue;
            }
            if expanding.have(dep) {
                let start = stack.iter().position(|(t, _)| *t == dep).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].iter().map(|(t, _)| t.to_string()).collect();
                cycle.push(dep.to_string());
                return Err(MakeError::CircularDependency(cycle));
            }
            expanding.add(dep);
            stack.push((dep, 0));
        }

        Ok(expanded)
    }
}

/// Lexically join `id` onto `base`, folding `.` and `..`
fn resolve(base: &Path, id: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(id).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
