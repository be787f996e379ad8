//! Build description - parses mk.yml and registers its rules
//!
//! ```yaml
//! cwd: build
//! rules:
//!   - target: app
//!     deps: [main.o]
//!     run: cc -o $@ $^
//! ```

use crate::core::{Action, Done};
use crate::engine::Engine;
use crate::Result;
use anyhow::Context;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::process::Command;

/// Default build description file name
pub const DEFAULT_FILE: &str = "mk.yml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Makefile {
    /// Working directory for file targets, relative to the description's directory
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub target: String,
    #[serde(default)]
    pub deps: Vec<String>,
    /// Shell command; absent keeps the default action
    pub run: Option<String>,
}

impl Makefile {
    /// Load a build description from YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read build description {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid build description {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Point `engine` at the working directory and register every rule.
    ///
    /// `base_dir` is the absolute directory the description was loaded from.
    /// Rules are staged on a copy of the engine's graph, so on error the
    /// engine is left exactly as it was.
    pub fn register(&self, engine: &mut Engine, base_dir: &Path) -> Result<()> {
        let cwd = match &self.cwd {
            Some(dir) => base_dir.join(dir),
            None => base_dir.to_path_buf(),
        };
        let mut graph = engine.graph().clone();
        graph.set_cwd(&cwd)?;

        for rule in &self.rules {
            let deps: Vec<&str> = rule.deps.iter().map(String::as_str).collect();
            let action = rule.run.as_ref().map(|command| {
                Arc::new(ShellAction::new(command.clone(), cwd.clone(), engine.args().to_vec()))
                    as Arc<dyn Action>
            });
            graph
                .rule(&rule.target, &deps, action)
                .with_context(|| format!("bad rule for '{}'", rule.target))?;
        }
        engine.replace_graph(graph);

        log::debug!("Registered {} rule(s) in {}", self.rules.len(), cwd.display());
        Ok(())
    }
}

/// Runs a shell command through `sh -c`.
///
/// `$@` expands to the target, `$<` to the first dependency and `$^` to all
/// dependencies. Extra arguments become the script's positional parameters.
#[derive(Debug, Clone)]
pub struct ShellAction {
    command: String,
    dir: PathBuf,
    args: Vec<String>,
}

impl ShellAction {
    pub fn new(command: String, dir: PathBuf, args: Vec<String>) -> Self {
        Self { command, dir, args }
    }

    /// Command line after variable substitution
    pub fn expand(&self, target: &str, dependencies: &[String]) -> String {
        static VARS: OnceLock<Regex> = OnceLock::new();
        let vars = VARS.get_or_init(|| Regex::new(r"\$[@<^]").unwrap());

        vars.replace_all(&self.command, |caps: &Captures| match &caps[0] {
            "$@" => target.to_string(),
            "$<" => dependencies.first().cloned().unwrap_or_default(),
            _ => dependencies.join(" "),
        })
        .into_owned()
    }
}

impl Action for ShellAction {
    fn call(&self, done: Done, target: &str, dependencies: &[String]) {
        let script = self.expand(target, dependencies);
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&script)
            .arg("mk")
            .args(&self.args)
            .current_dir(&self.dir);

        log::info!("{}", script);
        tokio::spawn(async move {
            match command.status().await {
                Ok(status) if status.success() => done.ok(),
                Ok(status) => done.fail(format!("command `{}` failed: {}", script, status)),
                Err(e) => done.fail(format!("cannot spawn `{}`: {}", script, e)),
            }
        });
    }
}
