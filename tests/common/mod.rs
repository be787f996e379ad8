//! Shared test infrastructure for mkgraph integration tests.

#![allow(dead_code)]

use mkgraph::{Done, Engine};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Engine rooted in a fresh temp directory.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub engine: Engine,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let engine = Engine::with_cwd(temp_dir.path()).expect("Failed to create engine");
        Self {
            temp_dir,
            engine,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Canonical identifier the engine uses for `name`
    pub fn id(&self, name: &str) -> String {
        self.engine.graph().canonical(name)
    }

    /// Rule whose action appends its target to the log and succeeds
    pub fn logged_rule(&mut self, target: &str, deps: &[&str]) {
        let log = self.log.clone();
        self.engine
            .rule_fn(target, deps, move |done: Done, target: &str, _: &[String]| {
                log.lock().unwrap().push(target.to_string());
                done.ok();
            })
            .expect("Failed to register rule");
    }

    /// Rule whose action logs, writes the target file and succeeds
    pub fn touching_rule(&mut self, target: &str, deps: &[&str]) {
        let log = self.log.clone();
        self.engine
            .rule_fn(target, deps, move |done: Done, target: &str, _: &[String]| {
                log.lock().unwrap().push(target.to_string());
                std::fs::write(target, "built").expect("Failed to write target");
                done.ok();
            })
            .expect("Failed to register rule");
    }

    pub fn logged(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Create `name` with a modification time `age` in the past
    pub fn write_aged(&self, name: &str, age: Duration) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, name).expect("Failed to write file");
        set_mtime(&path, SystemTime::now() - age);
        path
    }
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    std::fs::File::options()
        .write(true)
        .open(path)
        .expect("Failed to open file")
        .set_modified(time)
        .expect("Failed to set mtime");
}
