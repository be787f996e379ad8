//! Build engine - rule registration and the run event loop

use crate::core::{stamp, Action, Done, Executor, Graph, KeySet, Scheduler, TargetEvent};
use crate::error::MakeError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Targets whose own action ran, in completion order
    pub built: Vec<String>,
    /// Targets found up to date or without an action of their own
    pub up_to_date: Vec<String>,
}

/// A build engine owning one target graph.
///
/// Engines are independent; nothing is shared between instances.
#[derive(Debug)]
pub struct Engine {
    graph: Graph,
    args: Vec<String>,
}

impl Engine {
    /// Engine resolving file targets against the process working directory
    pub fn new() -> Result<Self, MakeError> {
        Ok(Self {
            graph: Graph::from_current_dir()?,
            args: Vec::new(),
        })
    }

    /// Engine resolving file targets against `cwd`, which must be absolute
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Result<Self, MakeError> {
        Ok(Self {
            graph: Graph::new(cwd)?,
            args: Vec::new(),
        })
    }

    pub fn cwd(&self) -> &Path {
        self.graph.cwd()
    }

    /// Set the base directory for file identifiers registered from now on
    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) -> Result<(), MakeError> {
        self.graph.set_cwd(cwd)
    }

    /// Extra arguments passed through by the host
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn set_args(&mut self, args: Vec<String>) {
        self.args = args;
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Swap in a whole graph, e.g. one staged on a clone of [`Engine::graph`]
    pub fn replace_graph(&mut self, graph: Graph) -> Graph {
        std::mem::replace(&mut self.graph, graph)
    }

    /// Register `target` with `dependencies`, optionally replacing its action
    pub fn rule(
        &mut self,
        target: &str,
        dependencies: &[&str],
        action: Option<Arc<dyn Action>>,
    ) -> Result<(), MakeError> {
        self.graph.rule(target, dependencies, action)
    }

    /// Register `target` with a closure as its action
    pub fn rule_fn<F>(&mut self, target: &str, dependencies: &[&str], action: F) -> Result<(), MakeError>
    where
        F: Fn(Done, &str, &[String]) + Send + Sync + 'static,
    {
        self.graph.rule(target, dependencies, Some(Arc::new(action)))
    }

    /// Bring `target` up to date.
    ///
    /// Only targets in the transitive closure of `target` are considered.
    /// Independent targets run concurrently; the first error ends the run.
    pub async fn run(&self, target: &str) -> Result<Report, MakeError> {
        self.run_until(target, std::future::pending()).await
    }

    /// Like [`Engine::run`], but give up once `shutdown` resolves.
    ///
    /// A run cut short this way fails with `IncompleteAction` naming every
    /// target still waiting on its action, including actions that hold on to
    /// their completion handle without ever signalling.
    pub async fn run_until<S>(&self, target: &str, shutdown: S) -> Result<Report, MakeError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let goal = self.graph.canonical(target);
        let closure = self.graph.closure(&goal)?;
        log::debug!("Run {} requires {} target(s)", goal, closure.len());

        let mut scheduler = Scheduler::new(goal, closure);
        let (executor, mut events) = Executor::new();
        let mut report = Report::default();
        let mut started = KeySet::new();

        loop {
            for id in scheduler.schedule_next(&self.graph) {
                let Some(record) = self.graph.get_target(&id) else {
                    continue;
                };
                scheduler.mark_started(&id);
                executor.launch(id, record.dependencies().to_vec(), record.action.clone());
            }

            if scheduler.in_flight() == 0 {
                let abandoned = scheduler.get_abandoned();
                if !abandoned.is_empty() {
                    log::warn!("Targets never signalled completion: {:?}", abandoned);
                    return Err(MakeError::IncompleteAction(abandoned));
                }
                return Err(MakeError::Stalled(scheduler.goal().to_string()));
            }

            let event = tokio::select! {
                event = events.recv() => event,
                _ = &mut shutdown => {
                    let active = scheduler.get_active();
                    log::warn!("Run {} stopped with targets still active: {:?}", scheduler.goal(), active);
                    if active.is_empty() {
                        return Err(MakeError::Stalled(scheduler.goal().to_string()));
                    }
                    return Err(MakeError::IncompleteAction(active));
                }
            };
            let Some(event) = event else {
                return Err(MakeError::Stalled(scheduler.goal().to_string()));
            };

            match event {
                TargetEvent::Started { target } => {
                    log::info!("Building {}", target);
                    started.add(target);
                }
                TargetEvent::Repeated { target } => {
                    log::warn!("Target {} signalled completion twice", target);
                    return Err(MakeError::DoubleCompletion(target));
                }
                TargetEvent::Abandoned { target } => {
                    log::warn!("Target {} dropped its completion handle", target);
                    scheduler.mark_abandoned(&target);
                }
                TargetEvent::Completed { target, result } => {
                    if let Err(e) = result {
                        log::warn!("Target {} failed: {}", target, e);
                        scheduler.mark_failed(&target);
                        return Err(e);
                    }
                    if !stamp::exists(&target).await? {
                        return Err(MakeError::PostconditionViolation(target));
                    }

                    scheduler.mark_done(&target);
                    if started.have(&target) {
                        report.built.push(target.clone());
                    } else {
                        report.up_to_date.push(target.clone());
                    }

                    if scheduler.goal_done() {
                        check_no_repeats(&mut events)?;
                        log::debug!("Run {} finished", scheduler.goal());
                        return Ok(report);
                    }
                }
            }
        }
    }

    /// Run `target` and hand the outcome to `callback`
    pub async fn run_with<F>(&self, target: &str, callback: F)
    where
        F: FnOnce(Result<Report, MakeError>),
    {
        callback(self.run(target).await);
    }
}

/// Fail on any second signal already queued behind the final completion
fn check_no_repeats(events: &mut mpsc::UnboundedReceiver<TargetEvent>) -> Result<(), MakeError> {
    while let Ok(event) = events.try_recv() {
        if let TargetEvent::Repeated { target } = event {
            return Err(MakeError::DoubleCompletion(target));
        }
    }
    Ok(())
}
