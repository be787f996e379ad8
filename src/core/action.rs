//! Build actions and their one-shot completion handle

use super::executor::TargetEvent;
use crate::error::{BoxError, MakeError};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;

/// A build step for one target.
///
/// `call` must arrange for `done` to be signalled exactly once, either before
/// returning or later from another task. Dropping every clone of `done`
/// without signalling is reported as an incomplete action.
pub trait Action: Send + Sync {
    fn call(&self, done: Done, target: &str, dependencies: &[String]);
}

impl<F> Action for F
where
    F: Fn(Done, &str, &[String]) + Send + Sync,
{
    fn call(&self, done: Done, target: &str, dependencies: &[String]) {
        self(done, target, dependencies)
    }
}

/// Default action: succeeds immediately.
///
/// Every call returns the same shared instance, see [`is_noop`].
pub fn noop() -> Arc<dyn Action> {
    static NOOP: OnceLock<Arc<dyn Action>> = OnceLock::new();
    NOOP.get_or_init(|| Arc::new(|done: Done, _: &str, _: &[String]| done.ok()))
        .clone()
}

/// Whether `action` is the default action returned by [`noop`]
pub fn is_noop(action: &Arc<dyn Action>) -> bool {
    Arc::ptr_eq(action, &noop())
}

/// Adapt an async function into an action.
///
/// The future is spawned on the current tokio runtime and its result is
/// signalled when it resolves.
pub fn from_async<F, Fut>(f: F) -> impl Action
where
    F: Fn(String, Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    move |done: Done, target: &str, dependencies: &[String]| {
        let fut = f(target.to_string(), dependencies.to_vec());
        tokio::spawn(async move {
            done.finish(fut.await);
        });
    }
}

/// Completion handle handed to an action.
///
/// Clones share a single slot: the first signal completes the target, any
/// later one is reported as a double completion.
#[derive(Clone)]
pub struct Done {
    slot: Arc<Slot>,
}

struct Slot {
    target: String,
    signalled: AtomicBool,
    events: mpsc::UnboundedSender<TargetEvent>,
}

impl Done {
    pub(crate) fn new(target: String, events: mpsc::UnboundedSender<TargetEvent>) -> Self {
        Self {
            slot: Arc::new(Slot {
                target,
                signalled: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Target this handle completes
    pub fn target(&self) -> &str {
        &self.slot.target
    }

    pub fn ok(&self) {
        self.settle(Ok(()));
    }

    pub fn fail(&self, err: impl Into<BoxError>) {
        self.finish(Err(err.into()));
    }

    pub fn finish(&self, result: Result<(), BoxError>) {
        let result = result.map_err(|source| MakeError::Action {
            target: self.slot.target.clone(),
            source,
        });
        self.settle(result);
    }

    pub(crate) fn settle(&self, result: Result<(), MakeError>) {
        let target = self.slot.target.clone();
        let event = if self.slot.signalled.swap(true, Ordering::AcqRel) {
            TargetEvent::Repeated { target }
        } else {
            TargetEvent::Completed { target, result }
        };
        // A closed channel means the run already ended
        let _ = self.slot.events.send(event);
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if !*self.signalled.get_mut() {
            let target = std::mem::take(&mut self.target);
            let _ = self.events.send(TargetEvent::Abandoned { target });
        }
    }
}

impl std::fmt::Debug for Done {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Done")
            .field("target", &self.slot.target)
            .field("signalled", &self.slot.signalled.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(target: &str) -> (Done, mpsc::UnboundedReceiver<TargetEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Done::new(target.to_string(), tx), rx)
    }

    #[test]
    fn test_first_signal_completes() {
        let (done, mut rx) = handle(":a");
        done.ok();
        drop(done);

        match rx.try_recv() {
            Ok(TargetEvent::Completed { target, result }) => {
                assert_eq!(target, ":a");
                assert!(result.is_ok());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        // signalled, so dropping must not report abandonment
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_second_signal_from_clone_is_repeated() {
        let (done, mut rx) = handle(":a");
        let again = done.clone();
        done.ok();
        again.fail("late");

        assert!(matches!(rx.try_recv(), Ok(TargetEvent::Completed { .. })));
        assert!(matches!(rx.try_recv(), Ok(TargetEvent::Repeated { target }) if target == ":a"));
    }

    #[test]
    fn test_drop_without_signal_is_abandoned() {
        let (done, mut rx) = handle(":lost");
        let clone = done.clone();
        drop(done);
        assert!(rx.try_recv().is_err());
        drop(clone);

        assert!(matches!(rx.try_recv(), Ok(TargetEvent::Abandoned { target }) if target == ":lost"));
    }

    #[test]
    fn test_failure_wraps_source() {
        let (done, mut rx) = handle(":a");
        done.fail("boom");

        match rx.try_recv() {
            Ok(TargetEvent::Completed { result: Err(err), .. }) => {
                assert!(matches!(err, MakeError::Action { ref target, .. } if target == ":a"));
                let source = std::error::Error::source(&err).unwrap();
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_noop_is_shared() {
        assert!(is_noop(&noop()));
        let custom: Arc<dyn Action> = Arc::new(|done: Done, _: &str, _: &[String]| done.ok());
        assert!(!is_noop(&custom));
    }

    #[test]
    fn test_signal_after_run_ended_is_ignored() {
        let (done, rx) = handle(":a");
        drop(rx);
        done.ok();
    }
}
