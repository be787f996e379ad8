//! Target executor - launches targets as tokio tasks
//!
//! Each launched target looks up its own and its dependencies' stamps,
//! then either invokes the action or completes straight away. Progress is
//! reported back over an unbounded channel.

use super::action::{self, Action, Done};
use super::stamp;
use crate::error::MakeError;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Target execution event
#[derive(Debug)]
pub enum TargetEvent {
    /// The target's own action is being invoked (target was stale)
    Started { target: String },
    /// First completion signal
    Completed {
        target: String,
        result: Result<(), MakeError>,
    },
    /// Any later completion signal
    Repeated { target: String },
    /// Every completion handle was dropped without signalling
    Abandoned { target: String },
}

/// Launches targets and owns the sending side of the event channel
pub struct Executor {
    event_tx: mpsc::UnboundedSender<TargetEvent>,
}

impl Executor {
    /// Create a new executor
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TargetEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { event_tx: tx }, rx)
    }

    /// Launch one target. Must be called from within a tokio runtime.
    pub fn launch(&self, target: String, dependencies: Vec<String>, action: Arc<dyn Action>) {
        let done = Done::new(target.clone(), self.event_tx.clone());
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let rebuild = match is_stale(&target, &dependencies).await {
                Ok(rebuild) => rebuild,
                Err(e) => {
                    done.settle(Err(e));
                    return;
                }
            };

            if rebuild && action::is_noop(&action) {
                log::debug!("Target {} has no action", target);
                done.ok();
            } else if rebuild {
                log::debug!("Target {} is stale, running action", target);
                let _ = event_tx.send(TargetEvent::Started {
                    target: target.clone(),
                });
                action.call(done, &target, &dependencies);
            } else {
                log::debug!("Target {} is up to date", target);
                done.ok();
            }
        });
    }
}

async fn is_stale(target: &str, dependencies: &[String]) -> Result<bool, MakeError> {
    let own = stamp::stamp(target).await?;
    let mut deps = Vec::with_capacity(dependencies.len());
    for dep in dependencies {
        deps.push(stamp::stamp(dep).await?);
    }
    Ok(stamp::needs_rebuild(own, &deps))
}
