//! Run scheduler - per-run bookkeeping over the required closure

use super::{Graph, KeySet};

/// Fulfilled/active tracking for a single `run`
#[derive(Debug)]
pub struct Scheduler {
    goal: String,
    closure: KeySet,
    fulfilled: KeySet,
    active: KeySet,
    abandoned: KeySet,
}

impl Scheduler {
    /// Create a scheduler for `goal`, restricted to `closure`
    pub fn new(goal: impl Into<String>, closure: KeySet) -> Self {
        Self {
            goal: goal.into(),
            closure,
            fulfilled: KeySet::new(),
            active: KeySet::new(),
            abandoned: KeySet::new(),
        }
    }

    /// Targets in the closure whose dependencies are all fulfilled and that
    /// are neither fulfilled nor running yet
    pub fn schedule_next(&self, graph: &Graph) -> Vec<String> {
        let mut ready: Vec<String> = self
            .closure
            .iter()
            .filter(|id| !self.fulfilled.have(id) && !self.active.have(id))
            .filter(|id| {
                graph
                    .get_target(id)
                    .map(|t| t.depends_on.is_subset_of(&self.fulfilled))
                    .unwrap_or(false)
            })
            .map(str::to_string)
            .collect();
        ready.sort();
        ready
    }

    /// Mark target as launched
    pub fn mark_started(&mut self, target: &str) {
        self.active.add(target);
    }

    /// Mark target as finished successfully
    pub fn mark_done(&mut self, target: &str) {
        self.active.remove(target);
        self.fulfilled.add(target);
    }

    /// Mark target as finished with an error
    pub fn mark_failed(&mut self, target: &str) {
        self.active.remove(target);
    }

    /// Record that a running target's completion handle is gone unsignalled
    pub fn mark_abandoned(&mut self, target: &str) {
        if self.active.have(target) {
            self.abandoned.add(target);
        }
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Requested target is built
    pub fn goal_done(&self) -> bool {
        self.fulfilled.have(&self.goal)
    }

    /// Running targets that can still signal completion
    pub fn in_flight(&self) -> usize {
        self.active.iter().filter(|t| !self.abandoned.have(t)).count()
    }

    /// Every running target, sorted
    pub fn get_active(&self) -> Vec<String> {
        let mut targets = self.active.to_vec();
        targets.sort();
        targets
    }

    /// Running targets that never will, sorted
    pub fn get_abandoned(&self) -> Vec<String> {
        let mut targets: Vec<String> = self
            .active
            .iter()
            .filter(|t| self.abandoned.have(t))
            .map(str::to_string)
            .collect();
        targets.sort();
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Graph, Scheduler) {
        let mut g = Graph::new("/w").unwrap();
        g.rule(":a", &[":b"], None).unwrap();
        g.rule(":b", &[":c"], None).unwrap();
        g.rule(":c", &[], None).unwrap();
        g.rule(":other", &[], None).unwrap();
        let closure = g.closure(":a").unwrap();
        (g, Scheduler::new(":a", closure))
    }

    #[test]
    fn test_schedule_follows_dependencies() {
        let (g, mut s) = chain();
        assert_eq!(s.schedule_next(&g), vec![":c"]);

        s.mark_started(":c");
        assert!(s.schedule_next(&g).is_empty());
        assert_eq!(s.get_active(), vec![":c"]);

        s.mark_done(":c");
        assert_eq!(s.schedule_next(&g), vec![":b"]);
        s.mark_started(":b");
        s.mark_done(":b");
        assert_eq!(s.schedule_next(&g), vec![":a"]);
        s.mark_started(":a");
        s.mark_done(":a");

        assert!(s.goal_done());
        assert!(s.schedule_next(&g).is_empty());
        assert!(s.get_active().is_empty());
    }

    #[test]
    fn test_independent_targets_ready_together() {
        let mut g = Graph::new("/w").unwrap();
        g.rule(":all", &[":x", ":y"], None).unwrap();
        let s = Scheduler::new(":all", g.closure(":all").unwrap());
        assert_eq!(s.schedule_next(&g), vec![":x", ":y"]);
    }

    #[test]
    fn test_abandoned_tracking() {
        let (_, mut s) = chain();
        s.mark_started(":c");
        assert_eq!(s.in_flight(), 1);

        s.mark_abandoned(":c");
        s.mark_abandoned(":never-started");
        assert_eq!(s.in_flight(), 0);
        assert_eq!(s.get_abandoned(), vec![":c"]);
    }

    #[test]
    fn test_failed_target_not_fulfilled() {
        let (g, mut s) = chain();
        s.mark_started(":c");
        s.mark_failed(":c");
        assert!(s.get_active().is_empty());
        // not fulfilled, so :b stays blocked
        assert_eq!(s.schedule_next(&g), vec![":c"]);
        assert!(!s.goal_done());
    }
}
