use std::collections::HashMap;
use std::fmt;

use super::state::TrackedState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub completed: u32,
    pub total: u32,
}

impl Stats {
    pub fn new(completed: u32, total: u32) -> Self {
        Self { completed, total }
    }

    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.completed)
    }

    fn add(&mut self, state: TrackedState) {
        self.total += 1;
        if state.is_completed() {
            self.completed += 1;
        }
    }

    fn remove(&mut self, state: TrackedState) {
        self.total = self.total.saturating_sub(1);
        if state.is_completed() {
            self.completed = self.completed.saturating_sub(1);
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

/// Payload delivered to change subscribers after an accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsChanged {
    pub region: String,
    pub region_stats: Stats,
    pub global_stats: Stats,
}

/// Per-region and global counters, maintained incrementally by the store.
#[derive(Debug, Default, Clone)]
pub(crate) struct Aggregates {
    by_region: HashMap<String, Stats>,
    global: Stats,
}

impl Aggregates {
    pub(crate) fn region(&self, region: &str) -> Stats {
        self.by_region.get(region).copied().unwrap_or_default()
    }

    pub(crate) fn global(&self) -> Stats {
        self.global
    }

    pub(crate) fn insert(&mut self, region: &str, state: TrackedState) {
        self.by_region
            .entry(region.to_string())
            .or_default()
            .add(state);
        self.global.add(state);
    }

    pub(crate) fn remove(&mut self, region: &str, state: TrackedState) {
        if let Some(stats) = self.by_region.get_mut(region) {
            stats.remove(state);
            if stats.total == 0 {
                self.by_region.remove(region);
            }
        }
        self.global.remove(state);
    }

    pub(crate) fn transition(&mut self, region: &str, from: TrackedState, to: TrackedState) {
        self.remove(region, from);
        self.insert(region, to);
    }

    pub(crate) fn clear(&mut self) {
        self.by_region.clear();
        self.global = Stats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_keep_region_and_global_in_step() {
        let mut aggregates = Aggregates::default();
        aggregates.insert("Glade", TrackedState::Uncut);
        aggregates.insert("Glade", TrackedState::Uncut);
        aggregates.insert("Cave", TrackedState::Cut);
        aggregates.transition("Glade", TrackedState::Uncut, TrackedState::Cut);

        assert_eq!(aggregates.region("Glade"), Stats::new(1, 2));
        assert_eq!(aggregates.region("Cave"), Stats::new(1, 1));
        assert_eq!(aggregates.global(), Stats::new(2, 3));

        aggregates.remove("Cave", TrackedState::Cut);
        assert_eq!(aggregates.region("Cave"), Stats::default());
        assert_eq!(aggregates.global(), Stats::new(1, 2));
        assert_eq!(aggregates.global().remaining(), 1);
        assert_eq!(aggregates.global().to_string(), "1/2");
    }
}
