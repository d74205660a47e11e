use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::knowledge::KnowledgeBase;
use crate::settings::DEFAULT_RESCAN_SETTLE_DELAY_MS;
use crate::store::{LoadReport, StateStore, TrackedState};
use crate::world::WorldObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationOutcome {
    Updated,
    Unchanged,
    NotTracked,
    /// The object could not be keyed or classified; the failure was logged.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescanSummary {
    pub region: String,
    pub examined: usize,
    pub tracked: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
struct PendingRescan {
    region: String,
    due_at: Instant,
}

/// Session policy on top of one store and one knowledge base.
///
/// Every handler is total: failures on a single object are logged and that
/// object is dropped, the rest of the event or scan still runs.
pub struct Orchestrator {
    store: StateStore,
    knowledge: Box<dyn KnowledgeBase>,
    settle_delay: Duration,
    pending: Option<PendingRescan>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store)
            .field("strategy", &self.knowledge.strategy())
            .field("settle_delay", &self.settle_delay)
            .field("pending", &self.pending)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(store: StateStore, knowledge: Box<dyn KnowledgeBase>) -> Self {
        Self {
            store,
            knowledge,
            settle_delay: Duration::from_millis(DEFAULT_RESCAN_SETTLE_DELAY_MS),
            pending: None,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    pub fn knowledge(&self) -> &dyn KnowledgeBase {
        self.knowledge.as_ref()
    }

    pub fn on_new_game(&mut self) {
        self.cancel_pending_rescan();
        self.store.clear();
        self.enter_file();
        info!(
            strategy = %self.knowledge.strategy(),
            global = %self.store.global_stats(),
            "new_game_started"
        );
    }

    pub fn on_save_loaded(&mut self, blob: &str) -> LoadReport {
        self.cancel_pending_rescan();
        self.store.clear();
        self.register_aliases();
        let report = self.store.add_serialized_data(blob);
        self.prepopulate();
        info!(
            strategy = %self.knowledge.strategy(),
            restored = report.restored,
            skipped = report.skipped,
            blob_rejected = report.blob_rejected,
            global = %self.store.global_stats(),
            "save_loaded"
        );
        report
    }

    pub fn on_save(&self) -> String {
        let blob = self.store.serialize();
        debug!(
            entries = self.store.len(),
            bytes = blob.len(),
            "save_requested"
        );
        blob
    }

    /// Schedules a rescan once the region has settled. Only one rescan is
    /// ever pending; a later call replaces it.
    pub fn on_region_entered(&mut self, region: &str, now: Instant) {
        let scheduled = PendingRescan {
            region: region.to_string(),
            due_at: now + self.settle_delay,
        };
        if let Some(stale) = self.pending.replace(scheduled) {
            debug!(region = %stale.region, "rescan_superseded");
        }
    }

    pub fn pending_rescan_region(&self) -> Option<&str> {
        self.pending.as_ref().map(|pending| pending.region.as_str())
    }

    pub fn rescan_due(&self, now: Instant) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| now >= pending.due_at)
    }

    /// Runs the pending rescan if it is due, over the objects live right now.
    pub fn poll_rescan(
        &mut self,
        now: Instant,
        live_objects: &[&dyn WorldObject],
    ) -> Option<RescanSummary> {
        if !self.rescan_due(now) {
            return None;
        }
        let pending = self.pending.take()?;
        Some(self.rescan_now(&pending.region, live_objects))
    }

    pub fn cancel_pending_rescan(&mut self) {
        if let Some(stale) = self.pending.take() {
            debug!(region = %stale.region, "rescan_cancelled");
        }
    }

    /// Marks every tracked live object as at least `Uncut`. Idempotent.
    pub fn rescan_now(
        &mut self,
        region: &str,
        live_objects: &[&dyn WorldObject],
    ) -> RescanSummary {
        let mut summary = RescanSummary {
            region: region.to_string(),
            ..RescanSummary::default()
        };
        for object in live_objects {
            summary.examined += 1;
            match self.observe(*object, TrackedState::Uncut, "rescan") {
                ObservationOutcome::Updated => {
                    summary.tracked += 1;
                    summary.updated += 1;
                }
                ObservationOutcome::Unchanged => summary.tracked += 1,
                ObservationOutcome::NotTracked => {}
                ObservationOutcome::Skipped => summary.skipped += 1,
            }
        }
        info!(
            region = %summary.region,
            examined = summary.examined,
            tracked = summary.tracked,
            updated = summary.updated,
            skipped = summary.skipped,
            region_stats = %self.store.stats_for_region(region),
            "rescan_completed"
        );
        summary
    }

    /// The host confirmed the object is destroyed.
    pub fn on_cut_confirmed(&mut self, object: &dyn WorldObject) -> ObservationOutcome {
        self.observe(object, TrackedState::Cut, "cut_confirmed")
    }

    /// A destructive hit connected but the host has not confirmed the cut.
    pub fn on_slash_hit(&mut self, object: &dyn WorldObject) -> ObservationOutcome {
        self.observe(object, TrackedState::ShouldBeCut, "slash_hit")
    }

    fn observe(
        &mut self,
        object: &dyn WorldObject,
        state: TrackedState,
        event: &'static str,
    ) -> ObservationOutcome {
        let key = match self.store.quantizer().derive(object) {
            Ok(key) => key,
            Err(error) => {
                warn!(event, object = object.name(), error = %error, "object_key_failed");
                return ObservationOutcome::Skipped;
            }
        };

        let tracked = self.store.contains(&key)
            || match self.knowledge.is_tracked(object) {
                Ok(tracked) => tracked,
                Err(error) => {
                    warn!(
                        event,
                        object = object.name(),
                        key = %key,
                        error = %error,
                        "object_classification_failed"
                    );
                    return ObservationOutcome::Skipped;
                }
            };
        if !tracked {
            return ObservationOutcome::NotTracked;
        }

        if self.store.try_set(&key, state) {
            debug!(event, key = %key, state = ?state, "grass_state_updated");
            ObservationOutcome::Updated
        } else {
            ObservationOutcome::Unchanged
        }
    }

    fn enter_file(&mut self) {
        self.register_aliases();
        self.prepopulate();
    }

    fn register_aliases(&mut self) {
        for (a, b) in self.knowledge.aliases() {
            self.store.register_alias(a, b);
        }
    }

    fn prepopulate(&mut self) {
        let Some(keys) = self.knowledge.all_tracked_keys() else {
            return;
        };
        for key in keys {
            self.store.try_set(key, TrackedState::Uncut);
        }
    }
}
