use std::cell::Cell;
use std::collections::HashMap;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use tracker::{Orchestrator, Stats, WorldObject};

use super::bootstrap::AppWiring;
use super::script::{load_script, ScriptEvent};
use super::world::ScriptedObject;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let events = match load_script(&app.script_path) {
        Ok(events) => events,
        Err(err) => {
            error!(error = %err, "script_load_failed");
            return ExitCode::FAILURE;
        }
    };

    let mut session = ReplaySession::new(app.orchestrator);
    let report = session.replay(&events);
    info!(
        events = report.events,
        rescans = report.rescans,
        notifications = report.notifications,
        entries = session.orchestrator().store().len(),
        global = %report.global,
        "replay_finished"
    );
    ExitCode::SUCCESS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReplayReport {
    pub(crate) events: usize,
    pub(crate) rescans: usize,
    pub(crate) notifications: usize,
    pub(crate) global: Stats,
}

/// Drives an [`Orchestrator`] the way a host would, with a simulated clock
/// and in-memory save slots.
pub(crate) struct ReplaySession {
    orchestrator: Orchestrator,
    epoch: Instant,
    elapsed: Duration,
    live_objects: Vec<ScriptedObject>,
    save_slots: HashMap<String, String>,
    rescans: usize,
    notifications: Rc<Cell<usize>>,
}

impl ReplaySession {
    pub(crate) fn new(mut orchestrator: Orchestrator) -> Self {
        let notifications = Rc::new(Cell::new(0));
        let counter = Rc::clone(&notifications);
        orchestrator.store_mut().subscribe(move |change| {
            counter.set(counter.get() + 1);
            info!(
                region = %change.region,
                region_stats = %change.region_stats,
                global = %change.global_stats,
                "grass_stats_changed"
            );
        });
        Self {
            orchestrator,
            epoch: Instant::now(),
            elapsed: Duration::ZERO,
            live_objects: Vec::new(),
            save_slots: HashMap::new(),
            rescans: 0,
            notifications,
        }
    }

    pub(crate) fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub(crate) fn replay(&mut self, events: &[ScriptEvent]) -> ReplayReport {
        for event in events {
            self.apply(event);
        }
        ReplayReport {
            events: events.len(),
            rescans: self.rescans,
            notifications: self.notifications.get(),
            global: self.orchestrator.store().global_stats(),
        }
    }

    fn now(&self) -> Instant {
        self.epoch + self.elapsed
    }

    fn apply(&mut self, event: &ScriptEvent) {
        match event {
            ScriptEvent::NewGame => {
                self.live_objects.clear();
                self.orchestrator.on_new_game();
            }
            ScriptEvent::Save { slot } => {
                let blob = self.orchestrator.on_save();
                self.save_slots.insert(slot.clone(), blob);
            }
            ScriptEvent::LoadSave { slot } => {
                self.live_objects.clear();
                let blob = match self.save_slots.get(slot) {
                    Some(blob) => blob.as_str(),
                    None => {
                        warn!(slot = %slot, "save_slot_empty");
                        ""
                    }
                };
                self.orchestrator.on_save_loaded(blob);
            }
            ScriptEvent::RegionEntered { region, objects } => {
                self.live_objects = objects.clone();
                self.orchestrator.on_region_entered(region, self.now());
                debug!(region = %region, objects = objects.len(), "region_entered");
            }
            ScriptEvent::Advance { ms } => {
                self.elapsed += Duration::from_millis(*ms);
                let now = self.now();
                let live: Vec<&dyn WorldObject> = self
                    .live_objects
                    .iter()
                    .map(|object| object as &dyn WorldObject)
                    .collect();
                if self.orchestrator.poll_rescan(now, &live).is_some() {
                    self.rescans += 1;
                }
            }
            ScriptEvent::CutConfirmed { object } => {
                let outcome = self.orchestrator.on_cut_confirmed(object);
                debug!(object = %object.name, outcome = ?outcome, "cut_confirmed");
            }
            ScriptEvent::SlashHit { object } => {
                let outcome = self.orchestrator.on_slash_hit(object);
                debug!(object = %object.name, outcome = ?outcome, "slash_hit");
            }
            ScriptEvent::ReportStats { region } => {
                let store = self.orchestrator.store();
                match region {
                    Some(region) => info!(
                        region = %region,
                        stats = %store.stats_for_region(region),
                        global = %store.global_stats(),
                        "stats_report"
                    ),
                    None => info!(global = %store.global_stats(), "stats_report"),
                }
            }
        }
    }
}
