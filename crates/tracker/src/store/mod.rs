mod aliases;
mod codec;
mod state;
mod stats;

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, error, warn};

use crate::key::{KeyQuantizer, ObjectKey};
use crate::world::Vec2;

pub(crate) use self::aliases::AliasTable;
use self::stats::Aggregates;

pub use aliases::AliasOutcome;
pub use codec::{BlobError, RecordError};
pub use state::TrackedState;
pub use stats::{Stats, StatsChanged};

pub type StatsListener = Box<dyn FnMut(&StatsChanged)>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub restored: usize,
    pub skipped: usize,
    pub blob_rejected: bool,
}

/// Progress of every known grass object, keyed by canonical [`ObjectKey`].
///
/// All mutation goes through `try_set`, `register_alias`, `clear` and
/// `add_serialized_data`; each is a single step that leaves entries and
/// aggregates consistent, so interleaved rescans and cut events are safe.
pub struct StateStore {
    quantizer: KeyQuantizer,
    entries: BTreeMap<ObjectKey, TrackedState>,
    aliases: AliasTable,
    aggregates: Aggregates,
    listeners: Vec<StatsListener>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(KeyQuantizer::default())
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("quantizer", &self.quantizer)
            .field("entries", &self.entries.len())
            .field("aliases", &self.aliases.len())
            .field("global", &self.aggregates.global())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl StateStore {
    pub fn new(quantizer: KeyQuantizer) -> Self {
        Self {
            quantizer,
            entries: BTreeMap::new(),
            aliases: AliasTable::default(),
            aggregates: Aggregates::default(),
            listeners: Vec::new(),
        }
    }

    pub fn quantizer(&self) -> &KeyQuantizer {
        &self.quantizer
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StatsChanged) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn canonical<'a>(&'a self, key: &'a ObjectKey) -> &'a ObjectKey {
        self.aliases.canonical(key)
    }

    pub fn register_alias(&mut self, a: &ObjectKey, b: &ObjectKey) -> AliasOutcome {
        let outcome = self.aliases.union(a, b);
        if let AliasOutcome::Merged {
            canonical,
            absorbed,
        } = &outcome
        {
            if let Some(absorbed_state) = self.entries.remove(absorbed) {
                self.aggregates.remove(&absorbed.region, absorbed_state);
                match self.entries.get_mut(canonical) {
                    Some(current) if *current >= absorbed_state => {}
                    Some(current) => {
                        let previous = *current;
                        *current = absorbed_state;
                        self.aggregates
                            .transition(&canonical.region, previous, absorbed_state);
                    }
                    None => {
                        self.entries.insert(canonical.clone(), absorbed_state);
                        self.aggregates.insert(&canonical.region, absorbed_state);
                    }
                }
            }
            debug!(canonical = %canonical, absorbed = %absorbed, "alias_registered");
        }
        outcome
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.state(key).is_recorded()
    }

    pub fn state(&self, key: &ObjectKey) -> TrackedState {
        self.entries
            .get(self.aliases.canonical(key))
            .copied()
            .unwrap_or_default()
    }

    /// Records `new_state` if the key is new or the state advances; returns
    /// whether anything changed. Listeners fire only on change.
    pub fn try_set(&mut self, key: &ObjectKey, new_state: TrackedState) -> bool {
        if !new_state.is_recorded() {
            return false;
        }
        let canonical = self.aliases.canonical(key).clone();
        let changed = match self.entries.get_mut(&canonical) {
            Some(current) if *current >= new_state => false,
            Some(current) => {
                let previous = *current;
                *current = new_state;
                self.aggregates
                    .transition(&canonical.region, previous, new_state);
                true
            }
            None => {
                self.entries.insert(canonical.clone(), new_state);
                self.aggregates.insert(&canonical.region, new_state);
                true
            }
        };
        if changed {
            self.notify(&canonical.region);
        }
        changed
    }

    pub fn stats_for_region(&self, region: &str) -> Stats {
        self.aggregates.region(region)
    }

    pub fn global_stats(&self) -> Stats {
        self.aggregates.global()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectKey, TrackedState)> {
        self.entries.iter().map(|(key, state)| (key, *state))
    }

    /// Closest `Uncut` entry in `region`, measured between cell centres.
    pub fn nearest_uncut(&self, region: &str, position: Vec2) -> Option<&ObjectKey> {
        self.entries
            .iter()
            .filter(|(key, state)| key.region == region && **state == TrackedState::Uncut)
            .map(|(key, _)| {
                let center = key.world_position(&self.quantizer);
                let dx = center.x - position.x;
                let dy = center.y - position.y;
                (key, dx * dx + dy * dy)
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(key, _)| key)
    }

    /// Drops entries, aliases and aggregates. Listeners stay subscribed.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.aliases.clear();
        self.aggregates.clear();
    }

    pub fn serialize(&self) -> String {
        match codec::encode(&self.quantizer, self.iter()) {
            Ok(raw) => raw,
            Err(err) => {
                error!(error = %err, "state_blob_encode_failed");
                String::new()
            }
        }
    }

    /// Merges a blob produced by [`StateStore::serialize`] into the store.
    /// Restored states only ever advance existing entries.
    pub fn add_serialized_data(&mut self, raw: &str) -> LoadReport {
        let decoded = match codec::decode(raw, &self.quantizer) {
            Ok(decoded) => decoded,
            Err(err) => {
                error!(error = %err, "state_blob_rejected");
                return LoadReport {
                    blob_rejected: true,
                    ..LoadReport::default()
                };
            }
        };

        for skipped in &decoded.skipped {
            warn!(error = %skipped, "state_record_skipped");
        }

        let restored = decoded.records.len();
        for (key, state) in decoded.records {
            let canonical = self.aliases.canonical(&key).clone();
            let entry = self.entries.entry(canonical).or_default();
            if *entry < state {
                *entry = state;
            }
        }
        self.rebuild_aggregates();

        debug!(
            version = decoded.version,
            restored,
            skipped = decoded.skipped.len(),
            entries = self.entries.len(),
            "state_blob_merged"
        );
        LoadReport {
            restored,
            skipped: decoded.skipped.len(),
            blob_rejected: false,
        }
    }

    fn rebuild_aggregates(&mut self) {
        self.aggregates.clear();
        for (key, state) in &self.entries {
            self.aggregates.insert(&key.region, *state);
        }
    }

    fn notify(&mut self, region: &str) {
        if self.listeners.is_empty() {
            return;
        }
        let event = StatsChanged {
            region: region.to_string(),
            region_stats: self.aggregates.region(region),
            global_stats: self.aggregates.global(),
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}
