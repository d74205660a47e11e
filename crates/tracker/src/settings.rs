use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::key::{DeriveError, KeyQuantizer, DEFAULT_UNITS_PER_WORLD};
use crate::knowledge::DEFAULT_GRASS_MARKERS;

pub const DEFAULT_RESCAN_SETTLE_DELAY_MS: u64 = 500;

/// Global (not per-save) settings. Missing fields take their defaults so older
/// settings files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub use_heuristic_knower: bool,
    pub key_units_per_world: f32,
    pub rescan_settle_delay_ms: u64,
    pub heuristic_markers: Vec<String>,
    pub catalog_path: Option<PathBuf>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            use_heuristic_knower: false,
            key_units_per_world: DEFAULT_UNITS_PER_WORLD,
            rescan_settle_delay_ms: DEFAULT_RESCAN_SETTLE_DELAY_MS,
            heuristic_markers: DEFAULT_GRASS_MARKERS
                .iter()
                .map(ToString::to_string)
                .collect(),
            catalog_path: None,
        }
    }
}

impl TrackerSettings {
    pub fn quantizer(&self) -> Result<KeyQuantizer, DeriveError> {
        KeyQuantizer::new(self.key_units_per_world)
    }

    pub fn rescan_settle_delay(&self) -> Duration {
        Duration::from_millis(self.rescan_settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: TrackerSettings =
            serde_json::from_str(r#"{"use_heuristic_knower": true}"#).expect("parse");
        assert!(settings.use_heuristic_knower);
        assert_eq!(settings.rescan_settle_delay(), Duration::from_millis(500));
        assert_eq!(settings.heuristic_markers.len(), DEFAULT_GRASS_MARKERS.len());
        assert_eq!(
            settings.quantizer().expect("quantizer"),
            KeyQuantizer::default()
        );
    }

    #[test]
    fn invalid_precision_is_reported() {
        let settings = TrackerSettings {
            key_units_per_world: 0.0,
            ..TrackerSettings::default()
        };
        assert!(settings.quantizer().is_err());
    }
}
