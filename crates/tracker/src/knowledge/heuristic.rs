use std::collections::HashSet;

use tracing::debug;

use crate::key::{KeyQuantizer, ObjectKey};
use crate::world::WorldObject;

use super::{KnowledgeBase, KnowledgeError, KnowledgeStrategy};

/// Components the host attaches to cuttable grass.
pub const DEFAULT_GRASS_MARKERS: [&str; 4] = [
    "GrassCut",
    "GrassBehaviour",
    "TownGrass",
    "GrassSpriteBehaviour",
];

/// Learns grass as it is seen. Positive verdicts are memoized per key for the
/// rest of the session, so grass that later loses its markers stays tracked.
/// Anything else is inspected again on the next look.
#[derive(Debug, Clone)]
pub struct HeuristicKnowledgeBase {
    quantizer: KeyQuantizer,
    markers: Vec<String>,
    learned: HashSet<ObjectKey>,
}

impl HeuristicKnowledgeBase {
    pub fn new(quantizer: KeyQuantizer) -> Self {
        Self::with_markers(
            quantizer,
            DEFAULT_GRASS_MARKERS.iter().map(ToString::to_string),
        )
    }

    pub fn with_markers(
        quantizer: KeyQuantizer,
        markers: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            quantizer,
            markers: markers.into_iter().collect(),
            learned: HashSet::new(),
        }
    }

    pub fn learned_grass_count(&self) -> usize {
        self.learned.len()
    }
}

impl KnowledgeBase for HeuristicKnowledgeBase {
    fn strategy(&self) -> KnowledgeStrategy {
        KnowledgeStrategy::Heuristic
    }

    fn is_tracked(&mut self, object: &dyn WorldObject) -> Result<bool, KnowledgeError> {
        let key = self.quantizer.derive(object)?;
        if self.learned.contains(&key) {
            return Ok(true);
        }

        let components = object.component_markers()?;
        let verdict = components
            .iter()
            .any(|component| self.markers.iter().any(|marker| marker == component));
        if verdict {
            debug!(key = %key, object = object.name(), "grass_learned");
            self.learned.insert(key);
        }
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::tests::FakeObject;
    use crate::key::DeriveError;

    #[test]
    fn classifies_by_component_markers() {
        let mut kb = HeuristicKnowledgeBase::new(KeyQuantizer::default());
        assert!(kb
            .is_tracked(&FakeObject::grass("Glade", 1.0, 1.0))
            .expect("classify"));
        assert!(!kb
            .is_tracked(&FakeObject::rock("Glade", 3.0, 1.0))
            .expect("classify"));
        assert_eq!(kb.learned_grass_count(), 1);
        assert_eq!(kb.strategy(), KnowledgeStrategy::Heuristic);
        assert!(kb.all_tracked_keys().is_none());
        assert!(kb.aliases().is_empty());
    }

    #[test]
    fn memoized_verdict_survives_marker_changes() {
        let mut kb = HeuristicKnowledgeBase::new(KeyQuantizer::default());
        let mut object = FakeObject::grass("Glade", 1.0, 1.0);
        assert!(kb.is_tracked(&object).expect("first look"));

        // Cut grass often loses its components; the verdict must not regress.
        object.markers.clear();
        object.broken = true;
        assert!(kb.is_tracked(&object).expect("memoized"));
        assert_eq!(kb.learned_grass_count(), 1);
    }

    #[test]
    fn inspection_failures_are_not_memoized() {
        let mut kb = HeuristicKnowledgeBase::new(KeyQuantizer::default());
        let mut object = FakeObject::grass("Glade", 1.0, 1.0);
        object.broken = true;
        assert!(matches!(
            kb.is_tracked(&object),
            Err(KnowledgeError::Inspect(_))
        ));
        assert_eq!(kb.learned_grass_count(), 0);

        object.broken = false;
        assert!(kb.is_tracked(&object).expect("retry on next scan"));
    }

    #[test]
    fn unkeyable_objects_report_the_derive_error() {
        let mut kb = HeuristicKnowledgeBase::new(KeyQuantizer::default());
        assert_eq!(
            kb.is_tracked(&FakeObject::grass("Glade", 1e30, 0.0)),
            Err(KnowledgeError::Derive(DeriveError::OutOfRange {
                object: "grass".to_string(),
                x: 1e30,
                y: 0.0,
            }))
        );
    }

    #[test]
    fn negative_verdicts_are_not_memoized() {
        let mut kb = HeuristicKnowledgeBase::new(KeyQuantizer::default());
        let mut object = FakeObject::grass("Glade", 1.0, 0.0);
        object.markers.clear();
        assert!(!kb.is_tracked(&object).expect("no markers yet"));
        assert_eq!(kb.learned_grass_count(), 0);

        object.markers.push("GrassCut".to_string());
        assert!(kb.is_tracked(&object).expect("markers attached"));
        assert_eq!(kb.learned_grass_count(), 1);
    }

    #[test]
    fn custom_markers_replace_defaults() {
        let mut kb = HeuristicKnowledgeBase::with_markers(
            KeyQuantizer::default(),
            ["Collider".to_string()],
        );
        assert!(kb
            .is_tracked(&FakeObject::rock("Glade", 1.0, 1.0))
            .expect("classify"));
        assert!(!kb
            .is_tracked(&FakeObject::grass("Glade", 2.0, 1.0))
            .expect("classify"));
    }
}
