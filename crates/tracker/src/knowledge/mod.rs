mod curated;
mod heuristic;

use std::fmt;

use thiserror::Error;

use crate::key::{DeriveError, ObjectKey};
use crate::world::{InspectError, WorldObject};

pub use curated::CuratedKnowledgeBase;
pub use heuristic::{HeuristicKnowledgeBase, DEFAULT_GRASS_MARKERS};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KnowledgeError {
    #[error(transparent)]
    Derive(#[from] DeriveError),
    #[error(transparent)]
    Inspect(#[from] InspectError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeStrategy {
    Curated,
    Heuristic,
}

impl fmt::Display for KnowledgeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeStrategy::Curated => f.write_str("curated"),
            KnowledgeStrategy::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// Decides whether a live object is grass.
pub trait KnowledgeBase {
    fn strategy(&self) -> KnowledgeStrategy;

    /// Classifies one object. A failure concerns only this object; callers
    /// log it and carry on with the rest of the batch.
    fn is_tracked(&mut self, object: &dyn WorldObject) -> Result<bool, KnowledgeError>;

    /// Every key expected to exist, when the strategy can enumerate them.
    fn all_tracked_keys(&self) -> Option<&[ObjectKey]> {
        None
    }

    fn aliases(&self) -> &[(ObjectKey, ObjectKey)] {
        &[]
    }
}
