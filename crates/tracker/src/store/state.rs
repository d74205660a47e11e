use serde::{Deserialize, Serialize};

/// Progress of one grass object. Variant order is the progress ordering; the
/// store only ever moves an entry towards `Cut`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TrackedState {
    #[default]
    Unknown,
    Uncut,
    /// Swung at, destruction not confirmed by the host yet.
    ShouldBeCut,
    Cut,
}

impl TrackedState {
    pub fn is_recorded(self) -> bool {
        self != TrackedState::Unknown
    }

    pub fn is_completed(self) -> bool {
        self == TrackedState::Cut
    }
}
