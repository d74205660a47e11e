use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to inspect object '{object}': {message}")]
pub struct InspectError {
    pub object: String,
    pub message: String,
}

/// Transient handle to a live object, as exposed by the host for the duration
/// of one callback. Nothing here is assumed to be stable across sessions.
pub trait WorldObject {
    /// Name of the region (scene) the object currently lives in.
    fn region_id(&self) -> Option<&str>;

    fn position(&self) -> Vec2;

    /// Order among siblings in the host's object hierarchy.
    fn sibling_index(&self) -> u32;

    fn name(&self) -> &str;

    /// Component/tag markers attached to the object.
    fn component_markers(&self) -> Result<Vec<String>, InspectError>;
}
