use serde::{Deserialize, Serialize};
use tracker::{InspectError, Vec2, WorldObject};

/// Object description carried by script events in place of a live engine
/// object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScriptedObject {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) region: Option<String>,
    pub(crate) x: f32,
    pub(crate) y: f32,
    #[serde(default)]
    pub(crate) index: u32,
    #[serde(default)]
    pub(crate) markers: Vec<String>,
    /// Simulates a host object whose components cannot be read.
    #[serde(default)]
    pub(crate) uninspectable: bool,
}

impl WorldObject for ScriptedObject {
    fn region_id(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn position(&self) -> Vec2 {
        Vec2 {
            x: self.x,
            y: self.y,
        }
    }

    fn sibling_index(&self) -> u32 {
        self.index
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn component_markers(&self) -> Result<Vec<String>, InspectError> {
        if self.uninspectable {
            return Err(InspectError {
                object: self.name.clone(),
                message: "components unavailable".to_string(),
            });
        }
        Ok(self.markers.clone())
    }
}
