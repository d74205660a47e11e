use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::{Vec2, WorldObject};

/// Grid cells per world unit. A tenth of a unit absorbs float jitter between
/// sessions while keeping neighbouring grass tufts apart.
pub const DEFAULT_UNITS_PER_WORLD: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeriveError {
    #[error("object '{object}' has no region id")]
    MissingRegion { object: String },
    #[error("object '{object}' has a non-finite position ({x}, {y})")]
    NonFinitePosition { object: String, x: f32, y: f32 },
    #[error("object '{object}' position ({x}, {y}) does not fit the key grid")]
    OutOfRange { object: String, x: f32, y: f32 },
    #[error("units_per_world must be finite and > 0, got {value}")]
    InvalidPrecision { value: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyQuantizer {
    units_per_world: f32,
}

impl Default for KeyQuantizer {
    fn default() -> Self {
        Self {
            units_per_world: DEFAULT_UNITS_PER_WORLD,
        }
    }
}

impl KeyQuantizer {
    pub fn new(units_per_world: f32) -> Result<Self, DeriveError> {
        if !units_per_world.is_finite() || units_per_world <= 0.0 {
            return Err(DeriveError::InvalidPrecision {
                value: units_per_world,
            });
        }
        Ok(Self { units_per_world })
    }

    pub fn units_per_world(&self) -> f32 {
        self.units_per_world
    }

    pub fn quantize(&self, position: Vec2) -> Option<(i32, i32)> {
        Some((
            self.quantize_axis(position.x)?,
            self.quantize_axis(position.y)?,
        ))
    }

    pub fn cell_center(&self, x: i32, y: i32) -> Vec2 {
        let scale = f64::from(self.units_per_world);
        Vec2 {
            x: (f64::from(x) / scale) as f32,
            y: (f64::from(y) / scale) as f32,
        }
    }

    fn quantize_axis(&self, value: f32) -> Option<i32> {
        let scaled = (f64::from(value) * f64::from(self.units_per_world)).round();
        if scaled < f64::from(i32::MIN) || scaled > f64::from(i32::MAX) {
            return None;
        }
        Some(scaled as i32)
    }

    /// Identity of a live object. Pure; the caller skips the object on error.
    pub fn derive(&self, object: &dyn WorldObject) -> Result<ObjectKey, DeriveError> {
        let region = match object.region_id() {
            Some(region) if !region.trim().is_empty() => region.to_string(),
            _ => {
                return Err(DeriveError::MissingRegion {
                    object: object.name().to_string(),
                })
            }
        };
        let position = object.position();
        if !position.x.is_finite() || !position.y.is_finite() {
            return Err(DeriveError::NonFinitePosition {
                object: object.name().to_string(),
                x: position.x,
                y: position.y,
            });
        }
        let (x, y) = self
            .quantize(position)
            .ok_or_else(|| DeriveError::OutOfRange {
                object: object.name().to_string(),
                x: position.x,
                y: position.y,
            })?;
        Ok(ObjectKey {
            region,
            x,
            y,
            index: object.sibling_index(),
        })
    }
}

/// Stable identity of one logical grass object. Field order defines the total
/// order used to pick canonical alias representatives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub region: String,
    pub x: i32,
    pub y: i32,
    pub index: u32,
}

impl ObjectKey {
    pub fn new(region: impl Into<String>, x: i32, y: i32, index: u32) -> Self {
        Self {
            region: region.into(),
            x,
            y,
            index,
        }
    }

    pub fn world_position(&self, quantizer: &KeyQuantizer) -> Vec2 {
        quantizer.cell_center(self.x, self.y)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@({},{})#{}", self.region, self.x, self.y, self.index)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::world::InspectError;

    #[derive(Debug, Clone)]
    pub(crate) struct FakeObject {
        pub region: Option<String>,
        pub position: Vec2,
        pub index: u32,
        pub name: String,
        pub markers: Vec<String>,
        pub broken: bool,
    }

    impl FakeObject {
        pub(crate) fn grass(region: &str, x: f32, y: f32) -> Self {
            Self {
                region: Some(region.to_string()),
                position: Vec2 { x, y },
                index: 0,
                name: "grass".to_string(),
                markers: vec!["GrassCut".to_string()],
                broken: false,
            }
        }

        pub(crate) fn rock(region: &str, x: f32, y: f32) -> Self {
            Self {
                name: "rock".to_string(),
                markers: vec!["Collider".to_string()],
                ..Self::grass(region, x, y)
            }
        }
    }

    impl WorldObject for FakeObject {
        fn region_id(&self) -> Option<&str> {
            self.region.as_deref()
        }

        fn position(&self) -> Vec2 {
            self.position
        }

        fn sibling_index(&self) -> u32 {
            self.index
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn component_markers(&self) -> Result<Vec<String>, InspectError> {
            if self.broken {
                return Err(InspectError {
                    object: self.name.clone(),
                    message: "component list unavailable".to_string(),
                });
            }
            Ok(self.markers.clone())
        }
    }

    #[test]
    fn derive_is_stable_under_jitter() {
        let quantizer = KeyQuantizer::default();
        let base = quantizer
            .derive(&FakeObject::grass("Crossroads_01", 12.34, -4.21))
            .expect("key");
        for (dx, dy) in [(0.001, 0.0), (-0.001, 0.001), (0.0004, -0.0009), (1e-5, 1e-5)] {
            let jittered = FakeObject::grass("Crossroads_01", 12.34 + dx, -4.21 + dy);
            assert_eq!(quantizer.derive(&jittered).expect("key"), base, "dx={dx} dy={dy}");
        }
        assert_eq!(base, ObjectKey::new("Crossroads_01", 123, -42, 0));
    }

    #[test]
    fn derive_separates_distinct_objects() {
        let quantizer = KeyQuantizer::default();
        let a = quantizer
            .derive(&FakeObject::grass("Crossroads_01", 10.0, 5.0))
            .expect("a");
        let moved = quantizer
            .derive(&FakeObject::grass("Crossroads_01", 10.3, 5.0))
            .expect("moved");
        let other_region = quantizer
            .derive(&FakeObject::grass("Crossroads_02", 10.0, 5.0))
            .expect("other region");
        let mut sibling = FakeObject::grass("Crossroads_01", 10.0, 5.0);
        sibling.index = 1;
        let sibling = quantizer.derive(&sibling).expect("sibling");

        assert_ne!(a, moved);
        assert_ne!(a, other_region);
        assert_ne!(a, sibling);
    }

    #[test]
    fn derive_rejects_missing_region_and_bad_positions() {
        let quantizer = KeyQuantizer::default();
        let mut no_region = FakeObject::grass("", 1.0, 1.0);
        assert!(matches!(
            quantizer.derive(&no_region),
            Err(DeriveError::MissingRegion { .. })
        ));
        no_region.region = None;
        assert!(matches!(
            quantizer.derive(&no_region),
            Err(DeriveError::MissingRegion { .. })
        ));
        assert!(matches!(
            quantizer.derive(&FakeObject::grass("A", f32::NAN, 0.0)),
            Err(DeriveError::NonFinitePosition { .. })
        ));
        assert!(matches!(
            quantizer.derive(&FakeObject::grass("A", 1e30, 0.0)),
            Err(DeriveError::OutOfRange { .. })
        ));
    }

    #[test]
    fn derive_errors_carry_the_offending_position() {
        let quantizer = KeyQuantizer::default();
        assert_eq!(
            quantizer.derive(&FakeObject::grass("A", 1e30, 0.5)),
            Err(DeriveError::OutOfRange {
                object: "grass".to_string(),
                x: 1e30,
                y: 0.5,
            })
        );
        assert_eq!(
            KeyQuantizer::new(-2.0),
            Err(DeriveError::InvalidPrecision { value: -2.0 })
        );
    }

    #[test]
    fn quantizer_rejects_invalid_precision() {
        for value in [0.0, -1.0, f32::INFINITY, f32::NAN] {
            assert!(KeyQuantizer::new(value).is_err(), "value={value}");
        }
        let coarse = KeyQuantizer::new(2.0).expect("coarse");
        assert_eq!(coarse.quantize(Vec2 { x: 1.2, y: -0.8 }), Some((2, -2)));
        assert_eq!(coarse.cell_center(2, -2), Vec2 { x: 1.0, y: -1.0 });
    }

    #[test]
    fn key_order_is_region_then_position_then_index() {
        let mut keys = vec![
            ObjectKey::new("B", 0, 0, 0),
            ObjectKey::new("A", 5, 0, 1),
            ObjectKey::new("A", 5, 0, 0),
            ObjectKey::new("A", -3, 9, 0),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ObjectKey::new("A", -3, 9, 0),
                ObjectKey::new("A", 5, 0, 0),
                ObjectKey::new("A", 5, 0, 1),
                ObjectKey::new("B", 0, 0, 0),
            ]
        );
        assert_eq!(keys[0].to_string(), "A@(-3,9)#0");
    }
}
