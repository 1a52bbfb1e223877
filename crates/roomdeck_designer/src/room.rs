use scenebud::Color;
use serde::{Deserialize, Serialize};

use crate::error::{DesignError, Result};

pub const MIN_ROOM_HEIGHT: f32 = 2.0;
pub const MAX_ROOM_HEIGHT: f32 = 4.0;

pub const DEFAULT_WALL_COLOR: &str = "#f5f5f0";
pub const DEFAULT_FLOOR_COLOR: &str = "#8b7355";

/// Room extents in meters. Width runs along X, length along Z.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct RoomDimensions {
    pub width: f32,
    pub length: f32,
    pub height: f32,
}

impl RoomDimensions {
    pub fn new(width: f32, length: f32, height: f32) -> Result<Self> {
        let dims = Self {
            width,
            length,
            height,
        };
        dims.validate()?;
        Ok(dims)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("width", self.width),
            ("length", self.length),
            ("height", self.height),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(DesignError::InvalidDimensions(format!(
                    "{name} must be positive, got {v}"
                )));
            }
        }

        if !(MIN_ROOM_HEIGHT..=MAX_ROOM_HEIGHT).contains(&self.height) {
            return Err(DesignError::InvalidDimensions(format!(
                "height must be between {MIN_ROOM_HEIGHT}m and {MAX_ROOM_HEIGHT}m, got {}",
                self.height
            )));
        }

        Ok(())
    }

    /// Interior half extents on the floor plane, (x, z).
    pub fn half_extents(&self) -> (f32, f32) {
        (self.width * 0.5, self.length * 0.5)
    }

    pub fn floor_area(&self) -> f32 {
        self.width * self.length
    }
}

impl Default for RoomDimensions {
    fn default() -> Self {
        Self {
            width: 7.0,
            length: 8.0,
            height: 3.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Wall {
    North,
    South,
    East,
    West,
}

impl Wall {
    /// Length of this wall for the given room.
    pub fn span(&self, dims: &RoomDimensions) -> f32 {
        match self {
            Wall::North | Wall::South => dims.width,
            Wall::East | Wall::West => dims.length,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpeningKind {
    Door,
    Window { sill_height: f32 },
}

/// A door or window on one of the four walls. `position` is measured
/// along the wall from its start.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Opening {
    pub id: String,
    #[serde(flatten)]
    pub kind: OpeningKind,
    pub wall: Wall,
    pub position: f32,
    pub width: f32,
    pub height: f32,
}

impl Opening {
    pub fn door(id: impl Into<String>, wall: Wall, position: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            kind: OpeningKind::Door,
            wall,
            position,
            width,
            height,
        }
    }

    pub fn window(
        id: impl Into<String>,
        wall: Wall,
        position: f32,
        width: f32,
        height: f32,
        sill_height: f32,
    ) -> Self {
        Self {
            id: id.into(),
            kind: OpeningKind::Window { sill_height },
            wall,
            position,
            width,
            height,
        }
    }

    pub fn is_door(&self) -> bool {
        self.kind == OpeningKind::Door
    }

    pub fn sill_height(&self) -> f32 {
        match self.kind {
            OpeningKind::Door => 0.0,
            OpeningKind::Window { sill_height } => sill_height,
        }
    }

    /// The opening must lie entirely within its wall.
    pub fn validate(&self, dims: &RoomDimensions) -> Result<()> {
        let invalid = |reason: String| DesignError::InvalidOpening {
            id: self.id.clone(),
            reason,
        };

        if !(self.width > 0.0 && self.height > 0.0) || self.sill_height() < 0.0 {
            return Err(invalid(format!(
                "width {} and height {} must be positive, sill {} not negative",
                self.width,
                self.height,
                self.sill_height()
            )));
        }

        let span = self.wall.span(dims);
        let (start, end) = (self.position - self.width * 0.5, self.position + self.width * 0.5);
        if !(start >= 0.0 && end <= span) {
            return Err(invalid(format!(
                "spans {start:.2}..{end:.2}m on a {span:.2}m {:?} wall",
                self.wall
            )));
        }

        let top = self.sill_height() + self.height;
        if top > dims.height {
            return Err(invalid(format!(
                "top at {top:.2}m is above the {:.2}m ceiling",
                dims.height
            )));
        }

        Ok(())
    }
}

/// Everything the host supplies to describe a room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSpec {
    pub dimensions: RoomDimensions,
    pub wall_color: Color,
    pub floor_color: Color,
    pub openings: Vec<Opening>,
}

impl RoomSpec {
    pub fn new(dimensions: RoomDimensions) -> Self {
        Self {
            dimensions,
            wall_color: Color::from_hex(DEFAULT_WALL_COLOR).unwrap_or(Color::WHITE),
            floor_color: Color::from_hex(DEFAULT_FLOOR_COLOR).unwrap_or(Color::WHITE),
            openings: Vec::new(),
        }
    }

    pub fn with_colors(mut self, wall: Color, floor: Color) -> Self {
        self.wall_color = wall;
        self.floor_color = floor;
        self
    }

    pub fn with_opening(mut self, opening: Opening) -> Self {
        self.openings.push(opening);
        self
    }

    /// Check the dimensions, then that every opening fits its wall.
    pub fn validate(&self) -> Result<()> {
        self.dimensions.validate()?;
        for opening in &self.openings {
            opening.validate(&self.dimensions)?;
        }
        Ok(())
    }

    pub fn doors(&self) -> impl Iterator<Item = &Opening> {
        self.openings.iter().filter(|o| o.is_door())
    }

    pub fn windows(&self) -> impl Iterator<Item = &Opening> {
        self.openings.iter().filter(|o| !o.is_door())
    }
}

impl Default for RoomSpec {
    fn default() -> Self {
        Self::new(RoomDimensions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_validation() {
        assert!(RoomDimensions::new(7.0, 8.0, 3.0).is_ok());
        assert!(RoomDimensions::new(7.0, 8.0, 2.0).is_ok());
        assert!(RoomDimensions::new(7.0, 8.0, 4.0).is_ok());

        for (w, l, h) in [
            (0.0, 8.0, 3.0),
            (7.0, -1.0, 3.0),
            (7.0, 8.0, 1.5),
            (7.0, 8.0, 4.5),
            (f32::NAN, 8.0, 3.0),
        ] {
            assert!(matches!(
                RoomDimensions::new(w, l, h),
                Err(DesignError::InvalidDimensions(_))
            ));
        }
    }

    #[test]
    fn opening_serializes_flat() {
        let window = Opening::window("w1", Wall::East, 2.0, 1.2, 1.0, 0.9);
        let json = serde_json::to_value(&window).unwrap();
        assert_eq!(json["kind"], "window");
        assert_eq!(json["wall"], "east");
        assert!((json["sill_height"].as_f64().unwrap() - 0.9).abs() < 1e-6);

        let back: Opening = serde_json::from_value(json).unwrap();
        assert_eq!(back, window);

        let door: Opening = serde_json::from_str(
            r#"{ "id": "d1", "kind": "door", "wall": "north", "position": 1.0, "width": 0.9, "height": 2.1 }"#,
        )
        .unwrap();
        assert!(door.is_door());
        assert_eq!(door.sill_height(), 0.0);
    }

    #[test]
    fn spec_splits_doors_and_windows() {
        let spec = RoomSpec::default()
            .with_opening(Opening::door("d", Wall::South, 1.0, 0.9, 2.1))
            .with_opening(Opening::window("w", Wall::North, 3.0, 1.5, 1.2, 0.8));
        assert_eq!(spec.doors().count(), 1);
        assert_eq!(spec.windows().count(), 1);
        assert_eq!(Wall::East.span(&spec.dimensions), 8.0);
    }

    #[test]
    fn openings_must_fit_their_wall() {
        let dims = RoomDimensions::new(5.0, 6.0, 2.8).unwrap();
        assert!(Opening::door("d", Wall::South, 0.5, 0.9, 2.1).validate(&dims).is_ok());
        assert!(Opening::window("w", Wall::East, 5.0, 1.2, 1.0, 0.9).validate(&dims).is_ok());

        for opening in [
            // centred on the corner
            Opening::door("d", Wall::South, 0.0, 0.9, 2.1),
            // past the end of a 5m wall, fine on a 6m one
            Opening::window("w", Wall::North, 5.0, 1.2, 1.0, 0.9),
            Opening::window("w", Wall::East, 2.0, 1.2, 1.5, 1.5),
            Opening::door("d", Wall::West, 2.0, 0.0, 2.1),
        ] {
            assert!(matches!(
                opening.validate(&dims),
                Err(DesignError::InvalidOpening { .. })
            ));
        }

        let spec = RoomSpec::new(dims).with_opening(Opening::door("d", Wall::North, 4.8, 0.9, 2.1));
        assert!(matches!(spec.validate(), Err(DesignError::InvalidOpening { id, .. }) if id == "d"));
    }
}
