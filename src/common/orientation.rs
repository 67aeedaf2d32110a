use serde::Deserialize;

/// Device orientation at the time a frame is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

/// Clockwise quarter turns applied to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

impl Orientation {
    /// Net rotation for this orientation, sensor mount offset included.
    pub fn net_rotation(&self) -> Rotation {
        match self {
            Orientation::Portrait => Rotation::Cw90,
            Orientation::LandscapeLeft => Rotation::Cw180,
            Orientation::LandscapeRight => Rotation::None,
            Orientation::PortraitUpsideDown => Rotation::Cw270,
        }
    }
}
