use crate::world::position::{Position, GROUND_FLOOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSize {
    pub width: u16,
    pub height: u16,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self { width: 18, height: 14 }
    }
}

/// The rectangle a player's client renders around them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub center: Position,
    pub min: Position,
    pub max: Position,
    pub size: ViewportSize,
}

impl Viewport {
    pub fn from_center(center: Position, size: ViewportSize) -> Self {
        let half_left = size.width / 2 - 1;
        let half_right = size.width.saturating_sub(half_left + 1);
        let half_up = size.height / 2 - 1;
        let half_down = size.height.saturating_sub(half_up + 1);

        let min = Position {
            x: center.x.saturating_sub(half_left),
            y: center.y.saturating_sub(half_up),
            z: center.z,
        };
        let max = Position {
            x: center.x.saturating_add(half_right),
            y: center.y.saturating_add(half_down),
            z: center.z,
        };

        Self {
            center,
            min,
            max,
            size,
        }
    }

    pub fn around(center: Position) -> Self {
        Self::from_center(center, ViewportSize::default())
    }

    pub fn contains(&self, position: Position) -> bool {
        position.z == self.center.z
            && position.x >= self.min.x
            && position.x <= self.max.x
            && position.y >= self.min.y
            && position.y <= self.max.y
    }

    /// Whether a client centered here renders `position`, other floors included.
    ///
    /// Floors above ground see every surface floor; underground floors see two
    /// floors up and down. Each floor of difference shifts the rectangle by one
    /// tile diagonally.
    pub fn can_see(&self, position: Position) -> bool {
        let viewer_z = i32::from(self.center.z);
        let z = i32::from(position.z);
        let surface = i32::from(GROUND_FLOOR);
        let floor_visible = if viewer_z <= surface {
            z <= surface
        } else {
            (z - viewer_z).abs() <= 2
        };
        if !floor_visible {
            return false;
        }
        let shift = viewer_z - z;
        let x = i32::from(position.x);
        let y = i32::from(position.y);
        x >= i32::from(self.min.x) + shift
            && x <= i32::from(self.max.x) + shift
            && y >= i32::from(self.min.y) + shift
            && y <= i32::from(self.max.y) + shift
    }
}
