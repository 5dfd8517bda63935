use serde::{Deserialize, Serialize};

/// Highest floor index; floor 7 is ground level and larger values are deeper.
pub const MAX_FLOOR: u8 = 15;
pub const GROUND_FLOOR: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
    pub z: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionDelta {
    pub dx: i16,
    pub dy: i16,
    pub dz: i8,
}

impl Position {
    pub const fn new(x: u16, y: u16, z: u8) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, delta: PositionDelta) -> Option<Self> {
        let x = i32::from(self.x) + i32::from(delta.dx);
        let y = i32::from(self.y) + i32::from(delta.dy);
        let z = i16::from(self.z) + i16::from(delta.dz);

        if x < 0 || y < 0 || z < 0 {
            return None;
        }

        if x > i32::from(u16::MAX) || y > i32::from(u16::MAX) || z > i16::from(MAX_FLOOR) {
            return None;
        }

        Some(Self {
            x: x as u16,
            y: y as u16,
            z: z as u8,
        })
    }

    pub fn step(self, direction: Direction) -> Option<Self> {
        self.offset(direction.delta())
    }

    pub fn dx(self, other: Position) -> u16 {
        self.x.abs_diff(other.x)
    }

    pub fn dy(self, other: Position) -> u16 {
        self.y.abs_diff(other.y)
    }

    /// Chebyshev distance on the horizontal plane; floors are ignored.
    pub fn distance(self, other: Position) -> u16 {
        self.dx(other).max(self.dy(other))
    }

    /// True when `other` lies within `dx`/`dy` tiles on the same floor.
    pub fn within(self, other: Position, dx: u16, dy: u16) -> bool {
        self.z == other.z && self.dx(other) <= dx && self.dy(other) <= dy
    }
}

impl Direction {
    pub fn delta(self) -> PositionDelta {
        match self {
            Direction::North => PositionDelta { dx: 0, dy: -1, dz: 0 },
            Direction::East => PositionDelta { dx: 1, dy: 0, dz: 0 },
            Direction::South => PositionDelta { dx: 0, dy: 1, dz: 0 },
            Direction::West => PositionDelta { dx: -1, dy: 0, dz: 0 },
            Direction::Northeast => PositionDelta { dx: 1, dy: -1, dz: 0 },
            Direction::Northwest => PositionDelta { dx: -1, dy: -1, dz: 0 },
            Direction::Southeast => PositionDelta { dx: 1, dy: 1, dz: 0 },
            Direction::Southwest => PositionDelta { dx: -1, dy: 1, dz: 0 },
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::Northeast
                | Direction::Northwest
                | Direction::Southeast
                | Direction::Southwest
        )
    }

    /// Facing after a step from `from` to `to`.
    ///
    /// The vertical component is resolved first and the horizontal one
    /// overrides it, so a diagonal step locks the facing to east or west.
    pub fn facing_after_move(from: Position, to: Position, current: Direction) -> Direction {
        let mut facing = current;
        if to.y < from.y {
            facing = Direction::North;
        }
        if to.y > from.y {
            facing = Direction::South;
        }
        if to.x > from.x {
            facing = Direction::East;
        }
        if to.x < from.x {
            facing = Direction::West;
        }
        facing
    }
}

/// Rectangular region used for spectator queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub min_x: u16,
    pub max_x: u16,
    pub min_y: u16,
    pub max_y: u16,
    pub min_z: u8,
    pub max_z: u8,
}

/// Half-widths of the area a client can see around its own position.
pub const VIEW_RANGE_X: u16 = 9;
pub const VIEW_RANGE_Y: u16 = 7;

impl Range {
    /// Everything a client standing at `center` could observe.
    ///
    /// A multi-floor range spans every floor visible from `center`: all surface
    /// floors above ground, or two floors up and down when underground.
    pub fn around(center: Position, multi_floor: bool) -> Self {
        Self::with_extent(center, VIEW_RANGE_X, VIEW_RANGE_X, VIEW_RANGE_Y, VIEW_RANGE_Y, multi_floor)
    }

    pub fn with_extent(
        center: Position,
        left: u16,
        right: u16,
        up: u16,
        down: u16,
        multi_floor: bool,
    ) -> Self {
        let (min_z, max_z) = if !multi_floor {
            (center.z, center.z)
        } else if center.z <= GROUND_FLOOR {
            (0, GROUND_FLOOR)
        } else {
            (center.z.saturating_sub(2), center.z.saturating_add(2).min(MAX_FLOOR))
        };
        Self {
            min_x: center.x.saturating_sub(left),
            max_x: center.x.saturating_add(right),
            min_y: center.y.saturating_sub(up),
            max_y: center.y.saturating_add(down),
            min_z,
            max_z,
        }
    }

    /// Union of the views around two positions on the first position's floor.
    pub fn between(a: Position, b: Position) -> Self {
        Self {
            min_x: a.x.min(b.x).saturating_sub(VIEW_RANGE_X),
            max_x: a.x.max(b.x).saturating_add(VIEW_RANGE_X),
            min_y: a.y.min(b.y).saturating_sub(VIEW_RANGE_Y),
            max_y: a.y.max(b.y).saturating_add(VIEW_RANGE_Y),
            min_z: a.z,
            max_z: a.z,
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.min_x
            && position.x <= self.max_x
            && position.y >= self.min_y
            && position.y <= self.max_y
            && position.z >= self.min_z
            && position.z <= self.max_z
    }
}
