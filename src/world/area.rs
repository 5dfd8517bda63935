use crate::world::position::{Direction, Position, PositionDelta};

/// Shape of the tile set an area effect touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaShape {
    /// Only the center tile.
    Point,
    Circle { radius: u8 },
    /// A straight beam starting next to the caster.
    Line { length: u8 },
    /// A wave widening away from the caster.
    Cone { range: u8, angle_degrees: u16 },
    /// Explicit offsets relative to the center.
    Offsets(Vec<(i16, i16)>),
}

impl AreaShape {
    /// Candidate tiles for an effect centered on `center`.
    ///
    /// Directional shapes (line, cone) extend from `center` in `facing`; the
    /// center tile itself is not part of them.
    pub fn positions(&self, center: Position, facing: Direction) -> Vec<Position> {
        match self {
            AreaShape::Point => vec![center],
            AreaShape::Circle { radius } => circle_positions(center, *radius),
            AreaShape::Line { length } => line_positions(center, facing, *length),
            AreaShape::Cone {
                range,
                angle_degrees,
            } => cone_positions(center, facing, *range, *angle_degrees),
            AreaShape::Offsets(offsets) => offsets
                .iter()
                .filter_map(|(dx, dy)| {
                    center.offset(PositionDelta {
                        dx: *dx,
                        dy: *dy,
                        dz: 0,
                    })
                })
                .collect(),
        }
    }

    pub fn is_directional(&self) -> bool {
        matches!(self, AreaShape::Line { .. } | AreaShape::Cone { .. })
    }
}

pub fn circle_offsets(radius: u8) -> Vec<(i16, i16)> {
    if radius == 0 {
        return vec![(0, 0)];
    }

    let radius_i = i16::from(radius);
    let mut offsets = Vec::new();
    for dy in -radius_i..=radius_i {
        for dx in -radius_i..=radius_i {
            if (dx * dx + dy * dy) <= radius_i * radius_i {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

pub fn circle_positions(center: Position, radius: u8) -> Vec<Position> {
    circle_offsets(radius)
        .into_iter()
        .filter_map(|(dx, dy)| center.offset(PositionDelta { dx, dy, dz: 0 }))
        .collect()
}

pub fn line_positions(origin: Position, direction: Direction, length: u8) -> Vec<Position> {
    let mut positions = Vec::new();
    let mut current = origin;
    for _ in 0..length {
        let Some(next) = current.step(direction) else {
            break;
        };
        positions.push(next);
        current = next;
    }
    positions
}

pub fn cone_positions(
    origin: Position,
    direction: Direction,
    range: u8,
    angle_degrees: u16,
) -> Vec<Position> {
    if range == 0 {
        return Vec::new();
    }

    let base_delta = direction.delta();
    let base_angle = (base_delta.dy as f32).atan2(base_delta.dx as f32).to_degrees();
    let max_angle = angle_degrees as f32;
    let range_i = i16::from(range);
    let mut positions = Vec::new();

    for dy in -range_i..=range_i {
        for dx in -range_i..=range_i {
            if dx == 0 && dy == 0 {
                continue;
            }
            let angle = (dy as f32).atan2(dx as f32).to_degrees();
            if angle_delta(base_angle, angle).abs() > max_angle {
                continue;
            }
            if let Some(position) = origin.offset(PositionDelta { dx, dy, dz: 0 }) {
                positions.push(position);
            }
        }
    }

    positions
}

fn angle_delta(a: f32, b: f32) -> f32 {
    let mut delta = b - a;
    while delta > 180.0 {
        delta -= 360.0;
    }
    while delta < -180.0 {
        delta += 360.0;
    }
    delta
}
