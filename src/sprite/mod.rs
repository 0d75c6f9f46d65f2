// ┌──────────────────────────────────────────────────────────────────────┐
// │                        sprite/ layout                                │
// ├────────────────┬─────────────────────────────────────────────────────┤
// │ mod.rs         │ Direction, AnimationState, SpriteState markers      │
// │ state.rs       │ AvatarState<S> typestates + shared AvatarContext    │
// │ avatar.rs      │ AvatarStateMachine + publish-on-change Avatar       │
// └────────────────┴─────────────────────────────────────────────────────┘
pub mod avatar;
pub mod state;

use crate::engine::input::AxisVector;
use serde::{Deserialize, Serialize};

pub use avatar::Avatar;

// wall clock time a walking frame stays on screen
pub const FRAME_INTERVAL_MS: f64 = 150.0;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Facing for an axis vector.
///
/// The horizontal axis only wins on a strictly larger magnitude, so a
/// perfect diagonal faces up or down. A zero vector keeps `previous`.
pub fn derive_direction(axis: AxisVector, previous: Direction) -> Direction {
    if axis.is_zero() {
        return previous;
    }
    if axis.dx.abs() > axis.dy.abs() {
        if axis.dx > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if axis.dy > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    }
}

/// What the presentation layer needs to pick a sprite sequence
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct AnimationState {
    pub direction: Direction,
    pub is_moving: bool,
}

pub trait SpriteState {
    fn name() -> &'static str;
    fn is_moving() -> bool;
}

#[derive(Debug, Copy, Clone)]
pub struct Idle;

#[derive(Debug, Copy, Clone)]
pub struct Walking;

impl SpriteState for Idle {
    fn name() -> &'static str {
        "idle"
    }

    fn is_moving() -> bool {
        false
    }
}

impl SpriteState for Walking {
    fn name() -> &'static str {
        "walking"
    }

    fn is_moving() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_dominant_axis_faces_sideways() {
        let axis = AxisVector { dx: 3.0, dy: -1.0 };
        assert_eq!(derive_direction(axis, Direction::Up), Direction::Right);
        let axis = AxisVector { dx: -0.9, dy: 0.2 };
        assert_eq!(derive_direction(axis, Direction::Up), Direction::Left);
    }

    #[test]
    fn vertical_axis_faces_up_or_down() {
        let axis = AxisVector { dx: 0.0, dy: 5.0 };
        assert_eq!(derive_direction(axis, Direction::Left), Direction::Down);
        let axis = AxisVector { dx: 0.0, dy: -0.3 };
        assert_eq!(derive_direction(axis, Direction::Left), Direction::Up);
    }

    #[test]
    fn diagonal_tie_goes_vertical() {
        let axis = AxisVector::new(1.0, 1.0);
        assert_eq!(derive_direction(axis, Direction::Left), Direction::Down);
        let axis = AxisVector::new(-1.0, -1.0);
        assert_eq!(derive_direction(axis, Direction::Right), Direction::Up);
    }

    #[test]
    fn stopping_keeps_previous_direction() {
        assert_eq!(
            derive_direction(AxisVector::ZERO, Direction::Left),
            Direction::Left
        );
    }
}
