//! Position integration with world clamping and all-or-nothing AABB
//! collision.
//!
//! A blocked candidate is dropped in full. There is no sliding along the
//! free axis: pushing diagonally into a wall stops the player dead.
use crate::engine::input::AxisVector;
use crate::engine::Point;
use crate::world::{Interactable, World};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Movement {
    /// world units per tick at full deflection
    pub speed: f32,
    /// side of the player's square
    pub player_size: f32,
}

impl Movement {
    pub fn new(speed: f32, player_size: f32) -> Self {
        Movement { speed, player_size }
    }

    /// Next position for one tick, or `position` itself when idle or blocked
    pub fn step(&self, position: Point, axis: AxisVector, world: &World) -> Point {
        if axis.is_zero() {
            return position;
        }
        let candidate = clamp_to_world(
            Point::new(
                position.x + axis.dx * self.speed,
                position.y + axis.dy * self.speed,
            ),
            world,
        );
        match self.blocker(candidate, world) {
            Some(object) => {
                log::trace!("move to {:?} blocked by {}", candidate, object.id);
                position
            }
            None => candidate,
        }
    }

    /// First object whose solid box, grown by half the player, strictly
    /// contains `position`
    pub fn blocker<'w>(&self, position: Point, world: &'w World) -> Option<&'w Interactable> {
        let half = self.player_size * 0.5;
        world
            .objects()
            .iter()
            .find(|object| object.bounds.expand(half).contains(&position))
    }
}

pub fn clamp_to_world(position: Point, world: &World) -> Point {
    Point::new(
        position.x.clamp(0.0, world.width()),
        position.y.clamp(0.0, world.height()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BazaarConfig;
    use crate::engine::{Rect, Size};
    use crate::world::InteractableKind;
    use approx::assert_relative_eq;

    fn crate_at(x: f32, y: f32, w: f32, h: f32) -> Interactable {
        Interactable {
            id: format!("crate_{x}_{y}"),
            kind: InteractableKind::Sign,
            bounds: Rect::new(Point::new(x, y), Size::new(w, h)),
            label: "Crate".to_string(),
            color: String::new(),
            dialogue: Vec::new(),
            catalog: None,
        }
    }

    fn open_world() -> World {
        World::new(Size::new(2000.0, 2000.0), Vec::new())
    }

    #[test]
    fn moves_by_speed_times_axis() {
        let movement = Movement::new(5.0, 50.0);
        let next = movement.step(Point::new(100.0, 100.0), AxisVector::new(1.0, -0.5), &open_world());
        assert_relative_eq!(next.x, 105.0);
        assert_relative_eq!(next.y, 97.5);
    }

    #[test]
    fn zero_axis_does_not_move() {
        let movement = Movement::new(5.0, 50.0);
        let start = Point::new(100.0, 100.0);
        assert_eq!(movement.step(start, AxisVector::ZERO, &open_world()), start);
    }

    #[test]
    fn clamps_to_world_edges() {
        let movement = Movement::new(5.0, 50.0);
        let world = open_world();
        let corner = movement.step(Point::new(2.0, 1998.0), AxisVector::new(-1.0, 1.0), &world);
        assert_eq!(corner, Point::new(0.0, 2000.0));
    }

    #[test]
    fn clamped_position_always_in_bounds() {
        let movement = Movement::new(37.0, 50.0);
        let world = open_world();
        let axes = [-1.0, -0.7, -0.1, 0.0, 0.3, 1.0];
        let starts = [0.0, 1.0, 999.0, 1990.0, 2000.0];
        for &dx in &axes {
            for &dy in &axes {
                for &x in &starts {
                    for &y in &starts {
                        let next = movement.step(Point::new(x, y), AxisVector::new(dx, dy), &world);
                        assert!((0.0..=2000.0).contains(&next.x));
                        assert!((0.0..=2000.0).contains(&next.y));
                    }
                }
            }
        }
    }

    #[test]
    fn blocked_move_keeps_exact_position() {
        let movement = Movement::new(5.0, 50.0);
        // solid box grown by 25 spans x in (375, 545)
        let world = World::new(Size::new(2000.0, 2000.0), vec![crate_at(400.0, 300.0, 120.0, 100.0)]);
        let start = Point::new(372.0, 350.0);
        let next = movement.step(start, AxisVector::new(1.0, 0.0), &world);
        assert_eq!(next, start);
    }

    #[test]
    fn no_sliding_along_free_axis() {
        let movement = Movement::new(5.0, 50.0);
        let world = World::new(Size::new(2000.0, 2000.0), vec![crate_at(400.0, 300.0, 120.0, 100.0)]);
        // only the x step enters the box, the y step alone would be free
        let start = Point::new(372.0, 350.0);
        let next = movement.step(start, AxisVector::new(1.0, 1.0), &world);
        assert_eq!(next, start);
    }

    #[test]
    fn touching_the_edge_is_not_a_collision() {
        let movement = Movement::new(5.0, 50.0);
        let world = World::new(Size::new(2000.0, 2000.0), vec![crate_at(400.0, 300.0, 120.0, 100.0)]);
        let next = movement.step(Point::new(370.0, 350.0), AxisVector::new(1.0, 0.0), &world);
        assert_eq!(next, Point::new(375.0, 350.0));
    }

    #[test]
    fn never_ends_inside_a_solid_box() {
        let config = BazaarConfig::default();
        let world = World::from_config(&config);
        let movement = Movement::new(config.player_speed, config.player_size);
        let mut position = world.center();
        // walk a square spiral that drags the player across several shops
        let legs = [
            AxisVector::new(-1.0, 0.0),
            AxisVector::new(0.0, -1.0),
            AxisVector::new(1.0, 0.0),
            AxisVector::new(0.0, 1.0),
            AxisVector::new(-0.7, -0.7),
        ];
        for (i, axis) in legs.iter().cycle().take(20).enumerate() {
            for _ in 0..(40 + i * 10) {
                position = movement.step(position, *axis, &world);
                assert!(movement.blocker(position, &world).is_none());
            }
        }
    }
}
