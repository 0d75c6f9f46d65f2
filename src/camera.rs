use crate::engine::{Point, Size};

// fraction of the viewport the whole map fills in map mode
const MAP_FIT: f32 = 0.9;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ViewMode {
    /// follow the player at 1:1
    #[default]
    Action,
    /// whole world fitted to the screen
    Map,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Action => ViewMode::Map,
            ViewMode::Map => ViewMode::Action,
        }
    }
}

/// World to screen: `screen = world * scale + translate`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraTransform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
}

impl Default for CameraTransform {
    fn default() -> Self {
        CameraTransform {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
        }
    }
}

impl CameraTransform {
    /// Action mode centers `player` and does not stop at the world edge.
    /// Map mode ignores the player entirely.
    pub fn compute(player: Point, mode: ViewMode, viewport: Size, world: Size) -> Self {
        match mode {
            ViewMode::Action => CameraTransform {
                translate_x: viewport.width / 2.0 - player.x,
                translate_y: viewport.height / 2.0 - player.y,
                scale: 1.0,
            },
            ViewMode::Map => {
                let scale = MAP_FIT
                    * (viewport.width / world.width).min(viewport.height / world.height);
                CameraTransform {
                    translate_x: (viewport.width - world.width * scale) / 2.0,
                    translate_y: (viewport.height - world.height * scale) / 2.0,
                    scale,
                }
            }
        }
    }

    pub fn world_to_screen(&self, point: Point) -> Point {
        Point::new(
            point.x * self.scale + self.translate_x,
            point.y * self.scale + self.translate_y,
        )
    }
}
