use crate::engine::{DelayedTask, Point};
use crate::world::{Interactable, World};

/// First interactable, in world order, whose center is closer than
/// `radius`. Overlapping ranges always resolve to the earlier object; this
/// is not a nearest-object search.
pub fn detect<'w>(position: Point, world: &'w World, radius: f32) -> Option<&'w Interactable> {
    world
        .objects()
        .iter()
        .find(|object| position.distance(&object.center()) < radius)
}

/// A sign's speech bubble that clears itself after a timeout
#[derive(Debug)]
pub struct Dialogue {
    source: String,
    lines: Vec<String>,
    expiry: DelayedTask<()>,
}

impl Dialogue {
    pub fn show(object: &Interactable, now: f64, timeout_ms: f64) -> Option<Self> {
        if object.dialogue.is_empty() {
            return None;
        }
        Some(Dialogue {
            source: object.id.clone(),
            lines: object.dialogue.clone(),
            expiry: DelayedTask::schedule((), now, timeout_ms),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Line currently on screen
    pub fn line(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or_default()
    }

    /// True once the timeout has elapsed
    pub fn expired(&mut self, now: f64) -> bool {
        self.expiry.poll(now).is_some() || !self.expiry.is_pending()
    }
}
