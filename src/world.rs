use crate::catalog::{self, CatalogEntry};
use crate::config::{BazaarConfig, InteractableDef};
use crate::engine::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractableKind {
    Shop,
    Sign,
}

/// A shop or sign placed in the world. Built once at load, never mutated.
#[derive(Debug, Clone)]
pub struct Interactable {
    pub id: String,
    pub kind: InteractableKind,
    /// top left + size, also the solid box
    pub bounds: Rect,
    pub label: String,
    pub color: String,
    pub dialogue: Vec<String>,
    // shared with any open shop session instead of cloned per visit
    pub catalog: Option<Rc<Vec<CatalogEntry>>>,
}

impl Interactable {
    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    fn from_def(def: &InteractableDef) -> Self {
        let catalog = match (def.kind, &def.category) {
            (InteractableKind::Shop, Some(category)) => {
                let products = catalog::products_in(category);
                if products.is_empty() {
                    log::warn!("shop '{}' stocks unknown category '{}'", def.id, category);
                }
                Some(Rc::new(products))
            }
            (InteractableKind::Shop, None) => {
                log::warn!("shop '{}' has no category, it will stay closed", def.id);
                None
            }
            (InteractableKind::Sign, _) => None,
        };
        Interactable {
            id: def.id.clone(),
            kind: def.kind,
            bounds: Rect::new(def.position, def.size),
            label: def.label.clone(),
            color: def.color.clone(),
            dialogue: def.dialogue.clone(),
            catalog,
        }
    }
}

/// Fixed map: bounds plus the interactables in iteration order
#[derive(Debug, Clone)]
pub struct World {
    size: Size,
    objects: Vec<Interactable>,
}

impl World {
    pub fn new(size: Size, objects: Vec<Interactable>) -> Self {
        World { size, objects }
    }

    pub fn from_config(config: &BazaarConfig) -> Self {
        let objects = config
            .interactables
            .iter()
            .map(Interactable::from_def)
            .collect::<Vec<_>>();
        log::debug!(
            "world {}x{} with {} interactables",
            config.world_width,
            config.world_height,
            objects.len()
        );
        World::new(config.world_size(), objects)
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.size.width * 0.5, self.size.height * 0.5)
    }

    pub fn objects(&self) -> &[Interactable] {
        &self.objects
    }

    pub fn get(&self, id: &str) -> Option<&Interactable> {
        self.objects.iter().find(|object| object.id == id)
    }
}
