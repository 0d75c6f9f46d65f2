//! Static world configuration.
//!
//! Loaded once from `bazaar.json` next to the page. Any field left out falls
//! back to the built-in bazaar below.
use crate::catalog;
use crate::engine::{Point, Size};
use crate::sprite::{Direction, FRAME_INTERVAL_MS};
use crate::world::InteractableKind;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const CONFIG_PATH: &str = "bazaar.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BazaarConfig {
    pub world_width: f32,
    pub world_height: f32,
    /// side of the player's square, collision uses half of it
    pub player_size: f32,
    /// world units per tick
    pub player_speed: f32,
    pub interaction_radius: f32,
    pub animation_frame_ms: f64,
    pub joystick_radius: f32,
    pub purchase_delay_ms: f64,
    pub dialogue_timeout_ms: f64,
    pub initial_gold: u32,
    pub floor_image: Option<String>,
    pub character_sprites: CharacterSprites,
    pub interactables: Vec<InteractableDef>,
}

impl Default for BazaarConfig {
    fn default() -> Self {
        BazaarConfig {
            world_width: 2000.0,
            world_height: 2000.0,
            player_size: 50.0,
            player_speed: 5.0,
            interaction_radius: 150.0,
            animation_frame_ms: FRAME_INTERVAL_MS,
            joystick_radius: 40.0,
            purchase_delay_ms: 1500.0,
            dialogue_timeout_ms: 3000.0,
            initial_gold: 1000,
            floor_image: Some(
                "https://i.postimg.cc/CK5rBZLQ/Untitled-design-(43).png".to_string(),
            ),
            character_sprites: CharacterSprites::default(),
            interactables: default_interactables(),
        }
    }
}

impl BazaarConfig {
    pub fn world_size(&self) -> Size {
        Size::new(self.world_width, self.world_height)
    }

    pub fn validate(&self) -> Result<()> {
        if self.world_width <= 0.0 || self.world_height <= 0.0 {
            bail!(
                "world must have a positive size, got {}x{}",
                self.world_width,
                self.world_height
            );
        }
        if self.player_size <= 0.0 {
            bail!("player_size must be positive, got {}", self.player_size);
        }
        if self.player_speed < 0.0 {
            bail!("player_speed must not be negative, got {}", self.player_speed);
        }
        if self.interaction_radius <= 0.0 {
            bail!(
                "interaction_radius must be positive, got {}",
                self.interaction_radius
            );
        }
        if self.joystick_radius <= 0.0 {
            bail!("joystick_radius must be positive, got {}", self.joystick_radius);
        }
        if self.animation_frame_ms <= 0.0 {
            bail!(
                "animation_frame_ms must be positive, got {}",
                self.animation_frame_ms
            );
        }
        if self.purchase_delay_ms < 0.0 || self.dialogue_timeout_ms < 0.0 {
            bail!("timer delays must not be negative");
        }

        let stocked = catalog::categories();
        let mut seen = HashSet::new();
        for def in &self.interactables {
            if def.id.is_empty() {
                bail!("interactable '{}' has an empty id", def.label);
            }
            if !seen.insert(def.id.as_str()) {
                bail!("duplicate interactable id '{}'", def.id);
            }
            if def.size.width <= 0.0 || def.size.height <= 0.0 {
                bail!("interactable '{}' must have a positive size", def.id);
            }
            if let (InteractableKind::Shop, Some(category)) = (def.kind, &def.category) {
                if !stocked.contains(&category.as_str()) {
                    bail!("shop '{}' stocks unknown category '{}'", def.id, category);
                }
            }
        }
        Ok(())
    }
}

/// One shop or sign as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractableDef {
    pub id: String,
    pub kind: InteractableKind,
    /// top left corner
    pub position: Point,
    pub size: Size,
    pub label: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// product category stocked by a shop
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub dialogue: Vec<String>,
}

fn default_color() -> String {
    "#374151".to_string()
}

/// Walking frame URLs per direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSprites {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
}

impl CharacterSprites {
    pub fn frames(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }

    /// Length of the shortest non-empty sequence, the cycle every direction
    /// can play without skipping
    pub fn frame_count(&self) -> usize {
        Direction::ALL
            .iter()
            .map(|direction| self.frames(*direction).len())
            .filter(|len| *len > 0)
            .min()
            .unwrap_or(0)
    }
}

impl Default for CharacterSprites {
    fn default() -> Self {
        let urls = |list: &[&str]| -> Vec<String> { list.iter().map(|url| url.to_string()).collect() };
        CharacterSprites {
            down: urls(&[
                "https://i.postimg.cc/NjbWSqz8/MMD2.png?v=1",
                "https://i.postimg.cc/R0HLfwKm/MMD3.png?v=1",
            ]),
            up: urls(&[
                "https://i.postimg.cc/tCGJCWCw/MMU1.png?v=1",
                "https://i.postimg.cc/mrn2xF5d/MMU2.png?v=1",
            ]),
            left: urls(&[
                "https://i.postimg.cc/rpkKn47M/MML1.png?v=1",
                "https://i.postimg.cc/L5wszgzd/MM2.png?v=1",
            ]),
            right: urls(&[
                "https://i.postimg.cc/0Nyb1v22/MMR1.png?v=1",
                "https://i.postimg.cc/1Xwzr5M5/MMR2.png?v=1",
            ]),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn shop(id: &str, x: f32, y: f32, w: f32, h: f32, color: &str, label: &str, category: &str) -> InteractableDef {
    InteractableDef {
        id: id.to_string(),
        kind: InteractableKind::Shop,
        position: Point::new(x, y),
        size: Size::new(w, h),
        label: label.to_string(),
        color: color.to_string(),
        category: Some(category.to_string()),
        dialogue: Vec::new(),
    }
}

fn default_interactables() -> Vec<InteractableDef> {
    vec![
        shop("hypebeast_shop", 400.0, 300.0, 120.0, 100.0, "#991b1b", "Hypebeast HQ", "Hypebeast"),
        shop("web3_shop", 800.0, 300.0, 120.0, 100.0, "#6b21a8", "Crypto Corner", "Web3"),
        shop("collectibles_shop", 600.0, 600.0, 140.0, 80.0, "#15803d", "Collectibles Market", "Collectible"),
        shop("ancient_shop", 1200.0, 500.0, 130.0, 90.0, "#a16207", "Ancient Relics", "Ancient"),
        shop("sculptures_shop", 1000.0, 800.0, 120.0, 100.0, "#374151", "Art Gallery", "Sculptures"),
        shop("household_shop", 300.0, 800.0, 120.0, 90.0, "#1d4ed8", "Home Goods", "Household"),
        InteractableDef {
            id: "fountain".to_string(),
            kind: InteractableKind::Sign,
            position: Point::new(600.0, 450.0),
            size: Size::new(80.0, 80.0),
            label: "Fountain".to_string(),
            color: "#60a5fa".to_string(),
            category: None,
            dialogue: vec![
                "The water is crystal clear.".to_string(),
                "You feel refreshed just looking at it.".to_string(),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BazaarConfig::default();
        config.validate().unwrap();
        assert_eq!(config.interactables.len(), 7);
        assert_eq!(config.character_sprites.frame_count(), 2);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: BazaarConfig =
            serde_json::from_str(r#"{ "player_speed": 8.0, "initial_gold": 250 }"#).unwrap();
        assert_eq!(config.player_speed, 8.0);
        assert_eq!(config.initial_gold, 250);
        assert_eq!(config.world_width, 2000.0);
        assert_eq!(config.interactables, default_interactables());
    }

    #[test]
    fn parses_interactables() {
        let config: BazaarConfig = serde_json::from_str(
            r#"{
                "interactables": [
                    {
                        "id": "well",
                        "kind": "sign",
                        "position": { "x": 10.0, "y": 20.0 },
                        "size": { "width": 30.0, "height": 40.0 },
                        "label": "Old Well",
                        "dialogue": ["Echo..."]
                    }
                ]
            }"#,
        )
        .unwrap();
        let well = &config.interactables[0];
        assert_eq!(well.kind, InteractableKind::Sign);
        assert_eq!(well.position, Point::new(10.0, 20.0));
        assert_eq!(well.dialogue, vec!["Echo...".to_string()]);
        assert_eq!(well.category, None);
        assert_eq!(well.color, default_color());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut config = BazaarConfig::default();
        let copy = config.interactables[0].clone();
        config.interactables.push(copy);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate interactable id"));
    }

    #[test]
    fn rejects_shop_with_unknown_category() {
        let mut config = BazaarConfig::default();
        config.interactables[0].category = Some("Spaceships".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown category 'Spaceships'"));
    }

    #[test]
    fn rejects_degenerate_world() {
        let config = BazaarConfig {
            world_width: 0.0,
            ..BazaarConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn frame_count_ignores_empty_sequences() {
        let sprites = CharacterSprites {
            up: vec!["a".into(), "b".into(), "c".into()],
            down: vec!["a".into(), "b".into()],
            left: Vec::new(),
            right: vec!["a".into(), "b".into(), "c".into()],
        };
        assert_eq!(sprites.frame_count(), 2);
    }
}
