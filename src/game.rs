use crate::browser;
use crate::camera::{CameraTransform, ViewMode};
use crate::commerce::{CommerceSession, Ledger, PurchaseError, Ticket};
use crate::config::{BazaarConfig, CharacterSprites, CONFIG_PATH};
use crate::engine::input::{Action, AxisVector};
#[cfg(debug_assertions)]
use crate::engine::DebugDraw;
use crate::engine::{self, Frame, Game, Image, Point, Rect, Renderer, Size};
use crate::interaction::{self, Dialogue};
use crate::movement::Movement;
use crate::sprite::{AnimationState, Avatar, Direction};
use crate::world::{Interactable, InteractableKind, World};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use futures::join;
use std::collections::HashMap;
use web_sys::HtmlImageElement;

// ┌──────────────────────────── one tick ───────────────────────────────┐
// │ axis ─► Movement::step ─► Avatar::update ─► interaction::detect     │
// │      ─► CameraTransform::compute ─► timers (purchase, dialogue)     │
// │      ─► FrameState                                                  │
// └─────────────────────────────────────────────────────────────────────┘

/// Per-tick inputs. View mode travels with every tick so toggling it never
/// touches the loop.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TickInput {
    pub axis: AxisVector,
    pub view_mode: ViewMode,
    pub viewport: Size,
    pub now: f64,
}

/// What the presentation layer reads after a tick
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    pub position: Point,
    pub animation: AnimationState,
    /// set only on the tick the animation changed
    pub animation_changed: Option<AnimationState>,
    pub frame: usize,
    pub camera: CameraTransform,
    pub in_range: Option<String>,
    pub show_prompt: bool,
    pub dialogue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractOutcome {
    /// nothing in range, or a shop without stock
    Nothing,
    OpenedShop(String),
    ShowingDialogue(String),
    /// a shop is already open
    Busy,
}

/// The whole simulation, free of any browser types
pub struct Bazaar {
    world: World,
    movement: Movement,
    interaction_radius: f32,
    purchase_delay_ms: f64,
    dialogue_timeout_ms: f64,
    position: Point,
    avatar: Avatar,
    animation_changed: Option<AnimationState>,
    camera: CameraTransform,
    view_mode: ViewMode,
    in_range: Option<usize>,
    ledger: Ledger,
    shop: Option<CommerceSession>,
    dialogue: Option<Dialogue>,
    status: Option<String>,
    last_tick: Option<f64>,
}

impl Bazaar {
    /// Player starts at the center of the world
    pub fn new(config: &BazaarConfig) -> Self {
        let world = World::from_config(config);
        let start = world.center();
        Bazaar::spawn_at(config, world, start)
    }

    pub fn spawn_at(config: &BazaarConfig, world: World, position: Point) -> Self {
        Bazaar {
            world,
            movement: Movement::new(config.player_speed, config.player_size),
            interaction_radius: config.interaction_radius,
            purchase_delay_ms: config.purchase_delay_ms,
            dialogue_timeout_ms: config.dialogue_timeout_ms,
            position,
            avatar: Avatar::new(
                Direction::default(),
                config.animation_frame_ms,
                config.character_sprites.frame_count(),
            ),
            animation_changed: None,
            camera: CameraTransform::default(),
            view_mode: ViewMode::default(),
            in_range: None,
            ledger: Ledger::new(config.initial_gold),
            shop: None,
            dialogue: None,
            status: None,
            last_tick: None,
        }
    }

    pub fn tick(&mut self, input: &TickInput) -> FrameState {
        let delta_ms = self
            .last_tick
            .map(|last| (input.now - last).max(0.0))
            .unwrap_or(0.0);
        self.last_tick = Some(input.now);
        self.view_mode = input.view_mode;

        self.position = self.movement.step(self.position, input.axis, &self.world);
        self.animation_changed = self.avatar.update(input.axis, delta_ms);
        if let Some(animation) = self.animation_changed {
            log::debug!(
                "facing {} {}",
                animation.direction.name(),
                if animation.is_moving { "walking" } else { "idle" }
            );
        }

        let in_range = interaction::detect(self.position, &self.world, self.interaction_radius)
            .and_then(|found| self.world.objects().iter().position(|o| o.id == found.id));
        if in_range != self.in_range {
            if let Some(index) = in_range {
                log::debug!("in range of {}", self.world.objects()[index].id);
            }
            self.in_range = in_range;
        }

        self.camera = CameraTransform::compute(
            self.position,
            input.view_mode,
            input.viewport,
            self.world.size(),
        );

        self.poll_timers(input.now);
        self.frame_state()
    }

    fn poll_timers(&mut self, now: f64) {
        if let Some(shop) = self.shop.as_mut() {
            match shop.poll(&mut self.ledger, now) {
                Some(Ok(receipt)) => {
                    self.status = Some(format!(
                        "Bought {} for {} gold",
                        receipt.entry.display_name, receipt.entry.price
                    ));
                }
                Some(Err(err)) => self.status = Some(err.to_string()),
                None => {}
            }
        }
        if self.dialogue.as_mut().is_some_and(|dialogue| dialogue.expired(now)) {
            self.dialogue = None;
        }
    }

    pub fn frame_state(&self) -> FrameState {
        FrameState {
            position: self.position,
            animation: self.avatar.animation(),
            animation_changed: self.animation_changed,
            frame: self.avatar.frame(),
            camera: self.camera,
            in_range: self.in_range_id().map(str::to_string),
            show_prompt: self.shows_prompt(),
            dialogue: self.dialogue().map(|d| d.line().to_string()),
        }
    }

    /// Act on whatever is in range
    pub fn interact(&mut self, now: f64) -> InteractOutcome {
        if self.shop.is_some() {
            return InteractOutcome::Busy;
        }
        let Some(object) = self.in_range.map(|index| &self.world.objects()[index]) else {
            return InteractOutcome::Nothing;
        };
        match object.kind {
            InteractableKind::Shop => match CommerceSession::open(object, self.purchase_delay_ms) {
                Some(session) => {
                    log::info!("opened {}", session.shop_name());
                    let id = session.shop_id().to_string();
                    self.dialogue = None;
                    self.status = None;
                    self.shop = Some(session);
                    InteractOutcome::OpenedShop(id)
                }
                None => InteractOutcome::Nothing,
            },
            InteractableKind::Sign => match Dialogue::show(object, now, self.dialogue_timeout_ms) {
                Some(dialogue) => {
                    let id = dialogue.source().to_string();
                    self.dialogue = Some(dialogue);
                    InteractOutcome::ShowingDialogue(id)
                }
                None => InteractOutcome::Nothing,
            },
        }
    }

    /// Returns false when no shop was open
    pub fn close_shop(&mut self) -> bool {
        match self.shop.take() {
            Some(shop) => {
                log::info!("closed {}", shop.shop_name());
                if shop.close() {
                    self.status = Some("Purchase cancelled".to_string());
                }
                true
            }
            None => false,
        }
    }

    pub fn purchase(&mut self, entry_id: &str, now: f64) -> Result<Ticket, PurchaseError> {
        let shop = self.shop.as_mut().ok_or(PurchaseError::NothingSelected)?;
        let result = shop.purchase(entry_id, &self.ledger, now);
        self.report(&result);
        result
    }

    /// Buy the `slot`th entry of the open shop's filtered list
    pub fn buy_visible(&mut self, slot: usize, now: f64) -> Result<Ticket, PurchaseError> {
        let entry_id = self
            .shop
            .as_ref()
            .ok_or(PurchaseError::NothingSelected)?
            .visible()
            .get(slot)
            .map(|entry| entry.id.clone())
            .ok_or_else(|| PurchaseError::UnknownEntry(format!("#{}", slot + 1)))?;
        self.purchase(&entry_id, now)
    }

    fn report(&mut self, result: &Result<Ticket, PurchaseError>) {
        self.status = match result {
            Ok(ticket) => Some(format!("Paying {} gold...", ticket.price)),
            Err(err) => {
                log::debug!("purchase rejected: {}", err);
                Some(err.to_string())
            }
        };
    }

    /// The "press E" prompt is hidden behind any open overlay and in map view
    pub fn shows_prompt(&self) -> bool {
        self.in_range.is_some()
            && self.shop.is_none()
            && self.dialogue.is_none()
            && self.view_mode == ViewMode::Action
    }

    /// The in-range object while its prompt is showing
    pub fn prompt_target(&self) -> Option<&Interactable> {
        if !self.shows_prompt() {
            return None;
        }
        self.in_range.map(|index| &self.world.objects()[index])
    }

    /// Cycle the open shop's category filter, `None` when no shop is open
    pub fn next_category(&mut self) -> Option<String> {
        let shop = self.shop.as_mut()?;
        let category = shop.next_category().to_string();
        log::debug!("{} showing {}", shop.shop_id(), category);
        Some(category)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn player_size(&self) -> f32 {
        self.movement.player_size
    }

    pub fn interaction_radius(&self) -> f32 {
        self.interaction_radius
    }

    pub fn animation(&self) -> AnimationState {
        self.avatar.animation()
    }

    pub fn frame(&self) -> usize {
        self.avatar.frame()
    }

    pub fn camera(&self) -> CameraTransform {
        self.camera
    }

    pub fn in_range_id(&self) -> Option<&str> {
        self.in_range
            .map(|index| self.world.objects()[index].id.as_str())
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn shop(&self) -> Option<&CommerceSession> {
        self.shop.as_ref()
    }

    /// Sign bubble on screen, only drawn in action view
    pub fn dialogue(&self) -> Option<&Dialogue> {
        match self.view_mode {
            ViewMode::Action => self.dialogue.as_ref(),
            ViewMode::Map => None,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

pub enum PixelBazaar {
    /// waiting on config and images
    Loading,
    Loaded(Stroll),
}

pub struct Stroll {
    bazaar: Bazaar,
    view_mode: ViewMode,
    joystick_radius: f32,
    sprites: HashMap<Direction, Vec<HtmlImageElement>>,
    floor: Option<Image>,
}

impl PixelBazaar {
    pub fn new() -> Self {
        PixelBazaar::Loading
    }

    async fn load_config() -> Result<BazaarConfig> {
        let config = match browser::fetch_json::<BazaarConfig>(CONFIG_PATH).await {
            Ok(config) => config,
            Err(err) => {
                log::warn!("using built-in world, {} unavailable: {:#}", CONFIG_PATH, err);
                BazaarConfig::default()
            }
        };
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", CONFIG_PATH))?;
        Ok(config)
    }

    async fn load_sprites(sprites: &CharacterSprites) -> Result<HashMap<Direction, Vec<HtmlImageElement>>> {
        let mut loaded = HashMap::new();
        for direction in Direction::ALL {
            let frames = try_join_all(sprites.frames(direction).iter().map(|url| engine::load_image(url)))
                .await
                .with_context(|| format!("Failed to load {} walking frames", direction.name()))?;
            loaded.insert(direction, frames);
        }
        Ok(loaded)
    }

    async fn load_floor(source: Option<&str>, world: Size) -> Result<Option<Image>> {
        let Some(source) = source else {
            return Ok(None);
        };
        let element = engine::load_image(source)
            .await
            .with_context(|| format!("Failed to load floor image from : {}", source))?;
        Ok(Some(Image::new(
            element,
            Rect::new(Point::new(0.0, 0.0), world),
        )))
    }
}

impl Default for PixelBazaar {
    fn default() -> Self {
        PixelBazaar::new()
    }
}

#[async_trait(?Send)]
impl Game for PixelBazaar {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            PixelBazaar::Loading => {
                let config = Self::load_config().await?;
                let (sprites, floor) = join!(
                    Self::load_sprites(&config.character_sprites),
                    Self::load_floor(config.floor_image.as_deref(), config.world_size()),
                );
                // art is optional, the world still plays with flat shapes
                let sprites = sprites.unwrap_or_else(|err| {
                    log::warn!("{:#}", err);
                    HashMap::new()
                });
                let floor = floor.unwrap_or_else(|err| {
                    log::warn!("{:#}", err);
                    None
                });
                let bazaar = Bazaar::new(&config);
                log::info!(
                    "bazaar ready with {} gold and {} places to visit",
                    bazaar.ledger().gold(),
                    bazaar.world().objects().len()
                );
                Ok(Box::new(PixelBazaar::Loaded(Stroll {
                    bazaar,
                    view_mode: ViewMode::default(),
                    joystick_radius: config.joystick_radius,
                    sprites,
                    floor,
                })))
            }
            PixelBazaar::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, frame: &Frame) {
        if let PixelBazaar::Loaded(stroll) = self {
            for action in &frame.actions {
                stroll.handle(*action, frame.now);
            }
            stroll.bazaar.tick(&TickInput {
                axis: frame.axis,
                view_mode: stroll.view_mode,
                viewport: frame.viewport,
                now: frame.now,
            });
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let PixelBazaar::Loaded(stroll) = self {
            renderer.reset_camera();
            renderer.clear(&Rect::new(Point::new(0.0, 0.0), renderer.viewport()));
            stroll.draw_world(renderer);
            renderer.reset_camera();
            stroll.draw_hud(renderer);
        }
    }

    fn joystick_radius(&self) -> f32 {
        match self {
            PixelBazaar::Loaded(stroll) => stroll.joystick_radius,
            PixelBazaar::Loading => engine::input::DEFAULT_JOYSTICK_RADIUS,
        }
    }
}

const FONT: &str = "16px monospace";
const SMALL_FONT: &str = "12px monospace";
const TEXT_COLOR: &str = "#f9fafb";
const PANEL_COLOR: &str = "rgba(17, 24, 39, 0.85)";

impl Stroll {
    fn handle(&mut self, action: Action, now: f64) {
        match action {
            Action::ToggleView => {
                self.view_mode = self.view_mode.toggle();
                log::debug!("view mode {:?}", self.view_mode);
            }
            Action::Interact => {
                let outcome = self.bazaar.interact(now);
                log::debug!("interact: {:?}", outcome);
            }
            Action::CloseShop => {
                self.bazaar.close_shop();
            }
            Action::NextCategory => {
                self.bazaar.next_category();
            }
            Action::Buy(slot) => {
                if self.bazaar.shop().is_some() {
                    // rejections surface in the status line
                    let _ = self.bazaar.buy_visible(slot, now);
                }
            }
        }
    }

    fn draw_world(&self, renderer: &Renderer) {
        let bazaar = &self.bazaar;
        let camera = bazaar.camera();
        renderer.set_camera(camera.translate_x, camera.translate_y, camera.scale);

        let world_rect = Rect::new(Point::new(0.0, 0.0), bazaar.world().size());
        match &self.floor {
            Some(floor) => floor.draw(renderer),
            None => renderer.fill_rect(&world_rect, "#1f2937"),
        }

        for object in bazaar.world().objects() {
            renderer.fill_rect(&object.bounds, &object.color);
            renderer.fill_text(
                &object.label,
                &Point::new(object.bounds.left(), object.bounds.top() - 8.0),
                SMALL_FONT,
                TEXT_COLOR,
            );
        }

        if let Some(object) = bazaar.prompt_target() {
            renderer.stroke_circle(&object.center(), bazaar.interaction_radius(), "#facc15");
        }

        let size = bazaar.player_size();
        let position = bazaar.position();
        let player_box = Rect::new(
            Point::new(position.x - size * 0.5, position.y - size * 0.5),
            Size::new(size, size),
        );
        let animation = bazaar.animation();
        match self
            .sprites
            .get(&animation.direction)
            .filter(|frames| !frames.is_empty())
        {
            Some(frames) => {
                let frame = if animation.is_moving {
                    bazaar.frame() % frames.len()
                } else {
                    0
                };
                renderer.draw_image(&frames[frame], &player_box);
            }
            None => renderer.fill_rect(&player_box, "#f59e0b"),
        }

        #[cfg(debug_assertions)]
        player_box.draw_debug(renderer);
    }

    fn draw_hud(&self, renderer: &Renderer) {
        let bazaar = &self.bazaar;
        let ledger = bazaar.ledger();
        renderer.fill_rect(
            &Rect::new(Point::new(10.0, 10.0), Size::new(260.0, 110.0)),
            PANEL_COLOR,
        );
        renderer.fill_text(
            &format!("Gold: {}", ledger.gold()),
            &Point::new(20.0, 32.0),
            FONT,
            "#fde047",
        );
        renderer.fill_text(
            &format!("Items: {}", ledger.inventory().len()),
            &Point::new(20.0, 52.0),
            FONT,
            TEXT_COLOR,
        );
        for (row, entry) in ledger.recent(3).iter().rev().enumerate() {
            renderer.fill_text(
                &entry.display_name,
                &Point::new(20.0, 72.0 + row as f32 * 16.0),
                SMALL_FONT,
                "#d1d5db",
            );
        }

        // prompt text stays screen sized, anchored under the object
        if let Some(object) = bazaar.prompt_target() {
            let anchor = bazaar
                .camera()
                .world_to_screen(Point::new(object.bounds.left(), object.bounds.bottom()));
            let verb = match object.kind {
                InteractableKind::Shop => "shop",
                InteractableKind::Sign => "look",
            };
            renderer.fill_text(
                &format!("[E] {} {}", verb, object.label),
                &Point::new(anchor.x, anchor.y + 20.0),
                FONT,
                "#facc15",
            );
        }

        let viewport = renderer.viewport();
        if let Some(shop) = bazaar.shop() {
            let panel = Rect::new(
                Point::new(viewport.width - 340.0, 10.0),
                Size::new(330.0, 60.0 + shop.visible().len().min(9) as f32 * 20.0 + 40.0),
            );
            renderer.fill_rect(&panel, PANEL_COLOR);
            renderer.fill_text(
                shop.shop_name(),
                &Point::new(panel.left() + 10.0, panel.top() + 24.0),
                FONT,
                TEXT_COLOR,
            );
            renderer.fill_text(
                &format!("Category: {}", shop.category()),
                &Point::new(panel.left() + 10.0, panel.top() + 44.0),
                SMALL_FONT,
                "#9ca3af",
            );
            let selected = shop.selected().map(|entry| entry.id.as_str());
            for (slot, entry) in shop.visible().iter().take(9).enumerate() {
                let color = if Some(entry.id.as_str()) == selected {
                    "#facc15"
                } else if ledger.can_afford(entry) {
                    TEXT_COLOR
                } else {
                    "#6b7280"
                };
                renderer.fill_text(
                    &format!("{} {} - {}g", slot + 1, entry.display_name, entry.price),
                    &Point::new(panel.left() + 10.0, panel.top() + 68.0 + slot as f32 * 20.0),
                    SMALL_FONT,
                    color,
                );
            }
            let footer = if shop.is_processing() {
                "Processing payment..."
            } else {
                "[1-9] buy  [Tab] category  [Esc] leave"
            };
            renderer.fill_text(
                footer,
                &Point::new(panel.left() + 10.0, panel.bottom() - 12.0),
                SMALL_FONT,
                "#9ca3af",
            );
        }

        if let Some(status) = bazaar.status() {
            renderer.fill_text(
                status,
                &Point::new(20.0, viewport.height - 20.0),
                FONT,
                TEXT_COLOR,
            );
        }

        if let Some(dialogue) = bazaar.dialogue() {
            let bubble = Rect::new(
                Point::new(viewport.width * 0.5 - 200.0, viewport.height - 110.0),
                Size::new(400.0, 50.0),
            );
            renderer.fill_rect(&bubble, PANEL_COLOR);
            renderer.fill_text(
                dialogue.line(),
                &Point::new(bubble.left() + 12.0, bubble.top() + 30.0),
                FONT,
                TEXT_COLOR,
            );
        }

        if self.view_mode == ViewMode::Map {
            renderer.fill_text(
                "MAP  [M] back",
                &Point::new(viewport.width * 0.5 - 50.0, 30.0),
                FONT,
                TEXT_COLOR,
            );
        }
    }
}
