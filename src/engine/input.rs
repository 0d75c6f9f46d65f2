//! Device events normalised into one axis vector plus a queue of discrete
//! actions.
//!
//! Keyboard and pointer handlers write into a shared `InputState` from DOM
//! callbacks; the game loop reads it once per update step. Both run on the
//! browser's single thread, so a plain `Rc<RefCell<_>>` is enough.
use super::Point;
use crate::browser;
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{KeyboardEvent, PointerEvent};

pub const DEFAULT_JOYSTICK_RADIUS: f32 = 40.0;

/// Movement intent, each component in [-1, 1]
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct AxisVector {
    pub dx: f32,
    pub dy: f32,
}

impl AxisVector {
    pub const ZERO: AxisVector = AxisVector { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f32, dy: f32) -> Self {
        AxisVector {
            dx: dx.clamp(-1.0, 1.0),
            dy: dy.clamp(-1.0, 1.0),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// One-shot commands, queued in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Interact,
    ToggleView,
    CloseShop,
    /// Cycle the open shop's category filter
    NextCategory,
    /// Buy the nth visible entry of the open shop
    Buy(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

fn direction_key(code: &str) -> Option<(Axis, f32)> {
    match code {
        "ArrowUp" | "KeyW" => Some((Axis::Vertical, -1.0)),
        "ArrowDown" | "KeyS" => Some((Axis::Vertical, 1.0)),
        "ArrowLeft" | "KeyA" => Some((Axis::Horizontal, -1.0)),
        "ArrowRight" | "KeyD" => Some((Axis::Horizontal, 1.0)),
        _ => None,
    }
}

fn action_key(code: &str) -> Option<Action> {
    match code {
        "KeyE" | "Enter" | "Space" => Some(Action::Interact),
        "KeyM" => Some(Action::ToggleView),
        "Escape" => Some(Action::CloseShop),
        "Tab" | "KeyC" => Some(Action::NextCategory),
        _ => code
            .strip_prefix("Digit")
            .and_then(|digit| digit.parse::<usize>().ok())
            .filter(|digit| *digit > 0)
            .map(|digit| Action::Buy(digit - 1)),
    }
}

/// Keyboard producer, each axis written independently
#[derive(Debug, Default)]
pub struct KeyboardAxis {
    axis: AxisVector,
}

impl KeyboardAxis {
    /// Returns true if `code` is a movement key
    pub fn key_down(&mut self, code: &str) -> bool {
        match direction_key(code) {
            Some((Axis::Horizontal, sign)) => self.axis.dx = sign,
            Some((Axis::Vertical, sign)) => self.axis.dy = sign,
            None => return false,
        }
        true
    }

    /// Releasing a key only clears its own axis, a held key on the other
    /// axis keeps steering
    pub fn key_up(&mut self, code: &str) -> bool {
        match direction_key(code) {
            Some((Axis::Horizontal, _)) => self.axis.dx = 0.0,
            Some((Axis::Vertical, _)) => self.axis.dy = 0.0,
            None => return false,
        }
        true
    }

    pub fn axis(&self) -> AxisVector {
        self.axis
    }
}

/// Pointer/touch producer: a floating stick anchored where the drag began
#[derive(Debug)]
pub struct Joystick {
    radius: f32,
    origin: Option<Point>,
    contact: Option<i32>,
    axis: AxisVector,
}

impl Joystick {
    pub fn new(radius: f32) -> Self {
        Joystick {
            radius,
            origin: None,
            contact: None,
            axis: AxisVector::ZERO,
        }
    }

    pub fn is_active(&self) -> bool {
        self.contact.is_some()
    }

    pub fn axis(&self) -> AxisVector {
        self.axis
    }

    /// Returns false when another contact already owns the stick
    pub fn start(&mut self, contact: i32, at: Point) -> bool {
        if self.contact.is_some() {
            return false;
        }
        self.contact = Some(contact);
        self.origin = Some(at);
        self.axis = AxisVector::ZERO;
        true
    }

    pub fn drag(&mut self, contact: i32, to: Point) -> bool {
        let origin = match (self.contact, self.origin) {
            (Some(owner), Some(origin)) if owner == contact => origin,
            _ => return false,
        };
        let mut dx = to.x - origin.x;
        let mut dy = to.y - origin.y;
        let distance = dx.hypot(dy);
        if distance > self.radius {
            let ratio = self.radius / distance;
            dx *= ratio;
            dy *= ratio;
        }
        self.axis = AxisVector::new(dx / self.radius, dy / self.radius);
        true
    }

    pub fn end(&mut self, contact: i32) -> bool {
        if self.contact != Some(contact) {
            return false;
        }
        self.contact = None;
        self.origin = None;
        self.axis = AxisVector::ZERO;
        true
    }
}

impl Default for Joystick {
    fn default() -> Self {
        Joystick::new(DEFAULT_JOYSTICK_RADIUS)
    }
}

/// Shared input cell read by the loop
#[derive(Debug, Default)]
pub struct InputState {
    keyboard: KeyboardAxis,
    joystick: Joystick,
    actions: Vec<Action>,
}

impl InputState {
    pub fn new(joystick_radius: f32) -> Self {
        InputState {
            keyboard: KeyboardAxis::default(),
            joystick: Joystick::new(joystick_radius),
            actions: Vec::new(),
        }
    }

    /// Returns true if the key was consumed
    pub fn key_down(&mut self, code: &str, repeat: bool) -> bool {
        if self.keyboard.key_down(code) {
            return true;
        }
        match action_key(code) {
            Some(action) => {
                if !repeat {
                    self.actions.push(action);
                }
                true
            }
            None => false,
        }
    }

    pub fn key_up(&mut self, code: &str) -> bool {
        self.keyboard.key_up(code)
    }

    pub fn pointer_down(&mut self, contact: i32, at: Point) -> bool {
        self.joystick.start(contact, at)
    }

    pub fn pointer_move(&mut self, contact: i32, to: Point) -> bool {
        self.joystick.drag(contact, to)
    }

    pub fn pointer_up(&mut self, contact: i32) -> bool {
        self.joystick.end(contact)
    }

    /// The joystick wins while it holds a contact, the keyboard otherwise
    pub fn axis(&self) -> AxisVector {
        if self.joystick.is_active() {
            self.joystick.axis()
        } else {
            self.keyboard.axis()
        }
    }

    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }
}

fn client_point(event: &PointerEvent) -> Point {
    Point::new(event.client_x() as f32, event.client_y() as f32)
}

fn add_listener<E>(
    target: &web_sys::EventTarget,
    event_name: &str,
    handler: impl FnMut(E) + 'static,
) -> Result<()>
where
    E: JsCast + 'static,
    E: wasm_bindgen::convert::FromWasmAbi,
{
    let closure = browser::closure_wrap(Box::new(handler) as Box<dyn FnMut(E)>);
    target
        .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Could not listen to '{}' : {:#?}", event_name, err))?;
    // listeners live for the whole page
    closure.forget();
    Ok(())
}

/// Wire keyboard and pointer events into a fresh shared InputState
pub fn listen(joystick_radius: f32) -> Result<Rc<RefCell<InputState>>> {
    let state = Rc::new(RefCell::new(InputState::new(joystick_radius)));
    let window: web_sys::EventTarget = browser::window()?.into();
    let canvas: web_sys::EventTarget = browser::canvas()?.into();

    let keydown_state = state.clone();
    add_listener(&window, "keydown", move |event: KeyboardEvent| {
        if keydown_state
            .borrow_mut()
            .key_down(&event.code(), event.repeat())
        {
            event.prevent_default();
        }
    })?;

    let keyup_state = state.clone();
    add_listener(&window, "keyup", move |event: KeyboardEvent| {
        keyup_state.borrow_mut().key_up(&event.code());
    })?;

    let down_state = state.clone();
    add_listener(&canvas, "pointerdown", move |event: PointerEvent| {
        if down_state
            .borrow_mut()
            .pointer_down(event.pointer_id(), client_point(&event))
        {
            event.prevent_default();
        }
    })?;

    let move_state = state.clone();
    add_listener(&window, "pointermove", move |event: PointerEvent| {
        move_state
            .borrow_mut()
            .pointer_move(event.pointer_id(), client_point(&event));
    })?;

    for release in ["pointerup", "pointercancel"] {
        let up_state = state.clone();
        add_listener(&window, release, move |event: PointerEvent| {
            up_state.borrow_mut().pointer_up(event.pointer_id());
        })?;
    }

    log::debug!("input listeners attached");
    Ok(state)
}
