pub mod input;

use crate::browser;
use anyhow::{anyhow, Error, Result};
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use serde::{Deserialize, Serialize};
// wasm is single threaded, so Rc RefCell over Arc Mutex
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref casts the closure to the js Function the DOM expects
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use self::input::{Action, AxisVector, InputState};

/// Everything a game sees during one fixed update step
#[derive(Debug, Clone)]
pub struct Frame {
    /// Axis vector sampled once for this step
    pub axis: AxisVector,
    /// Discrete actions queued since the previous step
    pub actions: Vec<Action>,
    /// Current canvas size
    pub viewport: Size,
    /// Simulation clock in milliseconds, advances by FRAME_SIZE per step
    pub now: f64,
}

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    fn update(&mut self, frame: &Frame);
    fn draw(&self, renderer: &Renderer);

    fn joystick_radius(&self) -> f32 {
        input::DEFAULT_JOYSTICK_RADIUS
    }
}

// length of a frame in milliseconds
pub const FRAME_SIZE: f32 = 1.0 / 60.0 * 1000.0;
// a hidden tab can hand us seconds of delta at once, cap what we catch up on
const MAX_FRAME_DELTA: f32 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

/// Teardown handle for a running GameLoop
///
/// Stopping breaks the request_animation_frame chain: the pending frame is
/// cancelled and the loop closure is released, so no further ticks happen.
#[derive(Clone)]
pub struct LoopHandle {
    state: Rc<Cell<LoopState>>,
    pending_frame: Rc<Cell<Option<i32>>>,
    closure: SharedLoopClosure,
}

impl LoopHandle {
    fn new() -> Self {
        LoopHandle {
            state: Rc::new(Cell::new(LoopState::Running)),
            pending_frame: Rc::new(Cell::new(None)),
            closure: Rc::new(RefCell::new(None)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.get() == LoopState::Running
    }

    pub fn stop(&self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        self.state.set(LoopState::Stopped);
        if let Some(frame_id) = self.pending_frame.take() {
            browser::cancel_animation_frame(frame_id)?;
        }
        // must not run from inside the closure itself, stop() is only
        // reachable from DOM callbacks
        self.closure.borrow_mut().take();
        log::info!("game loop stopped");
        Ok(())
    }
}

pub struct GameLoop {
    last_frame: f64,
    accumulated_delta: f32,
    clock: f64,
}

impl GameLoop {
    pub async fn start(game: impl Game + 'static) -> Result<LoopHandle> {
        let mut game = game.initialize().await?;
        let input = input::listen(game.joystick_radius())?;
        let mut game_loop = GameLoop::new(browser::now()?);
        let renderer = Renderer::new()?;
        let handle = LoopHandle::new();

        let f = handle.closure.clone();
        let state = handle.state.clone();
        let pending_frame = handle.pending_frame.clone();
        *handle.closure.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            pending_frame.set(None);
            if state.get() == LoopState::Stopped {
                return;
            }
            if let Err(err) = renderer.fit_to_window() {
                log::warn!("could not resize canvas: {:#}", err);
            }
            game_loop.tick(perf, &input, renderer.viewport(), game.as_mut());
            game.draw(&renderer);

            if let Some(closure) = f.borrow().as_ref() {
                match browser::request_animation_frame(closure) {
                    Ok(frame_id) => pending_frame.set(Some(frame_id)),
                    Err(err) => log::error!("game loop halted: {:#}", err),
                }
            }
        }));

        let frame_id = browser::request_animation_frame(
            handle
                .closure
                .borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;
        handle.pending_frame.set(Some(frame_id));
        log::info!("game loop running");

        Ok(handle)
    }

    fn new(started_at: f64) -> Self {
        GameLoop {
            last_frame: started_at,
            accumulated_delta: 0.0,
            clock: 0.0,
        }
    }

    /// Run as many fixed steps as the time since the last frame covers
    fn tick(
        &mut self,
        perf: f64,
        input: &RefCell<InputState>,
        viewport: Size,
        game: &mut dyn Game,
    ) {
        let delta = ((perf - self.last_frame) as f32).min(MAX_FRAME_DELTA);
        self.accumulated_delta += delta;
        self.last_frame = perf;
        while self.accumulated_delta > FRAME_SIZE {
            self.clock += f64::from(FRAME_SIZE);
            // one read of the shared input per step, actions drain on the
            // first step that sees them
            let (axis, actions) = {
                let mut input = input.borrow_mut();
                (input.axis(), input.take_actions())
            };
            game.update(&Frame {
                axis,
                actions,
                viewport,
                now: self.clock,
            });
            self.accumulated_delta -= FRAME_SIZE;
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Size { width, height }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub fn left(&self) -> f32 {
        self.position.x
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.size.width
    }

    pub fn top(&self) -> f32 {
        self.position.y
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.size.height
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.position.x + self.size.width * 0.5,
            y: self.position.y + self.size.height * 0.5,
        }
    }

    /// Grow by `margin` on every side
    pub fn expand(&self, margin: f32) -> Rect {
        Rect {
            position: Point::new(self.position.x - margin, self.position.y - margin),
            size: Size::new(
                self.size.width + margin * 2.0,
                self.size.height + margin * 2.0,
            ),
        }
    }

    /// Strict containment, a point on the edge is outside
    pub fn contains(&self, point: &Point) -> bool {
        point.x > self.left()
            && point.x < self.right()
            && point.y > self.top()
            && point.y < self.bottom()
    }
}

/// A single-shot effect that fires once the loop clock reaches `due_at`.
///
/// Cancelling (or dropping) the task guarantees the payload is never
/// delivered by `poll`.
#[derive(Debug)]
pub struct DelayedTask<T> {
    payload: Option<T>,
    due_at: f64,
}

impl<T> DelayedTask<T> {
    pub fn schedule(payload: T, now: f64, delay_ms: f64) -> Self {
        DelayedTask {
            payload: Some(payload),
            due_at: now + delay_ms,
        }
    }

    pub fn due_at(&self) -> f64 {
        self.due_at
    }

    pub fn is_pending(&self) -> bool {
        self.payload.is_some()
    }

    /// Hands out the payload exactly once, on the first poll at or after due_at
    pub fn poll(&mut self, now: f64) -> Option<T> {
        if now >= self.due_at {
            self.payload.take()
        } else {
            None
        }
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.payload.take()
    }
}

pub struct Renderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        Ok(Renderer {
            canvas: browser::canvas()?,
            context: browser::context()?,
        })
    }

    pub fn viewport(&self) -> Size {
        Size::new(self.canvas.width() as f32, self.canvas.height() as f32)
    }

    /// Match the canvas backing store to the window so the camera sees the
    /// real viewport every tick
    pub fn fit_to_window(&self) -> Result<()> {
        let (width, height) = browser::window_size()?;
        let (width, height) = (width as u32, height as u32);
        if self.canvas.width() != width || self.canvas.height() != height {
            self.canvas.set_width(width);
            self.canvas.set_height(height);
        }
        Ok(())
    }

    pub fn clear(&self, rect: &Rect) {
        self.context.clear_rect(
            rect.position.x.into(),
            rect.position.y.into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    /// Every draw call after this is in world space
    pub fn set_camera(&self, translate_x: f32, translate_y: f32, scale: f32) {
        if let Err(err) = self.context.set_transform(
            scale.into(),
            0.0,
            0.0,
            scale.into(),
            translate_x.into(),
            translate_y.into(),
        ) {
            log::warn!("set_transform failed: {:#?}", err);
        }
    }

    /// Back to screen space for the HUD
    pub fn reset_camera(&self) {
        self.set_camera(0.0, 0.0, 1.0);
    }

    pub fn fill_rect(&self, rect: &Rect, color: &str) {
        self.context.set_fill_style_str(color);
        self.context.fill_rect(
            rect.position.x.into(),
            rect.position.y.into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    pub fn stroke_rect(&self, rect: &Rect, color: &str) {
        self.context.set_stroke_style_str(color);
        self.context.stroke_rect(
            rect.position.x.into(),
            rect.position.y.into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    pub fn stroke_circle(&self, center: &Point, radius: f32, color: &str) {
        self.context.set_stroke_style_str(color);
        self.context.begin_path();
        if let Err(err) = self.context.arc(
            center.x.into(),
            center.y.into(),
            radius.into(),
            0.0,
            std::f64::consts::TAU,
        ) {
            log::warn!("arc failed: {:#?}", err);
            return;
        }
        self.context.stroke();
    }

    pub fn fill_text(&self, text: &str, position: &Point, font: &str, color: &str) {
        self.context.set_font(font);
        self.context.set_fill_style_str(color);
        if let Err(err) = self
            .context
            .fill_text(text, position.x.into(), position.y.into())
        {
            log::warn!("fill_text failed: {:#?}", err);
        }
    }

    pub fn draw_image(&self, image: &HtmlImageElement, destination: &Rect) {
        self.context
            .draw_image_with_html_image_element_and_dw_and_dh(
                image,
                destination.position.x.into(),
                destination.position.y.into(),
                destination.size.width.into(),
                destination.size.height.into(),
            )
            .expect("Drawing is throwing exceptions! Unrecoverable error");
    }
}

/// A loaded image pinned to a world rectangle
pub struct Image {
    element: HtmlImageElement,
    bounding_box: Rect,
}

impl Image {
    pub fn new(element: HtmlImageElement, bounding_box: Rect) -> Self {
        Image {
            element,
            bounding_box,
        }
    }

    pub fn draw(&self, renderer: &Renderer) {
        renderer.draw_image(&self.element, &self.bounding_box);
    }
}

pub trait DebugDraw {
    fn draw_debug(&self, renderer: &Renderer);
}

impl DebugDraw for Rect {
    fn draw_debug(&self, renderer: &Renderer) {
        renderer.stroke_rect(self, "#ff0000");
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::create_html_image_element()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let source_name = source.to_string();
    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[engine.rs::load_image] Error loading image {}: {:#?}",
                source_name,
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // Result<Result<(), Error>, oneshot::Canceled>
    // - outer ? : channel dropped
    // - inner ? : image load failure
    rx.await??;

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rect_contains_is_strict() {
        let rect = Rect::new(Point::new(10.0, 10.0), Size::new(20.0, 20.0));
        assert!(rect.contains(&Point::new(15.0, 15.0)));
        assert!(!rect.contains(&Point::new(10.0, 15.0)));
        assert!(!rect.contains(&Point::new(30.0, 15.0)));
        assert!(!rect.contains(&Point::new(15.0, 30.0)));
    }

    #[test]
    fn rect_expand_grows_each_side() {
        let rect = Rect::new(Point::new(10.0, 10.0), Size::new(20.0, 20.0)).expand(5.0);
        assert_relative_eq!(rect.left(), 5.0);
        assert_relative_eq!(rect.top(), 5.0);
        assert_relative_eq!(rect.right(), 35.0);
        assert_relative_eq!(rect.bottom(), 35.0);
    }

    #[test]
    fn rect_center() {
        let rect = Rect::new(Point::new(600.0, 450.0), Size::new(80.0, 80.0));
        assert_eq!(rect.center(), Point::new(640.0, 490.0));
    }

    #[test]
    fn delayed_task_fires_once_when_due() {
        let mut task = DelayedTask::schedule("done", 100.0, 50.0);
        assert_eq!(task.poll(120.0), None);
        assert!(task.is_pending());
        assert_eq!(task.poll(150.0), Some("done"));
        assert_eq!(task.poll(200.0), None);
        assert!(!task.is_pending());
    }

    #[test]
    fn cancelled_task_never_fires() {
        let mut task = DelayedTask::schedule(7, 0.0, 10.0);
        assert_eq!(task.cancel(), Some(7));
        assert_eq!(task.poll(1_000.0), None);
    }

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Frame>,
    }

    #[async_trait(?Send)]
    impl Game for Recorder {
        async fn initialize(&self) -> Result<Box<dyn Game>> {
            Err(anyhow!("Recorder is never initialized"))
        }

        fn update(&mut self, frame: &Frame) {
            self.frames.push(frame.clone());
        }

        fn draw(&self, _renderer: &Renderer) {}
    }

    const VIEWPORT: Size = Size::new(800.0, 600.0);

    fn shared_input() -> RefCell<InputState> {
        RefCell::new(InputState::new(input::DEFAULT_JOYSTICK_RADIUS))
    }

    #[test]
    fn tick_runs_one_step_per_frame_size() {
        let mut game_loop = GameLoop::new(1_000.0);
        let mut game = Recorder::default();
        let input = shared_input();

        game_loop.tick(1_040.0, &input, VIEWPORT, &mut game);
        assert_eq!(game.frames.len(), 2);
        assert_relative_eq!(game.frames[0].now, f64::from(FRAME_SIZE));
        assert_relative_eq!(game.frames[1].now, f64::from(FRAME_SIZE) * 2.0);
        assert_eq!(game.frames[1].viewport, VIEWPORT);

        // about 6.7 ms carried over, 12 more makes one more step
        game_loop.tick(1_052.0, &input, VIEWPORT, &mut game);
        assert_eq!(game.frames.len(), 3);
        assert_relative_eq!(game.frames[2].now, f64::from(FRAME_SIZE) * 3.0);
    }

    #[test]
    fn tick_without_elapsed_time_does_nothing() {
        let mut game_loop = GameLoop::new(500.0);
        let mut game = Recorder::default();
        game_loop.tick(500.0, &shared_input(), VIEWPORT, &mut game);
        game_loop.tick(505.0, &shared_input(), VIEWPORT, &mut game);
        assert!(game.frames.is_empty());
    }

    #[test]
    fn long_pause_catches_up_at_most_a_quarter_second() {
        let mut game_loop = GameLoop::new(0.0);
        let mut game = Recorder::default();
        game_loop.tick(10_000.0, &shared_input(), VIEWPORT, &mut game);
        assert!((14..=15).contains(&game.frames.len()));
        let last = game.frames.last().unwrap().now;
        assert!(last <= f64::from(MAX_FRAME_DELTA));
    }

    #[test]
    fn each_step_reads_input_once_and_drains_actions() {
        let mut game_loop = GameLoop::new(0.0);
        let mut game = Recorder::default();
        let input = shared_input();
        {
            let mut state = input.borrow_mut();
            state.key_down("ArrowRight", false);
            state.key_down("KeyM", false);
        }
        game_loop.tick(40.0, &input, VIEWPORT, &mut game);
        assert_eq!(game.frames.len(), 2);
        assert_eq!(game.frames[0].actions, vec![Action::ToggleView]);
        assert!(game.frames[1].actions.is_empty());
        assert!(game.frames.iter().all(|frame| frame.axis == AxisVector::new(1.0, 0.0)));
    }

    #[test]
    fn stopping_is_final_and_idempotent() {
        let handle = LoopHandle::new();
        assert!(handle.is_running());
        handle.stop().unwrap();
        assert_eq!(handle.state.get(), LoopState::Stopped);
        assert!(handle.closure.borrow().is_none());
        assert!(handle.pending_frame.get().is_none());
        handle.stop().unwrap();
        assert!(!handle.is_running());
    }
}
