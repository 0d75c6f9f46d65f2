//! Avatar typestates. Transitions are only reachable through the methods
//! below, so an Idle avatar can never carry a non-zero frame and a Walking
//! avatar always has a frame inside its sequence.
use super::{Direction, Idle, Walking};

#[derive(Debug, Copy, Clone, PartialEq)]
/// Shared data for :
/// - facing : direction
/// - display : frame index + time spent on it
pub struct AvatarContext {
    pub direction: Direction,
    pub frame: usize,
    pub elapsed_ms: f64,
}

#[derive(Debug, Copy, Clone)]
pub struct AvatarState<S> {
    context: AvatarContext,
    // phantom marker, only used to pick the impl block
    _state: S,
}

impl<S> AvatarState<S> {
    pub fn context(&self) -> &AvatarContext {
        &self.context
    }
}

impl AvatarState<Idle> {
    pub fn new(direction: Direction) -> Self {
        AvatarState {
            context: AvatarContext {
                direction,
                frame: 0,
                elapsed_ms: 0.0,
            },
            _state: Idle,
        }
    }

    pub fn walk(self, direction: Direction) -> AvatarState<Walking> {
        AvatarState {
            context: self.context.on_state_transition().facing(direction),
            _state: Walking,
        }
    }
}

impl AvatarState<Walking> {
    /// Advance the frame cycle by `delta_ms` of wall clock time
    pub fn update(mut self, delta_ms: f64, interval_ms: f64, frame_count: usize) -> Self {
        self.context = self.context.advance(delta_ms, interval_ms, frame_count);
        self
    }

    /// Turning mid-walk keeps the cycle going
    pub fn turn(mut self, direction: Direction) -> Self {
        self.context = self.context.facing(direction);
        self
    }

    pub fn stop(self) -> AvatarState<Idle> {
        AvatarState {
            context: self.context.on_state_transition(),
            _state: Idle,
        }
    }
}

impl AvatarContext {
    fn advance(mut self, delta_ms: f64, interval_ms: f64, frame_count: usize) -> Self {
        if frame_count == 0 || interval_ms <= 0.0 {
            self.frame = 0;
            return self;
        }
        self.elapsed_ms += delta_ms;
        while self.elapsed_ms >= interval_ms {
            self.elapsed_ms -= interval_ms;
            self.frame = (self.frame + 1) % frame_count;
        }
        self
    }

    /// frame 0 and a fresh interval on every state change
    fn on_state_transition(mut self) -> Self {
        self.frame = 0;
        self.elapsed_ms = 0.0;
        self
    }

    fn facing(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}
