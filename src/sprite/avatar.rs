use crate::engine::input::AxisVector;
use crate::sprite::state::{AvatarContext, AvatarState};
use crate::sprite::{derive_direction, AnimationState, Direction, Idle, SpriteState, Walking};

/// ┌──────────────── State Transition Flow ──────────────────┐
/// │  From State  →  Event        →  To State                │
/// ├─────────────────────────────────────────────────────────┤
/// │  Idle        →  Walk(dir)    →  Walking                 │
/// │  Walking     →  Walk(dir)    →  Walking (turned)        │
/// │  Walking     →  Stop         →  Idle (frame 0)          │
/// │  Walking     →  Update(dt)   →  Walking (frame cycled)  │
/// └─────────────────────────────────────────────────────────┘
#[derive(Debug, Copy, Clone)]
pub enum Event {
    Walk(Direction),
    Stop,
    Update(f64),
}

#[derive(Debug, Copy, Clone)]
enum AvatarStateMachine {
    Idle(AvatarState<Idle>),
    Walking(AvatarState<Walking>),
}

impl From<AvatarState<Idle>> for AvatarStateMachine {
    fn from(state: AvatarState<Idle>) -> Self {
        AvatarStateMachine::Idle(state)
    }
}

impl From<AvatarState<Walking>> for AvatarStateMachine {
    fn from(state: AvatarState<Walking>) -> Self {
        AvatarStateMachine::Walking(state)
    }
}

impl AvatarStateMachine {
    // consumes self: the old state is gone once the new one exists
    fn transition(self, event: Event, interval_ms: f64, frame_count: usize) -> Self {
        use AvatarStateMachine::*;
        match (self, event) {
            (Idle(state), Event::Walk(direction)) => state.walk(direction).into(),
            (Walking(state), Event::Walk(direction)) => state.turn(direction).into(),
            (Walking(state), Event::Stop) => state.stop().into(),
            (Walking(state), Event::Update(delta_ms)) => {
                state.update(delta_ms, interval_ms, frame_count).into()
            }
            // Idle ignores Stop and Update
            _ => self,
        }
    }

    fn context(&self) -> &AvatarContext {
        match self {
            AvatarStateMachine::Idle(state) => state.context(),
            AvatarStateMachine::Walking(state) => state.context(),
        }
    }

    fn is_moving(&self) -> bool {
        match self {
            AvatarStateMachine::Idle(_) => Idle::is_moving(),
            AvatarStateMachine::Walking(_) => Walking::is_moving(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AvatarStateMachine::Idle(_) => Idle::name(),
            AvatarStateMachine::Walking(_) => Walking::name(),
        }
    }
}

/// The player's animation: derives facing and the moving flag from the axis
/// every tick, cycles walking frames on a wall clock interval, and only
/// reports the animation state when it changed.
#[derive(Debug, Clone)]
pub struct Avatar {
    state: AvatarStateMachine,
    published: AnimationState,
    interval_ms: f64,
    frame_count: usize,
}

impl Avatar {
    pub fn new(direction: Direction, interval_ms: f64, frame_count: usize) -> Self {
        Avatar {
            state: AvatarState::new(direction).into(),
            published: AnimationState {
                direction,
                is_moving: false,
            },
            interval_ms,
            frame_count,
        }
    }

    /// Run one tick. Returns the new animation state only if it differs
    /// from the last one returned.
    pub fn update(&mut self, axis: AxisVector, delta_ms: f64) -> Option<AnimationState> {
        let previous = self.state.context().direction;
        let event = if axis.is_zero() {
            Event::Stop
        } else {
            Event::Walk(derive_direction(axis, previous))
        };
        let before = self.state.name();
        self.state = self
            .state
            .transition(event, self.interval_ms, self.frame_count)
            .transition(Event::Update(delta_ms), self.interval_ms, self.frame_count);
        if before != self.state.name() {
            log::trace!("avatar {} -> {}", before, self.state.name());
        }

        let current = self.animation();
        if current != self.published {
            self.published = current;
            Some(current)
        } else {
            None
        }
    }

    pub fn animation(&self) -> AnimationState {
        AnimationState {
            direction: self.state.context().direction,
            is_moving: self.state.is_moving(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.state.context().direction
    }

    pub fn is_moving(&self) -> bool {
        self.state.is_moving()
    }

    pub fn frame(&self) -> usize {
        self.state.context().frame
    }
}
