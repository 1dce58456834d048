//! Tick loop and run controller
//!
//! `tick` advances one frame of simulation; `RunController` owns the
//! canonical state, the checkpoint ring, and the continue budget, and drives
//! the idle/starting/playing/paused/gameOver state machine.
//!
//! Every subsystem call inside the tick is a failure-isolation boundary: a
//! subsystem fault is logged and degraded to a safe state; it never
//! propagates out of the loop.

use super::checkpoint::{self, CheckpointManager, GameStateSnapshot};
use super::state::{GameEvent, GamePhase, GameState};
use super::{collision, effects, events, generator, physics};
use crate::consts::*;
use crate::persistence::{CheckpointStore, SessionKey};

/// Input commands for a single tick. An impulse is a discrete trigger - it
/// overwrites vertical velocity, it never queues.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub impulse: bool,
    pub pause: bool,
    pub resume: bool,
}

/// What a tick decided; the controller turns `terminal` into the game-over
/// transition after capturing the final snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    pub terminal: bool,
}

/// Advance the game state by one frame. Runs in every phase so the frozen
/// game-over frame keeps rendering; taps are ignored outside `Playing`.
pub fn tick(state: &mut GameState, input: &TickInput, raw_dt: f32) -> TickReport {
    let dt = physics::clamp_frame_delta(raw_dt);

    match state.phase {
        GamePhase::Idle | GamePhase::GameOver => return TickReport::default(),
        GamePhase::Paused => {
            if input.resume {
                state.phase = GamePhase::Playing;
                state.push_cue(GameEvent::Resumed);
            }
            return TickReport::default();
        }
        GamePhase::Starting => {
            state.time_secs += dt as f64;
            state.countdown -= dt as f64;
            if state.countdown <= 0.0 {
                state.countdown = 0.0;
                state.phase = GamePhase::Playing;
                state.grace_until = state.time_secs + GRACE_PERIOD;
            }
            return TickReport::default();
        }
        GamePhase::Playing => {}
    }

    // Pause halts deterministically before any mutation: no partial tick is
    // ever left applied-but-unscored
    if input.pause {
        state.phase = GamePhase::Paused;
        state.push_cue(GameEvent::Paused);
        return TickReport::default();
    }

    state.time_secs += dt as f64;
    state.prev_ball_x = state.ball.pos.x;
    state.prev_ball_y = state.ball.pos.y;

    events::update(state);

    let world_dt = dt * state.effects.time_scale(state.time_secs);
    effects::update(state, world_dt);

    if input.impulse {
        physics::apply_impulse(&mut state.ball);
        state.push_cue(GameEvent::Impulse);
    }

    if let Err(e) = physics::update(state, world_dt) {
        log::error!("physics fault: {e}; repositioning ball");
        state.ball.recenter(state.camera_offset);
        state.prev_ball_x = state.ball.pos.x;
        state.prev_ball_y = state.ball.pos.y;
    }

    if let Err(e) = generator::update(state) {
        log::error!("generator fault: {e}; regenerating");
        generator::reset_after_fault(state);
    }

    let report = match collision::resolve(state) {
        Ok(resolution) => TickReport {
            terminal: resolution.terminal,
        },
        Err(e) => {
            log::error!("collision fault: {e}; dropping corrupt geometry");
            state
                .geometry
                .retain(|g| g.left().is_finite() && g.right().is_finite());
            TickReport::default()
        }
    };

    state.normalize_order();
    report
}

/// Top-level state machine: owns the canonical live state, the checkpoint
/// manager, and the continue budget
pub struct RunController {
    pub state: GameState,
    pub checkpoints: CheckpointManager,
    pending: TickInput,
    continues_granted: u32,
    continues_used: u32,
    /// Presentation viewport (logical pixels) for the embedder's renderer
    viewport: (f32, f32),
    /// Latest resize request; applied between ticks, never mid-tick
    pending_viewport: Option<(f32, f32)>,
}

impl RunController {
    pub fn new(seed: u64, key: SessionKey) -> Self {
        Self {
            state: GameState::new(seed),
            checkpoints: CheckpointManager::new(key),
            pending: TickInput::default(),
            continues_granted: 0,
            continues_used: 0,
            viewport: (VIEW_WIDTH, FIELD_HEIGHT),
            pending_viewport: None,
        }
    }

    /// Record a resize/environment event. Requests are debounced: only the
    /// newest one is applied, at the next frame boundary.
    pub fn request_viewport(&mut self, width: f32, height: f32) {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            self.pending_viewport = Some((width, height));
        }
    }

    pub fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    /// Attach an external checkpoint sink
    pub fn set_store(&mut self, store: Box<dyn CheckpointStore>) {
        self.checkpoints.set_store(store);
    }

    /// Begin the run from idle. No-op in any other phase.
    pub fn start(&mut self) {
        if self.state.phase != GamePhase::Idle {
            return;
        }
        self.state.phase = GamePhase::Starting;
        self.state.countdown = STARTING_COUNTDOWN;
        self.state.push_cue(GameEvent::Started);
    }

    /// Full reset for a new run: fresh state, cleared checkpoints, restored
    /// continue budget
    pub fn restart(&mut self, seed: u64) {
        self.state = GameState::new(seed);
        self.checkpoints.reset();
        self.continues_granted = 0;
        self.continues_used = 0;
        self.pending = TickInput::default();
        self.state.phase = GamePhase::Starting;
        self.state.countdown = STARTING_COUNTDOWN;
        self.state.push_cue(GameEvent::Started);
        log::info!("run restarted with seed {seed}");
    }

    /// Discrete tap. Starts the run from idle; queues an impulse while
    /// playing; ignored during starting/paused/game-over.
    pub fn tap(&mut self) {
        match self.state.phase {
            GamePhase::Idle => self.start(),
            GamePhase::Playing => self.pending.impulse = true,
            _ => {}
        }
    }

    pub fn pause(&mut self) {
        if self.state.phase == GamePhase::Playing {
            self.pending.pause = true;
        }
    }

    pub fn resume(&mut self) {
        if self.state.phase == GamePhase::Paused {
            self.pending.resume = true;
        }
    }

    /// External reward collaborator grants one continue, up to the per-run cap
    pub fn grant_continue(&mut self) -> bool {
        if self.continues_granted >= MAX_CONTINUES {
            return false;
        }
        self.continues_granted += 1;
        true
    }

    pub fn continues_available(&self) -> u32 {
        self.continues_granted - self.continues_used
    }

    /// Resume after death from a snapshot. Uses the provided snapshot, else
    /// the newest checkpoint at least `CONTINUE_MARGIN` before death, else
    /// the oldest checkpoint, else a safe default. No-op unless game-over
    /// with continues available.
    pub fn continue_run(&mut self, snapshot: Option<&GameStateSnapshot>) -> bool {
        if self.state.phase != GamePhase::GameOver || self.continues_available() == 0 {
            return false;
        }
        self.continues_used += 1;

        let death_time = self.state.time_secs;
        match snapshot {
            Some(snap) => checkpoint::restore_into(&mut self.state, snap),
            None => {
                let chosen = self
                    .checkpoints
                    .find_before(death_time, CONTINUE_MARGIN)
                    .cloned();
                match chosen {
                    Some(snap) => checkpoint::restore_into(&mut self.state, &snap),
                    None => checkpoint::safe_default_continue(&mut self.state),
                }
            }
        }

        self.checkpoints.resync(self.state.time_secs);
        self.pending = TickInput::default();
        let remaining = self.continues_available();
        self.state.push_cue(GameEvent::ContinueUsed { remaining });
        true
    }

    /// Advance one frame: consume pending input, tick, checkpoint on the
    /// interval, and finalize a terminal collision (final snapshot first,
    /// then the game-over transition - the most recent pre-death state is
    /// always available).
    pub fn frame(&mut self, raw_dt: f32) -> TickReport {
        // Apply at most one debounced viewport update per frame, before the
        // tick so it never lands mid-update
        if let Some(viewport) = self.pending_viewport.take() {
            self.viewport = viewport;
        }

        let input = std::mem::take(&mut self.pending);
        let report = tick(&mut self.state, &input, raw_dt);

        if let Some(id) = self.checkpoints.maybe_capture(&self.state) {
            self.state.push_cue(GameEvent::CheckpointCaptured { id });
        }

        if report.terminal {
            self.checkpoints.capture(&self.state);
            self.state.phase = GamePhase::GameOver;
            let score = self.state.score;
            self.state.push_cue(GameEvent::GameOver { score });
            log::info!("game over with score {score}");
        }

        report
    }

    /// Drain the cues emitted since the last call
    pub fn drain_cues(&mut self) -> Vec<GameEvent> {
        self.state.take_cues()
    }
}
