//! Gravitap - simulation core for an endless one-tap gravity arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, generation, collisions, game state)
//! - `persistence`: Checkpoint storage behind a pluggable sink trait
//! - `settings`: Player preferences with JSON file persistence
//! - `highscores`: Local leaderboard and score submission boundary
//!
//! The crate never draws or plays audio itself: each tick it emits declarative
//! draw/cue intents that an embedding shell is free to render however it wants.

pub mod highscores;
pub mod persistence;
pub mod settings;
pub mod sim;

pub use highscores::{HighScores, ScoreSink};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Reference frame rate the simulation is tuned against (Hz)
    pub const REF_FRAME_RATE: f32 = 60.0;
    /// One reference frame in seconds
    pub const REF_DT: f32 = 1.0 / REF_FRAME_RATE;
    /// A raw frame delta is clamped to at most this many reference frames,
    /// absorbing stalls and tab switches without teleporting the ball
    pub const MAX_DELTA_FACTOR: f32 = 5.0;

    /// Play-field dimensions (world units)
    pub const VIEW_WIDTH: f32 = 800.0;
    pub const FIELD_HEIGHT: f32 = 600.0;

    /// Ball defaults - the ball stays at a fixed view X while the world scrolls
    pub const BALL_ANCHOR_X: f32 = 200.0;
    pub const BALL_RADIUS: f32 = 14.0;
    /// Downward acceleration (world units / s²); Y grows downward
    pub const GRAVITY: f32 = 1400.0;
    /// Vertical velocity set by a tap (negative = upward)
    pub const IMPULSE_VELOCITY: f32 = -420.0;
    /// Terminal fall speed
    pub const MAX_FALL_SPEED: f32 = 720.0;
    /// Ball may stray this far past the field edge before the run ends
    pub const BOUNDS_TOLERANCE: f32 = 20.0;

    /// Horizontal scroll speed at difficulty 1.0 (world units / s)
    pub const BASE_SCROLL_SPEED: f32 = 160.0;

    /// Generation lookahead: geometry always exists at least this far ahead
    pub const GEN_LOOKAHEAD: f32 = 2.0 * VIEW_WIDTH + GEN_BUFFER;
    pub const GEN_BUFFER: f32 = 200.0;
    /// Off-screen margin before geometry is destroyed (avoids visible popping)
    pub const DESPAWN_BUFFER: f32 = 100.0;
    /// Geometry further than this outside the view is never collision-tested
    pub const CULL_TOLERANCE: f32 = 50.0;

    /// Vertical obstacle layout
    pub const OBSTACLE_SPACING: f32 = 340.0;
    pub const OBSTACLE_WIDTH: f32 = 70.0;
    pub const MIN_GAP_HEIGHT: f32 = 110.0;
    /// Gap height used when synthesizing without a chunk (before multipliers)
    pub const BASE_GAP_HEIGHT: f32 = 170.0;
    /// Random jitter applied to a chunk's gap center (± world units)
    pub const GAP_JITTER: f32 = 18.0;
    /// Consecutive gap centers may not differ by more than this
    pub const MAX_GAP_SHIFT: f32 = 140.0;
    /// Normalized safe band for gap centers
    pub const GAP_CENTER_MIN: f32 = 0.1;
    pub const GAP_CENTER_MAX: f32 = 0.9;

    /// Horizontal wall layout
    pub const WALL_THICKNESS: f32 = 26.0;
    pub const WALL_GAP_WIDTH: f32 = 130.0;
    /// Level-transition gaps are enlarged for visibility
    pub const TRANSITION_GAP_WIDTH: f32 = 200.0;
    /// One zone pattern persists for this horizontal span
    pub const ZONE_SPAN: f32 = 1600.0;
    pub const BARRIER_WALL_SPACING: f32 = 300.0;
    pub const MAZE_WALL_SPACING: f32 = 190.0;
    /// Two walls in the same horizontal neighborhood must keep their bands
    /// at least this far apart vertically
    pub const WALL_MIN_SPACING: f32 = 90.0;
    pub const WALL_NEIGHBORHOOD: f32 = 320.0;
    /// Bounded placement search; on exhaustion a deterministic
    /// maximum-distance fallback is used
    pub const WALL_PLACE_ATTEMPTS: u32 = 12;

    /// Power-up sizing and magnet behavior
    pub const POWERUP_SIZE: f32 = 22.0;
    pub const MAGNET_RADIUS: f32 = 180.0;
    pub const MAGNET_PULL: f32 = 420.0;

    /// Timed-effect durations (seconds)
    pub const SLOWMO_DURATION: f64 = 5.0;
    pub const SPEEDBOOST_DURATION: f64 = 4.0;
    pub const MAGNET_DURATION: f64 = 6.0;
    pub const DOUBLESCORE_DURATION: f64 = 8.0;
    pub const GRAVITY_FLIP_DURATION: f64 = 4.0;
    pub const SLOWMO_FACTOR: f32 = 0.55;
    pub const SPEEDBOOST_FACTOR: f32 = 1.45;

    /// Random event scheduling
    pub const EVENT_CHECK_INTERVAL: f64 = 5.0;
    pub const EVENT_MILESTONE: u64 = 25;
    pub const EVENT_PROBABILITY: f64 = 0.35;
    pub const MAX_CONCURRENT_EVENTS: usize = 2;

    /// Checkpoint / continue
    pub const CHECKPOINT_INTERVAL: f64 = 2.0;
    pub const CHECKPOINT_RING_CAP: usize = 8;
    /// Default safety margin when selecting a continue snapshot
    pub const CONTINUE_MARGIN: f64 = 2.0;
    /// Terminal collisions are suppressed this long after start/continue
    pub const GRACE_PERIOD: f64 = 2.0;
    pub const MAX_CONTINUES: u32 = 3;

    /// Run controller
    pub const STARTING_COUNTDOWN: f64 = 1.5;

    /// Scoring
    pub const SHORTCUT_BONUS: u64 = 5;
    pub const TRANSITION_BONUS: u64 = 10;
    pub const SCORE_POWERUP_VALUE: u64 = 10;
    /// Difficulty rises by this for every `DIFFICULTY_STEP_SCORE` points
    pub const DIFFICULTY_STEP: f32 = 0.1;
    pub const DIFFICULTY_STEP_SCORE: u64 = 10;
}

/// Clamp a value into `[lo, hi]`, tolerating inverted bounds
#[inline]
pub fn clamp_range(value: f32, lo: f32, hi: f32) -> f32 {
    if lo > hi { value } else { value.clamp(lo, hi) }
}

/// Overlap test for two closed 1D intervals
#[inline]
pub fn spans_overlap(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> bool {
    a_min <= b_max && b_min <= a_max
}
