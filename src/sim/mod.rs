//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Normalized, clamped frame deltas only
//! - Seeded RNG only, serialized with the state
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod checkpoint;
pub mod collision;
pub mod content;
pub mod effects;
pub mod events;
pub mod generator;
pub mod intent;
pub mod physics;
pub mod state;
pub mod tick;

pub use checkpoint::{CheckpointManager, GameStateSnapshot};
pub use collision::{Resolution, ball_in_wall_gap, obstacle_hit, wall_hit};
pub use content::{Chunk, ingest_chunks, parse_chunks};
pub use intent::{DrawIntent, frame_intents};
pub use state::{
    ActiveEffects, Ball, EventKind, GameEvent, GamePhase, GameState, GapPurpose, Geometry,
    Obstacle, ObstacleStyle, PowerUp, PowerUpKind, RandomEvent, Theme, Wall, WallGap,
    WallOrientation, ZonePattern,
};
pub use tick::{RunController, TickInput, TickReport, tick};

use thiserror::Error;

/// Subsystem faults caught at the tick-loop boundary. The loop logs them and
/// degrades the offending collection to a safe state instead of halting.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("ball state is not finite")]
    CorruptBall,
    #[error("generation cursors are not finite (obstacle={obstacle}, wall={wall})")]
    CorruptCursors { obstacle: f32, wall: f32 },
    #[error("{count} geometry entries have non-finite coordinates")]
    CorruptGeometry { count: usize },
}
