//! Ball physics: gravity integration, impulses, bounds
//!
//! Y grows downward, so gravity is positive and a tap sets a negative
//! vertical velocity. The ball's track X is slaved to the camera - the world
//! scrolls, the ball does not steer horizontally.

use super::SimError;
use super::state::{Ball, GameState};
use crate::consts::*;

/// Clamp a raw frame delta to the simulation's tolerated range. Stalls and
/// tab switches produce huge deltas; at most `MAX_DELTA_FACTOR` reference
/// frames are absorbed per tick.
#[inline]
pub fn clamp_frame_delta(raw_secs: f32) -> f32 {
    if !raw_secs.is_finite() || raw_secs < 0.0 {
        return REF_DT;
    }
    raw_secs.min(MAX_DELTA_FACTOR * REF_DT)
}

/// Issue an upward impulse: overwrite vertical velocity, no queueing. Under
/// gravity flip the impulse pushes against the inverted pull.
pub fn apply_impulse(ball: &mut Ball) {
    ball.vel.y = IMPULSE_VELOCITY * ball.gravity_scale.signum();
}

/// Advance ball and camera by one tick of world time
pub fn update(state: &mut GameState, world_dt: f32) -> Result<(), SimError> {
    let scroll = state.scroll_speed() * world_dt;
    state.camera_offset += scroll;

    let ball = &mut state.ball;
    ball.vel.y += GRAVITY * ball.gravity_scale * world_dt;
    ball.vel.y = ball.vel.y.clamp(-MAX_FALL_SPEED, MAX_FALL_SPEED);
    ball.pos.y += ball.vel.y * world_dt;
    ball.pos.x = state.camera_offset + BALL_ANCHOR_X;

    if !ball.pos.is_finite() || !ball.vel.is_finite() {
        return Err(SimError::CorruptBall);
    }
    Ok(())
}

/// True when the ball has fully left the vertical play-field (plus tolerance).
/// This is a terminal condition unless absorbed by shield/extra-time.
pub fn out_of_bounds(ball: &Ball) -> bool {
    ball.bottom() < -BOUNDS_TOLERANCE || ball.top() > FIELD_HEIGHT + BOUNDS_TOLERANCE
}

/// Put an out-of-range ball back inside the field after an absorbed boundary
/// hit, killing its vertical momentum so it does not immediately exit again
pub fn clamp_into_field(ball: &mut Ball) {
    ball.pos.y = ball
        .pos
        .y
        .clamp(ball.radius, FIELD_HEIGHT - ball.radius);
    ball.vel.y = 0.0;
}
