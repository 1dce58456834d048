//! Collision detection and scoring
//!
//! The tricky part of a scrolling one-tap game: deciding, across variable
//! timesteps, whether the ball hit a column, threaded a gap, or crossed an
//! entire gap band within a single tick. Pass/hit resolution works off the
//! current and previous tick's ball position so nothing is missed at high
//! scroll speed.

use super::SimError;
use super::effects;
use super::state::{GameEvent, GameState, GapPurpose, Geometry, Obstacle, Wall};
use crate::consts::*;
use crate::spans_overlap;

/// Forgiveness padding for the center-based in-gap test (tuning constant,
/// not load-bearing for correctness)
pub const GAP_FORGIVENESS: f32 = 3.0;
/// Minimum ball/gap overlap for the edge-based in-gap test
pub const EDGE_OVERLAP_MIN: f32 = 2.0;

/// What the resolver decided this tick
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolution {
    /// Unabsorbed fatal collision: the run controller must end the run
    pub terminal: bool,
}

/// Vertical-obstacle hit test: ball's horizontal extent overlaps the column
/// and its vertical extent is not fully inside the gap band
pub fn obstacle_hit(ball_x: f32, ball_y: f32, radius: f32, o: &Obstacle) -> bool {
    let horizontal = spans_overlap(ball_x - radius, ball_x + radius, o.x, o.right());
    if !horizontal {
        return false;
    }
    let inside_gap = ball_y - radius >= o.gap_top() && ball_y + radius <= o.gap_bottom();
    !inside_gap
}

/// Dual in-gap test for horizontal walls: a forgiving center-inclusion check
/// OR an edge-overlap check. The union reduces false hits at high scroll
/// speed.
pub fn ball_in_wall_gap(ball_x: f32, radius: f32, w: &Wall) -> bool {
    let Some(gap) = w.gap else {
        return false;
    };
    let center_in =
        ball_x >= gap.left() - GAP_FORGIVENESS && ball_x <= gap.right() + GAP_FORGIVENESS;
    let overlap = (ball_x + radius).min(gap.right()) - (ball_x - radius).max(gap.left());
    center_in || overlap >= EDGE_OVERLAP_MIN
}

/// Horizontal-wall hit test: vertical band overlap, and the ball is not
/// classified as inside the gap
pub fn wall_hit(ball_x: f32, ball_y: f32, radius: f32, w: &Wall) -> bool {
    let in_band = spans_overlap(ball_y - radius, ball_y + radius, w.band_top(), w.band_bottom());
    if !in_band {
        return false;
    }
    let in_span = spans_overlap(ball_x - radius, ball_x + radius, w.x, w.right());
    if !in_span {
        return false;
    }
    !ball_in_wall_gap(ball_x, radius, w)
}

/// Run hit tests, scoring, power-up collection, and the absorption chain for
/// one tick. Only geometry within the visible field (plus tolerance) is
/// tested.
pub fn resolve(state: &mut GameState) -> Result<Resolution, SimError> {
    let test_left = state.view_left() - CULL_TOLERANCE;
    let test_right = state.view_right() + CULL_TOLERANCE;

    let corrupt = state
        .geometry
        .iter()
        .filter(|g| !g.left().is_finite() || !g.right().is_finite())
        .count();
    if corrupt > 0 {
        return Err(SimError::CorruptGeometry { count: corrupt });
    }

    let ball = state.ball.clone();
    let prev_x = state.prev_ball_x;
    let prev_y = state.prev_ball_y;
    let now = state.time_secs;
    let multiplier = state.score_multiplier();

    let mut score_delta: u64 = 0;
    let mut cues: Vec<GameEvent> = Vec::new();
    let mut hit = false;
    let mut level_transition = false;

    for g in &mut state.geometry {
        if g.right() < test_left || g.left() > test_right {
            continue;
        }

        match g {
            Geometry::Obstacle(o) => {
                if !hit && obstacle_hit(ball.pos.x, ball.pos.y, ball.radius, o) {
                    hit = true;
                }
                // Score the instant the leading edge passes the trailing
                // edge, if this or the previous tick overlapped the gap band
                // (a single tick can cross the entire column)
                if !o.passed && ball.leading_edge() > o.right() {
                    let gap_now =
                        spans_overlap(ball.top(), ball.bottom(), o.gap_top(), o.gap_bottom());
                    let gap_prev = spans_overlap(
                        prev_y - ball.radius,
                        prev_y + ball.radius,
                        o.gap_top(),
                        o.gap_bottom(),
                    );
                    if gap_now || gap_prev {
                        o.passed = true;
                        score_delta += multiplier;
                    }
                }
            }
            Geometry::Wall(w) => {
                if !hit && wall_hit(ball.pos.x, ball.pos.y, ball.radius, w) {
                    hit = true;
                }
                if w.passed {
                    continue;
                }
                let Some(gap) = w.gap else { continue };

                // Entry: ball is inside the gap region (purpose effects fire
                // here, not on full traversal)
                let in_band =
                    spans_overlap(ball.top(), ball.bottom(), w.band_top(), w.band_bottom());
                let entered = in_band && ball_in_wall_gap(ball.pos.x, ball.radius, w);

                // Verified threading: before the gap last tick, past it now,
                // with band overlap somewhere in the transition
                let prev_in_band = spans_overlap(
                    prev_y - ball.radius,
                    prev_y + ball.radius,
                    w.band_top(),
                    w.band_bottom(),
                );
                let threaded =
                    prev_x < gap.left() && ball.pos.x > gap.right() && (in_band || prev_in_band);

                if entered || threaded {
                    w.passed = true;
                    score_delta += multiplier;
                    match w.purpose {
                        GapPurpose::Shortcut => {
                            score_delta += SHORTCUT_BONUS * multiplier;
                            cues.push(GameEvent::ShortcutTaken);
                        }
                        GapPurpose::LevelTransition => {
                            score_delta += TRANSITION_BONUS * multiplier;
                            level_transition = true;
                        }
                        GapPurpose::PowerUp | GapPurpose::None => {}
                    }
                }
            }
        }
    }

    // Power-up collection (circle vs square, forgiving)
    let mut collected = Vec::new();
    for p in &mut state.powerups {
        if p.collected || p.pos.x < test_left || p.pos.x > test_right {
            continue;
        }
        if ball.pos.distance(p.pos) < ball.radius + p.size / 2.0 {
            p.collected = true;
            collected.push(p.kind);
        }
    }
    state.powerups.retain(|p| !p.collected);
    for kind in collected {
        effects::apply_powerup(state, kind);
    }

    // Apply deferred scoring and cues
    if score_delta > 0 {
        state.score += score_delta;
        state.refresh_difficulty();
        let total = state.score;
        state.push_cue(GameEvent::Scored { total });
    }
    if level_transition {
        state.theme = state.theme.next();
        let level = state.level;
        state.push_cue(GameEvent::LevelTransition { level });
    }
    for cue in cues {
        state.push_cue(cue);
    }

    // Boundary exit is a terminal condition like any other hit
    let out = super::physics::out_of_bounds(&state.ball);

    if !(hit || out) {
        return Ok(Resolution::default());
    }

    // Grace period after start/continue suppresses terminal collisions
    if now < state.grace_until {
        if out {
            super::physics::clamp_into_field(&mut state.ball);
        }
        return Ok(Resolution::default());
    }

    // Fixed absorption precedence: extra time, then shield, then game over
    if state.effects.extra_time > 0 {
        state.effects.extra_time -= 1;
        if out {
            super::physics::clamp_into_field(&mut state.ball);
        }
        state.push_cue(GameEvent::ExtraTimeConsumed);
        return Ok(Resolution::default());
    }
    if state.effects.shield_charges > 0 {
        state.effects.shield_charges -= 1;
        if out {
            super::physics::clamp_into_field(&mut state.ball);
        }
        let remaining = state.effects.shield_charges;
        state.push_cue(GameEvent::ShieldAbsorbed { remaining });
        return Ok(Resolution::default());
    }

    Ok(Resolution { terminal: true })
}
