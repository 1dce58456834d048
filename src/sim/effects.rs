//! Power-up application and timed-effect bookkeeping
//!
//! Timed effects store absolute end-times in sim seconds. Expiry is checked
//! every tick; gravity flip is the only effect that inverts state and must
//! restore it on expiry.

use super::state::{GameEvent, GameState, PowerUpKind};
use crate::consts::*;

/// Extend an absolute end-time, never shortening an already-active effect
fn extend(until: &mut Option<f64>, end: f64) {
    *until = Some(until.map_or(end, |t| t.max(end)));
}

/// Apply a collected power-up to the run state
pub fn apply_powerup(state: &mut GameState, kind: PowerUpKind) {
    let now = state.time_secs;
    match kind {
        PowerUpKind::Score => {
            state.score += SCORE_POWERUP_VALUE * state.score_multiplier();
            state.refresh_difficulty();
        }
        PowerUpKind::Life => {
            state.effects.extra_time += 1;
        }
        PowerUpKind::SlowMo => {
            extend(&mut state.effects.slowmo_until, now + SLOWMO_DURATION);
        }
        PowerUpKind::SpeedBoost => {
            extend(&mut state.effects.speedboost_until, now + SPEEDBOOST_DURATION);
        }
        PowerUpKind::Shield => {
            state.effects.shield_charges += 1;
        }
        PowerUpKind::Magnet => {
            extend(&mut state.effects.magnet_until, now + MAGNET_DURATION);
        }
        PowerUpKind::DoubleScore => {
            extend(&mut state.effects.doublescore_until, now + DOUBLESCORE_DURATION);
        }
        PowerUpKind::GravityFlip => {
            extend(&mut state.effects.gravity_flip_until, now + GRAVITY_FLIP_DURATION);
            state.ball.gravity_scale = -state.ball.gravity_scale.abs();
        }
    }
    log::debug!("power-up {kind:?} applied at t={now:.2}");
    state.push_cue(GameEvent::PowerUpCollected(kind));
}

/// Per-tick effect maintenance: expire timed flags, home power-ups under
/// magnet, advance pickup animation phases
pub fn update(state: &mut GameState, world_dt: f32) {
    let now = state.time_secs;
    let fx = &mut state.effects;

    for until in [
        &mut fx.slowmo_until,
        &mut fx.speedboost_until,
        &mut fx.magnet_until,
        &mut fx.doublescore_until,
    ] {
        if until.is_some_and(|t| t <= now) {
            *until = None;
        }
    }

    if fx.gravity_flip_until.is_some_and(|t| t <= now) {
        fx.gravity_flip_until = None;
        state.ball.gravity_scale = state.ball.gravity_scale.abs();
    }

    let magnet = state.effects.magnet(now);
    let ball_pos = state.ball.pos;
    for p in &mut state.powerups {
        p.phase = (p.phase + world_dt * 6.0) % std::f32::consts::TAU;
        if magnet {
            let to_ball = ball_pos - p.pos;
            let dist = to_ball.length();
            if dist > 1.0 && dist < MAGNET_RADIUS {
                let step = (MAGNET_PULL * world_dt).min(dist);
                p.pos += to_ball / dist * step;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::PowerUp;
    use glam::Vec2;

    #[test]
    fn timed_powerups_set_absolute_end_times() {
        let mut state = GameState::new(1);
        state.time_secs = 10.0;
        apply_powerup(&mut state, PowerUpKind::SlowMo);
        assert_eq!(state.effects.slowmo_until, Some(10.0 + SLOWMO_DURATION));
        apply_powerup(&mut state, PowerUpKind::DoubleScore);
        assert_eq!(
            state.effects.doublescore_until,
            Some(10.0 + DOUBLESCORE_DURATION)
        );
    }

    #[test]
    fn reapplying_extends_never_shortens() {
        let mut state = GameState::new(1);
        state.time_secs = 10.0;
        apply_powerup(&mut state, PowerUpKind::SlowMo);
        state.time_secs = 4.0; // pathological rewind must not shorten
        apply_powerup(&mut state, PowerUpKind::SlowMo);
        assert_eq!(state.effects.slowmo_until, Some(10.0 + SLOWMO_DURATION));
    }

    #[test]
    fn shield_charges_stack() {
        let mut state = GameState::new(1);
        apply_powerup(&mut state, PowerUpKind::Shield);
        apply_powerup(&mut state, PowerUpKind::Shield);
        assert_eq!(state.effects.shield_charges, 2);
    }

    #[test]
    fn life_grants_extra_time_credit() {
        let mut state = GameState::new(1);
        apply_powerup(&mut state, PowerUpKind::Life);
        assert_eq!(state.effects.extra_time, 1);
    }

    #[test]
    fn gravity_flip_inverts_and_restores() {
        let mut state = GameState::new(1);
        state.time_secs = 2.0;
        apply_powerup(&mut state, PowerUpKind::GravityFlip);
        assert_eq!(state.ball.gravity_scale, -1.0);

        state.time_secs = 2.0 + GRAVITY_FLIP_DURATION + 0.01;
        update(&mut state, 0.016);
        assert_eq!(state.effects.gravity_flip_until, None);
        assert_eq!(state.ball.gravity_scale, 1.0);
    }

    #[test]
    fn score_powerup_grants_immediately() {
        let mut state = GameState::new(1);
        apply_powerup(&mut state, PowerUpKind::Score);
        assert_eq!(state.score, SCORE_POWERUP_VALUE);
        assert_eq!(state.level, 1);
    }

    #[test]
    fn magnet_homes_nearby_powerups_without_collecting() {
        let mut state = GameState::new(1);
        state.effects.magnet_until = Some(100.0);
        let start = state.ball.pos + Vec2::new(MAGNET_RADIUS - 10.0, 0.0);
        state.powerups.push(PowerUp {
            id: 1,
            kind: PowerUpKind::Score,
            pos: start,
            size: POWERUP_SIZE,
            collected: false,
            phase: 0.0,
        });
        update(&mut state, 0.016);
        let p = &state.powerups[0];
        assert!(p.pos.distance(state.ball.pos) < start.distance(state.ball.pos));
        assert!(!p.collected);
    }

    #[test]
    fn magnet_ignores_powerups_outside_radius() {
        let mut state = GameState::new(1);
        state.effects.magnet_until = Some(100.0);
        let start = state.ball.pos + Vec2::new(MAGNET_RADIUS + 50.0, 0.0);
        state.powerups.push(PowerUp {
            id: 1,
            kind: PowerUpKind::Score,
            pos: start,
            size: POWERUP_SIZE,
            collected: false,
            phase: 0.0,
        });
        update(&mut state, 0.016);
        assert_eq!(state.powerups[0].pos, start);
    }
}
