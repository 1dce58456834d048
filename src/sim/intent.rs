//! Declarative frame output
//!
//! The core never draws. Each frame the embedder asks for a list of draw
//! intents in view space; gameplay cues (`GameEvent`) are drained separately
//! for audio/haptics. No rendering technology has to succeed for the sim to
//! keep running.

use super::state::{
    EventKind, GamePhase, GameState, Geometry, ObstacleStyle, PowerUpKind, Theme, WallOrientation,
};
use crate::consts::*;

/// One thing to draw this frame, in view-space coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum DrawIntent {
    Background {
        theme: Theme,
        rainbow: bool,
        color_shift: bool,
    },
    Ball {
        x: f32,
        y: f32,
        radius: f32,
        shielded: bool,
    },
    ObstacleColumn {
        x: f32,
        width: f32,
        gap_top: f32,
        gap_bottom: f32,
        style: ObstacleStyle,
        passed: bool,
    },
    WallBar {
        x: f32,
        width: f32,
        y: f32,
        thickness: f32,
        orientation: WallOrientation,
        /// View-space gap span (left, right), if the wall has an opening
        gap: Option<(f32, f32)>,
    },
    PowerUp {
        x: f32,
        y: f32,
        size: f32,
        kind: PowerUpKind,
        phase: f32,
    },
    Hud {
        score: u64,
        level: u32,
        difficulty: f32,
        shield_charges: u32,
        extra_time: u32,
    },
    Countdown {
        remaining: f64,
    },
    PauseOverlay,
    GameOverOverlay {
        score: u64,
    },
}

/// Build the draw list for the current state. Everything outside the view
/// (plus a small margin) is culled.
pub fn frame_intents(state: &GameState) -> Vec<DrawIntent> {
    let cam = state.camera_offset;
    let left = state.view_left() - DESPAWN_BUFFER;
    let right = state.view_right() + DESPAWN_BUFFER;

    let mut intents = Vec::with_capacity(state.geometry.len() + state.powerups.len() + 4);

    intents.push(DrawIntent::Background {
        theme: state.theme,
        rainbow: state
            .active_events
            .iter()
            .any(|e| e.kind == EventKind::RainbowMode),
        color_shift: state
            .active_events
            .iter()
            .any(|e| e.kind == EventKind::ColorShift),
    });

    for g in &state.geometry {
        if g.right() < left || g.left() > right {
            continue;
        }
        match g {
            Geometry::Obstacle(o) => intents.push(DrawIntent::ObstacleColumn {
                x: o.x - cam,
                width: o.width,
                gap_top: o.gap_top(),
                gap_bottom: o.gap_bottom(),
                style: o.style,
                passed: o.passed,
            }),
            Geometry::Wall(w) => intents.push(DrawIntent::WallBar {
                x: w.x - cam,
                width: w.width,
                y: w.y,
                thickness: w.thickness,
                orientation: w.orientation,
                gap: w.gap.map(|g| (g.left() - cam, g.right() - cam)),
            }),
        }
    }

    for p in &state.powerups {
        if p.pos.x < left || p.pos.x > right {
            continue;
        }
        intents.push(DrawIntent::PowerUp {
            x: p.pos.x - cam,
            y: p.pos.y,
            size: p.size,
            kind: p.kind,
            phase: p.phase,
        });
    }

    intents.push(DrawIntent::Ball {
        x: state.ball.pos.x - cam,
        y: state.ball.pos.y,
        radius: state.ball.radius,
        shielded: state.effects.shield_charges > 0,
    });

    intents.push(DrawIntent::Hud {
        score: state.score,
        level: state.level,
        difficulty: state.difficulty,
        shield_charges: state.effects.shield_charges,
        extra_time: state.effects.extra_time,
    });

    match state.phase {
        GamePhase::Starting => intents.push(DrawIntent::Countdown {
            remaining: state.countdown,
        }),
        GamePhase::Paused => intents.push(DrawIntent::PauseOverlay),
        GamePhase::GameOver => intents.push(DrawIntent::GameOverOverlay { score: state.score }),
        _ => {}
    }

    intents
}
