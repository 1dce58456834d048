//! Procedural obstacle and wall generation
//!
//! Keeps geometry at least `GEN_LOOKAHEAD` ahead of the ball at all times and
//! guarantees every generated gap is reachable: gap centers stay in a safe
//! band and consecutive centers never jump further than `MAX_GAP_SHIFT`.
//!
//! Horizontal walls are grouped into zones. One pattern (barrier, corridor,
//! maze) holds for `ZONE_SPAN` world units before re-rolling; the catalog
//! widens as the level rises.

use rand::Rng;

use super::SimError;
use super::state::{
    GameState, GapPurpose, Geometry, Obstacle, PowerUp, PowerUpKind, Wall, WallGap,
    WallOrientation, ZonePattern,
};
use crate::consts::*;

/// Keep gap bands away from the field edges by this much
const EDGE_MARGIN: f32 = 30.0;
/// Walls this close to a spawn cursor are merge/alignment candidates
const MERGE_RANGE: f32 = 220.0;
/// Vertical margin walls keep from the field edges
const WALL_EDGE_MARGIN: f32 = 60.0;
/// Chance an obstacle gap carries an embedded power-up
const OBSTACLE_POWERUP_CHANCE: f64 = 0.15;

/// Advance generation: spawn ahead of the ball, detach embedded power-ups
/// entering the view, destroy geometry scrolled fully off-screen.
pub fn update(state: &mut GameState) -> Result<(), SimError> {
    if !state.cursors.obstacle_cursor.is_finite() || !state.cursors.wall_cursor.is_finite() {
        return Err(SimError::CorruptCursors {
            obstacle: state.cursors.obstacle_cursor,
            wall: state.cursors.wall_cursor,
        });
    }

    let horizon = state.ball.pos.x + GEN_LOOKAHEAD;

    while state.cursors.obstacle_cursor < horizon {
        spawn_obstacle(state);
    }

    while state.cursors.wall_cursor < horizon {
        reroll_zone_if_due(state);
        spawn_walls(state);
    }

    detach_visible_powerups(state);
    despawn_offscreen(state);
    Ok(())
}

/// Reset cursors and clear geometry after a corruption fault; the next tick
/// regenerates from scratch ahead of the ball.
pub fn reset_after_fault(state: &mut GameState) {
    log::warn!("generator state corrupt; clearing geometry and reseeding cursors");
    state.geometry.clear();
    reseed_cursors(state);
}

/// Re-derive generation cursors from existing geometry so the generator
/// continues seamlessly after a checkpoint restore without re-emitting
/// overlapping content.
pub fn reseed_cursors(state: &mut GameState) {
    let mut obstacle_cursor = state.ball.pos.x + VIEW_WIDTH;
    let mut wall_cursor = state.ball.pos.x + VIEW_WIDTH;
    let mut last_gap_center = state.cursors.last_gap_center;

    let mut rightmost_obstacle = f32::NEG_INFINITY;
    for g in &state.geometry {
        match g {
            Geometry::Obstacle(o) => {
                if o.x > rightmost_obstacle {
                    rightmost_obstacle = o.x;
                    last_gap_center = o.gap_center_y;
                }
                obstacle_cursor = obstacle_cursor.max(o.right() + OBSTACLE_SPACING);
            }
            Geometry::Wall(w) => {
                wall_cursor = wall_cursor.max(w.right() + BARRIER_WALL_SPACING);
            }
        }
    }

    state.cursors.obstacle_cursor = obstacle_cursor;
    state.cursors.wall_cursor = wall_cursor;
    state.cursors.last_gap_center = last_gap_center;
    state.cursors.zone_end = state.cursors.zone_end.max(wall_cursor);
}

/// Gap-size multiplier: generous at low levels, tightening by 0.1 per
/// 10-level band down to 1.0
fn gap_multiplier(level: u32) -> f32 {
    (2.0 - 0.1 * (level / 10) as f32).max(1.0)
}

fn spawn_obstacle(state: &mut GameState) {
    let x = state.cursors.obstacle_cursor;
    let level = state.level;

    // Consume the next chunk if available, otherwise synthesize
    let (mut center, mut height, style) = match state.chunks.pop_front() {
        Some(chunk) => {
            state.chunks_consumed += 1;
            state.theme = chunk.theme;
            (
                chunk.gap_center_normalized * FIELD_HEIGHT,
                chunk.gap_height_normalized * FIELD_HEIGHT,
                chunk.obstacle_style,
            )
        }
        None => {
            // Uniform center in the safe middle band
            let center = state.rng.random_range(0.25..0.75) * FIELD_HEIGHT;
            (center, BASE_GAP_HEIGHT, state.theme_style())
        }
    };

    height = (height * gap_multiplier(level))
        .max(MIN_GAP_HEIGHT)
        .min(FIELD_HEIGHT * 0.75);

    center += state.rng.random_range(-GAP_JITTER..=GAP_JITTER);

    // Smooth-transition constraint: a walkable path always exists
    let last = state.cursors.last_gap_center;
    center = center.clamp(last - MAX_GAP_SHIFT, last + MAX_GAP_SHIFT);

    // Safe band. The previous center already lies inside it, so clamping
    // here can only move the center toward it and never breaks the
    // transition constraint above.
    center = center.clamp(GAP_CENTER_MIN * FIELD_HEIGHT, GAP_CENTER_MAX * FIELD_HEIGHT);

    // Shrink the gap if its band would spill past the field margins; the
    // minimum gap height wins over the margin when both cannot hold
    let max_fit = 2.0 * (center - EDGE_MARGIN).min(FIELD_HEIGHT - EDGE_MARGIN - center);
    height = crate::clamp_range(height, MIN_GAP_HEIGHT, max_fit.max(MIN_GAP_HEIGHT));

    let powerup = if state.rng.random_bool(OBSTACLE_POWERUP_CHANCE) {
        let kind = roll_powerup_kind(state);
        let id = state.next_entity_id();
        Some(PowerUp {
            id,
            kind,
            pos: glam::Vec2::new(x + OBSTACLE_WIDTH / 2.0, center),
            size: POWERUP_SIZE,
            collected: false,
            phase: 0.0,
        })
    } else {
        None
    };

    let id = state.next_entity_id();
    state.geometry.push(Geometry::Obstacle(Obstacle {
        id,
        x,
        width: OBSTACLE_WIDTH,
        gap_center_y: center,
        gap_height: height,
        style,
        powerup,
        passed: false,
    }));

    state.cursors.last_gap_center = center;
    let spacing_jitter = state.rng.random_range(-40.0..40.0);
    state.cursors.obstacle_cursor = x + OBSTACLE_SPACING + spacing_jitter;
}

impl GameState {
    /// Obstacle style suggested by the current theme (procedural fallback)
    fn theme_style(&self) -> super::state::ObstacleStyle {
        use super::state::{ObstacleStyle, Theme};
        match self.theme {
            Theme::Sky | Theme::Sunset => ObstacleStyle::Block,
            Theme::Night => ObstacleStyle::Pillar,
            Theme::Cavern => ObstacleStyle::Crystal,
            Theme::Neon => ObstacleStyle::Vine,
        }
    }
}

/// Zone catalog widens with level: early runs see barriers only, corridors
/// join mid-game, mazes late
fn reroll_zone_if_due(state: &mut GameState) {
    while state.cursors.wall_cursor >= state.cursors.zone_end {
        let allowed: &[ZonePattern] = if state.level < 5 {
            &[ZonePattern::Barrier]
        } else if state.level < 15 {
            &[ZonePattern::Barrier, ZonePattern::Corridor]
        } else {
            &[
                ZonePattern::Barrier,
                ZonePattern::Corridor,
                ZonePattern::Maze,
            ]
        };
        let idx = state.rng.random_range(0..allowed.len());
        state.cursors.zone = allowed[idx];
        state.cursors.zone_end += ZONE_SPAN;
        log::debug!(
            "zone {:?} until x={:.0}",
            state.cursors.zone,
            state.cursors.zone_end
        );
    }
}

fn spawn_walls(state: &mut GameState) {
    match state.cursors.zone {
        ZonePattern::Barrier => spawn_barrier_wall(state),
        ZonePattern::Corridor => spawn_corridor_wall(state),
        ZonePattern::Maze => spawn_maze_walls(state),
    }
}

/// Parallel walls with staggered single gaps
fn spawn_barrier_wall(state: &mut GameState) {
    let x = state.cursors.wall_cursor;

    if let Some(y) = place_wall_y(state, x) {
        // Stagger: gaps alternate between the left and right thirds
        let step = (x / BARRIER_WALL_SPACING) as i64;
        let frac = if step % 2 == 0 { 0.3 } else { 0.7 };
        let gap_center_x = x + VIEW_WIDTH * frac;
        push_wall(state, x, y, Some(gap_center_x), None);
    }
    state.cursors.wall_cursor = x + BARRIER_WALL_SPACING;
}

/// Wall gap aligned to a nearby obstacle's gap for a seamless merged passage
fn spawn_corridor_wall(state: &mut GameState) {
    let x = state.cursors.wall_cursor;

    match nearest_obstacle(state, x) {
        Some((obs_id, column_center_x, gap_center_y)) => {
            push_wall(state, x, gap_center_y, Some(column_center_x), Some(obs_id));
        }
        None => {
            // No obstacle nearby to merge with; barrier-style placement
            if let Some(y) = place_wall_y(state, x) {
                let gap_center_x = x + VIEW_WIDTH * 0.5;
                push_wall(state, x, y, Some(gap_center_x), None);
            }
        }
    }
    state.cursors.wall_cursor = x + BARRIER_WALL_SPACING;
}

/// Denser walls, each individually navigable, merging opportunistically
fn spawn_maze_walls(state: &mut GameState) {
    let x = state.cursors.wall_cursor;

    match nearest_obstacle(state, x) {
        Some((obs_id, column_center_x, gap_center_y)) => {
            push_wall(state, x, gap_center_y, Some(column_center_x), Some(obs_id));
        }
        None => {
            if let Some(y) = place_wall_y(state, x) {
                // A quarter of maze walls are solid bars the ball steers around
                let gap_center_x = if state.rng.random_bool(0.25) {
                    None
                } else {
                    let frac = state.rng.random_range(0.2..0.8);
                    Some(x + VIEW_WIDTH * frac)
                };
                push_wall(state, x, y, gap_center_x, None);
            }
        }
    }

    // Sometimes a second wall in the same column, spaced by the same
    // non-overlap search
    if state.rng.random_bool(0.4) {
        if let Some(y) = place_wall_y(state, x) {
            let frac = state.rng.random_range(0.2..0.8);
            push_wall(state, x, y, Some(x + VIEW_WIDTH * frac), None);
        }
    }

    state.cursors.wall_cursor = x + MAZE_WALL_SPACING;
}

/// Nearest obstacle within merge range of `x`: (id, column center X, gap
/// center Y)
fn nearest_obstacle(state: &GameState, x: f32) -> Option<(u32, f32, f32)> {
    state
        .geometry
        .iter()
        .filter_map(|g| match g {
            Geometry::Obstacle(o) if (o.x - x).abs() < MERGE_RANGE => {
                Some((o.id, o.x + o.width / 2.0, o.gap_center_y, (o.x - x).abs()))
            }
            _ => None,
        })
        .min_by(|a, b| a.3.total_cmp(&b.3))
        .map(|(id, cx, cy, _)| (id, cx, cy))
}

/// Bounded-attempt vertical placement. A candidate is rejected when its band
/// would crowd a wall already placed in the same horizontal neighborhood, or
/// cover the gap band of an obstacle the wall's span crosses (which would
/// seal the only passage). On exhaustion a deterministic fallback picks the
/// candidate with the largest clearance; if even that violates the spacing
/// margin, the wall is skipped - the search always terminates.
fn place_wall_y(state: &mut GameState, x: f32) -> Option<f32> {
    let lo = WALL_EDGE_MARGIN;
    let hi = FIELD_HEIGHT - WALL_EDGE_MARGIN;

    // (center, required clearance) exclusion bands
    let mut blocked: Vec<(f32, f32)> = Vec::new();
    for g in &state.geometry {
        match g {
            Geometry::Wall(w) if (w.x - x).abs() < WALL_NEIGHBORHOOD => {
                blocked.push((w.y, WALL_MIN_SPACING));
            }
            Geometry::Obstacle(o) if o.right() > x && o.x < x + VIEW_WIDTH => {
                blocked.push((
                    o.gap_center_y,
                    o.gap_height / 2.0 + WALL_THICKNESS / 2.0 + 2.0 * BALL_RADIUS,
                ));
            }
            _ => {}
        }
    }

    let clearance = |y: f32| {
        blocked
            .iter()
            .map(|&(c, need)| (c - y).abs() - need)
            .fold(f32::INFINITY, f32::min)
    };

    for _ in 0..WALL_PLACE_ATTEMPTS {
        let y = state.rng.random_range(lo..hi);
        if clearance(y) >= 0.0 {
            return Some(y);
        }
    }

    // Deterministic fallback: ladder of evenly spaced candidates, pick the
    // one with the most clearance
    let steps = 12;
    let mut best_y = (lo + hi) / 2.0;
    let mut best = f32::NEG_INFINITY;
    for i in 0..=steps {
        let y = lo + (hi - lo) * i as f32 / steps as f32;
        let margin = clearance(y);
        if margin > best {
            best = margin;
            best_y = y;
        }
    }
    (best >= 0.0).then_some(best_y)
}

/// Fixed probability split across gap purposes
fn roll_gap_purpose(state: &mut GameState) -> GapPurpose {
    let r: f32 = state.rng.random();
    if r < 0.30 {
        GapPurpose::PowerUp
    } else if r < 0.50 {
        GapPurpose::Shortcut
    } else if r < 0.60 {
        GapPurpose::LevelTransition
    } else {
        GapPurpose::None
    }
}

fn roll_powerup_kind(state: &mut GameState) -> PowerUpKind {
    const KINDS: [PowerUpKind; 8] = [
        PowerUpKind::Score,
        PowerUpKind::Score,
        PowerUpKind::Life,
        PowerUpKind::SlowMo,
        PowerUpKind::SpeedBoost,
        PowerUpKind::Shield,
        PowerUpKind::Magnet,
        PowerUpKind::DoubleScore,
    ];
    // Gravity flip is rarer than the table above
    if state.rng.random_bool(0.05) {
        return PowerUpKind::GravityFlip;
    }
    KINDS[state.rng.random_range(0..KINDS.len())]
}

fn push_wall(
    state: &mut GameState,
    x: f32,
    y: f32,
    gap_center_x: Option<f32>,
    merged_with: Option<u32>,
) {
    let (gap, purpose) = match gap_center_x {
        Some(center_x) => {
            let purpose = roll_gap_purpose(state);
            let width = if purpose == GapPurpose::LevelTransition {
                TRANSITION_GAP_WIDTH
            } else {
                WALL_GAP_WIDTH
            };
            // Keep the opening inside the wall span
            let center_x = center_x.clamp(x + width / 2.0, x + VIEW_WIDTH - width / 2.0);
            (Some(WallGap { center_x, width }), purpose)
        }
        None => (None, GapPurpose::None),
    };

    let powerup = if purpose == GapPurpose::PowerUp {
        let kind = roll_powerup_kind(state);
        let id = state.next_entity_id();
        gap.map(|g| PowerUp {
            id,
            kind,
            pos: glam::Vec2::new(g.center_x, y),
            size: POWERUP_SIZE,
            collected: false,
            phase: 0.0,
        })
    } else {
        None
    };

    let id = state.next_entity_id();
    state.geometry.push(Geometry::Wall(Wall {
        id,
        x,
        width: VIEW_WIDTH,
        y,
        thickness: WALL_THICKNESS,
        orientation: if y < FIELD_HEIGHT / 2.0 {
            WallOrientation::Ceiling
        } else {
            WallOrientation::Floor
        },
        gap,
        purpose,
        powerup,
        merged_with,
        passed: false,
    }));
}

/// Move embedded power-ups into the free-floating list once their geometry
/// nears the view, so magnet homing and collection share one path
fn detach_visible_powerups(state: &mut GameState) {
    let detach_edge = state.view_right() + DESPAWN_BUFFER;
    let mut detached = Vec::new();
    for g in &mut state.geometry {
        if g.left() < detach_edge {
            if let Some(p) = g.take_powerup() {
                detached.push(p);
            }
        }
    }
    state.powerups.extend(detached);
}

/// Destroy geometry and power-ups fully left of the view (plus buffer)
fn despawn_offscreen(state: &mut GameState) {
    let cutoff = state.view_left() - DESPAWN_BUFFER;
    state.geometry.retain(|g| g.right() >= cutoff);
    state
        .powerups
        .retain(|p| !p.collected && p.pos.x + p.size >= cutoff);
}
