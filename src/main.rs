//! Gravitap entry point
//!
//! Headless demo driver: runs the deterministic core with a simple autopilot,
//! exercising content ingestion, checkpoints, continues, and score
//! submission. A real shell would replace the autopilot with input events and
//! render the draw intents.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use gravitap::consts::*;
use gravitap::highscores::{HighScores, ScoreSink};
use gravitap::persistence::{FileStore, SessionKey};
use gravitap::settings::Settings;
use gravitap::sim::{
    GameEvent, GamePhase, RunController, frame_intents, ingest_chunks, parse_chunks,
};

/// Demo content: a short externally-authored warmup sequence; the generator
/// synthesizes everything after it
const DEMO_CHUNKS: &str = r#"[
    {"gapCenterNormalized": 0.5, "gapHeightNormalized": 0.3, "obstacleStyle": "Block", "theme": "Sky"},
    {"gapCenterNormalized": 0.4, "gapHeightNormalized": 0.28, "obstacleStyle": "Block", "theme": "Sky"},
    {"gapCenterNormalized": 0.55, "gapHeightNormalized": 0.25, "obstacleStyle": "Pillar", "theme": "Sunset"},
    {"gapCenterNormalized": 0.45, "gapHeightNormalized": 0.22, "obstacleStyle": "Pillar", "theme": "Sunset"}
]"#;

/// Maximum sim time for the demo run (seconds)
const DEMO_DURATION: f64 = 180.0;

fn unix_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}

/// Tap whenever the ball sinks below the next gap's centerline
fn autopilot(rc: &mut RunController) {
    let state = &rc.state;
    let target = state
        .geometry
        .iter()
        .filter_map(|g| match g {
            gravitap::sim::Geometry::Obstacle(o) if o.right() >= state.ball.pos.x => {
                Some((o.x, o.gap_center_y))
            }
            _ => None,
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, center)| center)
        .unwrap_or(FIELD_HEIGHT / 2.0);

    let falling = state.ball.vel.y * state.ball.gravity_scale.signum() >= 0.0;
    if state.ball.pos.y > target && falling {
        rc.tap();
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| unix_ms() as u64);
    log::info!("Gravitap demo starting with seed {seed}");

    let data_dir = PathBuf::from("gravitap-data");
    let settings = Settings::load(&data_dir.join("settings.json"));
    let mut scores = HighScores::load(&data_dir.join("highscores.json"));
    log::info!(
        "sfx volume {:.2}, best score so far: {:?}",
        settings.effective_sfx_volume(),
        scores.top_score()
    );

    let key = SessionKey::anonymous(format!("demo-{seed}"));
    let mut rc = RunController::new(seed, key);
    match FileStore::new(data_dir.join("checkpoints")) {
        Ok(store) => rc.set_store(Box::new(store)),
        Err(e) => log::warn!("checkpoint store unavailable ({e}); in-memory ring only"),
    }

    ingest_chunks(&mut rc.state, parse_chunks(DEMO_CHUNKS));

    rc.tap(); // first input starts the run

    let mut frames: u64 = 0;
    while rc.state.time_secs < DEMO_DURATION {
        if rc.state.phase == GamePhase::Playing {
            autopilot(&mut rc);
        }

        // Mostly steady 60 Hz with an occasional long frame, exercising the
        // delta clamp
        let dt = if frames % 600 == 599 { 0.25 } else { REF_DT };
        rc.frame(dt);
        frames += 1;

        // A real shell would draw these; the demo just samples the stream
        if frames % 600 == 0 {
            let intents = frame_intents(&rc.state);
            log::debug!("frame {frames}: {} draw intents", intents.len());
        }

        for cue in rc.drain_cues() {
            match cue {
                GameEvent::Scored { total } if total % 10 == 0 => {
                    log::info!("score {total} (difficulty {:.1})", rc.state.difficulty);
                }
                GameEvent::LevelTransition { level } => {
                    log::info!("level transition -> {level} ({:?})", rc.state.theme);
                }
                GameEvent::EventStarted(kind) => log::info!("random event: {kind:?}"),
                GameEvent::GameOver { score } => log::info!("died with score {score}"),
                _ => {}
            }
        }

        if rc.state.phase == GamePhase::GameOver {
            // Simulate the reward flow granting a continue
            if rc.grant_continue() && rc.continue_run(None) {
                log::info!("continuing ({} left)", rc.continues_available());
            } else {
                break;
            }
        }
    }

    let final_score = rc.state.score;
    let final_level = rc.state.level;
    log::info!(
        "demo finished: score {final_score}, level {final_level}, {} checkpoints in ring",
        rc.checkpoints.len()
    );

    // Fire-and-forget submission to the local leaderboard
    scores.submit(final_score, final_level, unix_ms());
    scores.save(&data_dir.join("highscores.json"));
    settings.save(&data_dir.join("settings.json"));
}
