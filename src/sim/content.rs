//! External content descriptors ("chunks")
//!
//! An external level generator may feed the game an ordered list of gap
//! descriptors. The generator consumes them in order and falls back to pure
//! procedural synthesis once they run out. Malformed values are clamped and
//! repaired here - bad content never propagates an error into the sim.

use serde::{Deserialize, Serialize};

use super::state::{GameState, ObstacleStyle, Theme};
use crate::consts::*;

/// One externally supplied (or synthesized) gap descriptor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Gap center, normalized 0..1 (top..bottom of the field)
    pub gap_center_normalized: f32,
    /// Gap height, normalized fraction of field height
    pub gap_height_normalized: f32,
    #[serde(default)]
    pub obstacle_style: ObstacleStyle,
    #[serde(default)]
    pub theme: Theme,
}

/// Normalized gap-height bounds accepted from external content
pub const CHUNK_HEIGHT_MIN: f32 = 0.1;
pub const CHUNK_HEIGHT_MAX: f32 = 0.35;

impl Chunk {
    /// Clamp out-of-range values and replace non-finite ones with safe
    /// defaults. Repair, never reject.
    pub fn sanitized(mut self) -> Self {
        if !self.gap_center_normalized.is_finite() {
            self.gap_center_normalized = 0.5;
        }
        if !self.gap_height_normalized.is_finite() {
            self.gap_height_normalized = CHUNK_HEIGHT_MIN;
        }
        self.gap_center_normalized = self
            .gap_center_normalized
            .clamp(GAP_CENTER_MIN, GAP_CENTER_MAX);
        self.gap_height_normalized = self
            .gap_height_normalized
            .clamp(CHUNK_HEIGHT_MIN, CHUNK_HEIGHT_MAX);
        self
    }
}

/// Append externally supplied chunks to the backlog (never replaces it).
/// Every chunk is sanitized on the way in.
pub fn ingest_chunks(state: &mut GameState, chunks: impl IntoIterator<Item = Chunk>) {
    let before = state.chunks.len();
    state
        .chunks
        .extend(chunks.into_iter().map(Chunk::sanitized));
    let added = state.chunks.len() - before;
    if added > 0 {
        log::info!("ingested {added} content chunks ({} queued)", state.chunks.len());
    }
}

/// Parse a JSON chunk list. A malformed document yields an empty list with a
/// warning; per-field repair happens later in `sanitized`.
pub fn parse_chunks(json: &str) -> Vec<Chunk> {
    match serde_json::from_str::<Vec<Chunk>>(json) {
        Ok(chunks) => chunks,
        Err(e) => {
            log::warn!("discarding malformed chunk list: {e}");
            Vec::new()
        }
    }
}
