//! High score leaderboard system
//!
//! Tracks the top 10 scores locally. Also hosts the `ScoreSink` boundary the
//! run controller reports final scores through - submission is fire-and-forget
//! from the core's perspective.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// Final-score submission boundary. A remote leaderboard client would
/// implement this too; the core never learns whether submission succeeded.
pub trait ScoreSink {
    fn submit(&mut self, score: u64, level: u32, timestamp: f64);
}

/// A single high score entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Player's score
    pub score: u64,
    /// Level reached
    pub level: u32,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

/// High score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        // Check if score beats the lowest entry
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Add a new score to the leaderboard (if it qualifies)
    /// Returns the rank achieved (1-indexed) or None if didn't qualify
    pub fn add_score(&mut self, score: u64, level: u32, timestamp: f64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }

        let entry = HighScoreEntry {
            score,
            level,
            timestamp,
        };

        // Find insertion point (sorted descending by score)
        let pos = self.entries.iter().position(|e| score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        // Trim to max size
        self.entries.truncate(MAX_HIGH_SCORES);

        Some(rank)
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load high scores from a JSON file; any failure starts fresh
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<HighScores>(&json) {
                Ok(scores) => {
                    log::info!("loaded {} high scores", scores.entries.len());
                    scores
                }
                Err(e) => {
                    log::warn!("high score file unreadable ({e}); starting fresh");
                    Self::new()
                }
            },
            Err(_) => {
                log::info!("no high scores found, starting fresh");
                Self::new()
            }
        }
    }

    /// Save high scores; failures are logged, never fatal
    pub fn save(&self, path: &Path) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("could not serialize high scores: {e}");
                return;
            }
        };
        if let Err(e) = fs::write(path, json) {
            log::warn!("could not save high scores to {}: {e}", path.display());
        } else {
            log::info!("high scores saved ({} entries)", self.entries.len());
        }
    }
}

impl ScoreSink for HighScores {
    fn submit(&mut self, score: u64, level: u32, timestamp: f64) {
        if let Some(rank) = self.add_score(score, level, timestamp) {
            log::info!("score {score} entered the leaderboard at rank {rank}");
        }
    }
}
