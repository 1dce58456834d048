//! Checkpoint persistence behind a pluggable sink
//!
//! The simulation only ever talks to the `CheckpointStore` trait. Two
//! implementations ship with the crate:
//! - `MemoryStore`: pure in-memory fallback, always available
//! - `FileStore`: JSON file per session with tmp-then-rename writes
//!
//! Store failures are typed and logged by callers; they degrade durability
//! of the continue feature but never gameplay correctness.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::checkpoint::GameStateSnapshot;

/// Envelope version written alongside stored snapshots
const STORE_VERSION: u32 = 1;

/// Errors surfaced by checkpoint stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("stored session {0} has an unsupported version {1}")]
    Version(String, u32),
}

/// Identifies who a stored snapshot belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// User identity, or None for anonymous play
    pub identity: Option<String>,
    pub session: String,
}

impl SessionKey {
    pub fn anonymous(session: impl Into<String>) -> Self {
        Self {
            identity: None,
            session: session.into(),
        }
    }

    /// Stable storage key string
    fn storage_id(&self) -> String {
        match &self.identity {
            Some(identity) => format!("{identity}-{}", self.session),
            None => format!("anon-{}", self.session),
        }
    }
}

/// External checkpoint sink
pub trait CheckpointStore {
    /// Persist one snapshot for the session (fire-and-forget from the sim's
    /// perspective; callers log failures and move on)
    fn save(&mut self, key: &SessionKey, snapshot: &GameStateSnapshot) -> Result<(), StoreError>;
    /// Load the most recent `n` snapshots, newest first
    fn load_recent(&self, key: &SessionKey, n: usize) -> Result<Vec<GameStateSnapshot>, StoreError>;
    /// Remove everything stored for the session
    fn delete_session(&mut self, key: &SessionKey) -> Result<(), StoreError>;
}

/// Versioned on-disk / in-memory envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionEnvelope {
    version: u32,
    snapshots: Vec<GameStateSnapshot>,
}

impl SessionEnvelope {
    fn new() -> Self {
        Self {
            version: STORE_VERSION,
            snapshots: Vec::new(),
        }
    }

    fn push_capped(&mut self, snapshot: GameStateSnapshot, cap: usize) {
        self.snapshots.push(snapshot);
        if self.snapshots.len() > cap {
            let excess = self.snapshots.len() - cap;
            self.snapshots.drain(..excess);
        }
    }
}

/// Pure in-memory store; the fallback when no durable sink is available
pub struct MemoryStore {
    sessions: HashMap<String, SessionEnvelope>,
    cap: usize,
}

impl MemoryStore {
    pub fn new(cap: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            cap,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(crate::consts::CHECKPOINT_RING_CAP)
    }
}

impl CheckpointStore for MemoryStore {
    fn save(&mut self, key: &SessionKey, snapshot: &GameStateSnapshot) -> Result<(), StoreError> {
        let envelope = self
            .sessions
            .entry(key.storage_id())
            .or_insert_with(SessionEnvelope::new);
        envelope.push_capped(snapshot.clone(), self.cap);
        Ok(())
    }

    fn load_recent(&self, key: &SessionKey, n: usize) -> Result<Vec<GameStateSnapshot>, StoreError> {
        let snapshots = self
            .sessions
            .get(&key.storage_id())
            .map(|e| e.snapshots.iter().rev().take(n).cloned().collect())
            .unwrap_or_default();
        Ok(snapshots)
    }

    fn delete_session(&mut self, key: &SessionKey) -> Result<(), StoreError> {
        self.sessions.remove(&key.storage_id());
        Ok(())
    }
}

/// JSON file per session under a base directory. Writes go to a temp file
/// first, then rename over the old save, so a crash mid-write leaves the
/// previous save intact.
pub struct FileStore {
    dir: PathBuf,
    cap: usize,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            cap: crate::consts::CHECKPOINT_RING_CAP,
        })
    }

    fn path_for(&self, key: &SessionKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.storage_id()))
    }

    fn read_envelope(&self, key: &SessionKey) -> Result<SessionEnvelope, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(SessionEnvelope::new());
        }
        let json = fs::read_to_string(&path)?;
        let envelope: SessionEnvelope = serde_json::from_str(&json)?;
        if envelope.version != STORE_VERSION {
            return Err(StoreError::Version(
                key.storage_id(),
                envelope.version,
            ));
        }
        Ok(envelope)
    }

    fn write_envelope(&self, key: &SessionKey, envelope: &SessionEnvelope) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string(envelope)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl CheckpointStore for FileStore {
    fn save(&mut self, key: &SessionKey, snapshot: &GameStateSnapshot) -> Result<(), StoreError> {
        // A corrupt existing file degrades to a fresh envelope rather than
        // blocking new saves
        let mut envelope = self.read_envelope(key).unwrap_or_else(|e| {
            log::warn!("discarding unreadable session file for {}: {e}", key.storage_id());
            SessionEnvelope::new()
        });
        envelope.push_capped(snapshot.clone(), self.cap);
        self.write_envelope(key, &envelope)
    }

    fn load_recent(&self, key: &SessionKey, n: usize) -> Result<Vec<GameStateSnapshot>, StoreError> {
        let envelope = self.read_envelope(key)?;
        Ok(envelope.snapshots.into_iter().rev().take(n).collect())
    }

    fn delete_session(&mut self, key: &SessionKey) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::GameState;

    fn snapshot(id: u64, captured_at: f64) -> GameStateSnapshot {
        GameStateSnapshot {
            id,
            captured_at,
            state: GameState::new(1),
        }
    }

    #[test]
    fn memory_store_roundtrip_newest_first() {
        let mut store = MemoryStore::default();
        let key = SessionKey::anonymous("s1");
        for i in 0..3 {
            store.save(&key, &snapshot(i, i as f64)).unwrap();
        }
        let recent = store.load_recent(&key, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, 2);
        assert_eq!(recent[1].id, 1);
    }

    #[test]
    fn memory_store_caps_per_session() {
        let mut store = MemoryStore::new(3);
        let key = SessionKey::anonymous("s1");
        for i in 0..10 {
            store.save(&key, &snapshot(i, i as f64)).unwrap();
        }
        let all = store.load_recent(&key, 100).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, 9);
    }

    #[test]
    fn memory_store_delete_session() {
        let mut store = MemoryStore::default();
        let key = SessionKey::anonymous("s1");
        let other = SessionKey::anonymous("s2");
        store.save(&key, &snapshot(1, 0.0)).unwrap();
        store.save(&other, &snapshot(2, 0.0)).unwrap();
        store.delete_session(&key).unwrap();
        assert!(store.load_recent(&key, 10).unwrap().is_empty());
        assert_eq!(store.load_recent(&other, 10).unwrap().len(), 1);
    }

    #[test]
    fn sessions_are_isolated_by_identity() {
        let mut store = MemoryStore::default();
        let anon = SessionKey::anonymous("s1");
        let named = SessionKey {
            identity: Some("player7".into()),
            session: "s1".into(),
        };
        store.save(&anon, &snapshot(1, 0.0)).unwrap();
        assert!(store.load_recent(&named, 10).unwrap().is_empty());
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("gravitap-store-{}", std::process::id()));
        let mut store = FileStore::new(&dir).unwrap();
        let key = SessionKey::anonymous("file-test");
        store.delete_session(&key).unwrap();

        store.save(&key, &snapshot(1, 1.0)).unwrap();
        store.save(&key, &snapshot(2, 2.0)).unwrap();
        let recent = store.load_recent(&key, 1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, 2);

        store.delete_session(&key).unwrap();
        assert!(store.load_recent(&key, 10).unwrap().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_store_survives_corrupt_save_file() {
        let dir = std::env::temp_dir().join(format!("gravitap-corrupt-{}", std::process::id()));
        let mut store = FileStore::new(&dir).unwrap();
        let key = SessionKey::anonymous("corrupt");
        fs::write(store.path_for(&key), "{ not json").unwrap();

        // Save degrades to a fresh envelope instead of erroring
        store.save(&key, &snapshot(5, 5.0)).unwrap();
        let recent = store.load_recent(&key, 10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, 5);
        let _ = fs::remove_dir_all(&dir);
    }
}
