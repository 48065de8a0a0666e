//! Session directory: id allocation, lookup, and the player-to-session map.
//!
//! Sessions live behind `Arc<Mutex<..>>` so the scheduler and the action
//! handlers can both drive them. The directory locks are never held while a
//! session mutex is taken; callers clone the handle out first.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::info;

use crate::game::entity::{PlayerId, SessionId};
use crate::game::session::GameSession;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("session {0} already exists")]
    AlreadyExists(SessionId),
    #[error("session {0} not found")]
    NotFound(SessionId),
}

pub type SessionHandle = Arc<Mutex<GameSession>>;

#[derive(Default)]
pub struct SessionDirectory {
    by_id: RwLock<HashMap<SessionId, SessionHandle>>,
    by_player: RwLock<HashMap<PlayerId, SessionId>>,
    next_id: AtomicU32,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self {
            by_id: RwLock::new(HashMap::new()),
            by_player: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Reserve the next session id.
    pub fn allocate_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, id: SessionId, session: SessionHandle) -> Result<(), DirectoryError> {
        let mut by_id = self.by_id.write();
        if by_id.contains_key(&id) {
            return Err(DirectoryError::AlreadyExists(id));
        }
        by_id.insert(id, session);
        info!(session = id, "session registered");
        Ok(())
    }

    pub fn get(&self, id: SessionId) -> Option<SessionHandle> {
        self.by_id.read().get(&id).cloned()
    }

    /// Resolve the session a player is currently mapped to.
    pub fn get_by_player(&self, player_id: PlayerId) -> Option<(SessionId, SessionHandle)> {
        let session_id = *self.by_player.read().get(&player_id)?;
        let handle = self.get(session_id)?;
        Some((session_id, handle))
    }

    pub fn map_player(&self, player_id: PlayerId, session_id: SessionId) {
        self.by_player.write().insert(player_id, session_id);
    }

    pub fn unmap_player(&self, player_id: PlayerId) {
        self.by_player.write().remove(&player_id);
    }

    /// Drop a session and every player mapping pointing at it.
    pub fn remove(&self, id: SessionId) -> Result<SessionHandle, DirectoryError> {
        let removed = self
            .by_id
            .write()
            .remove(&id)
            .ok_or(DirectoryError::NotFound(id))?;
        self.by_player
            .write()
            .retain(|_, session_id| *session_id != id);
        info!(session = id, "session removed");
        Ok(removed)
    }

    /// Snapshot of the live session ids for a scheduler pass.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.by_id.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::directory::players::PlayerDirectory;
    use crate::game::waves::WaveRoster;
    use crate::net::dispatch::QueueDispatch;

    fn handle(id: SessionId) -> SessionHandle {
        let players = Arc::new(PlayerDirectory::new());
        Arc::new(Mutex::new(GameSession::new(
            id,
            ServerConfig::default().into_shared(),
            Arc::clone(&players),
            Arc::new(QueueDispatch::new(players)),
            Arc::new(WaveRoster::standard()),
        )))
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let directory = SessionDirectory::new();
        let id = directory.allocate_id();
        directory.insert(id, handle(id)).unwrap();
        assert!(matches!(
            directory.insert(id, handle(id)),
            Err(DirectoryError::AlreadyExists(other)) if other == id
        ));
    }

    #[test]
    fn test_remove_clears_player_mappings() {
        let directory = SessionDirectory::new();
        let id = directory.allocate_id();
        directory.insert(id, handle(id)).unwrap();
        directory.map_player(42, id);
        assert!(directory.get_by_player(42).is_some());

        directory.remove(id).unwrap();
        assert!(directory.get_by_player(42).is_none());
        assert!(matches!(
            directory.remove(id),
            Err(DirectoryError::NotFound(other)) if other == id
        ));
    }

    #[test]
    fn test_mapping_survives_other_session_removal() {
        let directory = SessionDirectory::new();
        let first = directory.allocate_id();
        let second = directory.allocate_id();
        directory.insert(first, handle(first)).unwrap();
        directory.insert(second, handle(second)).unwrap();
        directory.map_player(1, first);
        directory.map_player(2, second);

        directory.remove(first).unwrap();
        assert!(directory.get_by_player(1).is_none());
        assert_eq!(directory.get_by_player(2).unwrap().0, second);
    }
}
