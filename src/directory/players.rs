//! Global player directory.
//!
//! Players are registered when a transport connection identifies itself and
//! removed when it goes away. Sessions reference players by id and resolve
//! through this directory, so a disconnected player simply stops resolving.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::directory::player::{Player, Role};
use crate::game::entity::PlayerId;

#[derive(Default)]
pub struct PlayerDirectory {
    players: RwLock<HashMap<PlayerId, Arc<Player>>>,
    next_id: AtomicU32,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            // 0 is the empty-slot sentinel in session rosters
            next_id: AtomicU32::new(1),
        }
    }

    /// Register a new player and hand back its shared handle.
    pub fn register(&self, role: Role) -> Arc<Player> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let player = Arc::new(Player::new(id, role));
        player.set_connected(true);
        self.players.write().insert(id, Arc::clone(&player));
        debug!(player = id, ?role, "player registered");
        player
    }

    pub fn get(&self, id: PlayerId) -> Option<Arc<Player>> {
        self.players.read().get(&id).cloned()
    }

    pub fn remove(&self, id: PlayerId) -> Option<Arc<Player>> {
        let removed = self.players.write().remove(&id);
        if let Some(player) = &removed {
            player.set_connected(false);
            debug!(player = id, "player removed");
        }
        removed
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.players.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.read().is_empty()
    }
}
