//! Outbound notification routing.
//!
//! Game logic never talks to sockets. It hands notifications to a
//! [`Dispatch`] which routes them to the recipient's per-transport outbox;
//! the transport layer drains those queues on its own cadence. The trait
//! seam also lets tests capture traffic with a recording fake.

use std::sync::Arc;

use tracing::debug;

use crate::directory::players::PlayerDirectory;
use crate::game::entity::PlayerId;
use crate::net::protocol::Notification;

pub trait Dispatch: Send + Sync {
    /// Route one notification to one player. Unknown recipients are dropped.
    fn notify(&self, player_id: PlayerId, notification: Notification);
}

/// Production dispatch: resolves the player and queues on the channel the
/// notification asks for.
pub struct QueueDispatch {
    players: Arc<PlayerDirectory>,
}

impl QueueDispatch {
    pub fn new(players: Arc<PlayerDirectory>) -> Self {
        Self { players }
    }
}

impl Dispatch for QueueDispatch {
    fn notify(&self, player_id: PlayerId, notification: Notification) {
        match self.players.get(player_id) {
            Some(player) => {
                player.push_notification(notification.transport(), notification);
            }
            None => {
                // Normal during disconnect races; the session will notice.
                debug!(player = player_id, "dropping notification for unknown player");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::player::Role;
    use crate::net::protocol::Transport;

    #[test]
    fn test_notify_queues_on_declared_transport() {
        let players = Arc::new(PlayerDirectory::new());
        let player = players.register(Role::Player);
        let dispatch = QueueDispatch::new(Arc::clone(&players));

        dispatch.notify(player.id(), Notification::NextWave);
        assert!(player.has_notification(Transport::Reliable));
        assert!(!player.has_notification(Transport::Unreliable));

        dispatch.notify(player.id(), Notification::Positions(Vec::new()));
        assert!(player.has_notification(Transport::Unreliable));
    }

    #[test]
    fn test_notify_unknown_player_is_silent() {
        let players = Arc::new(PlayerDirectory::new());
        let dispatch = QueueDispatch::new(players);
        dispatch.notify(999, Notification::NextWave);
    }
}
