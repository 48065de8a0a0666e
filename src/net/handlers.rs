//! Inbound action handlers.
//!
//! The transport layer decodes a packet, resolves the sending player, and
//! calls one method here. Every handler re-validates the player's state
//! before acting; a request that fails validation is logged and dropped,
//! never answered with an error payload. Clients learn outcomes from the
//! notifications the successful path emits.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::directory::player::{Direction, Player};
use crate::directory::players::PlayerDirectory;
use crate::directory::sessions::{SessionDirectory, SessionHandle};
use crate::game::constants::roster;
use crate::game::entity::{EntityKind, MissileKind, PlayerId, SessionId, Statistic};
use crate::game::session::GameSession;
use crate::game::wave::WaveSource;
use crate::net::dispatch::Dispatch;
use crate::net::protocol::{ActionKind, Notification};

pub struct Actions {
    sessions: Arc<SessionDirectory>,
    players: Arc<PlayerDirectory>,
    config: Arc<ServerConfig>,
    dispatch: Arc<dyn Dispatch>,
    waves: Arc<dyn WaveSource>,
}

impl Actions {
    pub fn new(
        sessions: Arc<SessionDirectory>,
        players: Arc<PlayerDirectory>,
        config: Arc<ServerConfig>,
        dispatch: Arc<dyn Dispatch>,
        waves: Arc<dyn WaveSource>,
    ) -> Self {
        Self {
            sessions,
            players,
            config,
            dispatch,
            waves,
        }
    }

    /// Routed entry point for the transport layer: one decoded packet in,
    /// the matching handler out. Malformed payloads and server-to-client
    /// action kinds are logged and dropped.
    pub fn deliver(&self, action: ActionKind, player_id: PlayerId, payload: &[u8]) {
        match action {
            ActionKind::Create => self.create_session(player_id),
            ActionKind::Join => match payload.try_into().map(u32::from_le_bytes) {
                Ok(session_id) => self.join_session(player_id, session_id),
                Err(_) => debug!(player = player_id, "malformed join payload"),
            },
            ActionKind::Leave => self.leave_session(player_id),
            ActionKind::Start => self.start_session(player_id),
            ActionKind::Move => match payload.first() {
                Some(code) => self.move_player(player_id, *code),
                None => debug!(player = player_id, "empty move payload"),
            },
            ActionKind::Shoot => self.shoot(player_id),
            ActionKind::GodMode => self.toggle_god(player_id),
            other => {
                debug!(player = player_id, ?other, "unhandled inbound action");
            }
        }
    }

    /// Connected player with no current session.
    fn idle_player(&self, player_id: PlayerId) -> Option<Arc<Player>> {
        let player = self.players.get(player_id)?;
        if !player.is_connected() {
            warn!(player = player_id, "player not connected");
            return None;
        }
        if player.is_playing() {
            warn!(player = player_id, "player already in a session");
            return None;
        }
        Some(player)
    }

    /// Connected player currently seated in a session.
    fn seated_player(&self, player_id: PlayerId) -> Option<(Arc<Player>, SessionHandle)> {
        let player = self.players.get(player_id)?;
        if !player.is_connected() {
            warn!(player = player_id, "player not connected");
            return None;
        }
        if !player.is_playing() {
            warn!(player = player_id, "player not in a session");
            return None;
        }
        let (_, handle) = self.sessions.get_by_player(player_id)?;
        Some((player, handle))
    }

    /// Create a new session. The creator is told its id but does not join.
    pub fn create_session(&self, player_id: PlayerId) {
        if self.idle_player(player_id).is_none() {
            return;
        }
        let session_id = self.sessions.allocate_id();
        let session = GameSession::new(
            session_id,
            Arc::clone(&self.config),
            Arc::clone(&self.players),
            Arc::clone(&self.dispatch),
            Arc::clone(&self.waves),
        );
        if let Err(err) = self.sessions.insert(session_id, Arc::new(Mutex::new(session))) {
            warn!(player = player_id, %err, "failed to register session");
            return;
        }
        self.dispatch
            .notify(player_id, Notification::Created { session_id });
    }

    /// Seat the player in an open, not yet started session.
    pub fn join_session(&self, player_id: PlayerId, session_id: SessionId) {
        if self.idle_player(player_id).is_none() {
            return;
        }
        let Some(handle) = self.sessions.get(session_id) else {
            warn!(player = player_id, session = session_id, "session not found");
            return;
        };
        let mut session = handle.lock();
        if session.is_started() {
            warn!(player = player_id, session = session_id, "session already started");
            return;
        }
        if session.is_full() {
            warn!(player = player_id, session = session_id, "session already full");
            return;
        }
        match session.add_player(player_id) {
            Ok(()) => self.sessions.map_player(player_id, session_id),
            Err(err) => warn!(player = player_id, %err, "failed to join session"),
        }
    }

    /// Leave the current session.
    pub fn leave_session(&self, player_id: PlayerId) {
        let Some((_, handle)) = self.seated_player(player_id) else {
            return;
        };
        handle.lock().remove_player(player_id);
        self.sessions.unmap_player(player_id);
    }

    /// Start the current session once enough players are seated.
    pub fn start_session(&self, player_id: PlayerId) {
        let Some((_, handle)) = self.seated_player(player_id) else {
            return;
        };
        let mut session = handle.lock();
        if session.is_started() {
            warn!(player = player_id, session = session.id(), "session already started");
            return;
        }
        if session.player_count() < roster::MIN_PLAYERS {
            warn!(
                player = player_id,
                session = session.id(),
                "not enough players to start the session"
            );
            return;
        }
        session.start();
    }

    /// Move the player one step and queue the resulting position.
    pub fn move_player(&self, player_id: PlayerId, direction_code: u8) {
        let Some((player, handle)) = self.seated_player(player_id) else {
            return;
        };
        let Some(direction) = Direction::from_code(direction_code) else {
            debug!(player = player_id, code = direction_code, "unknown direction");
            return;
        };
        let mut session = handle.lock();
        if !session.is_started() || !player.is_alive() {
            return;
        }
        let position = player.step(direction, self.config.field_width, self.config.field_height);
        session.queue_position(player_id, EntityKind::Character, position);
    }

    /// Fire from the player's current position. An active force statistic
    /// upgrades the shot.
    pub fn shoot(&self, player_id: PlayerId) {
        let Some((player, handle)) = self.seated_player(player_id) else {
            return;
        };
        let mut session = handle.lock();
        if !session.is_started() || !player.is_alive() {
            return;
        }
        let kind = if player.is_statistic_active(Statistic::Force) {
            MissileKind::Force
        } else {
            MissileKind::Player
        };
        session.create_missile(kind, player.position());
    }

    /// Administrator-only invulnerability toggle: a shield that never
    /// expires, flipped by the same player pressing again.
    pub fn toggle_god(&self, player_id: PlayerId) {
        let Some((player, handle)) = self.seated_player(player_id) else {
            return;
        };
        if !player.is_administrator() {
            warn!(player = player_id, "god mode requires administrator role");
            return;
        }
        let session = handle.lock();
        if !session.is_started() {
            return;
        }
        let activate = !player.is_statistic_active(Statistic::Shield);
        session.set_player_statistic(player_id, Statistic::Shield, activate, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::player::Role;
    use crate::game::entity::Position;
    use crate::game::waves::WaveRoster;
    use crate::net::dispatch::QueueDispatch;
    use crate::net::protocol::Transport;

    struct Fixture {
        actions: Actions,
        players: Arc<PlayerDirectory>,
        sessions: Arc<SessionDirectory>,
    }

    fn fixture() -> Fixture {
        let players = Arc::new(PlayerDirectory::new());
        let sessions = Arc::new(SessionDirectory::new());
        let dispatch: Arc<dyn Dispatch> = Arc::new(QueueDispatch::new(Arc::clone(&players)));
        let actions = Actions::new(
            Arc::clone(&sessions),
            Arc::clone(&players),
            ServerConfig::default().into_shared(),
            dispatch,
            Arc::new(WaveRoster::standard()),
        );
        Fixture {
            actions,
            players,
            sessions,
        }
    }

    /// Create a session through the handler and return its id from the ack.
    fn created_session(fixture: &Fixture, creator: &Player) -> u32 {
        fixture.actions.create_session(creator.id());
        match creator.pop_notification(Transport::Reliable) {
            Some(Notification::Created { session_id }) => session_id,
            other => panic!("expected creation ack, got {other:?}"),
        }
    }

    #[test]
    fn test_create_acks_but_does_not_seat_creator() {
        let fixture = fixture();
        let creator = fixture.players.register(Role::Player);
        let session_id = created_session(&fixture, &creator);
        let handle = fixture.sessions.get(session_id).unwrap();
        assert_eq!(handle.lock().player_count(), 0);
        assert!(!creator.is_playing());
    }

    #[test]
    fn test_create_requires_idle_player() {
        let fixture = fixture();
        let creator = fixture.players.register(Role::Player);
        let session_id = created_session(&fixture, &creator);
        fixture.actions.join_session(creator.id(), session_id);
        assert!(creator.is_playing());
        // Joining queues the self-introduction; drain it.
        assert!(matches!(
            creator.pop_notification(Transport::Reliable),
            Some(Notification::Joined { .. })
        ));

        // Seated players cannot create another session.
        fixture.actions.create_session(creator.id());
        assert!(creator.pop_notification(Transport::Reliable).is_none());
        assert_eq!(fixture.sessions.len(), 1);
    }

    #[test]
    fn test_join_rejected_after_start() {
        let fixture = fixture();
        let creator = fixture.players.register(Role::Player);
        let session_id = created_session(&fixture, &creator);
        let a = fixture.players.register(Role::Player);
        let b = fixture.players.register(Role::Player);
        fixture.actions.join_session(a.id(), session_id);
        fixture.actions.join_session(b.id(), session_id);
        fixture.actions.start_session(a.id());

        let late = fixture.players.register(Role::Player);
        fixture.actions.join_session(late.id(), session_id);
        assert!(!late.is_playing());
        assert!(fixture.sessions.get_by_player(late.id()).is_none());
    }

    #[test]
    fn test_start_needs_minimum_roster() {
        let fixture = fixture();
        let creator = fixture.players.register(Role::Player);
        let session_id = created_session(&fixture, &creator);
        let only = fixture.players.register(Role::Player);
        fixture.actions.join_session(only.id(), session_id);

        fixture.actions.start_session(only.id());
        assert!(!fixture.sessions.get(session_id).unwrap().lock().is_started());

        let second = fixture.players.register(Role::Player);
        fixture.actions.join_session(second.id(), session_id);
        fixture.actions.start_session(only.id());
        assert!(fixture.sessions.get(session_id).unwrap().lock().is_started());
    }

    #[test]
    fn test_leave_unmaps_player() {
        let fixture = fixture();
        let creator = fixture.players.register(Role::Player);
        let session_id = created_session(&fixture, &creator);
        let a = fixture.players.register(Role::Player);
        fixture.actions.join_session(a.id(), session_id);
        assert!(fixture.sessions.get_by_player(a.id()).is_some());

        fixture.actions.leave_session(a.id());
        assert!(!a.is_playing());
        assert!(fixture.sessions.get_by_player(a.id()).is_none());
    }

    #[test]
    fn test_move_steps_and_queues_position() {
        let fixture = fixture();
        let creator = fixture.players.register(Role::Player);
        let session_id = created_session(&fixture, &creator);
        let a = fixture.players.register(Role::Player);
        let b = fixture.players.register(Role::Player);
        fixture.actions.join_session(a.id(), session_id);
        fixture.actions.join_session(b.id(), session_id);
        fixture.actions.start_session(a.id());

        let before = a.position();
        // Code 4 is right.
        fixture.actions.move_player(a.id(), 4);
        assert_eq!(a.position(), Position::new(before.x + 4, before.y));
    }

    #[test]
    fn test_shoot_kind_follows_force_statistic() {
        let fixture = fixture();
        let creator = fixture.players.register(Role::Player);
        let session_id = created_session(&fixture, &creator);
        let a = fixture.players.register(Role::Player);
        let b = fixture.players.register(Role::Player);
        fixture.actions.join_session(a.id(), session_id);
        fixture.actions.join_session(b.id(), session_id);
        fixture.actions.start_session(a.id());

        fixture.actions.shoot(a.id());
        let handle = fixture.sessions.get(session_id).unwrap();
        {
            let session = handle.lock();
            assert!(session.get_missile(1, MissileKind::Player).is_some());
        }

        a.set_statistic(Statistic::Force, true, false);
        fixture.actions.shoot(a.id());
        assert!(handle.lock().get_missile(1, MissileKind::Force).is_some());
    }

    #[test]
    fn test_deliver_routes_by_action_kind() {
        let fixture = fixture();
        let creator = fixture.players.register(Role::Player);
        fixture.actions.deliver(ActionKind::Create, creator.id(), &[]);
        let session_id = match creator.pop_notification(Transport::Reliable) {
            Some(Notification::Created { session_id }) => session_id,
            other => panic!("expected creation ack, got {other:?}"),
        };
        let a = fixture.players.register(Role::Player);
        fixture
            .actions
            .deliver(ActionKind::Join, a.id(), &session_id.to_le_bytes());
        assert!(a.is_playing());

        // Malformed payloads are dropped without effect.
        let b = fixture.players.register(Role::Player);
        fixture.actions.deliver(ActionKind::Join, b.id(), &[1, 2]);
        assert!(!b.is_playing());
    }

    #[test]
    fn test_god_mode_restricted_to_administrators() {
        let fixture = fixture();
        let creator = fixture.players.register(Role::Player);
        let session_id = created_session(&fixture, &creator);
        let admin = fixture.players.register(Role::Administrator);
        let mortal = fixture.players.register(Role::Player);
        fixture.actions.join_session(admin.id(), session_id);
        fixture.actions.join_session(mortal.id(), session_id);
        fixture.actions.start_session(admin.id());

        fixture.actions.toggle_god(mortal.id());
        assert!(!mortal.is_statistic_active(Statistic::Shield));

        fixture.actions.toggle_god(admin.id());
        assert!(admin.is_statistic_active(Statistic::Shield));
        // Overridden shields never expire on their own.
        assert!(!admin.is_statistic_expired(Statistic::Shield, 0));

        fixture.actions.toggle_god(admin.id());
        assert!(!admin.is_statistic_active(Statistic::Shield));
    }
}
