//! Authoritative game session.
//!
//! One [`GameSession`] owns the full simulation state of one match: the
//! player roster, every live entity, the wave controller, and the queue of
//! position updates awaiting a flush. The scheduler drives it through
//! [`GameSession::process`] under a single mutex, so nothing in here needs
//! interior locking of its own.
//!
//! All outbound traffic leaves through the [`Dispatch`] seam; the session
//! never touches sockets.

use std::mem;
use std::sync::Arc;

use hashbrown::HashMap;
use rand::Rng;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::directory::players::PlayerDirectory;
use crate::game::collision::{self, CollisionOutcome, PlayerSnapshot};
use crate::game::constants::{limits, roster, speed};
use crate::game::entity::{
    Enemies, EnemyKind, Entity, EntityId, EntityKind, IdAllocator, ItemKind, Items, MissileKind,
    Missiles, PlayerId, Position, SessionId, Statistic,
};
use crate::game::wave::{WaveController, WaveError, WaveSignal, WaveSource, WaveWorld};
use crate::net::dispatch::Dispatch;
use crate::net::protocol::{MatchOutcome, Notification, PositionUpdate};
use crate::util::clock::Clock;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {session} is full")]
    RosterFull { session: SessionId },
    #[error("player {player} is already seated in session {session}")]
    AlreadySeated {
        session: SessionId,
        player: PlayerId,
    },
    #[error("session {session} reached the enemy limit")]
    EnemyLimit { session: SessionId },
}

/// Per-category id allocators. Ids are unique within one
/// (session, category) namespace, never across categories.
#[derive(Debug, Default)]
struct SessionCounters {
    player_missiles: IdAllocator,
    enemy_missiles: IdAllocator,
    force_missiles: IdAllocator,
    boss_missiles: IdAllocator,
    enemies: IdAllocator,
    shield_items: IdAllocator,
    force_items: IdAllocator,
}

impl SessionCounters {
    fn missile(&mut self, kind: MissileKind) -> EntityId {
        match kind {
            MissileKind::Player => self.player_missiles.allocate(),
            MissileKind::Enemy => self.enemy_missiles.allocate(),
            MissileKind::Force => self.force_missiles.allocate(),
            MissileKind::Boss => self.boss_missiles.allocate(),
        }
    }

    fn item(&mut self, kind: ItemKind) -> EntityId {
        match kind {
            ItemKind::Shield => self.shield_items.allocate(),
            ItemKind::Force => self.force_items.allocate(),
        }
    }
}

pub struct GameSession {
    id: SessionId,
    /// Fixed roster; 0 marks an empty slot. The slot index determines the
    /// player's starting lane.
    slots: [PlayerId; roster::MAX_PLAYERS],
    missiles: Missiles,
    enemies: Enemies,
    items: Items,
    wave: Option<WaveController>,
    positions: Vec<PositionUpdate>,
    counters: SessionCounters,
    inactivity_clock: Clock,
    wave_clock: Clock,
    move_clock: Clock,
    started: bool,
    /// Set once the roster has been observed empty; arms the grace timer.
    inactive: bool,
    config: Arc<ServerConfig>,
    players: Arc<PlayerDirectory>,
    dispatch: Arc<dyn Dispatch>,
    waves: Arc<dyn WaveSource>,
}

impl GameSession {
    pub fn new(
        id: SessionId,
        config: Arc<ServerConfig>,
        players: Arc<PlayerDirectory>,
        dispatch: Arc<dyn Dispatch>,
        waves: Arc<dyn WaveSource>,
    ) -> Self {
        info!(session = id, "session created");
        Self {
            id,
            slots: [0; roster::MAX_PLAYERS],
            missiles: Missiles::default(),
            enemies: Enemies::default(),
            items: Items::default(),
            wave: None,
            positions: Vec::new(),
            counters: SessionCounters::default(),
            inactivity_clock: Clock::new(),
            wave_clock: Clock::new(),
            move_clock: Clock::new(),
            started: false,
            inactive: false,
            config,
            players,
            dispatch,
            waves,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn player_count(&self) -> usize {
        self.slots.iter().filter(|slot| **slot != 0).count()
    }

    pub fn is_full(&self) -> bool {
        self.player_count() == roster::MAX_PLAYERS
    }

    pub fn contains_player(&self, player_id: PlayerId) -> bool {
        player_id != 0 && self.slots.contains(&player_id)
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.slots.iter().copied().filter(|slot| *slot != 0).collect()
    }

    /// Seat a player in the first free slot and introduce everyone.
    ///
    /// The starting position is the slot's lane: x = 0, y centered in the
    /// slot's quarter of the field.
    pub fn add_player(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        if self.contains_player(player_id) {
            return Err(SessionError::AlreadySeated {
                session: self.id,
                player: player_id,
            });
        }
        let Some(slot) = self.slots.iter().position(|slot| *slot == 0) else {
            return Err(SessionError::RosterFull { session: self.id });
        };

        let lane_height = self.config.field_height / roster::MAX_PLAYERS as u16;
        let position = Position::new(0, lane_height * slot as u16 + lane_height / 2);

        if let Some(player) = self.players.get(player_id) {
            player.set_position(position);
            player.set_playing(true);
            player.set_alive(true);
        }

        // Seat first so the introduction reaches the joiner too: every
        // occupied slot hears about the joiner, and the joiner additionally
        // hears about each already-present peer.
        self.slots[slot] = player_id;
        for seat in self.player_ids() {
            self.dispatch.notify(seat, Notification::Joined { player_id });
            if seat != player_id {
                self.dispatch
                    .notify(player_id, Notification::Joined { player_id: seat });
            }
        }
        self.inactive = false;
        info!(session = self.id, player = player_id, slot, "player joined session");
        Ok(())
    }

    /// Free the player's slot and tell the remaining players.
    pub fn remove_player(&mut self, player_id: PlayerId) {
        let Some(slot) = self.slots.iter().position(|slot| *slot == player_id) else {
            return;
        };
        self.slots[slot] = 0;
        if let Some(player) = self.players.get(player_id) {
            player.set_playing(false);
            player.set_alive(false);
        }
        self.broadcast(Notification::Left { player_id });
        info!(session = self.id, player = player_id, "player left session");
    }

    /// Mark the player dead. The slot stays occupied so the player keeps
    /// receiving the rest of the match.
    pub fn kill_player(&mut self, player_id: PlayerId) {
        if !self.contains_player(player_id) {
            return;
        }
        if let Some(player) = self.players.get(player_id) {
            if !player.is_alive() {
                return;
            }
            player.set_alive(false);
        }
        self.broadcast(Notification::Died {
            id: player_id,
            kind: EntityKind::Character,
        });
        info!(session = self.id, player = player_id, "player died");
    }

    /// Whether the session has been empty for the configured grace period.
    ///
    /// The first empty observation only arms the timer, so a session is
    /// never reaped on the same tick its last player leaves.
    pub fn is_inactive(&mut self) -> bool {
        if self.player_count() > 0 {
            self.inactive = false;
            return false;
        }
        if !self.inactive {
            self.inactive = true;
            self.inactivity_clock.reset();
            return false;
        }
        self.inactivity_clock
            .has_elapsed(self.config.inactivity_timeout_ms)
    }

    /// One scheduler tick: wave logic, then entity movement, then the
    /// position flush. No-op until the match starts.
    pub fn process(&mut self) {
        if !self.started {
            return;
        }
        if let Some(mut wave) = self.wave.take() {
            let delta = self.wave_clock.elapsed_seconds();
            self.wave_clock.reset();
            let signal = wave.process(delta, &mut WorldView { session: self });
            match signal {
                WaveSignal::Continue => {
                    self.wave = Some(wave);
                    self.move_entities();
                    self.flush_positions();
                }
                // The wave change clears transient state; movement resumes
                // next tick.
                WaveSignal::Next => {
                    self.wave = Some(wave);
                    self.next_wave();
                }
                WaveSignal::Stop => self.stop(),
            }
        }
    }

    /// Begin the match: load the first wave and send every player the full
    /// starting lineup. Idempotent.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        let mut controller = WaveController::new(self.id, Arc::clone(&self.waves));
        // A failed first load surfaces as Stop on the next process pass.
        controller.activate(&mut WorldView { session: self });
        self.wave = Some(controller);

        let mut positions: Vec<(PlayerId, Position)> = Vec::new();
        for player_id in self.player_ids() {
            if let Some(player) = self.players.get(player_id) {
                positions.push((player_id, player.position()));
            }
        }
        self.broadcast(Notification::Started {
            positions: positions.clone(),
        });

        self.started = true;
        self.wave_clock.reset();
        self.move_clock.reset();
        info!(session = self.id, players = positions.len(), "session started");
    }

    /// End the match: shared outcome, then evict everyone. Idempotent.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        self.wave = None;

        let any_alive = self.player_ids().iter().any(|id| {
            self.players
                .get(*id)
                .is_some_and(|player| player.is_alive())
        });
        let outcome = if any_alive {
            MatchOutcome::Win
        } else {
            MatchOutcome::Lose
        };
        self.broadcast(Notification::Stopped { outcome });
        for player_id in self.player_ids() {
            self.remove_player(player_id);
        }
        self.positions.clear();
        info!(session = self.id, ?outcome, "session stopped");
    }

    /// Announce the wave change and drop stale queued positions.
    fn next_wave(&mut self) {
        self.broadcast(Notification::NextWave);
        self.positions.clear();
    }

    /// Queue one position for the next flush. Bounded; overflow drops the
    /// update, never the session.
    pub fn queue_position(&mut self, id: EntityId, kind: EntityKind, position: Position) {
        if self.positions.len() >= limits::MAX_QUEUED_POSITIONS {
            warn!(session = self.id, "position queue full, dropping update");
            return;
        }
        self.positions.push(PositionUpdate { id, kind, position });
    }

    /// Send the queued batch to every seated player and reset the queue.
    fn flush_positions(&mut self) {
        if self.positions.is_empty() {
            return;
        }
        let batch = mem::take(&mut self.positions);
        self.broadcast(Notification::Positions(batch));
    }

    /// Gated movement pass: autonomous missiles advance, expired statistics
    /// switch off, and the collision rules run over the snapshot.
    fn move_entities(&mut self) {
        if !self
            .move_clock
            .has_elapsed(self.config.entity_move_interval_ms)
        {
            return;
        }
        self.move_clock.reset();

        let field_width = self.config.field_width;

        // Friendly missiles fly right and expire past the right edge.
        for kind in [MissileKind::Player, MissileKind::Force] {
            let mut expired: SmallVec<[EntityId; 16]> = SmallVec::new();
            let mut moved: Vec<(EntityId, Position)> = Vec::new();
            for entity in self.missiles.by_kind_mut(kind).values_mut() {
                if entity.position.x >= field_width {
                    expired.push(entity.id);
                } else {
                    entity.position.x =
                        entity.position.x.saturating_add(speed::MISSILE).min(field_width);
                    moved.push((entity.id, entity.position));
                }
            }
            for id in expired {
                self.remove_missile(id, kind);
            }
            for (id, position) in moved {
                self.queue_position(id, kind.into(), position);
            }
        }

        // Hostile (enemy, boss) missiles are wave-steered through the delta
        // mover and despawn there on a negative x; only the friendly kinds
        // advance autonomously.

        // Timed statistics burn down in real time, deactivation included.
        for player_id in self.player_ids() {
            if let Some(player) = self.players.get(player_id) {
                for statistic in [Statistic::Shield, Statistic::Force] {
                    if player.is_statistic_expired(statistic, self.config.statistic_duration_ms) {
                        self.set_player_statistic(player_id, statistic, false, false);
                    }
                }
            }
        }

        let mut snapshots: Vec<PlayerSnapshot> = Vec::new();
        for player_id in self.player_ids() {
            if let Some(player) = self.players.get(player_id) {
                if player.is_alive() {
                    snapshots.push(PlayerSnapshot {
                        id: player_id,
                        position: player.position(),
                        shielded: player.is_statistic_active(Statistic::Shield),
                    });
                }
            }
        }
        let outcome = collision::check(&snapshots, &self.enemies, &self.missiles, &self.items);
        self.apply_collisions(outcome);
    }

    fn apply_collisions(&mut self, outcome: CollisionOutcome) {
        let CollisionOutcome {
            missiles,
            damaged,
            rammed,
            players,
            shields,
            forces,
        } = outcome;

        let damage_groups: [(EnemyKind, HashMap<EntityId, i32>); 4] = [
            (EnemyKind::Generic, damaged.generic),
            (EnemyKind::Walking, damaged.walking),
            (EnemyKind::Flying, damaged.flying),
            (EnemyKind::Boss, damaged.boss),
        ];
        for (kind, group) in damage_groups {
            for (id, amount) in group {
                self.damage_enemy(id, kind, amount);
            }
        }

        for (kind, group) in [
            (EnemyKind::Generic, rammed.generic),
            (EnemyKind::Walking, rammed.walking),
            (EnemyKind::Flying, rammed.flying),
            (EnemyKind::Boss, rammed.boss),
        ] {
            for id in group {
                self.remove_enemy(id, kind);
            }
        }

        for (kind, group) in [
            (MissileKind::Player, missiles.player),
            (MissileKind::Enemy, missiles.enemy),
            (MissileKind::Force, missiles.force),
            (MissileKind::Boss, missiles.boss),
        ] {
            for id in group {
                self.remove_missile(id, kind);
            }
        }

        for (item_id, player_id) in shields {
            self.remove_item(item_id, ItemKind::Shield);
            self.set_player_statistic(player_id, Statistic::Shield, true, false);
        }
        for (item_id, player_id) in forces {
            self.remove_item(item_id, ItemKind::Force);
            self.set_player_statistic(player_id, Statistic::Force, true, false);
        }

        for player_id in players {
            self.kill_player(player_id);
        }
    }

    pub fn create_missile(&mut self, kind: MissileKind, position: Position) -> EntityId {
        let id = self.counters.missile(kind);
        self.missiles.by_kind_mut(kind).insert(
            id,
            Entity {
                id,
                position,
                health: 0,
            },
        );
        self.broadcast(Notification::Spawned {
            id,
            kind: kind.into(),
            position,
        });
        id
    }

    /// Spawn an enemy, enforcing the live minion cap. Bosses are exempt.
    pub fn create_enemy(
        &mut self,
        kind: EnemyKind,
        position: Position,
    ) -> Result<EntityId, SessionError> {
        if kind != EnemyKind::Boss && self.enemies.minion_count() >= limits::MAX_ENEMIES {
            return Err(SessionError::EnemyLimit { session: self.id });
        }
        let id = self.counters.enemies.allocate();
        self.enemies.by_kind_mut(kind).insert(
            id,
            Entity {
                id,
                position,
                health: kind.starting_health(),
            },
        );
        self.broadcast(Notification::Spawned {
            id,
            kind: kind.into(),
            position,
        });
        Ok(id)
    }

    pub fn create_item(&mut self, kind: ItemKind, position: Position) -> EntityId {
        let id = self.counters.item(kind);
        self.items.by_kind_mut(kind).insert(
            id,
            Entity {
                id,
                position,
                health: 0,
            },
        );
        self.broadcast(Notification::Spawned {
            id,
            kind: kind.into(),
            position,
        });
        id
    }

    pub fn get_missile(&self, id: EntityId, kind: MissileKind) -> Option<Entity> {
        self.missiles.by_kind(kind).get(&id).copied()
    }

    pub fn get_enemy(&self, id: EntityId, kind: EnemyKind) -> Option<Entity> {
        self.enemies.by_kind(kind).get(&id).copied()
    }

    pub fn get_item(&self, id: EntityId, kind: ItemKind) -> Option<Entity> {
        self.items.by_kind(kind).get(&id).copied()
    }

    /// Displace a missile. A negative resulting x removes it instead;
    /// otherwise the position clamps to the field.
    pub fn move_missile(&mut self, id: EntityId, kind: MissileKind, dx: i16, dy: i16) {
        let (field_width, field_height) = (self.config.field_width, self.config.field_height);
        let Some(entity) = self.missiles.by_kind_mut(kind).get_mut(&id) else {
            return;
        };
        let new_x = i32::from(entity.position.x) + i32::from(dx);
        if new_x < 0 {
            self.remove_missile(id, kind);
            return;
        }
        // Clamp in i32 before narrowing; the cast alone would wrap.
        entity.position.x = new_x.min(i32::from(field_width)) as u16;
        let new_y = (i32::from(entity.position.y) + i32::from(dy))
            .clamp(0, i32::from(field_height));
        entity.position.y = new_y as u16;
        let position = entity.position;
        self.queue_position(id, kind.into(), position);
    }

    /// Displace an enemy, clamped to the field on both axes.
    pub fn move_enemy(&mut self, id: EntityId, kind: EnemyKind, dx: i16, dy: i16) {
        let (field_width, field_height) = (self.config.field_width, self.config.field_height);
        let Some(entity) = self.enemies.by_kind_mut(kind).get_mut(&id) else {
            return;
        };
        let new_x = (i32::from(entity.position.x) + i32::from(dx))
            .clamp(0, i32::from(field_width));
        entity.position.x = new_x as u16;
        let new_y = (i32::from(entity.position.y) + i32::from(dy))
            .clamp(0, i32::from(field_height));
        entity.position.y = new_y as u16;
        let position = entity.position;
        self.queue_position(id, kind.into(), position);
    }

    /// Apply damage; returns whether the enemy died from it.
    pub fn damage_enemy(&mut self, id: EntityId, kind: EnemyKind, amount: i32) -> bool {
        let Some(entity) = self.enemies.by_kind_mut(kind).get_mut(&id) else {
            return false;
        };
        entity.health -= amount;
        let dead = entity.health <= 0;
        if dead {
            self.remove_enemy(id, kind);
        }
        dead
    }

    /// Idempotent removal; the death notification fires only on the call
    /// that actually removed the entity.
    pub fn remove_missile(&mut self, id: EntityId, kind: MissileKind) {
        if self.missiles.by_kind_mut(kind).remove(&id).is_some() {
            self.broadcast(Notification::Died {
                id,
                kind: kind.into(),
            });
        }
    }

    pub fn remove_enemy(&mut self, id: EntityId, kind: EnemyKind) {
        if self.enemies.by_kind_mut(kind).remove(&id).is_some() {
            self.broadcast(Notification::Died {
                id,
                kind: kind.into(),
            });
        }
    }

    pub fn remove_item(&mut self, id: EntityId, kind: ItemKind) {
        if self.items.by_kind_mut(kind).remove(&id).is_some() {
            self.broadcast(Notification::Died {
                id,
                kind: kind.into(),
            });
        }
    }

    /// Flip a statistic on the player and broadcast only when the player
    /// actually accepted the change (override rules can refuse it).
    pub fn set_player_statistic(
        &self,
        player_id: PlayerId,
        statistic: Statistic,
        active: bool,
        overridden: bool,
    ) {
        let Some(player) = self.players.get(player_id) else {
            return;
        };
        if player.set_statistic(statistic, active, overridden) {
            self.broadcast(Notification::Statistic {
                player_id,
                statistic,
                active,
            });
        } else {
            debug!(
                session = self.id,
                player = player_id,
                "statistic change refused"
            );
        }
    }

    /// Deliver to every seated player.
    fn broadcast(&self, notification: Notification) {
        for slot in self.slots {
            if slot != 0 {
                self.dispatch.notify(slot, notification.clone());
            }
        }
    }
}

/// Borrowed capability view handed to wave behaviors for one call.
struct WorldView<'a> {
    session: &'a mut GameSession,
}

impl WaveWorld for WorldView<'_> {
    fn enemies(&self, kind: EnemyKind) -> Vec<Entity> {
        self.session.enemies.by_kind(kind).values().copied().collect()
    }

    fn create_enemy(
        &mut self,
        kind: EnemyKind,
        position: Position,
    ) -> Result<EntityId, WaveError> {
        self.session
            .create_enemy(kind, position)
            .map_err(|err| WaveError::World(err.to_string()))
    }

    fn move_enemy(&mut self, id: EntityId, kind: EnemyKind, dx: i16, dy: i16) {
        self.session.move_enemy(id, kind, dx, dy);
    }

    fn remove_enemy(&mut self, id: EntityId, kind: EnemyKind) {
        self.session.remove_enemy(id, kind);
    }

    fn missiles(&self, kind: MissileKind) -> Vec<Entity> {
        self.session.missiles.by_kind(kind).values().copied().collect()
    }

    fn create_missile(&mut self, kind: MissileKind, position: Position) -> EntityId {
        self.session.create_missile(kind, position)
    }

    fn move_missile(&mut self, id: EntityId, kind: MissileKind, dx: i16, dy: i16) {
        self.session.move_missile(id, kind, dx, dy);
    }

    fn remove_missile(&mut self, id: EntityId, kind: MissileKind) {
        self.session.remove_missile(id, kind);
    }

    fn items(&self, kind: ItemKind) -> Vec<Entity> {
        self.session.items.by_kind(kind).values().copied().collect()
    }

    fn create_item(&mut self, kind: ItemKind, position: Position) -> EntityId {
        self.session.create_item(kind, position)
    }

    fn remove_item(&mut self, id: EntityId, kind: ItemKind) {
        self.session.remove_item(id, kind);
    }

    fn field_width(&self) -> u16 {
        self.session.config.field_width
    }

    fn field_height(&self) -> u16 {
        self.session.config.field_height
    }

    fn session_id(&self) -> SessionId {
        self.session.id
    }

    fn player_count(&self) -> usize {
        self.session.player_count()
    }

    fn player_ids(&self) -> Vec<PlayerId> {
        self.session.player_ids()
    }

    fn player_position(&self, id: PlayerId) -> Option<Position> {
        if !self.session.contains_player(id) {
            return None;
        }
        self.session.players.get(id).map(|player| player.position())
    }

    fn log(&self, message: &str) {
        info!(session = self.session.id, "{message}");
    }

    fn random(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}
