//! In-match player handle.
//!
//! Credential storage and socket I/O live outside the core; this handle only
//! carries the state the simulation reads and mutates: position, liveness
//! flags, timed statistics, and the per-transport outbound queues the writer
//! threads drain. Flags use atomics and each queue has its own lock so a
//! stalled reliable send never blocks unreliable delivery.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::game::constants::speed;
use crate::game::entity::{PlayerId, Position, Statistic};
use crate::net::protocol::{Notification, Transport};
use crate::util::clock::Clock;

/// Player privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrator,
    Player,
}

/// 8-way movement directions, by wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    DownRight = 0,
    DownLeft = 1,
    UpRight = 2,
    UpLeft = 3,
    Right = 4,
    Down = 5,
    Left = 6,
    Up = 7,
}

impl Direction {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Direction::DownRight,
            1 => Direction::DownLeft,
            2 => Direction::UpRight,
            3 => Direction::UpLeft,
            4 => Direction::Right,
            5 => Direction::Down,
            6 => Direction::Left,
            7 => Direction::Up,
            _ => return None,
        })
    }

    /// Displacement in world units for one movement action.
    fn deltas(self) -> (i32, i32) {
        let step = i32::from(speed::PLAYER);
        match self {
            Direction::DownRight => (step, step),
            Direction::DownLeft => (-step, step),
            Direction::UpRight => (step, -step),
            Direction::UpLeft => (-step, -step),
            Direction::Right => (step, 0),
            Direction::Down => (0, step),
            Direction::Left => (-step, 0),
            Direction::Up => (0, -step),
        }
    }
}

/// One timed buff: activation flag plus the clock measuring its lifetime.
#[derive(Debug)]
struct StatisticState {
    clock: Clock,
    active: bool,
}

impl StatisticState {
    fn new() -> Self {
        Self {
            clock: Clock::new(),
            active: false,
        }
    }
}

#[derive(Debug)]
struct StatisticSet {
    shield: StatisticState,
    force: StatisticState,
}

impl StatisticSet {
    fn get_mut(&mut self, statistic: Statistic) -> &mut StatisticState {
        match statistic {
            Statistic::Shield => &mut self.shield,
            Statistic::Force => &mut self.force,
        }
    }

    fn get(&self, statistic: Statistic) -> &StatisticState {
        match statistic {
            Statistic::Shield => &self.shield,
            Statistic::Force => &self.force,
        }
    }
}

/// A connected player. Shared across threads behind `Arc` by the directory.
pub struct Player {
    id: PlayerId,
    role: Role,
    position: Mutex<Position>,
    playing: AtomicBool,
    alive: AtomicBool,
    connected: AtomicBool,
    /// Admin override: suspends automatic statistic expiry.
    god: AtomicBool,
    statistics: Mutex<StatisticSet>,
    reliable: Mutex<VecDeque<Notification>>,
    unreliable: Mutex<VecDeque<Notification>>,
}

impl Player {
    pub fn new(id: PlayerId, role: Role) -> Self {
        Self {
            id,
            role,
            position: Mutex::new(Position::default()),
            playing: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            connected: AtomicBool::new(false),
            god: AtomicBool::new(false),
            statistics: Mutex::new(StatisticSet {
                shield: StatisticState::new(),
                force: StatisticState::new(),
            }),
            reliable: Mutex::new(VecDeque::new()),
            unreliable: Mutex::new(VecDeque::new()),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }

    pub fn position(&self) -> Position {
        *self.position.lock()
    }

    pub fn set_position(&self, position: Position) {
        *self.position.lock() = position;
    }

    /// Apply one movement action, clamped to the field, returning the new
    /// position.
    pub fn step(&self, direction: Direction, field_width: u16, field_height: u16) -> Position {
        let (dx, dy) = direction.deltas();
        let mut position = self.position.lock();
        let x = (i32::from(position.x) + dx).clamp(0, i32::from(field_width));
        let y = (i32::from(position.y) + dy).clamp(0, i32::from(field_height));
        *position = Position::new(x as u16, y as u16);
        *position
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Switch a statistic on or off.
    ///
    /// `overridden` marks an admin grant: the buff then ignores automatic
    /// expiry, and normal (non-overridden) updates are refused until it is
    /// switched off. Activation resets the buff's clock. Returns whether the
    /// update was applied.
    pub fn set_statistic(&self, statistic: Statistic, active: bool, overridden: bool) -> bool {
        if !overridden && self.god.load(Ordering::Acquire) {
            debug!(
                player = self.id,
                ?statistic,
                "statistic update ignored while override is active"
            );
            return false;
        }
        let mut statistics = self.statistics.lock();
        let state = statistics.get_mut(statistic);
        if active {
            state.clock.reset();
            self.god.store(overridden, Ordering::Release);
        } else {
            self.god.store(false, Ordering::Release);
        }
        state.active = active;
        true
    }

    pub fn is_statistic_active(&self, statistic: Statistic) -> bool {
        self.statistics.lock().get(statistic).active
    }

    /// Whether an active, non-overridden statistic outlived `duration_ms`.
    pub fn is_statistic_expired(&self, statistic: Statistic, duration_ms: u64) -> bool {
        if self.god.load(Ordering::Acquire) {
            return false;
        }
        let statistics = self.statistics.lock();
        let state = statistics.get(statistic);
        state.active && state.clock.has_elapsed(duration_ms)
    }

    fn queue(&self, transport: Transport) -> &Mutex<VecDeque<Notification>> {
        match transport {
            Transport::Reliable => &self.reliable,
            Transport::Unreliable => &self.unreliable,
        }
    }

    /// Enqueue an outbound notification for the writer threads.
    pub fn push_notification(&self, transport: Transport, notification: Notification) {
        self.queue(transport).lock().push_back(notification);
    }

    /// Dequeue the oldest notification on a transport, if any.
    pub fn pop_notification(&self, transport: Transport) -> Option<Notification> {
        self.queue(transport).lock().pop_front()
    }

    pub fn has_notification(&self, transport: Transport) -> bool {
        !self.queue(transport).lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_clamps_to_field() {
        let player = Player::new(1, Role::Player);
        player.set_position(Position::new(0, 0));
        let position = player.step(Direction::UpLeft, 900, 600);
        assert_eq!(position, Position::new(0, 0));

        player.set_position(Position::new(899, 599));
        let position = player.step(Direction::DownRight, 900, 600);
        assert_eq!(position, Position::new(900, 600));
    }

    #[test]
    fn test_step_moves_at_player_speed() {
        let player = Player::new(1, Role::Player);
        player.set_position(Position::new(100, 100));
        let position = player.step(Direction::Right, 900, 600);
        assert_eq!(position, Position::new(100 + speed::PLAYER, 100));
    }

    #[test]
    fn test_statistic_activation_and_expiry() {
        let player = Player::new(2, Role::Player);
        assert!(!player.is_statistic_active(Statistic::Shield));

        assert!(player.set_statistic(Statistic::Shield, true, false));
        assert!(player.is_statistic_active(Statistic::Shield));
        // Fresh clock: not expired against a long duration, expired at zero.
        assert!(!player.is_statistic_expired(Statistic::Shield, 60_000));
        assert!(player.is_statistic_expired(Statistic::Shield, 0));

        assert!(player.set_statistic(Statistic::Shield, false, false));
        assert!(!player.is_statistic_active(Statistic::Shield));
        assert!(!player.is_statistic_expired(Statistic::Shield, 0));
    }

    #[test]
    fn test_override_suspends_expiry_and_blocks_normal_updates() {
        let player = Player::new(3, Role::Administrator);
        assert!(player.set_statistic(Statistic::Shield, true, true));
        assert!(!player.is_statistic_expired(Statistic::Shield, 0));

        // Normal expiry path must not clear an overridden buff.
        assert!(!player.set_statistic(Statistic::Shield, false, false));
        assert!(player.is_statistic_active(Statistic::Shield));

        // An overridden deactivation clears it and drops the override.
        assert!(player.set_statistic(Statistic::Shield, false, true));
        assert!(!player.is_statistic_active(Statistic::Shield));
        assert!(player.set_statistic(Statistic::Shield, true, false));
    }

    #[test]
    fn test_queues_are_independent() {
        let player = Player::new(4, Role::Player);
        player.push_notification(Transport::Reliable, Notification::NextWave);
        assert!(player.has_notification(Transport::Reliable));
        assert!(!player.has_notification(Transport::Unreliable));

        assert_eq!(
            player.pop_notification(Transport::Reliable),
            Some(Notification::NextWave)
        );
        assert_eq!(player.pop_notification(Transport::Reliable), None);
    }
}
