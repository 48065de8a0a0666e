//! Gameplay tuning constants.
//!
//! Hitbox dimensions are sprite-derived fixed values per category, not
//! computed from anything at runtime.

/// Field (visible play area) dimensions
pub mod field {
    /// Width of the game area in world units
    pub const WIDTH: u16 = 900;
    /// Height of the game area in world units
    pub const HEIGHT: u16 = 600;
}

/// Roster limits
pub mod roster {
    /// Maximum number of players in a single session
    pub const MAX_PLAYERS: usize = 4;
    /// Minimum number of players required to start a session
    pub const MIN_PLAYERS: usize = 2;
}

/// Starting health per enemy category
pub mod health {
    pub const GENERIC_ENEMY: i32 = 80;
    pub const WALKING_ENEMY: i32 = 120;
    pub const FLYING_ENEMY: i32 = 40;
    pub const BOSS_ENEMY: i32 = 750;
}

/// Missile damage values
pub mod damage {
    /// Damage dealt by a regular player missile
    pub const PLAYER_MISSILE: i32 = 20;
    /// Damage dealt by a force missile (double the regular missile)
    pub const FORCE_MISSILE: i32 = 40;
}

/// Movement speeds
pub mod speed {
    /// Horizontal advance of autonomous missiles per move tick
    pub const MISSILE: u16 = 40;
    /// Player displacement per movement action
    pub const PLAYER: u16 = 4;
}

/// Interval and timeout defaults, in milliseconds
pub mod interval {
    /// Scheduler pass over all live sessions
    pub const PROCESS_MS: u64 = 10;
    /// Gate between entity movement passes within a session
    pub const ENTITY_MOVE_MS: u64 = 100;
    /// Lifetime of a timed player statistic (shield, force)
    pub const STATISTIC_MS: u64 = 30_000;
    /// Empty-session grace period before the scheduler reaps it
    pub const INACTIVITY_MS: u64 = 25_000;
}

/// Hard caps on per-session state
pub mod limits {
    /// Maximum live non-boss enemies in one session
    pub const MAX_ENEMIES: usize = 64;
    /// Maximum queued position updates per flush
    pub const MAX_QUEUED_POSITIONS: usize = u16::MAX as usize;
}

/// Axis-aligned hitbox dimensions (width, height) per category
pub mod hitbox {
    pub const PLAYER: (u16, u16) = (82, 70);
    pub const PLAYER_MISSILE: (u16, u16) = (60, 20);
    pub const ENEMY_MISSILE: (u16, u16) = (38, 30);
    pub const FORCE_MISSILE: (u16, u16) = (28, 20);
    pub const BOSS_MISSILE: (u16, u16) = (100, 40);
    pub const GENERIC_ENEMY: (u16, u16) = (164, 164);
    pub const WALKING_ENEMY: (u16, u16) = (230, 166);
    pub const FLYING_ENEMY: (u16, u16) = (80, 44);
    pub const BOSS_ENEMY: (u16, u16) = (300, 300);
    pub const ITEM: (u16, u16) = (42, 44);
}
