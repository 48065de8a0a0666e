//! Entity model: positions, categories, and per-category stores.
//!
//! Missiles, enemies, and items share one generic [`Entity`] record; the
//! category determines hitbox size, starting health, and which store the
//! entity lives in. Categories are closed enums, so an invalid category is
//! unrepresentable rather than a runtime error.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::game::constants::{health, hitbox};

/// Unique player identifier (0 is the empty-slot sentinel)
pub type PlayerId = u32;

/// Entity identifier, unique within one (session, category) namespace
pub type EntityId = u32;

/// Unique game session identifier
pub type SessionId = u32;

/// 2D coordinate on the play field, clamped to the field bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Generic record for missiles, enemies and items.
///
/// `health` is only meaningful for enemies; missiles and items carry 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub position: Position,
    pub health: i32,
}

/// Timed player buffs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    /// Absorbs hostile contact while active
    Shield,
    /// Upgrades the player's shots to force missiles
    Force,
}

/// Missile categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissileKind {
    Player,
    Enemy,
    Force,
    Boss,
}

impl MissileKind {
    pub fn hitbox(self) -> (u16, u16) {
        match self {
            MissileKind::Player => hitbox::PLAYER_MISSILE,
            MissileKind::Enemy => hitbox::ENEMY_MISSILE,
            MissileKind::Force => hitbox::FORCE_MISSILE,
            MissileKind::Boss => hitbox::BOSS_MISSILE,
        }
    }
}

/// Enemy categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Generic,
    Walking,
    Flying,
    Boss,
}

impl EnemyKind {
    pub fn hitbox(self) -> (u16, u16) {
        match self {
            EnemyKind::Generic => hitbox::GENERIC_ENEMY,
            EnemyKind::Walking => hitbox::WALKING_ENEMY,
            EnemyKind::Flying => hitbox::FLYING_ENEMY,
            EnemyKind::Boss => hitbox::BOSS_ENEMY,
        }
    }

    pub fn starting_health(self) -> i32 {
        match self {
            EnemyKind::Generic => health::GENERIC_ENEMY,
            EnemyKind::Walking => health::WALKING_ENEMY,
            EnemyKind::Flying => health::FLYING_ENEMY,
            EnemyKind::Boss => health::BOSS_ENEMY,
        }
    }
}

/// Item categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Shield,
    Force,
}

impl ItemKind {
    pub fn hitbox(self) -> (u16, u16) {
        hitbox::ITEM
    }
}

/// Every positioned object the protocol can reference, with the stable wire
/// index the transport layer serializes for spawn/despawn/position tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Missile(MissileKind),
    Enemy(EnemyKind),
    Item(ItemKind),
    Character,
}

impl EntityKind {
    /// Stable wire index shared with clients.
    pub fn code(self) -> u8 {
        match self {
            EntityKind::Missile(MissileKind::Player) => 0,
            EntityKind::Missile(MissileKind::Enemy) => 1,
            EntityKind::Missile(MissileKind::Force) => 2,
            EntityKind::Missile(MissileKind::Boss) => 3,
            EntityKind::Enemy(EnemyKind::Generic) => 4,
            EntityKind::Enemy(EnemyKind::Walking) => 5,
            EntityKind::Enemy(EnemyKind::Flying) => 6,
            EntityKind::Enemy(EnemyKind::Boss) => 7,
            EntityKind::Item(ItemKind::Shield) => 8,
            EntityKind::Item(ItemKind::Force) => 9,
            EntityKind::Character => 10,
        }
    }
}

impl From<MissileKind> for EntityKind {
    fn from(kind: MissileKind) -> Self {
        EntityKind::Missile(kind)
    }
}

impl From<EnemyKind> for EntityKind {
    fn from(kind: EnemyKind) -> Self {
        EntityKind::Enemy(kind)
    }
}

impl From<ItemKind> for EntityKind {
    fn from(kind: ItemKind) -> Self {
        EntityKind::Item(kind)
    }
}

/// Live missiles of one session, one map per category.
#[derive(Debug, Clone, Default)]
pub struct Missiles {
    pub player: HashMap<EntityId, Entity>,
    pub enemy: HashMap<EntityId, Entity>,
    pub force: HashMap<EntityId, Entity>,
    pub boss: HashMap<EntityId, Entity>,
}

impl Missiles {
    pub fn by_kind(&self, kind: MissileKind) -> &HashMap<EntityId, Entity> {
        match kind {
            MissileKind::Player => &self.player,
            MissileKind::Enemy => &self.enemy,
            MissileKind::Force => &self.force,
            MissileKind::Boss => &self.boss,
        }
    }

    pub fn by_kind_mut(&mut self, kind: MissileKind) -> &mut HashMap<EntityId, Entity> {
        match kind {
            MissileKind::Player => &mut self.player,
            MissileKind::Enemy => &mut self.enemy,
            MissileKind::Force => &mut self.force,
            MissileKind::Boss => &mut self.boss,
        }
    }
}

/// Live enemies of one session, one map per category.
#[derive(Debug, Clone, Default)]
pub struct Enemies {
    pub generic: HashMap<EntityId, Entity>,
    pub walking: HashMap<EntityId, Entity>,
    pub flying: HashMap<EntityId, Entity>,
    pub boss: HashMap<EntityId, Entity>,
}

impl Enemies {
    pub fn by_kind(&self, kind: EnemyKind) -> &HashMap<EntityId, Entity> {
        match kind {
            EnemyKind::Generic => &self.generic,
            EnemyKind::Walking => &self.walking,
            EnemyKind::Flying => &self.flying,
            EnemyKind::Boss => &self.boss,
        }
    }

    pub fn by_kind_mut(&mut self, kind: EnemyKind) -> &mut HashMap<EntityId, Entity> {
        match kind {
            EnemyKind::Generic => &mut self.generic,
            EnemyKind::Walking => &mut self.walking,
            EnemyKind::Flying => &mut self.flying,
            EnemyKind::Boss => &mut self.boss,
        }
    }

    /// Live non-boss enemy count, checked against the per-session cap.
    pub fn minion_count(&self) -> usize {
        self.generic.len() + self.walking.len() + self.flying.len()
    }
}

/// Live items of one session, one map per category.
#[derive(Debug, Clone, Default)]
pub struct Items {
    pub shield: HashMap<EntityId, Entity>,
    pub force: HashMap<EntityId, Entity>,
}

impl Items {
    pub fn by_kind(&self, kind: ItemKind) -> &HashMap<EntityId, Entity> {
        match kind {
            ItemKind::Shield => &self.shield,
            ItemKind::Force => &self.force,
        }
    }

    pub fn by_kind_mut(&mut self, kind: ItemKind) -> &mut HashMap<EntityId, Entity> {
        match kind {
            ItemKind::Shield => &mut self.shield,
            ItemKind::Force => &mut self.force,
        }
    }
}

/// Monotonically increasing id allocator for one (session, category) key.
///
/// Starts at 1 and wraps back to 1 on overflow; 0 is never produced because
/// it doubles as the empty-slot sentinel in the player roster.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: EntityId,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> EntityId {
        let id = self.next;
        self.next = self.next.checked_add(1).unwrap_or(1);
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_starts_at_one() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.allocate(), 1);
        assert_eq!(alloc.allocate(), 2);
        assert_eq!(alloc.allocate(), 3);
    }

    #[test]
    fn test_allocator_wraps_past_zero() {
        let mut alloc = IdAllocator { next: u32::MAX };
        assert_eq!(alloc.allocate(), u32::MAX);
        assert_eq!(alloc.allocate(), 1);
    }

    #[test]
    fn test_wire_codes_are_stable() {
        assert_eq!(EntityKind::from(MissileKind::Player).code(), 0);
        assert_eq!(EntityKind::from(MissileKind::Boss).code(), 3);
        assert_eq!(EntityKind::from(EnemyKind::Generic).code(), 4);
        assert_eq!(EntityKind::from(EnemyKind::Boss).code(), 7);
        assert_eq!(EntityKind::from(ItemKind::Force).code(), 9);
        assert_eq!(EntityKind::Character.code(), 10);
    }

    #[test]
    fn test_enemy_starting_health() {
        assert_eq!(EnemyKind::Generic.starting_health(), 80);
        assert_eq!(EnemyKind::Walking.starting_health(), 120);
        assert_eq!(EnemyKind::Flying.starting_health(), 40);
        assert_eq!(EnemyKind::Boss.starting_health(), 750);
    }

    #[test]
    fn test_minion_count_excludes_boss() {
        let mut enemies = Enemies::default();
        let entity = Entity {
            id: 1,
            position: Position::default(),
            health: 80,
        };
        enemies.generic.insert(1, entity);
        enemies.boss.insert(2, Entity { id: 2, ..entity });
        assert_eq!(enemies.minion_count(), 1);
    }
}
