//! Stateless AABB collision engine.
//!
//! [`check`] takes snapshots of every live entity category for one tick and
//! returns the full set of pairwise outcomes. Rules run in a fixed priority
//! order and every entity is consumed at most once per tick: once an id is
//! marked (destroyed, damaged, killed, or claimed) it is skipped by all later
//! rules. The caller applies the outcome as one batch.

use hashbrown::{HashMap, HashSet};

use crate::game::constants::{damage, hitbox};
use crate::game::entity::{Enemies, Entity, EntityId, Items, Missiles, PlayerId, Position};

/// Axis-aligned bounding box anchored at the entity position (top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(position: Position, width: u16, height: u16) -> Self {
        Self {
            x: u32::from(position.x),
            y: u32::from(position.y),
            width: u32::from(width),
            height: u32::from(height),
        }
    }
}

/// Standard AABB overlap test; symmetric in its arguments.
pub fn collides(a: &BoundingBox, b: &BoundingBox) -> bool {
    a.x < b.x + b.width && a.x + a.width > b.x && a.y < b.y + b.height && a.y + a.height > b.y
}

/// What the collision engine needs to know about one live player.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub position: Position,
    /// Shielded players ignore hostile contact but still pick up items.
    pub shielded: bool,
}

/// Missile ids destroyed this tick, per category.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MissileHits {
    pub player: HashSet<EntityId>,
    pub enemy: HashSet<EntityId>,
    pub force: HashSet<EntityId>,
    pub boss: HashSet<EntityId>,
}

/// Enemy ids hit by missiles this tick, with the damage to apply.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnemyDamage {
    pub generic: HashMap<EntityId, i32>,
    pub walking: HashMap<EntityId, i32>,
    pub flying: HashMap<EntityId, i32>,
    pub boss: HashMap<EntityId, i32>,
}

/// Enemy ids removed outright by player body contact this tick.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnemyRemovals {
    pub generic: HashSet<EntityId>,
    pub walking: HashSet<EntityId>,
    pub flying: HashSet<EntityId>,
    pub boss: HashSet<EntityId>,
}

/// Aggregate result of one collision pass.
#[derive(Debug, Default)]
pub struct CollisionOutcome {
    pub missiles: MissileHits,
    pub damaged: EnemyDamage,
    pub rammed: EnemyRemovals,
    /// Players marked for death
    pub players: Vec<PlayerId>,
    /// Shield item id -> collecting player
    pub shields: HashMap<EntityId, PlayerId>,
    /// Force item id -> collecting player
    pub forces: HashMap<EntityId, PlayerId>,
}

type Boxed = Vec<(EntityId, BoundingBox)>;

/// Build sorted (id, box) pairs so rule resolution is deterministic.
fn boxes_of(entities: &HashMap<EntityId, Entity>, dims: (u16, u16)) -> Boxed {
    let mut boxes: Boxed = entities
        .values()
        .map(|entity| (entity.id, BoundingBox::new(entity.position, dims.0, dims.1)))
        .collect();
    boxes.sort_unstable_by_key(|(id, _)| *id);
    boxes
}

/// Missile vs missile: both are destroyed on contact.
fn mutual_destruction(
    attackers: &Boxed,
    attacker_hits: &mut HashSet<EntityId>,
    defenders: &Boxed,
    defender_hits: &mut HashSet<EntityId>,
) {
    for (attacker_id, attacker_box) in attackers {
        if attacker_hits.contains(attacker_id) {
            continue;
        }
        for (defender_id, defender_box) in defenders {
            if defender_hits.contains(defender_id) {
                continue;
            }
            if collides(attacker_box, defender_box) {
                attacker_hits.insert(*attacker_id);
                defender_hits.insert(*defender_id);
                break;
            }
        }
    }
}

/// Missile vs enemy: missile destroyed, enemy takes `amount` damage.
fn missile_strikes(
    missiles: &Boxed,
    missile_hits: &mut HashSet<EntityId>,
    enemies: &Boxed,
    damaged: &mut HashMap<EntityId, i32>,
    amount: i32,
) {
    for (missile_id, missile_box) in missiles {
        if missile_hits.contains(missile_id) {
            continue;
        }
        for (enemy_id, enemy_box) in enemies {
            if damaged.contains_key(enemy_id) {
                continue;
            }
            if collides(missile_box, enemy_box) {
                missile_hits.insert(*missile_id);
                damaged.insert(*enemy_id, amount);
                break;
            }
        }
    }
}

/// Hostile missile vs unshielded player: both consumed, player dies.
fn missiles_hit_players(
    missiles: &Boxed,
    missile_hits: &mut HashSet<EntityId>,
    players: &Boxed,
    dead: &mut Vec<PlayerId>,
) {
    for (missile_id, missile_box) in missiles {
        if missile_hits.contains(missile_id) {
            continue;
        }
        for (player_id, player_box) in players {
            if dead.contains(player_id) {
                continue;
            }
            if collides(missile_box, player_box) {
                missile_hits.insert(*missile_id);
                dead.push(*player_id);
                break;
            }
        }
    }
}

/// Unshielded player vs enemy body: both die outright.
fn body_contact(
    players: &Boxed,
    dead: &mut Vec<PlayerId>,
    enemies: &Boxed,
    removed: &mut HashSet<EntityId>,
) {
    for (player_id, player_box) in players {
        if dead.contains(player_id) {
            continue;
        }
        for (enemy_id, enemy_box) in enemies {
            if removed.contains(enemy_id) {
                continue;
            }
            if collides(player_box, enemy_box) {
                dead.push(*player_id);
                removed.insert(*enemy_id);
                break;
            }
        }
    }
}

/// Item pickups: one claim per item id, one item per player per pass.
fn pickups(players: &Boxed, items: &Boxed, claims: &mut HashMap<EntityId, PlayerId>) {
    for (player_id, player_box) in players {
        if claims.values().any(|claimer| claimer == player_id) {
            continue;
        }
        for (item_id, item_box) in items {
            if claims.contains_key(item_id) {
                continue;
            }
            if collides(player_box, item_box) {
                claims.insert(*item_id, *player_id);
                break;
            }
        }
    }
}

/// Run one full collision pass over the given snapshots.
///
/// Dead players must already be filtered out of `players`; an empty category
/// simply short-circuits its rules.
pub fn check(
    players: &[PlayerSnapshot],
    enemies: &Enemies,
    missiles: &Missiles,
    items: &Items,
) -> CollisionOutcome {
    let mut player_boxes: Boxed = Vec::with_capacity(players.len());
    let mut exposed_player_boxes: Boxed = Vec::with_capacity(players.len());
    for player in players {
        let bounds = BoundingBox::new(player.position, hitbox::PLAYER.0, hitbox::PLAYER.1);
        player_boxes.push((player.id, bounds));
        if !player.shielded {
            exposed_player_boxes.push((player.id, bounds));
        }
    }
    player_boxes.sort_unstable_by_key(|(id, _)| *id);
    exposed_player_boxes.sort_unstable_by_key(|(id, _)| *id);

    let player_missiles = boxes_of(&missiles.player, hitbox::PLAYER_MISSILE);
    let enemy_missiles = boxes_of(&missiles.enemy, hitbox::ENEMY_MISSILE);
    let force_missiles = boxes_of(&missiles.force, hitbox::FORCE_MISSILE);
    let boss_missiles = boxes_of(&missiles.boss, hitbox::BOSS_MISSILE);
    let generic_enemies = boxes_of(&enemies.generic, hitbox::GENERIC_ENEMY);
    let walking_enemies = boxes_of(&enemies.walking, hitbox::WALKING_ENEMY);
    let flying_enemies = boxes_of(&enemies.flying, hitbox::FLYING_ENEMY);
    let boss_enemies = boxes_of(&enemies.boss, hitbox::BOSS_ENEMY);
    let shield_items = boxes_of(&items.shield, hitbox::ITEM);
    let force_items = boxes_of(&items.force, hitbox::ITEM);

    let mut outcome = CollisionOutcome::default();

    // 1-2: friendly missiles vs enemy missiles, mutual destruction
    mutual_destruction(
        &player_missiles,
        &mut outcome.missiles.player,
        &enemy_missiles,
        &mut outcome.missiles.enemy,
    );
    mutual_destruction(
        &force_missiles,
        &mut outcome.missiles.force,
        &enemy_missiles,
        &mut outcome.missiles.enemy,
    );

    // 3: player missiles vs minion enemies
    missile_strikes(
        &player_missiles,
        &mut outcome.missiles.player,
        &generic_enemies,
        &mut outcome.damaged.generic,
        damage::PLAYER_MISSILE,
    );
    missile_strikes(
        &player_missiles,
        &mut outcome.missiles.player,
        &walking_enemies,
        &mut outcome.damaged.walking,
        damage::PLAYER_MISSILE,
    );
    missile_strikes(
        &player_missiles,
        &mut outcome.missiles.player,
        &flying_enemies,
        &mut outcome.damaged.flying,
        damage::PLAYER_MISSILE,
    );

    // 4: force missiles vs minion enemies, double damage
    missile_strikes(
        &force_missiles,
        &mut outcome.missiles.force,
        &generic_enemies,
        &mut outcome.damaged.generic,
        damage::FORCE_MISSILE,
    );
    missile_strikes(
        &force_missiles,
        &mut outcome.missiles.force,
        &walking_enemies,
        &mut outcome.damaged.walking,
        damage::FORCE_MISSILE,
    );
    missile_strikes(
        &force_missiles,
        &mut outcome.missiles.force,
        &flying_enemies,
        &mut outcome.damaged.flying,
        damage::FORCE_MISSILE,
    );

    // 5-6: hostile missiles vs unshielded players
    missiles_hit_players(
        &enemy_missiles,
        &mut outcome.missiles.enemy,
        &exposed_player_boxes,
        &mut outcome.players,
    );
    missiles_hit_players(
        &boss_missiles,
        &mut outcome.missiles.boss,
        &exposed_player_boxes,
        &mut outcome.players,
    );

    // 7-8: friendly missiles vs boss missiles, mutual destruction
    mutual_destruction(
        &player_missiles,
        &mut outcome.missiles.player,
        &boss_missiles,
        &mut outcome.missiles.boss,
    );
    mutual_destruction(
        &force_missiles,
        &mut outcome.missiles.force,
        &boss_missiles,
        &mut outcome.missiles.boss,
    );

    // 9: friendly missiles vs boss body
    missile_strikes(
        &player_missiles,
        &mut outcome.missiles.player,
        &boss_enemies,
        &mut outcome.damaged.boss,
        damage::PLAYER_MISSILE,
    );
    missile_strikes(
        &force_missiles,
        &mut outcome.missiles.force,
        &boss_enemies,
        &mut outcome.damaged.boss,
        damage::FORCE_MISSILE,
    );

    // 10: body contact kills player and enemy alike
    body_contact(
        &exposed_player_boxes,
        &mut outcome.players,
        &boss_enemies,
        &mut outcome.rammed.boss,
    );
    body_contact(
        &exposed_player_boxes,
        &mut outcome.players,
        &generic_enemies,
        &mut outcome.rammed.generic,
    );
    body_contact(
        &exposed_player_boxes,
        &mut outcome.players,
        &walking_enemies,
        &mut outcome.rammed.walking,
    );
    body_contact(
        &exposed_player_boxes,
        &mut outcome.players,
        &flying_enemies,
        &mut outcome.rammed.flying,
    );

    // 11-12: item pickups ignore shield status
    pickups(&player_boxes, &shield_items, &mut outcome.shields);
    pickups(&player_boxes, &force_items, &mut outcome.forces);

    outcome
}
