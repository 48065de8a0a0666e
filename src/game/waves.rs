//! Built-in wave definitions.
//!
//! The default campaign is three skirmish waves of increasing pressure
//! followed by a boss fight. Behaviors steer enemies through the
//! [`WaveWorld`] surface only; movement of missiles and players is handled
//! by the session itself.

use std::sync::Arc;

use crate::game::constants::{hitbox, speed};
use crate::game::entity::{EnemyKind, EntityId, ItemKind, MissileKind, Position};
use crate::game::wave::{UpdateOutcome, WaveBehavior, WaveError, WaveSource, WaveWorld};

type WaveFactory = Box<dyn Fn() -> Box<dyn WaveBehavior> + Send + Sync>;

/// Ordered roster of wave factories. Indexing past the end is how the
/// controller learns the campaign is over.
pub struct WaveRoster {
    factories: Vec<WaveFactory>,
}

impl WaveRoster {
    pub fn new(factories: Vec<WaveFactory>) -> Self {
        Self { factories }
    }

    /// The default campaign.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(|| {
                Box::new(SkirmishWave::new(&[
                    (EnemyKind::Generic, 6),
                    (EnemyKind::Flying, 2),
                ]))
            }),
            Box::new(|| {
                Box::new(SkirmishWave::new(&[
                    (EnemyKind::Generic, 6),
                    (EnemyKind::Walking, 3),
                    (EnemyKind::Flying, 4),
                ]))
            }),
            Box::new(|| {
                Box::new(SkirmishWave::new(&[
                    (EnemyKind::Generic, 10),
                    (EnemyKind::Walking, 5),
                    (EnemyKind::Flying, 6),
                ]))
            }),
            Box::new(|| Box::new(BossWave::new())),
        ])
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl WaveSource for WaveRoster {
    fn build(&self, index: usize) -> Option<Result<Box<dyn WaveBehavior>, WaveError>> {
        self.factories.get(index).map(|factory| Ok(factory()))
    }
}

/// Convenience for the server entrypoint.
pub fn standard_roster() -> Arc<dyn WaveSource> {
    Arc::new(WaveRoster::standard())
}

const SPAWN_PERIOD_SECONDS: f32 = 1.2;
const FIRE_PERIOD_SECONDS: f32 = 2.0;
const DROP_PERIOD_SECONDS: f32 = 11.0;
const BOSS_FIRE_PERIOD_SECONDS: f32 = 1.5;
const STEER_PERIOD_SECONDS: f32 = 0.1;

/// March every hostile missile left by one missile stride. The delta mover
/// despawns any that would cross the left edge, so leftovers from an
/// earlier wave are swept up too.
fn steer_hostile_missiles(world: &mut dyn WaveWorld) {
    for kind in [MissileKind::Enemy, MissileKind::Boss] {
        for missile in world.missiles(kind) {
            world.move_missile(missile.id, kind, -(speed::MISSILE as i16), 0);
        }
    }
}

/// Marching-enemy wave: spawns a fixed quota per kind on a timer, marches
/// everything left, fires the occasional enemy missile and drops the
/// occasional power-up. Complete once the quota is spawned and the field is
/// clear of its enemies.
struct SkirmishWave {
    quotas: Vec<(EnemyKind, u32)>,
    spawned: Vec<u32>,
    spawn_timer: f32,
    fire_timer: f32,
    drop_timer: f32,
    steer_timer: f32,
}

impl SkirmishWave {
    fn new(quotas: &[(EnemyKind, u32)]) -> Self {
        Self {
            quotas: quotas.to_vec(),
            spawned: vec![0; quotas.len()],
            spawn_timer: 0.0,
            fire_timer: 0.0,
            drop_timer: 0.0,
            steer_timer: 0.0,
        }
    }

    fn spawn_pending(&self) -> bool {
        self.quotas
            .iter()
            .zip(&self.spawned)
            .any(|((_, quota), done)| done < quota)
    }

    fn spawn_one(&mut self, world: &mut dyn WaveWorld) {
        let Some(slot) = self
            .quotas
            .iter()
            .zip(self.spawned.iter())
            .position(|((_, quota), done)| done < quota)
        else {
            return;
        };
        let (kind, _) = self.quotas[slot];
        let height = kind.hitbox().1;
        let max_y = i32::from(world.field_height().saturating_sub(height));
        let y = world.random(0, max_y.max(0)) as u16;
        let position = Position {
            x: world.field_width(),
            y,
        };
        match world.create_enemy(kind, position) {
            Ok(_) => self.spawned[slot] += 1,
            // Enemy cap reached: keep the quota pending and retry later.
            Err(err) => world.log(&format!("enemy spawn deferred: {err}")),
        }
    }

    fn march(&self, world: &mut dyn WaveWorld) {
        for (kind, _) in &self.quotas {
            let stride = match kind {
                EnemyKind::Walking => -2 * speed::PLAYER as i16,
                _ => -3 * speed::PLAYER as i16,
            };
            let enemies = world.enemies(*kind);
            for enemy in enemies {
                if enemy.position.x == 0 {
                    // Marched off the left edge without being killed.
                    world.remove_enemy(enemy.id, *kind);
                } else {
                    let dy = match kind {
                        EnemyKind::Flying => (world.random(-6, 6)) as i16,
                        _ => 0,
                    };
                    world.move_enemy(enemy.id, *kind, stride, dy);
                }
            }
        }
    }

    fn fire(&self, world: &mut dyn WaveWorld) {
        let mut shooters: Vec<Position> = Vec::new();
        for (kind, _) in &self.quotas {
            shooters.extend(world.enemies(*kind).iter().map(|enemy| enemy.position));
        }
        if shooters.is_empty() {
            return;
        }
        let pick = world.random(0, shooters.len() as i32 - 1) as usize;
        let from = shooters[pick.min(shooters.len() - 1)];
        world.create_missile(MissileKind::Enemy, from);
    }

    fn drop_item(&self, world: &mut dyn WaveWorld) {
        let kind = if world.random(0, 1) == 0 {
            ItemKind::Shield
        } else {
            ItemKind::Force
        };
        let max_y = i32::from(world.field_height().saturating_sub(hitbox::ITEM.1));
        let position = Position {
            x: world.field_width() / 2,
            y: world.random(0, max_y.max(0)) as u16,
        };
        world.create_item(kind, position);
    }

    fn field_clear(&self, world: &dyn WaveWorld) -> bool {
        self.quotas
            .iter()
            .all(|(kind, _)| world.enemies(*kind).is_empty())
    }
}

impl WaveBehavior for SkirmishWave {
    fn update(
        &mut self,
        delta_seconds: f32,
        world: &mut dyn WaveWorld,
    ) -> Result<UpdateOutcome, WaveError> {
        self.spawn_timer += delta_seconds;
        self.fire_timer += delta_seconds;
        self.drop_timer += delta_seconds;
        self.steer_timer += delta_seconds;

        if self.spawn_pending() && self.spawn_timer >= SPAWN_PERIOD_SECONDS {
            self.spawn_timer = 0.0;
            self.spawn_one(world);
        }
        self.march(world);
        if self.steer_timer >= STEER_PERIOD_SECONDS {
            self.steer_timer = 0.0;
            steer_hostile_missiles(world);
        }
        if self.fire_timer >= FIRE_PERIOD_SECONDS {
            self.fire_timer = 0.0;
            self.fire(world);
        }
        if self.drop_timer >= DROP_PERIOD_SECONDS {
            self.drop_timer = 0.0;
            self.drop_item(world);
        }

        if !self.spawn_pending() && self.field_clear(world) {
            Ok(UpdateOutcome::Complete)
        } else {
            Ok(UpdateOutcome::Continue)
        }
    }
}

/// Final wave: a single boss anchored near the right edge, bouncing
/// vertically and firing heavy missiles. Complete once the boss is gone.
struct BossWave {
    boss: Option<EntityId>,
    descending: bool,
    fire_timer: f32,
    steer_timer: f32,
}

impl BossWave {
    fn new() -> Self {
        Self {
            boss: None,
            descending: true,
            fire_timer: 0.0,
            steer_timer: 0.0,
        }
    }
}

impl WaveBehavior for BossWave {
    fn on_init(&mut self, world: &mut dyn WaveWorld) -> Result<(), WaveError> {
        let (width, height) = hitbox::BOSS_ENEMY;
        let position = Position {
            x: world.field_width().saturating_sub(width),
            y: world.field_height().saturating_sub(height) / 2,
        };
        let id = world.create_enemy(EnemyKind::Boss, position)?;
        self.boss = Some(id);
        Ok(())
    }

    fn update(
        &mut self,
        delta_seconds: f32,
        world: &mut dyn WaveWorld,
    ) -> Result<UpdateOutcome, WaveError> {
        self.steer_timer += delta_seconds;
        if self.steer_timer >= STEER_PERIOD_SECONDS {
            self.steer_timer = 0.0;
            steer_hostile_missiles(world);
        }

        let Some(id) = self.boss else {
            return Ok(UpdateOutcome::Complete);
        };
        let Some(boss) = world
            .enemies(EnemyKind::Boss)
            .into_iter()
            .find(|enemy| enemy.id == id)
        else {
            // Killed by the players.
            return Ok(UpdateOutcome::Complete);
        };

        let height = hitbox::BOSS_ENEMY.1;
        let floor = world.field_height().saturating_sub(height);
        if boss.position.y >= floor {
            self.descending = false;
        } else if boss.position.y == 0 {
            self.descending = true;
        }
        let dy = if self.descending { 4 } else { -4 };
        world.move_enemy(id, EnemyKind::Boss, 0, dy);

        self.fire_timer += delta_seconds;
        if self.fire_timer >= BOSS_FIRE_PERIOD_SECONDS {
            self.fire_timer = 0.0;
            world.create_missile(MissileKind::Boss, boss.position);
        }

        Ok(UpdateOutcome::Continue)
    }
}
