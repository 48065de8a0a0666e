//! Wave progression state machine.
//!
//! A session owns one [`WaveController`]; each tick the controller delegates
//! to the currently loaded [`WaveBehavior`], a swappable policy object built
//! by an external [`WaveSource`]. Behaviors act on the world only through the
//! narrow [`WaveWorld`] capability surface, never through the session
//! directly, so a fake world is enough to test any behavior.
//!
//! Failure policy: a behavior that errors during `update` forfeits the rest
//! of its wave and the controller advances; a definition that fails to build
//! or initialize ends the match (same path as running out of waves).

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::game::entity::{EnemyKind, Entity, EntityId, ItemKind, MissileKind, PlayerId, Position, SessionId};

/// What the controller tells the session after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveSignal {
    /// Keep simulating the current wave
    Continue,
    /// A new wave was loaded; notify players and clear per-wave state
    Next,
    /// No wave can run anymore; end the match
    Stop,
}

/// What a behavior reports from its per-tick update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Continue,
    Complete,
}

#[derive(Debug, Error)]
pub enum WaveError {
    #[error("wave definition failed to load: {0}")]
    Load(String),
    #[error("wave initialization failed: {0}")]
    Init(String),
    #[error("wave update failed: {0}")]
    Update(String),
    #[error("world rejected wave action: {0}")]
    World(String),
}

/// The capability surface a wave behavior is granted over its session's
/// world. Deliberately a strict subset of the session's mutators: no player
/// network state, no authentication, no cross-session access.
pub trait WaveWorld {
    fn enemies(&self, kind: EnemyKind) -> Vec<Entity>;
    fn create_enemy(&mut self, kind: EnemyKind, position: Position)
        -> Result<EntityId, WaveError>;
    fn move_enemy(&mut self, id: EntityId, kind: EnemyKind, dx: i16, dy: i16);
    fn remove_enemy(&mut self, id: EntityId, kind: EnemyKind);

    fn missiles(&self, kind: MissileKind) -> Vec<Entity>;
    fn create_missile(&mut self, kind: MissileKind, position: Position) -> EntityId;
    fn move_missile(&mut self, id: EntityId, kind: MissileKind, dx: i16, dy: i16);
    fn remove_missile(&mut self, id: EntityId, kind: MissileKind);

    fn items(&self, kind: ItemKind) -> Vec<Entity>;
    fn create_item(&mut self, kind: ItemKind, position: Position) -> EntityId;
    fn remove_item(&mut self, id: EntityId, kind: ItemKind);

    fn field_width(&self) -> u16;
    fn field_height(&self) -> u16;
    fn session_id(&self) -> SessionId;
    fn player_count(&self) -> usize;
    fn player_ids(&self) -> Vec<PlayerId>;
    fn player_position(&self, id: PlayerId) -> Option<Position>;

    /// Emit a log line scoped to this session.
    fn log(&self, message: &str);
    /// Bounded random integer in `[min, max]`.
    fn random(&mut self, min: i32, max: i32) -> i32;
}

/// One wave's behavior: spawn choreography, enemy steering, completion.
pub trait WaveBehavior: Send {
    /// Invoked once right after the definition is loaded.
    fn on_init(&mut self, _world: &mut dyn WaveWorld) -> Result<(), WaveError> {
        Ok(())
    }

    /// Per-tick update with the elapsed seconds since the previous tick.
    fn update(
        &mut self,
        delta_seconds: f32,
        world: &mut dyn WaveWorld,
    ) -> Result<UpdateOutcome, WaveError>;
}

/// Ordered, externally configured supply of wave definitions.
///
/// `build` returns `None` past the last wave, and `Some(Err)` when the
/// definition at that index exists but cannot be constructed.
pub trait WaveSource: Send + Sync {
    fn build(&self, index: usize) -> Option<Result<Box<dyn WaveBehavior>, WaveError>>;
}

/// Drives one session's waves. The session owns the controller and passes a
/// world view into every call, so there is no back-reference to the session.
pub struct WaveController {
    source: Arc<dyn WaveSource>,
    behavior: Option<Box<dyn WaveBehavior>>,
    /// Index of the next wave to load; monotonically increasing.
    index: u8,
    session_id: SessionId,
}

impl WaveController {
    pub fn new(session_id: SessionId, source: Arc<dyn WaveSource>) -> Self {
        Self {
            source,
            behavior: None,
            index: 0,
            session_id,
        }
    }

    /// Index the next `advance` will load. Never decreases.
    pub fn next_index(&self) -> u8 {
        self.index
    }

    /// Load the first wave. Called once by the session at match start; the
    /// signal is informational. A failed load leaves no behavior and the
    /// first `process` call reports `Stop`.
    pub fn activate(&mut self, world: &mut dyn WaveWorld) -> WaveSignal {
        self.advance(world)
    }

    /// Advance the wave logic by one tick.
    pub fn process(&mut self, delta_seconds: f32, world: &mut dyn WaveWorld) -> WaveSignal {
        let Some(behavior) = self.behavior.as_mut() else {
            return WaveSignal::Stop;
        };
        match behavior.update(delta_seconds, world) {
            Ok(UpdateOutcome::Continue) => WaveSignal::Continue,
            Ok(UpdateOutcome::Complete) => {
                info!(session = self.session_id, "wave completed");
                self.advance(world)
            }
            Err(err) => {
                error!(session = self.session_id, %err, "failed to process wave");
                self.advance(world)
            }
        }
    }

    /// Load the wave at the current index. Exhaustion and load/init failure
    /// share the terminal `Stop` path.
    fn advance(&mut self, world: &mut dyn WaveWorld) -> WaveSignal {
        self.behavior = None;
        match self.source.build(usize::from(self.index)) {
            None => {
                info!(session = self.session_id, "no more waves available");
                WaveSignal::Stop
            }
            Some(Err(err)) => {
                error!(
                    session = self.session_id,
                    wave = self.index,
                    %err,
                    "failed to load wave"
                );
                WaveSignal::Stop
            }
            Some(Ok(mut behavior)) => {
                if let Err(err) = behavior.on_init(world) {
                    error!(
                        session = self.session_id,
                        wave = self.index,
                        %err,
                        "failed to initialize wave"
                    );
                    return WaveSignal::Stop;
                }
                info!(session = self.session_id, wave = self.index, "switched to wave");
                self.behavior = Some(behavior);
                self.index = self.index.saturating_add(1);
                WaveSignal::Next
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::entity::{Enemies, Items, Missiles};
    use hashbrown::HashMap;

    /// Minimal in-memory world for exercising behaviors and the controller.
    pub(crate) struct FakeWorld {
        pub enemies: Enemies,
        pub missiles: Missiles,
        pub items: Items,
        pub next_id: EntityId,
        pub players: HashMap<PlayerId, Position>,
        pub rng_value: i32,
    }

    impl FakeWorld {
        pub fn new() -> Self {
            Self {
                enemies: Enemies::default(),
                missiles: Missiles::default(),
                items: Items::default(),
                next_id: 1,
                players: HashMap::new(),
                rng_value: 0,
            }
        }

        fn allocate(&mut self) -> EntityId {
            let id = self.next_id;
            self.next_id += 1;
            id
        }
    }

    impl WaveWorld for FakeWorld {
        fn enemies(&self, kind: EnemyKind) -> Vec<Entity> {
            self.enemies.by_kind(kind).values().copied().collect()
        }

        fn create_enemy(
            &mut self,
            kind: EnemyKind,
            position: Position,
        ) -> Result<EntityId, WaveError> {
            let id = self.allocate();
            self.enemies.by_kind_mut(kind).insert(
                id,
                Entity {
                    id,
                    position,
                    health: kind.starting_health(),
                },
            );
            Ok(id)
        }

        fn move_enemy(&mut self, id: EntityId, kind: EnemyKind, dx: i16, dy: i16) {
            if let Some(entity) = self.enemies.by_kind_mut(kind).get_mut(&id) {
                entity.position.x = (i32::from(entity.position.x) + i32::from(dx)).max(0) as u16;
                entity.position.y = (i32::from(entity.position.y) + i32::from(dy)).max(0) as u16;
            }
        }

        fn remove_enemy(&mut self, id: EntityId, kind: EnemyKind) {
            self.enemies.by_kind_mut(kind).remove(&id);
        }

        fn missiles(&self, kind: MissileKind) -> Vec<Entity> {
            self.missiles.by_kind(kind).values().copied().collect()
        }

        fn create_missile(&mut self, kind: MissileKind, position: Position) -> EntityId {
            let id = self.allocate();
            self.missiles.by_kind_mut(kind).insert(
                id,
                Entity {
                    id,
                    position,
                    health: 0,
                },
            );
            id
        }

        fn move_missile(&mut self, id: EntityId, kind: MissileKind, dx: i16, dy: i16) {
            if let Some(entity) = self.missiles.by_kind_mut(kind).get_mut(&id) {
                entity.position.x = (i32::from(entity.position.x) + i32::from(dx)).max(0) as u16;
                entity.position.y = (i32::from(entity.position.y) + i32::from(dy)).max(0) as u16;
            }
        }

        fn remove_missile(&mut self, id: EntityId, kind: MissileKind) {
            self.missiles.by_kind_mut(kind).remove(&id);
        }

        fn items(&self, kind: ItemKind) -> Vec<Entity> {
            self.items.by_kind(kind).values().copied().collect()
        }

        fn create_item(&mut self, kind: ItemKind, position: Position) -> EntityId {
            let id = self.allocate();
            self.items.by_kind_mut(kind).insert(
                id,
                Entity {
                    id,
                    position,
                    health: 0,
                },
            );
            id
        }

        fn remove_item(&mut self, id: EntityId, kind: ItemKind) {
            self.items.by_kind_mut(kind).remove(&id);
        }

        fn field_width(&self) -> u16 {
            900
        }

        fn field_height(&self) -> u16 {
            600
        }

        fn session_id(&self) -> SessionId {
            1
        }

        fn player_count(&self) -> usize {
            self.players.len()
        }

        fn player_ids(&self) -> Vec<PlayerId> {
            self.players.keys().copied().collect()
        }

        fn player_position(&self, id: PlayerId) -> Option<Position> {
            self.players.get(&id).copied()
        }

        fn log(&self, _message: &str) {}

        fn random(&mut self, min: i32, _max: i32) -> i32 {
            min.max(self.rng_value)
        }
    }

    struct ScriptedBehavior {
        outcomes: Vec<Result<UpdateOutcome, WaveError>>,
        fail_init: bool,
    }

    impl WaveBehavior for ScriptedBehavior {
        fn on_init(&mut self, _world: &mut dyn WaveWorld) -> Result<(), WaveError> {
            if self.fail_init {
                Err(WaveError::Init("scripted init failure".into()))
            } else {
                Ok(())
            }
        }

        fn update(
            &mut self,
            _delta_seconds: f32,
            _world: &mut dyn WaveWorld,
        ) -> Result<UpdateOutcome, WaveError> {
            if self.outcomes.is_empty() {
                Ok(UpdateOutcome::Continue)
            } else {
                self.outcomes.remove(0)
            }
        }
    }

    enum Plan {
        Wave {
            outcomes: Vec<&'static str>,
            fail_init: bool,
        },
        Broken,
    }

    struct ScriptedSource {
        plans: Vec<Plan>,
    }

    impl WaveSource for ScriptedSource {
        fn build(&self, index: usize) -> Option<Result<Box<dyn WaveBehavior>, WaveError>> {
            let plan = self.plans.get(index)?;
            Some(match plan {
                Plan::Broken => Err(WaveError::Load("scripted load failure".into())),
                Plan::Wave {
                    outcomes,
                    fail_init,
                } => Ok(Box::new(ScriptedBehavior {
                    outcomes: outcomes
                        .iter()
                        .map(|tag| match *tag {
                            "continue" => Ok(UpdateOutcome::Continue),
                            "complete" => Ok(UpdateOutcome::Complete),
                            _ => Err(WaveError::Update("scripted update failure".into())),
                        })
                        .collect(),
                    fail_init: *fail_init,
                })),
            })
        }
    }

    fn controller(plans: Vec<Plan>) -> (WaveController, FakeWorld) {
        let mut world = FakeWorld::new();
        let mut controller = WaveController::new(1, Arc::new(ScriptedSource { plans }));
        controller.activate(&mut world);
        (controller, world)
    }

    #[test]
    fn test_continue_keeps_current_wave() {
        let (mut controller, mut world) = controller(vec![Plan::Wave {
            outcomes: vec!["continue", "continue"],
            fail_init: false,
        }]);
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Continue);
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Continue);
        assert_eq!(controller.next_index(), 1);
    }

    #[test]
    fn test_completion_advances_to_next_wave() {
        let (mut controller, mut world) = controller(vec![
            Plan::Wave {
                outcomes: vec!["complete"],
                fail_init: false,
            },
            Plan::Wave {
                outcomes: vec!["continue"],
                fail_init: false,
            },
        ]);
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Next);
        assert_eq!(controller.next_index(), 2);
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Continue);
    }

    #[test]
    fn test_exhaustion_stops_permanently() {
        let (mut controller, mut world) = controller(vec![Plan::Wave {
            outcomes: vec!["complete"],
            fail_init: false,
        }]);
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Stop);
        // Terminal: every later call keeps reporting Stop.
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Stop);
    }

    #[test]
    fn test_update_error_forfeits_wave() {
        let (mut controller, mut world) = controller(vec![
            Plan::Wave {
                outcomes: vec!["error"],
                fail_init: false,
            },
            Plan::Wave {
                outcomes: vec!["continue"],
                fail_init: false,
            },
        ]);
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Next);
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Continue);
    }

    #[test]
    fn test_load_failure_ends_match() {
        let (mut controller, mut world) = controller(vec![
            Plan::Wave {
                outcomes: vec!["complete"],
                fail_init: false,
            },
            Plan::Broken,
            Plan::Wave {
                outcomes: vec!["continue"],
                fail_init: false,
            },
        ]);
        // Broken wave 1 is not skipped: the match ends instead.
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Stop);
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Stop);
    }

    #[test]
    fn test_init_failure_ends_match() {
        let (mut controller, mut world) = controller(vec![
            Plan::Wave {
                outcomes: vec!["complete"],
                fail_init: false,
            },
            Plan::Wave {
                outcomes: vec![],
                fail_init: true,
            },
        ]);
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Stop);
    }

    #[test]
    fn test_failed_first_wave_stops_on_first_process() {
        let mut world = FakeWorld::new();
        let mut controller =
            WaveController::new(1, Arc::new(ScriptedSource { plans: vec![Plan::Broken] }));
        controller.activate(&mut world);
        assert_eq!(controller.process(0.1, &mut world), WaveSignal::Stop);
    }

    #[test]
    fn test_index_never_decreases() {
        let (mut controller, mut world) = controller(vec![
            Plan::Wave {
                outcomes: vec!["complete"],
                fail_init: false,
            },
            Plan::Wave {
                outcomes: vec!["complete"],
                fail_init: false,
            },
        ]);
        let mut last = controller.next_index();
        for _ in 0..4 {
            controller.process(0.1, &mut world);
            assert!(controller.next_index() >= last);
            last = controller.next_index();
        }
    }
}
