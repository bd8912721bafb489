//! Secondary-resource engine
//!
//! Each registered entity holds exactly one [`SecondaryResource`]: a numeric
//! pool with its own regen/decay rule, or a combo-point counter.

mod pool;

pub use pool::{ComboPoints, ResourcePool, SecondaryResource, COMBO_POINT_CAP};

use crate::arena::EntityArena;
use crate::config::ResourceConstants;
use crate::events::{CombatEvent, EventQueue};
use crate::world::Spatial;
use combat_types::{CharacterClass, CombatEntityId, ResourceCost, ResourceKind};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct ResourceEngine {
    resources: EntityArena<SecondaryResource>,
    config: ResourceConstants,
    events: EventQueue,
}

impl ResourceEngine {
    /// Create an engine with no pools; regen and decay rates come from `config`
    pub fn new(config: ResourceConstants) -> Self {
        ResourceEngine {
            resources: EntityArena::new(),
            config,
            events: EventQueue::new(),
        }
    }

    /// Register an entity with a resource kind, replacing any previous one
    pub fn register(&mut self, entity: CombatEntityId, kind: ResourceKind) {
        let resource = match self.config.behavior(kind) {
            Some(behavior) => SecondaryResource::Pool(ResourcePool::new(kind, *behavior)),
            None => SecondaryResource::ComboPoints(ComboPoints::new()),
        };
        debug!(%entity, %kind, "Registered resource");
        self.resources.insert(entity, resource);
    }

    /// Register an entity with its class's default resource
    pub fn register_for_class(&mut self, entity: CombatEntityId, class: CharacterClass) {
        self.register(entity, ResourceKind::for_class(class));
    }

    /// Drop the entity's pool and combo points
    pub fn unregister(&mut self, entity: CombatEntityId) {
        self.resources.remove(entity);
    }

    pub fn is_registered(&self, entity: CombatEntityId) -> bool {
        self.resources.contains(entity)
    }

    /// The entity's pool; `None` if it never registered
    pub fn get(&self, entity: CombatEntityId) -> Option<&SecondaryResource> {
        self.resources.get(entity)
    }

    pub fn kind(&self, entity: CombatEntityId) -> Option<ResourceKind> {
        self.resources.get(entity).map(SecondaryResource::kind)
    }

    /// Current pool value. Combo-point users report their points here.
    pub fn current(&self, entity: CombatEntityId) -> Option<f64> {
        self.resources.get(entity).map(SecondaryResource::current)
    }

    pub fn max(&self, entity: CombatEntityId) -> Option<f64> {
        self.resources.get(entity).map(SecondaryResource::max)
    }

    /// Amount of `kind` the entity can spend (0 if it uses another resource)
    pub fn available(&self, entity: CombatEntityId, kind: ResourceKind) -> f64 {
        match self.resources.get(entity) {
            Some(resource) if resource.kind() == kind => resource.current(),
            _ => 0.0,
        }
    }

    /// Pure check used before any state is touched
    pub fn can_afford(&self, entity: CombatEntityId, cost: &ResourceCost) -> bool {
        self.available(entity, cost.kind) >= cost.amount
    }

    /// Add to a numeric pool; returns the change actually applied
    pub fn add_resource(&mut self, entity: CombatEntityId, amount: f64) -> f64 {
        let Some(SecondaryResource::Pool(pool)) = self.resources.get_mut(entity) else {
            warn!(%entity, "add_resource on entity without a numeric pool");
            return 0.0;
        };
        let applied = pool.add(amount);
        if applied != 0.0 {
            Self::emit_pool(&mut self.events, entity, pool);
        }
        applied
    }

    /// Atomic check-then-spend on a numeric pool
    pub fn try_spend_resource(&mut self, entity: CombatEntityId, amount: f64) -> bool {
        let Some(SecondaryResource::Pool(pool)) = self.resources.get_mut(entity) else {
            return false;
        };
        if !pool.try_spend(amount) {
            return false;
        }
        if amount > 0.0 {
            Self::emit_pool(&mut self.events, entity, pool);
        }
        true
    }

    /// Spend an ability cost of either variant
    pub fn spend(&mut self, entity: CombatEntityId, cost: &ResourceCost) -> bool {
        if self.kind(entity) != Some(cost.kind) {
            return false;
        }
        match self.resources.get_mut(entity) {
            Some(SecondaryResource::Pool(pool)) => {
                if !pool.try_spend(cost.amount) {
                    return false;
                }
                if cost.amount > 0.0 {
                    Self::emit_pool(&mut self.events, entity, pool);
                }
                true
            }
            Some(SecondaryResource::ComboPoints(combo)) => {
                let count = cost.amount.ceil().max(0.0) as u8;
                if !combo.try_spend(count) {
                    return false;
                }
                if count > 0 {
                    self.events.push(CombatEvent::ComboPointsChanged {
                        entity,
                        points: combo.points(),
                    });
                }
                true
            }
            None => false,
        }
    }

    /// Regenerate or decay one entity's pool
    pub fn apply_decay(&mut self, entity: CombatEntityId, delta: f64, in_combat: bool) {
        if let Some(SecondaryResource::Pool(pool)) = self.resources.get_mut(entity) {
            if pool.apply_decay(delta, in_combat) != 0.0 {
                Self::emit_pool(&mut self.events, entity, pool);
            }
        }
    }

    /// Advance every pool by `delta`, asking the host who is in combat
    pub fn tick<S: Spatial + ?Sized>(&mut self, delta: f64, world: &S) {
        let Self {
            resources, events, ..
        } = self;
        for (entity, resource) in resources.iter_mut() {
            if let SecondaryResource::Pool(pool) = resource {
                if pool.apply_decay(delta, world.is_in_combat(entity)) != 0.0 {
                    Self::emit_pool(events, entity, pool);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Combo points
    // ------------------------------------------------------------------

    /// Points on the counter; 0 for entities without one
    pub fn combo_points(&self, entity: CombatEntityId) -> u8 {
        match self.resources.get(entity) {
            Some(SecondaryResource::ComboPoints(combo)) => combo.points(),
            _ => 0,
        }
    }

    /// Add a single point, see `add_combo_points`
    pub fn add_combo_point(&mut self, entity: CombatEntityId) -> u8 {
        self.add_combo_points(entity, 1)
    }

    /// Add points, clamped at the cap; returns the number actually added
    pub fn add_combo_points(&mut self, entity: CombatEntityId, count: u8) -> u8 {
        let Some(SecondaryResource::ComboPoints(combo)) = self.resources.get_mut(entity) else {
            return 0;
        };
        let added = combo.add(count);
        if added > 0 {
            self.events.push(CombatEvent::ComboPointsChanged {
                entity,
                points: combo.points(),
            });
        }
        added
    }

    /// Zero the counter and return how many points were consumed
    pub fn consume_all_combo_points(&mut self, entity: CombatEntityId) -> u8 {
        let Some(SecondaryResource::ComboPoints(combo)) = self.resources.get_mut(entity) else {
            return 0;
        };
        let consumed = combo.consume_all();
        if consumed > 0 {
            self.events.push(CombatEvent::ComboPointsChanged { entity, points: 0 });
        }
        consumed
    }

    /// Finisher damage multiplier for `points` consumed points
    pub fn combo_point_damage_multiplier(&self, points: u8) -> f64 {
        combo_point_damage_multiplier(
            points.min(COMBO_POINT_CAP),
            self.config.combo_point_damage_bonus,
        )
    }

    // ------------------------------------------------------------------
    // Rage
    // ------------------------------------------------------------------

    /// Rage for landing a hit; ignored for non-rage users
    pub fn generate_rage_from_damage_dealt(&mut self, entity: CombatEntityId) {
        self.generate_rage(entity, self.config.rage_per_damage_dealt);
    }

    /// Rage for being hit. Taking damage also counts as combat activity and
    /// delays the out-of-combat decay.
    pub fn generate_rage_from_damage_taken(&mut self, entity: CombatEntityId) {
        self.generate_rage(entity, self.config.rage_per_damage_taken);
    }

    fn generate_rage(&mut self, entity: CombatEntityId, amount: f64) {
        if self.kind(entity) == Some(ResourceKind::Rage) {
            self.add_resource(entity, amount);
        }
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.events.drain()
    }

    fn emit_pool(events: &mut EventQueue, entity: CombatEntityId, pool: &ResourcePool) {
        events.push(CombatEvent::ResourceChanged {
            entity,
            kind: pool.kind,
            current: pool.current(),
            max: pool.max(),
        });
        if pool.current() <= 0.0 {
            events.push(CombatEvent::ResourceEmpty {
                entity,
                kind: pool.kind,
            });
        }
    }
}

/// Linear finisher scaling: `1 + points × bonus`
pub fn combo_point_damage_multiplier(points: u8, bonus_per_point: f64) -> f64 {
    1.0 + points as f64 * bonus_per_point
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::SandboxWorld;
    use combat_types::Position;
    use proptest::prelude::*;

    fn id(raw: u64) -> CombatEntityId {
        CombatEntityId(raw)
    }

    fn engine() -> ResourceEngine {
        ResourceEngine::new(ResourceConstants::default())
    }

    #[test]
    fn test_energy_spend() {
        let mut engine = engine();
        engine.register(id(1), ResourceKind::Energy);
        assert_eq!(engine.current(id(1)), Some(100.0));

        assert!(engine.try_spend_resource(id(1), 40.0));
        assert_eq!(engine.current(id(1)), Some(60.0));
        assert!(!engine.try_spend_resource(id(1), 61.0));
        assert_eq!(engine.current(id(1)), Some(60.0));

        let events = engine.drain_events();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_resource_empty_event() {
        let mut engine = engine();
        engine.register(id(1), ResourceKind::Focus);
        assert!(engine.try_spend_resource(id(1), 100.0));
        let events = engine.drain_events();
        assert!(events.contains(&CombatEvent::ResourceEmpty {
            entity: id(1),
            kind: ResourceKind::Focus
        }));
    }

    #[test]
    fn test_rage_decays_only_out_of_combat() {
        let mut engine = engine();
        engine.register_for_class(id(1), CharacterClass::Warrior);
        assert_eq!(engine.current(id(1)), Some(0.0));

        engine.add_resource(id(1), 50.0);
        engine.apply_decay(id(1), 1.0, true);
        assert_eq!(engine.current(id(1)), Some(50.0));

        engine.apply_decay(id(1), 1.0, false);
        assert_eq!(engine.current(id(1)), Some(48.0));
    }

    #[test]
    fn test_tick_uses_host_combat_state() {
        let mut world = SandboxWorld::new();
        world.spawn(id(1), Position::default(), 100.0, 0);
        world.set_in_combat(id(1), true);

        let mut engine = engine();
        engine.register(id(1), ResourceKind::Rage);
        engine.add_resource(id(1), 20.0);
        engine.tick(2.0, &world);
        assert_eq!(engine.current(id(1)), Some(20.0));

        world.set_in_combat(id(1), false);
        engine.tick(2.0, &world);
        assert_eq!(engine.current(id(1)), Some(16.0));
    }

    #[test]
    fn test_rage_generation() {
        let mut engine = engine();
        engine.register(id(1), ResourceKind::Rage);
        engine.register(id(2), ResourceKind::Energy);

        engine.generate_rage_from_damage_dealt(id(1));
        engine.generate_rage_from_damage_taken(id(1));
        assert_eq!(engine.current(id(1)), Some(8.0));

        engine.generate_rage_from_damage_dealt(id(2));
        assert_eq!(engine.current(id(2)), Some(100.0));
    }

    #[test]
    fn test_combo_point_round_trip() {
        let mut engine = engine();
        engine.register(id(1), ResourceKind::ComboPoints);

        for _ in 0..5 {
            assert_eq!(engine.add_combo_point(id(1)), 1);
        }
        assert_eq!(engine.add_combo_point(id(1)), 0);
        assert_eq!(engine.combo_points(id(1)), 5);

        assert_eq!(engine.consume_all_combo_points(id(1)), 5);
        assert_eq!(engine.combo_points(id(1)), 0);
    }

    #[test]
    fn test_combo_point_multiplier() {
        let engine = engine();
        assert!((engine.combo_point_damage_multiplier(0) - 1.0).abs() < f64::EPSILON);
        assert!((engine.combo_point_damage_multiplier(5) - 2.0).abs() < 1e-9);
        assert!((engine.combo_point_damage_multiplier(9) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_spend_cost_kind_mismatch() {
        let mut engine = engine();
        engine.register(id(1), ResourceKind::Mana);
        let cost = ResourceCost {
            kind: ResourceKind::Energy,
            amount: 10.0,
        };
        assert!(!engine.can_afford(id(1), &cost));
        assert!(!engine.spend(id(1), &cost));
        assert_eq!(engine.current(id(1)), Some(100.0));
    }

    proptest! {
        #[test]
        fn resources_stay_clamped(ops in prop::collection::vec(-150.0f64..150.0, 1..40)) {
            let mut engine = engine();
            engine.register(id(1), ResourceKind::Energy);
            for amount in ops {
                if amount < 0.0 {
                    engine.try_spend_resource(id(1), -amount);
                } else {
                    engine.add_resource(id(1), amount);
                }
                let current = engine.current(id(1)).unwrap();
                prop_assert!((0.0..=100.0).contains(&current));
            }
        }

        #[test]
        fn combo_points_never_exceed_cap(adds in prop::collection::vec(0u8..4, 0..20)) {
            let mut engine = engine();
            engine.register(id(1), ResourceKind::ComboPoints);
            for count in adds {
                engine.add_combo_points(id(1), count);
                prop_assert!(engine.combo_points(id(1)) <= COMBO_POINT_CAP);
            }
        }
    }
}
