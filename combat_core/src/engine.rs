//! The combat core facade
//!
//! [`CombatCore`] owns one instance of each engine and wires them together:
//! resolved damage and healing are routed into threat and rage, deaths tear
//! down per-entity state, and a single `tick` advances everything in a fixed
//! order.

use crate::ability::{AbilityContext, AbilityEngine, ExecutionOutcome};
use crate::config::{CombatConfig, ConfigError};
use crate::diminishing::DrTracker;
use crate::effects::{EffectApplication, EffectEngine};
use crate::error::AbilityError;
use crate::events::{CombatEvent, InterruptReason};
use crate::resource::ResourceEngine;
use crate::threat::ThreatEngine;
use crate::world::CombatHost;
use combat_types::{AbilityDefinition, CharacterClass, CombatEntityId, EffectDefinition, ResourceKind};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Damage or healing waiting to be fed into threat and rage
enum Routed {
    Damage {
        source: CombatEntityId,
        target: CombatEntityId,
        threat: f64,
    },
    Healing {
        source: CombatEntityId,
        amount: f64,
    },
}

impl Routed {
    fn from_event(event: &CombatEvent) -> Option<Self> {
        match *event {
            CombatEvent::DamageResolved {
                source,
                target,
                threat,
                ..
            } => Some(Routed::Damage {
                source,
                target,
                threat,
            }),
            CombatEvent::HealingResolved { source, amount, .. } => {
                Some(Routed::Healing { source, amount })
            }
            _ => None,
        }
    }
}

/// Queue lengths taken before an operation, so only its own events are routed
#[derive(Debug, Clone, Copy)]
struct QueueMarks {
    effects: usize,
    abilities: usize,
}

/// One instance of each engine, wired together
///
/// The engines stay reachable through accessors; draining an engine's queue
/// directly only hides those events from `drain_events`, routing into threat
/// and rage has already happened by the time any call returns.
#[derive(Debug, Clone, Default)]
pub struct CombatCore {
    config: CombatConfig,
    resources: ResourceEngine,
    diminishing: DrTracker,
    effects: EffectEngine,
    threat: ThreatEngine,
    abilities: AbilityEngine,
}

impl CombatCore {
    /// Build all five engines from one config
    pub fn new(config: CombatConfig) -> Self {
        CombatCore {
            resources: ResourceEngine::new(config.resources.clone()),
            diminishing: DrTracker::new(config.diminishing_returns.clone()),
            effects: EffectEngine::new(config.effects.clone()),
            threat: ThreatEngine::new(config.threat.clone()),
            abilities: AbilityEngine::new(config.abilities.clone()),
            config,
        }
    }

    /// Load and validate a TOML config, then build the core from it
    pub fn from_config_path(path: &Path) -> Result<Self, ConfigError> {
        let config = CombatConfig::load_from_path(path)?;
        info!(path = %path.display(), "Loaded combat config");
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn resources(&self) -> &ResourceEngine {
        &self.resources
    }

    /// Mutable access for hosts granting or draining resources directly
    pub fn resources_mut(&mut self) -> &mut ResourceEngine {
        &mut self.resources
    }

    pub fn diminishing(&self) -> &DrTracker {
        &self.diminishing
    }

    pub fn effects(&self) -> &EffectEngine {
        &self.effects
    }

    pub fn threat(&self) -> &ThreatEngine {
        &self.threat
    }

    pub fn threat_mut(&mut self) -> &mut ThreatEngine {
        &mut self.threat
    }

    pub fn abilities(&self) -> &AbilityEngine {
        &self.abilities
    }

    /// Direct engine access. Events drained here were already routed.
    pub fn abilities_mut(&mut self) -> &mut AbilityEngine {
        &mut self.abilities
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Give an entity an action bar and, optionally, a secondary resource
    pub fn register_entity(&mut self, entity: CombatEntityId, resource: Option<ResourceKind>) {
        self.abilities.register(entity);
        if let Some(kind) = resource {
            self.resources.register(entity, kind);
        }
        debug!(%entity, ?resource, "Entity registered");
    }

    /// Register with the class's default secondary resource
    pub fn register_class(&mut self, entity: CombatEntityId, class: CharacterClass) {
        self.register_entity(entity, Some(ResourceKind::for_class(class)));
    }

    /// Forget everything the engines hold for an entity
    pub fn unregister_entity(&mut self, entity: CombatEntityId) {
        self.abilities.unregister(entity);
        self.resources.unregister(entity);
        self.effects.unregister(entity);
        self.diminishing.clear(entity);
        self.threat.reset_threat(entity);
        self.threat.remove_contributor(entity);
        debug!(%entity, "Entity unregistered");
    }

    /// Put an ability in one slot of the entity's bar
    pub fn set_ability(
        &mut self,
        entity: CombatEntityId,
        slot: usize,
        ability: Arc<AbilityDefinition>,
    ) -> Result<(), AbilityError> {
        self.abilities.set_ability(entity, slot, ability)
    }

    /// Replace the entity's whole bar
    pub fn load_abilities(
        &mut self,
        entity: CombatEntityId,
        abilities: Vec<Arc<AbilityDefinition>>,
    ) -> Result<(), AbilityError> {
        self.abilities.load_abilities(entity, abilities)
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Validate and start the ability in `slot`
    ///
    /// Damage and healing from an instant resolution are routed into threat
    /// and rage before this returns. On error no state has changed.
    pub fn try_execute_ability<H: CombatHost + ?Sized>(
        &mut self,
        caster: CombatEntityId,
        slot: usize,
        host: &mut H,
    ) -> Result<ExecutionOutcome, AbilityError> {
        let marks = self.marks();
        let mut ctx = AbilityContext {
            host: &mut *host,
            resources: &mut self.resources,
            effects: &mut self.effects,
            diminishing: &mut self.diminishing,
        };
        let result = self.abilities.try_execute_ability(caster, slot, &mut ctx);
        self.route(marks, &*host);
        result
    }

    /// Stop a cast or channel without lockout
    pub fn interrupt(&mut self, entity: CombatEntityId) -> bool {
        self.abilities.interrupt(entity, InterruptReason::Manual)
    }

    /// Interrupt with a spell lockout; `None` uses the configured default
    pub fn interrupt_with_lockout(&mut self, entity: CombatEntityId, duration: Option<f64>) -> bool {
        let duration = duration.unwrap_or_else(|| self.abilities.default_lockout());
        self.abilities.interrupt_with_lockout(entity, duration)
    }

    /// Apply an effect outside of any ability (auras, scripted events)
    pub fn apply_effect(
        &mut self,
        target: CombatEntityId,
        definition: &EffectDefinition,
        source: CombatEntityId,
    ) -> EffectApplication {
        self.effects
            .apply_effect(target, definition, source, &mut self.diminishing)
    }

    /// Threat from outside the ability pipeline (e.g. proximity aggro)
    pub fn add_threat(&mut self, contributor: CombatEntityId, enemy: CombatEntityId, amount: f64) {
        self.threat.add_threat(contributor, enemy, amount);
    }

    /// Force aggro onto `contributor`, see `ThreatEngine::taunt`
    pub fn taunt(&mut self, contributor: CombatEntityId, enemy: CombatEntityId) {
        self.threat.taunt(contributor, enemy);
    }

    /// Tear down a dead entity's casts, effects and threat
    pub fn handle_death<H: CombatHost + ?Sized>(&mut self, entity: CombatEntityId, host: &H) {
        if host.is_alive(entity) {
            debug!(%entity, "handle_death on living entity");
        }
        info!(%entity, "Entity died");
        self.abilities.interrupt(entity, InterruptReason::CasterDied);
        self.effects.clear_all_effects(entity);
        self.diminishing.clear(entity);
        self.threat.reset_threat(entity);
        self.threat.remove_contributor(entity);
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Advance every engine by `delta` seconds
    ///
    /// Engines tick leaves first: resources, diminishing returns, effects,
    /// threat, then abilities. Periodic damage is routed before threat updates
    /// aggro; damage from casts finishing this tick is routed straight away but
    /// can only move aggro on the next tick.
    pub fn tick<H: CombatHost + ?Sized>(&mut self, delta: f64, host: &mut H) {
        if delta <= 0.0 {
            return;
        }
        let marks = self.marks();
        self.resources.tick(delta, &*host);
        self.diminishing.tick(delta);
        self.effects.tick(delta, &mut *host);
        self.route(marks, &*host);
        self.threat.tick(&*host);

        let marks = self.marks();
        let mut ctx = AbilityContext {
            host: &mut *host,
            resources: &mut self.resources,
            effects: &mut self.effects,
            diminishing: &mut self.diminishing,
        };
        self.abilities.tick(delta, &mut ctx);
        self.route(marks, &*host);
    }

    fn marks(&self) -> QueueMarks {
        QueueMarks {
            effects: self.effects.events().len(),
            abilities: self.abilities.events().len(),
        }
    }

    /// Feed damage and healing resolved since `marks` into threat and rage
    fn route<H: CombatHost + ?Sized>(&mut self, marks: QueueMarks, host: &H) {
        let pending: Vec<Routed> = self
            .effects
            .events()
            .since(marks.effects)
            .iter()
            .chain(self.abilities.events().since(marks.abilities))
            .filter_map(Routed::from_event)
            .collect();

        for routed in pending {
            match routed {
                Routed::Damage {
                    source,
                    target,
                    threat,
                } => {
                    if source == target {
                        continue;
                    }
                    self.threat.add_threat(source, target, threat);
                    self.resources.generate_rage_from_damage_dealt(source);
                    self.resources.generate_rage_from_damage_taken(target);
                }
                Routed::Healing { source, amount } => {
                    let enemies = host.engaged_enemies(source);
                    self.threat.add_healing_threat(source, amount, &enemies);
                }
            }
        }
    }

    /// Take every pending event, grouped by engine
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        let mut events = self.resources.drain_events();
        events.extend(self.diminishing.drain_events());
        events.extend(self.effects.drain_events());
        events.extend(self.abilities.drain_events());
        events.extend(self.threat.drain_events());
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::SandboxWorld;
    use combat_types::{DamageType, Position};

    const WARRIOR: CombatEntityId = CombatEntityId(1);
    const PRIEST: CombatEntityId = CombatEntityId(2);
    const OGRE: CombatEntityId = CombatEntityId(10);

    fn setup() -> (CombatCore, SandboxWorld) {
        let mut world = SandboxWorld::new();
        world.spawn(WARRIOR, Position::default(), 500.0, 0);
        world.spawn(PRIEST, Position::new(0.0, 10.0, 0.0), 300.0, 0);
        world.spawn(OGRE, Position::new(3.0, 0.0, 0.0), 5000.0, 1);
        world.set_target(WARRIOR, Some(OGRE));
        world.set_target(PRIEST, Some(WARRIOR));

        let mut core = CombatCore::default();
        core.register_class(WARRIOR, CharacterClass::Warrior);
        core.register_class(PRIEST, CharacterClass::Priest);
        core.register_entity(OGRE, None);

        core.set_ability(
            WARRIOR,
            0,
            Arc::new(
                AbilityDefinition::new("heroic_strike", "Heroic Strike")
                    .with_range(5.0)
                    .with_damage(DamageType::Physical, 40.0)
                    .with_threat_multiplier(2.0),
            ),
        )
        .unwrap();
        core.set_ability(
            PRIEST,
            0,
            Arc::new(
                AbilityDefinition::new("flash_heal", "Flash Heal")
                    .with_range(40.0)
                    .spell()
                    .with_healing(100.0),
            ),
        )
        .unwrap();
        (core, world)
    }

    #[test]
    fn test_damage_routes_to_threat_and_rage() {
        let (mut core, mut world) = setup();
        core.try_execute_ability(WARRIOR, 0, &mut world).unwrap();

        assert!((core.threat().threat(WARRIOR, OGRE) - 80.0).abs() < f64::EPSILON);
        assert_eq!(core.threat().current_target(OGRE), Some(WARRIOR));
        assert_eq!(core.resources().current(WARRIOR), Some(5.0));
    }

    #[test]
    fn test_healing_threat_split_across_engaged_enemies() {
        let (mut core, mut world) = setup();
        core.try_execute_ability(WARRIOR, 0, &mut world).unwrap();
        world.set_health(WARRIOR, 300.0);

        core.try_execute_ability(PRIEST, 0, &mut world).unwrap();
        // 100 healed × 0.5, one engaged enemy
        assert!((core.threat().threat(PRIEST, OGRE) - 50.0).abs() < f64::EPSILON);
        assert_eq!(core.threat().current_target(OGRE), Some(WARRIOR));
    }

    #[test]
    fn test_events_routed_once() {
        let (mut core, mut world) = setup();
        core.try_execute_ability(WARRIOR, 0, &mut world).unwrap();
        core.tick(0.1, &mut world);
        core.tick(0.1, &mut world);
        assert!((core.threat().threat(WARRIOR, OGRE) - 80.0).abs() < f64::EPSILON);

        let events = core.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, CombatEvent::AggroChanged { current: Some(WARRIOR), .. })));
        assert!(core.drain_events().is_empty());
    }

    #[test]
    fn test_death_clears_threat_and_effects() {
        let (mut core, mut world) = setup();
        core.try_execute_ability(WARRIOR, 0, &mut world).unwrap();
        core.apply_effect(
            OGRE,
            &EffectDefinition::damage_over_time("rend", "Rend", 15.0, DamageType::Physical, 5.0, 3.0),
            WARRIOR,
        );

        world.kill(OGRE);
        core.handle_death(OGRE, &world);
        assert_eq!(core.effects().effect_count(OGRE), 0);
        assert!(core.threat().table(OGRE).is_none());
    }

    #[test]
    fn test_out_of_combat_enemy_resets() {
        let (mut core, mut world) = setup();
        core.try_execute_ability(WARRIOR, 0, &mut world).unwrap();
        world.set_in_combat(OGRE, false);
        core.tick(0.1, &mut world);
        assert_eq!(core.threat().current_target(OGRE), None);
    }
}
