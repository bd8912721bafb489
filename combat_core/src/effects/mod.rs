//! Buff/debuff engine
//!
//! Effects live in two ordered lists per target, one for buffs and one for
//! debuffs. Reapplying an effect refreshes it in place; a full list evicts the
//! instance closest to expiring. Crowd-control debuffs pass through the
//! diminishing-returns tracker before they are stored.

mod instance;

pub use instance::EffectInstance;

use crate::arena::EntityArena;
use crate::config::EffectConstants;
use crate::diminishing::{DiminishedDuration, DrTracker};
use crate::events::{CombatEvent, EventQueue};
use crate::world::CombatResolver;
use combat_types::{
    CcCategory, CombatEntityId, EffectCategory, EffectDefinition, EffectId, Polarity,
};
use instance::PeriodicPulse;
use tracing::{debug, info};

/// Result of applying an effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectApplication {
    /// A new instance was stored
    Applied { duration: f64 },
    /// An existing instance was refreshed and gained a stack (up to its cap)
    Refreshed { duration: f64, stacks: u32 },
    /// Diminishing returns scaled the duration to nothing
    Resisted,
    /// Target is immune to the effect's crowd-control category
    Immune,
}

impl EffectApplication {
    /// Effective duration; zero when nothing was stored
    pub fn duration(&self) -> f64 {
        match self {
            EffectApplication::Applied { duration }
            | EffectApplication::Refreshed { duration, .. } => *duration,
            EffectApplication::Resisted | EffectApplication::Immune => 0.0,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.duration() > 0.0
    }
}

#[derive(Debug, Clone, Default)]
struct EffectLists {
    buffs: Vec<EffectInstance>,
    debuffs: Vec<EffectInstance>,
}

impl EffectLists {
    fn list(&self, polarity: Polarity) -> &Vec<EffectInstance> {
        match polarity {
            Polarity::Buff => &self.buffs,
            Polarity::Debuff => &self.debuffs,
        }
    }

    fn list_mut(&mut self, polarity: Polarity) -> &mut Vec<EffectInstance> {
        match polarity {
            Polarity::Buff => &mut self.buffs,
            Polarity::Debuff => &mut self.debuffs,
        }
    }

    fn all(&self) -> impl Iterator<Item = &EffectInstance> {
        self.buffs.iter().chain(self.debuffs.iter())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EffectEngine {
    targets: EntityArena<EffectLists>,
    config: EffectConstants,
    events: EventQueue,
}

impl EffectEngine {
    /// Create an engine with no tracked targets
    pub fn new(config: EffectConstants) -> Self {
        EffectEngine {
            targets: EntityArena::new(),
            config,
            events: EventQueue::new(),
        }
    }

    /// Apply an effect to the list matching its polarity
    pub fn apply_effect(
        &mut self,
        target: CombatEntityId,
        definition: &EffectDefinition,
        source: CombatEntityId,
        diminishing: &mut DrTracker,
    ) -> EffectApplication {
        self.apply_to(definition.polarity(), target, definition, source, diminishing)
    }

    /// Apply an effect to the target's buff list
    pub fn apply_buff(
        &mut self,
        target: CombatEntityId,
        definition: &EffectDefinition,
        source: CombatEntityId,
        diminishing: &mut DrTracker,
    ) -> EffectApplication {
        self.apply_to(Polarity::Buff, target, definition, source, diminishing)
    }

    /// Apply an effect to the target's debuff list
    pub fn apply_debuff(
        &mut self,
        target: CombatEntityId,
        definition: &EffectDefinition,
        source: CombatEntityId,
        diminishing: &mut DrTracker,
    ) -> EffectApplication {
        self.apply_to(Polarity::Debuff, target, definition, source, diminishing)
    }

    fn apply_to(
        &mut self,
        polarity: Polarity,
        target: CombatEntityId,
        definition: &EffectDefinition,
        source: CombatEntityId,
        diminishing: &mut DrTracker,
    ) -> EffectApplication {
        let clamped = definition
            .duration
            .clamp(self.config.min_duration, self.config.max_duration);

        let cc = definition.crowd_control_category();
        let duration = match cc {
            Some(category) => match diminishing.apply_diminishing_returns(target, category, clamped) {
                DiminishedDuration::Immune => return EffectApplication::Immune,
                DiminishedDuration::Applied { duration, .. } => duration,
            },
            None => clamped,
        };
        if duration <= 0.0 {
            return EffectApplication::Resisted;
        }

        let cap = match polarity {
            Polarity::Buff => self.config.max_buffs,
            Polarity::Debuff => self.config.max_debuffs,
        };
        let Self {
            targets, events, ..
        } = self;
        let list = targets
            .get_or_insert_with(target, EffectLists::default)
            .list_mut(polarity);

        if let Some(existing) = list.iter_mut().find(|i| i.id() == &definition.id) {
            existing.refresh(duration);
            existing.add_stack();
            let stacks = existing.stacks;
            debug!(%target, effect = %definition.id, stacks, duration, "Effect refreshed");
            events.push(CombatEvent::EffectRefreshed {
                target,
                effect: definition.id.clone(),
                duration,
                stacks,
            });
            if let Some(category) = cc {
                events.push(CombatEvent::CrowdControlApplied {
                    target,
                    category,
                    duration,
                });
            }
            return EffectApplication::Refreshed { duration, stacks };
        }

        if list.len() >= cap {
            if let Some(evicted) = evict_oldest(list) {
                debug!(%target, effect = %evicted.id(), "Effect evicted at cap");
                events.push(CombatEvent::EffectEvicted {
                    target,
                    effect: evicted.id().clone(),
                });
                emit_cc_expired(events, &evicted);
            }
        }

        list.push(EffectInstance::new(definition, source, target, duration));
        debug_assert!(list.len() <= cap);

        events.push(CombatEvent::EffectApplied {
            target,
            source,
            effect: definition.id.clone(),
            polarity,
            duration,
        });
        if let Some(category) = cc {
            info!(%target, %category, duration, "Crowd control applied");
            events.push(CombatEvent::CrowdControlApplied {
                target,
                category,
                duration,
            });
        }
        EffectApplication::Applied { duration }
    }

    /// Advance durations and resolve due periodic ticks through the host
    pub fn tick<R: CombatResolver + ?Sized>(&mut self, delta: f64, resolver: &mut R) {
        let Self {
            targets, events, ..
        } = self;

        for (target, lists) in targets.iter_mut() {
            for polarity in [Polarity::Buff, Polarity::Debuff] {
                let list = lists.list_mut(polarity);
                let mut i = 0;
                while i < list.len() {
                    let instance = &mut list[i];
                    let pulses = instance.tick(delta);
                    if !resolver.is_dead(target) {
                        for pulse in pulses {
                            resolve_pulse(resolver, events, instance, pulse);
                        }
                    }

                    if instance.is_expired() {
                        let expired = list.remove(i);
                        debug!(%target, effect = %expired.id(), "Effect expired");
                        events.push(CombatEvent::EffectExpired {
                            target,
                            effect: expired.id().clone(),
                        });
                        emit_cc_expired(events, &expired);
                    } else {
                        i += 1;
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Remove a buff by id; false when the target does not have it
    pub fn remove_buff(&mut self, target: CombatEntityId, id: &str) -> bool {
        self.remove_from(Polarity::Buff, target, id)
    }

    pub fn remove_debuff(&mut self, target: CombatEntityId, id: &str) -> bool {
        self.remove_from(Polarity::Debuff, target, id)
    }

    /// Remove an effect from whichever list holds it
    pub fn remove_effect(&mut self, target: CombatEntityId, id: &str) -> bool {
        self.remove_buff(target, id) || self.remove_debuff(target, id)
    }

    fn remove_from(&mut self, polarity: Polarity, target: CombatEntityId, id: &str) -> bool {
        let Some(lists) = self.targets.get_mut(target) else {
            return false;
        };
        let list = lists.list_mut(polarity);
        let Some(index) = list.iter().position(|i| i.id().as_str() == id) else {
            return false;
        };
        let removed = list.remove(index);
        emit_removed(&mut self.events, &removed);
        true
    }

    /// Strip every buff, emitting `EffectRemoved` for each
    pub fn remove_all_buffs(&mut self, target: CombatEntityId) {
        self.remove_all(Polarity::Buff, target);
    }

    pub fn remove_all_debuffs(&mut self, target: CombatEntityId) {
        self.remove_all(Polarity::Debuff, target);
    }

    fn remove_all(&mut self, polarity: Polarity, target: CombatEntityId) {
        let Some(lists) = self.targets.get_mut(target) else {
            return;
        };
        for removed in std::mem::take(lists.list_mut(polarity)) {
            emit_removed(&mut self.events, &removed);
        }
    }

    /// Strip up to `count` dispellable effects of one polarity, oldest first
    ///
    /// Effects marked undispellable are skipped. Returns the removed ids.
    pub fn dispel(
        &mut self,
        target: CombatEntityId,
        polarity: Polarity,
        count: u32,
    ) -> Vec<EffectId> {
        let Some(lists) = self.targets.get_mut(target) else {
            return Vec::new();
        };
        let list = lists.list_mut(polarity);
        let mut removed = Vec::new();
        let mut i = 0;
        while i < list.len() && removed.len() < count as usize {
            if !list[i].definition.dispellable {
                i += 1;
                continue;
            }
            let instance = list.remove(i);
            debug!(%target, effect = %instance.id(), "Effect dispelled");
            self.events.push(CombatEvent::EffectDispelled {
                target,
                effect: instance.id().clone(),
            });
            emit_cc_expired(&mut self.events, &instance);
            removed.push(instance.definition.id);
        }
        removed
    }

    /// Remove every buff and debuff from a target
    pub fn clear_all_effects(&mut self, target: CombatEntityId) {
        self.remove_all_buffs(target);
        self.remove_all_debuffs(target);
    }

    /// Forget a target entirely without emitting removal events
    pub fn unregister(&mut self, target: CombatEntityId) {
        self.targets.remove(target);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether any active effect on the target carries `category`
    pub fn is_affected_by(&self, target: CombatEntityId, category: CcCategory) -> bool {
        self.active_debuffs(target)
            .iter()
            .any(|i| i.definition.crowd_control_category() == Some(category))
    }

    pub fn is_stunned(&self, target: CombatEntityId) -> bool {
        self.is_affected_by(target, CcCategory::Stun)
    }

    pub fn is_feared(&self, target: CombatEntityId) -> bool {
        self.is_affected_by(target, CcCategory::Fear)
    }

    pub fn is_rooted(&self, target: CombatEntityId) -> bool {
        self.is_affected_by(target, CcCategory::Root)
    }

    pub fn is_silenced(&self, target: CombatEntityId) -> bool {
        self.is_affected_by(target, CcCategory::Silence)
    }

    /// First active crowd control that prevents all actions (stun or fear)
    pub fn incapacitating_cc(&self, target: CombatEntityId) -> Option<CcCategory> {
        self.active_debuffs(target)
            .iter()
            .filter_map(|i| i.definition.crowd_control_category())
            .find(|cc| cc.prevents_actions())
    }

    /// Summed slow magnitude, clamped to the configured maximum
    pub fn slow_percent(&self, target: CombatEntityId) -> f64 {
        let total: f64 = self
            .active_debuffs(target)
            .iter()
            .filter_map(|i| match i.definition.category {
                EffectCategory::CrowdControl {
                    cc: CcCategory::Slow,
                    magnitude,
                } => Some(magnitude),
                _ => None,
            })
            .sum();
        total.clamp(0.0, self.config.max_slow)
    }

    fn find(&self, target: CombatEntityId, id: &str) -> Option<&EffectInstance> {
        self.targets
            .get(target)?
            .all()
            .find(|i| i.id().as_str() == id)
    }

    pub fn has_effect(&self, target: CombatEntityId, id: &str) -> bool {
        self.find(target, id).is_some()
    }

    /// Seconds left on the effect; `None` if not present
    pub fn remaining_duration(&self, target: CombatEntityId, id: &str) -> Option<f64> {
        self.find(target, id).map(|i| i.remaining)
    }

    /// Current stack count of the effect
    pub fn stacks(&self, target: CombatEntityId, id: &str) -> Option<u32> {
        self.find(target, id).map(|i| i.stacks)
    }

    /// Buffs in application order (oldest first)
    pub fn active_buffs(&self, target: CombatEntityId) -> &[EffectInstance] {
        self.targets
            .get(target)
            .map_or(&[], |lists| lists.list(Polarity::Buff).as_slice())
    }

    pub fn active_debuffs(&self, target: CombatEntityId) -> &[EffectInstance] {
        self.targets
            .get(target)
            .map_or(&[], |lists| lists.list(Polarity::Debuff).as_slice())
    }

    pub fn buff_count(&self, target: CombatEntityId) -> usize {
        self.active_buffs(target).len()
    }

    pub fn debuff_count(&self, target: CombatEntityId) -> usize {
        self.active_debuffs(target).len()
    }

    pub fn effect_count(&self, target: CombatEntityId) -> usize {
        self.buff_count(target) + self.debuff_count(target)
    }

    /// Events pushed since the last drain
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.events.drain()
    }
}

/// Remove the instance closest to expiring; earlier insertion wins ties
fn evict_oldest(list: &mut Vec<EffectInstance>) -> Option<EffectInstance> {
    let index = list
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.remaining.total_cmp(&b.remaining))
        .map(|(i, _)| i)?;
    Some(list.remove(index))
}

fn resolve_pulse<R: CombatResolver + ?Sized>(
    resolver: &mut R,
    events: &mut EventQueue,
    instance: &EffectInstance,
    pulse: PeriodicPulse,
) {
    let target = instance.target;
    let source = instance.source;
    let amount = match &instance.definition.category {
        EffectCategory::DamageOverTime { damage_type, .. } => {
            let dealt = resolver.apply_damage(target, pulse.amount, *damage_type, source);
            if dealt > 0.0 {
                events.push(CombatEvent::DamageResolved {
                    source,
                    target,
                    amount: dealt,
                    damage_type: *damage_type,
                    threat: dealt,
                });
            }
            dealt
        }
        EffectCategory::HealOverTime { .. } => {
            let healed = resolver.apply_healing(target, pulse.amount, source);
            if healed > 0.0 {
                events.push(CombatEvent::HealingResolved {
                    source,
                    target,
                    amount: healed,
                });
            }
            healed
        }
        _ => return,
    };

    debug!(%target, %source, effect = %instance.id(), amount, "Periodic tick");
    events.push(CombatEvent::PeriodicTick {
        target,
        source,
        effect: instance.id().clone(),
        amount,
        polarity: pulse.polarity,
    });
}

fn emit_removed(events: &mut EventQueue, removed: &EffectInstance) {
    events.push(CombatEvent::EffectRemoved {
        target: removed.target,
        effect: removed.id().clone(),
    });
    emit_cc_expired(events, removed);
}

fn emit_cc_expired(events: &mut EventQueue, instance: &EffectInstance) {
    if let Some(category) = instance.definition.crowd_control_category() {
        events.push(CombatEvent::CrowdControlExpired {
            target: instance.target,
            category,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiminishingReturnsConstants;
    use crate::sandbox::SandboxWorld;
    use combat_types::{DamageType, Position};
    use proptest::prelude::*;

    const CASTER: CombatEntityId = CombatEntityId(1);
    const TARGET: CombatEntityId = CombatEntityId(2);

    fn setup() -> (EffectEngine, DrTracker) {
        (
            EffectEngine::new(EffectConstants::default()),
            DrTracker::new(DiminishingReturnsConstants::default()),
        )
    }

    fn world() -> SandboxWorld {
        let mut world = SandboxWorld::new();
        world.spawn(CASTER, Position::default(), 100.0, 0);
        world.spawn(TARGET, Position::default(), 1000.0, 1);
        world
    }

    #[test]
    fn test_apply_and_expire() {
        let (mut effects, mut dr) = setup();
        let shield = EffectDefinition::buff("shield", "Shield", 5.0);

        let result = effects.apply_effect(TARGET, &shield, CASTER, &mut dr);
        assert_eq!(result, EffectApplication::Applied { duration: 5.0 });
        assert!(effects.has_effect(TARGET, "shield"));
        assert_eq!(effects.buff_count(TARGET), 1);

        let mut world = world();
        effects.tick(5.0, &mut world);
        assert!(!effects.has_effect(TARGET, "shield"));
        assert!(effects.drain_events().contains(&CombatEvent::EffectExpired {
            target: TARGET,
            effect: "shield".into()
        }));
    }

    #[test]
    fn test_reapply_refreshes_and_caps_stacks() {
        let (mut effects, mut dr) = setup();
        let sunder = EffectDefinition::debuff("sunder", "Sunder Armor", 30.0).with_max_stacks(3);
        let mut world = world();

        effects.apply_effect(TARGET, &sunder, CASTER, &mut dr);
        effects.tick(10.0, &mut world);
        effects.apply_effect(TARGET, &sunder, CASTER, &mut dr);
        effects.tick(10.0, &mut world);
        let result = effects.apply_effect(TARGET, &sunder, CASTER, &mut dr);
        assert_eq!(
            result,
            EffectApplication::Refreshed {
                duration: 30.0,
                stacks: 3
            }
        );

        let result = effects.apply_effect(TARGET, &sunder, CASTER, &mut dr);
        assert_eq!(
            result,
            EffectApplication::Refreshed {
                duration: 30.0,
                stacks: 3
            }
        );
        assert_eq!(effects.stacks(TARGET, "sunder"), Some(3));
        assert_eq!(effects.remaining_duration(TARGET, "sunder"), Some(30.0));
        assert_eq!(effects.debuff_count(TARGET), 1);
    }

    #[test]
    fn test_cap_evicts_shortest_remaining() {
        let (mut effects, mut dr) = setup();
        for i in 0..20 {
            let def = EffectDefinition::buff(format!("buff_{}", i), "Buff", 100.0 - i as f64);
            effects.apply_effect(TARGET, &def, CASTER, &mut dr);
        }
        assert_eq!(effects.buff_count(TARGET), 20);

        let extra = EffectDefinition::buff("extra", "Extra", 200.0);
        let result = effects.apply_effect(TARGET, &extra, CASTER, &mut dr);
        assert!(result.is_stored());
        assert_eq!(effects.buff_count(TARGET), 20);
        assert!(!effects.has_effect(TARGET, "buff_19"));
        assert!(effects.has_effect(TARGET, "extra"));
        assert!(effects.drain_events().contains(&CombatEvent::EffectEvicted {
            target: TARGET,
            effect: "buff_19".into()
        }));
    }

    #[test]
    fn test_duration_clamped() {
        let (mut effects, mut dr) = setup();
        let long = EffectDefinition::buff("long", "Long", 1000.0);
        let short = EffectDefinition::buff("short", "Short", 0.2);
        assert_eq!(
            effects.apply_effect(TARGET, &long, CASTER, &mut dr).duration(),
            300.0
        );
        assert_eq!(
            effects.apply_effect(TARGET, &short, CASTER, &mut dr).duration(),
            1.0
        );
    }

    #[test]
    fn test_dot_damage_attributed_to_source() {
        let (mut effects, mut dr) = setup();
        let mut world = world();
        let dot = EffectDefinition::damage_over_time("ignite", "Ignite", 6.0, DamageType::Fire, 25.0, 1.0);
        effects.apply_effect(TARGET, &dot, CASTER, &mut dr);
        effects.drain_events();

        effects.tick(3.0, &mut world);
        assert_eq!(world.health(TARGET), Some(925.0));

        let events = effects.drain_events();
        let resolved: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, CombatEvent::DamageResolved { source, .. } if *source == CASTER))
            .collect();
        assert_eq!(resolved.len(), 3);
    }

    #[test]
    fn test_hot_heals() {
        let (mut effects, mut dr) = setup();
        let mut world = world();
        world.set_health(TARGET, 500.0);
        let renew = EffectDefinition::heal_over_time("renew", "Renew", 9.0, 20.0, 3.0);
        effects.apply_effect(TARGET, &renew, CASTER, &mut dr);

        effects.tick(9.0, &mut world);
        assert_eq!(world.health(TARGET), Some(560.0));
        assert!(!effects.has_effect(TARGET, "renew"));
    }

    #[test]
    fn test_crowd_control_goes_through_dr() {
        let (mut effects, mut dr) = setup();
        let stun = EffectDefinition::crowd_control("kidney", "Kidney Shot", 4.0, CcCategory::Stun);

        assert_eq!(effects.apply_effect(TARGET, &stun, CASTER, &mut dr).duration(), 4.0);
        assert!(effects.is_stunned(TARGET));
        assert_eq!(effects.apply_effect(TARGET, &stun, CASTER, &mut dr).duration(), 2.0);
        assert_eq!(effects.apply_effect(TARGET, &stun, CASTER, &mut dr).duration(), 1.0);
        assert_eq!(
            effects.apply_effect(TARGET, &stun, CASTER, &mut dr),
            EffectApplication::Immune
        );
        assert_eq!(effects.remaining_duration(TARGET, "kidney"), Some(1.0));
    }

    #[test]
    fn test_immune_effect_not_stored() {
        let (mut effects, mut dr) = setup();
        let fear = EffectDefinition::crowd_control("fear", "Fear", 8.0, CcCategory::Fear);
        for _ in 0..3 {
            dr.apply_diminishing_returns(TARGET, CcCategory::Fear, 8.0);
        }
        assert_eq!(
            effects.apply_effect(TARGET, &fear, CASTER, &mut dr),
            EffectApplication::Immune
        );
        assert!(!effects.is_feared(TARGET));
        assert_eq!(effects.debuff_count(TARGET), 0);
    }

    #[test]
    fn test_slow_percent_clamped() {
        let (mut effects, mut dr) = setup();
        effects.apply_effect(TARGET, &EffectDefinition::slow("chill", "Chill", 10.0, 0.6), CASTER, &mut dr);
        assert!((effects.slow_percent(TARGET) - 0.6).abs() < f64::EPSILON);

        // Second slow category application is diminished, magnitude is not
        effects.apply_effect(TARGET, &EffectDefinition::slow("hamstring", "Hamstring", 10.0, 0.5), CASTER, &mut dr);
        assert!((effects.slow_percent(TARGET) - 1.0).abs() < f64::EPSILON);
        assert!(!effects.is_rooted(TARGET));
    }

    #[test]
    fn test_remove_and_clear() {
        let (mut effects, mut dr) = setup();
        effects.apply_effect(TARGET, &EffectDefinition::buff("a", "A", 10.0), CASTER, &mut dr);
        effects.apply_effect(TARGET, &EffectDefinition::debuff("b", "B", 10.0), CASTER, &mut dr);
        effects.apply_effect(
            TARGET,
            &EffectDefinition::crowd_control("c", "C", 10.0, CcCategory::Root),
            CASTER,
            &mut dr,
        );

        assert!(effects.remove_debuff(TARGET, "b"));
        assert!(!effects.remove_buff(TARGET, "b"));
        assert_eq!(effects.effect_count(TARGET), 2);

        effects.drain_events();
        effects.clear_all_effects(TARGET);
        assert_eq!(effects.effect_count(TARGET), 0);
        assert!(effects.drain_events().contains(&CombatEvent::CrowdControlExpired {
            target: TARGET,
            category: CcCategory::Root
        }));
    }

    #[test]
    fn test_dispel_skips_undispellable() {
        let (mut effects, mut dr) = setup();
        let curse = EffectDefinition::debuff("curse", "Curse", 30.0).undispellable();
        let poison = EffectDefinition::debuff("poison", "Poison", 30.0);
        let stun = EffectDefinition::crowd_control("stun", "Stun", 4.0, CcCategory::Stun);
        effects.apply_effect(TARGET, &curse, CASTER, &mut dr);
        effects.apply_effect(TARGET, &poison, CASTER, &mut dr);
        effects.apply_effect(TARGET, &stun, CASTER, &mut dr);
        effects.drain_events();

        let removed = effects.dispel(TARGET, Polarity::Debuff, 5);
        assert_eq!(removed, vec![EffectId::from("poison"), EffectId::from("stun")]);
        assert!(effects.has_effect(TARGET, "curse"));
        assert!(!effects.is_stunned(TARGET));

        let events = effects.drain_events();
        assert!(events.contains(&CombatEvent::EffectDispelled {
            target: TARGET,
            effect: "poison".into()
        }));
        assert!(events.contains(&CombatEvent::CrowdControlExpired {
            target: TARGET,
            category: CcCategory::Stun
        }));
    }

    #[test]
    fn test_dispel_respects_count() {
        let (mut effects, mut dr) = setup();
        for id in ["a", "b", "c"] {
            effects.apply_effect(TARGET, &EffectDefinition::buff(id, "Buff", 10.0), CASTER, &mut dr);
        }
        assert_eq!(effects.dispel(TARGET, Polarity::Buff, 1), vec![EffectId::from("a")]);
        assert_eq!(effects.buff_count(TARGET), 2);
        assert!(effects.dispel(TARGET, Polarity::Debuff, 1).is_empty());
    }

    #[test]
    fn test_dead_target_takes_no_ticks() {
        let (mut effects, mut dr) = setup();
        let mut world = world();
        let dot = EffectDefinition::damage_over_time("rend", "Rend", 6.0, DamageType::Physical, 10.0, 1.0);
        effects.apply_effect(TARGET, &dot, CASTER, &mut dr);
        world.kill(TARGET);
        effects.drain_events();

        effects.tick(2.0, &mut world);
        assert!(!effects
            .drain_events()
            .iter()
            .any(|e| matches!(e, CombatEvent::PeriodicTick { .. })));
    }

    proptest! {
        #[test]
        fn stacks_never_exceed_max(max_stacks in 1u32..6, applications in 1usize..15) {
            let (mut effects, mut dr) = setup();
            let def = EffectDefinition::debuff("stacking", "Stacking", 10.0).with_max_stacks(max_stacks);
            for _ in 0..applications {
                effects.apply_effect(TARGET, &def, CASTER, &mut dr);
                prop_assert!(effects.stacks(TARGET, "stacking").unwrap() <= max_stacks);
            }
        }

        #[test]
        fn buff_list_never_exceeds_cap(count in 1usize..40) {
            let (mut effects, mut dr) = setup();
            for i in 0..count {
                let def = EffectDefinition::buff(format!("b{}", i), "Buff", 10.0 + i as f64);
                effects.apply_effect(TARGET, &def, CASTER, &mut dr);
            }
            prop_assert_eq!(effects.buff_count(TARGET), count.min(20));
        }
    }
}
