use combat_types::{CombatEntityId, EffectCategory, EffectDefinition, EffectId, Polarity};

/// Tolerance for countdowns landing exactly on a tick boundary
const TICK_EPSILON: f64 = 1e-9;

/// A live buff or debuff on a target
#[derive(Debug, Clone, PartialEq)]
pub struct EffectInstance {
    pub definition: EffectDefinition,
    /// Entity that first applied the effect; periodic ticks are attributed to it
    pub source: CombatEntityId,
    pub target: CombatEntityId,
    pub remaining: f64,
    pub duration: f64,
    pub stacks: u32,
    /// Countdown to the next periodic tick
    time_until_tick: f64,
}

/// One resolved periodic tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PeriodicPulse {
    pub polarity: Polarity,
    pub amount: f64,
}

impl EffectInstance {
    pub fn new(
        definition: &EffectDefinition,
        source: CombatEntityId,
        target: CombatEntityId,
        duration: f64,
    ) -> Self {
        EffectInstance {
            definition: definition.clone(),
            source,
            target,
            remaining: duration,
            duration,
            stacks: 1,
            time_until_tick: definition.category.tick_interval().unwrap_or(0.0),
        }
    }

    pub fn id(&self) -> &EffectId {
        &self.definition.id
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Add a stack (capped at max_stacks)
    pub fn add_stack(&mut self) {
        if self.stacks < self.definition.max_stacks {
            self.stacks += 1;
        }
        debug_assert!(self.stacks <= self.definition.max_stacks.max(1));
    }

    /// Reset the remaining and total duration
    pub fn refresh(&mut self, new_duration: f64) {
        self.remaining = new_duration;
        self.duration = new_duration;
    }

    /// Advance by `delta`, returning every periodic pulse that came due
    ///
    /// Ticks never fire past the instance's remaining duration, so a large
    /// delta cannot squeeze extra ticks out of an expiring effect.
    pub(crate) fn tick(&mut self, delta: f64) -> Vec<PeriodicPulse> {
        let mut pulses = Vec::new();
        let step = delta.min(self.remaining.max(0.0));

        if let Some(interval) = self.definition.category.tick_interval() {
            let amount = match &self.definition.category {
                EffectCategory::DamageOverTime { tick_damage, .. } => *tick_damage,
                EffectCategory::HealOverTime { tick_healing, .. } => *tick_healing,
                _ => 0.0,
            } * self.stacks as f64;

            self.time_until_tick -= step;
            while self.time_until_tick <= TICK_EPSILON && interval > 0.0 {
                pulses.push(PeriodicPulse {
                    polarity: self.definition.polarity(),
                    amount,
                });
                self.time_until_tick += interval;
            }
        }

        self.remaining -= delta;
        pulses
    }
}
