use combat_types::AbilityDefinition;
use std::sync::Arc;

/// One action-bar slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbilitySlotState {
    pub ability: Option<Arc<AbilityDefinition>>,
    pub cooldown_remaining: f64,
    /// Simulation time of the last successful execution
    pub last_used: Option<f64>,
}

impl AbilitySlotState {
    pub fn is_on_cooldown(&self) -> bool {
        self.cooldown_remaining > 0.0
    }

    /// Count the cooldown down, flooring at zero
    pub fn tick(&mut self, delta: f64) {
        if self.cooldown_remaining > 0.0 {
            self.cooldown_remaining = (self.cooldown_remaining - delta).max(0.0);
        }
    }

    pub fn start_cooldown(&mut self, now: f64) {
        if let Some(ability) = &self.ability {
            self.cooldown_remaining = ability.cooldown;
        }
        self.last_used = Some(now);
    }
}
