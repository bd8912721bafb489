use crate::config::AbilityConfig;
use crate::ContentError;
use combat_types::{AbilityDefinition, AbilityPayload, EffectCategory, EffectDefinition, EffectId};
use std::collections::HashMap;

/// Reject effect templates the engines cannot run
pub(crate) fn validate_effect(effect: &EffectDefinition) -> Result<(), ContentError> {
    let invalid = |message: &str| ContentError::Invalid {
        id: effect.id.to_string(),
        message: message.to_string(),
    };

    if !(effect.duration > 0.0) {
        return Err(invalid("duration must be positive"));
    }
    if effect.max_stacks == 0 {
        return Err(invalid("max_stacks must be at least 1"));
    }
    if let Some(interval) = effect.category.tick_interval() {
        if !(interval > 0.0) {
            return Err(invalid("tick_interval must be positive"));
        }
    }
    if let EffectCategory::CrowdControl { magnitude, .. } = effect.category {
        if !(0.0..=1.0).contains(&magnitude) {
            return Err(invalid("magnitude must be within [0, 1]"));
        }
    }
    Ok(())
}

impl AbilityConfig {
    /// Resolve effect references and build the runtime definition
    pub(crate) fn into_definition(
        self,
        effects: &HashMap<EffectId, EffectDefinition>,
    ) -> Result<AbilityDefinition, ContentError> {
        let invalid = |message: &str| ContentError::Invalid {
            id: self.id.clone(),
            message: message.to_string(),
        };

        if self.cast_time < 0.0 {
            return Err(invalid("cast_time must not be negative"));
        }
        if self.cooldown < 0.0 {
            return Err(invalid("cooldown must not be negative"));
        }
        if self.channel_ticks > 0 && !(self.channel_tick_interval > 0.0) {
            return Err(invalid("channel_tick_interval must be positive"));
        }
        if self.channel_ticks > 0 && self.cast_time > 0.0 {
            return Err(invalid("an ability is either cast or channeled, not both"));
        }
        if let Some(cost) = &self.cost {
            if cost.amount < 0.0 {
                return Err(invalid("cost must not be negative"));
            }
        }
        if let Some(dispel) = &self.dispel {
            if dispel.count == 0 {
                return Err(invalid("dispel count must be at least 1"));
            }
        }
        if let Some(lockout) = self.interrupt_lockout {
            if lockout < 0.0 {
                return Err(invalid("interrupt_lockout must not be negative"));
            }
            if self.cast_time > 0.0 || self.channel_ticks > 0 {
                return Err(invalid("interrupts must be instant"));
            }
            if !self.requires_target && self.range.is_none() {
                return Err(invalid("interrupts need a target"));
            }
        }

        let applies = self
            .applies
            .iter()
            .map(|effect_id| {
                effects
                    .get(&EffectId::from(effect_id.as_str()))
                    .cloned()
                    .ok_or_else(|| ContentError::UnknownEffect {
                        ability: self.id.clone(),
                        effect: effect_id.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AbilityDefinition {
            id: self.id.into(),
            name: self.name,
            cast_time: self.cast_time,
            channel_ticks: self.channel_ticks,
            channel_tick_interval: self.channel_tick_interval,
            cooldown: self.cooldown,
            // A range implies a target
            requires_target: self.requires_target || self.range.is_some(),
            range: self.range,
            cost: self.cost,
            triggers_gcd: self.triggers_gcd,
            is_spell: self.is_spell,
            castable_while_moving: self.castable_while_moving,
            payload: AbilityPayload {
                damage: self.damage,
                damage_type: self.damage_type,
                healing: self.healing,
                threat_multiplier: self.threat_multiplier,
                applies,
                combo_points_generated: self.combo_points_generated,
                consumes_combo_points: self.consumes_combo_points,
                dispel: self.dispel,
                interrupt_lockout: self.interrupt_lockout,
            },
        })
    }
}
