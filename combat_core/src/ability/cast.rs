//! Per-entity cast state machine
//!
//! GCD, cast and channel are one tagged union so that casting while
//! channeling cannot be represented. A cast or channel carries its own GCD
//! countdown because the GCD keeps running underneath it.

use combat_types::{AbilityDefinition, CombatEntityId, Position};
use std::sync::Arc;

/// Cast bar in progress
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCast {
    pub ability: Arc<AbilityDefinition>,
    pub target: CombatEntityId,
    pub elapsed: f64,
    pub total: f64,
    pub gcd_remaining: f64,
    /// Where the caster stood when the cast began
    pub start_position: Option<Position>,
    /// Finisher damage multiplier captured at execution start
    pub damage_multiplier: f64,
}

/// Channel in progress
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveChannel {
    pub ability: Arc<AbilityDefinition>,
    pub target: CombatEntityId,
    pub ticks_done: u32,
    pub ticks_total: u32,
    pub elapsed: f64,
    pub gcd_remaining: f64,
    pub start_position: Option<Position>,
    pub damage_multiplier: f64,
}

impl ActiveChannel {
    /// Elapsed time at which the next tick resolves
    pub fn next_tick_at(&self) -> f64 {
        (self.ticks_done + 1) as f64 * self.ability.channel_tick_interval
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CastState {
    #[default]
    Idle,
    OnGcd {
        remaining: f64,
    },
    Casting(ActiveCast),
    Channeling(ActiveChannel),
}

impl CastState {
    /// Idle or GCD, whichever the remaining GCD calls for
    pub fn after_gcd(remaining: f64) -> Self {
        if remaining > 0.0 {
            CastState::OnGcd { remaining }
        } else {
            CastState::Idle
        }
    }

    pub fn gcd_remaining(&self) -> f64 {
        match self {
            CastState::Idle => 0.0,
            CastState::OnGcd { remaining } => *remaining,
            CastState::Casting(cast) => cast.gcd_remaining,
            CastState::Channeling(channel) => channel.gcd_remaining,
        }
    }

    pub fn is_on_gcd(&self) -> bool {
        self.gcd_remaining() > 0.0
    }

    pub fn is_casting(&self) -> bool {
        matches!(self, CastState::Casting(_))
    }

    pub fn is_channeling(&self) -> bool {
        matches!(self, CastState::Channeling(_))
    }

    pub fn is_busy(&self) -> bool {
        self.is_casting() || self.is_channeling()
    }

    /// Ability being cast or channeled
    pub fn ability(&self) -> Option<&Arc<AbilityDefinition>> {
        match self {
            CastState::Casting(cast) => Some(&cast.ability),
            CastState::Channeling(channel) => Some(&channel.ability),
            _ => None,
        }
    }

    /// Cast progress in [0, 1]
    pub fn progress(&self) -> Option<f64> {
        match self {
            CastState::Casting(cast) if cast.total > 0.0 => {
                Some((cast.elapsed / cast.total).clamp(0.0, 1.0))
            }
            CastState::Channeling(channel) if channel.ticks_total > 0 => {
                Some(channel.ticks_done as f64 / channel.ticks_total as f64)
            }
            _ => None,
        }
    }
}
