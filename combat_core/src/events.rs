//! Outbound notifications
//!
//! Engines never call into presentation or network code. Each engine appends
//! records to its own [`EventQueue`], and the host drains them once per tick.

use crate::error::ErrorKind;
use combat_types::{
    AbilityId, CcCategory, CombatEntityId, DamageType, EffectId, Polarity, ResourceKind,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a cast or channel stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptReason {
    /// Explicit interrupt request
    Manual,
    /// Interrupt that also locks out spellcasting
    Lockout,
    Movement,
    CrowdControl(CcCategory),
    CasterDied,
    TargetLost,
}

impl fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptReason::Manual => write!(f, "interrupted"),
            InterruptReason::Lockout => write!(f, "interrupted with lockout"),
            InterruptReason::Movement => write!(f, "moved"),
            InterruptReason::CrowdControl(cc) => write!(f, "{}", cc),
            InterruptReason::CasterDied => write!(f, "caster died"),
            InterruptReason::TargetLost => write!(f, "target lost"),
        }
    }
}

/// Everything the combat core reports to the outside world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    // Ability execution
    GcdStarted {
        entity: CombatEntityId,
        duration: f64,
    },
    GcdEnded {
        entity: CombatEntityId,
    },
    CastStarted {
        entity: CombatEntityId,
        ability: AbilityId,
        cast_time: f64,
    },
    CastCompleted {
        entity: CombatEntityId,
        ability: AbilityId,
    },
    CastInterrupted {
        entity: CombatEntityId,
        ability: AbilityId,
        reason: InterruptReason,
    },
    ChannelStarted {
        entity: CombatEntityId,
        ability: AbilityId,
        ticks: u32,
    },
    ChannelTick {
        entity: CombatEntityId,
        ability: AbilityId,
        tick: u32,
        total: u32,
    },
    ChannelCompleted {
        entity: CombatEntityId,
        ability: AbilityId,
    },
    ChannelInterrupted {
        entity: CombatEntityId,
        ability: AbilityId,
        ticks_done: u32,
        reason: InterruptReason,
    },
    AbilityExecuted {
        entity: CombatEntityId,
        ability: AbilityId,
        target: Option<CombatEntityId>,
    },
    AbilityFailed {
        entity: CombatEntityId,
        ability: Option<AbilityId>,
        error: ErrorKind,
        reason: String,
    },
    LockoutStarted {
        entity: CombatEntityId,
        duration: f64,
    },
    LockoutEnded {
        entity: CombatEntityId,
    },

    // Resolution through the combat collaborator
    DamageResolved {
        source: CombatEntityId,
        target: CombatEntityId,
        amount: f64,
        damage_type: DamageType,
        /// Threat this hit is worth to the source
        threat: f64,
    },
    HealingResolved {
        source: CombatEntityId,
        target: CombatEntityId,
        amount: f64,
    },

    // Buffs and debuffs
    EffectApplied {
        target: CombatEntityId,
        source: CombatEntityId,
        effect: EffectId,
        polarity: Polarity,
        duration: f64,
    },
    EffectRefreshed {
        target: CombatEntityId,
        effect: EffectId,
        duration: f64,
        stacks: u32,
    },
    EffectExpired {
        target: CombatEntityId,
        effect: EffectId,
    },
    EffectRemoved {
        target: CombatEntityId,
        effect: EffectId,
    },
    EffectEvicted {
        target: CombatEntityId,
        effect: EffectId,
    },
    EffectDispelled {
        target: CombatEntityId,
        effect: EffectId,
    },
    PeriodicTick {
        target: CombatEntityId,
        source: CombatEntityId,
        effect: EffectId,
        /// Damage dealt (harmful) or healing done (beneficial)
        amount: f64,
        polarity: Polarity,
    },
    CrowdControlApplied {
        target: CombatEntityId,
        category: CcCategory,
        duration: f64,
    },
    CrowdControlExpired {
        target: CombatEntityId,
        category: CcCategory,
    },

    // Diminishing returns
    DrApplied {
        target: CombatEntityId,
        category: CcCategory,
        level: u8,
        multiplier: f64,
    },
    DrReset {
        target: CombatEntityId,
        category: CcCategory,
    },
    ImmunityStarted {
        target: CombatEntityId,
        category: CcCategory,
        duration: f64,
    },
    ImmunityExpired {
        target: CombatEntityId,
        category: CcCategory,
    },

    // Resources
    ResourceChanged {
        entity: CombatEntityId,
        kind: ResourceKind,
        current: f64,
        max: f64,
    },
    ResourceEmpty {
        entity: CombatEntityId,
        kind: ResourceKind,
    },
    ComboPointsChanged {
        entity: CombatEntityId,
        points: u8,
    },

    // Threat
    AggroChanged {
        enemy: CombatEntityId,
        previous: Option<CombatEntityId>,
        current: Option<CombatEntityId>,
    },
    ThreatReset {
        enemy: CombatEntityId,
    },
}

/// Per-engine outbound queue
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<CombatEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    /// Events queued since the last drain, oldest first
    pub fn as_slice(&self) -> &[CombatEvent] {
        &self.events
    }

    /// Events pushed after the queue held `start` entries
    ///
    /// Empty when the queue has since been drained below `start`.
    pub fn since(&self, start: usize) -> &[CombatEvent] {
        self.events.get(start..).unwrap_or(&[])
    }

    pub fn drain(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
