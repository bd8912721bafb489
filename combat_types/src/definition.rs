//! Immutable content templates for abilities and effects
//!
//! Definitions are created at content-load time and never mutated afterwards.
//! Runtime state (cooldowns, remaining durations, stacks) lives in the engines.

use crate::types::{AbilityId, CcCategory, DamageType, EffectId, ResourceKind};
use serde::{Deserialize, Serialize};

// ============================================================================
// Effects
// ============================================================================

/// Whether an effect sits in the target's buff list or debuff list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Buff,
    Debuff,
}

/// What an effect does while it is active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectCategory {
    /// Beneficial marker effect with no periodic component
    Buff,
    /// Harmful marker effect with no periodic component
    Debuff,
    /// Damage over time
    DamageOverTime {
        #[serde(default)]
        damage_type: DamageType,
        tick_damage: f64,
        #[serde(default = "default_tick_interval")]
        tick_interval: f64,
    },
    /// Healing over time
    HealOverTime {
        tick_healing: f64,
        #[serde(default = "default_tick_interval")]
        tick_interval: f64,
    },
    /// Crowd control, scaled by diminishing returns
    CrowdControl {
        cc: CcCategory,
        /// Slow fraction for slows (0.5 = 50% slower), unused otherwise
        #[serde(default)]
        magnitude: f64,
    },
}

fn default_tick_interval() -> f64 {
    1.0
}

impl EffectCategory {
    /// Which list the effect belongs to
    pub fn polarity(&self) -> Polarity {
        match self {
            EffectCategory::Buff | EffectCategory::HealOverTime { .. } => Polarity::Buff,
            EffectCategory::Debuff
            | EffectCategory::DamageOverTime { .. }
            | EffectCategory::CrowdControl { .. } => Polarity::Debuff,
        }
    }

    /// Tick interval for periodic effects
    pub fn tick_interval(&self) -> Option<f64> {
        match self {
            EffectCategory::DamageOverTime { tick_interval, .. }
            | EffectCategory::HealOverTime { tick_interval, .. } => Some(*tick_interval),
            _ => None,
        }
    }

    pub fn crowd_control(&self) -> Option<CcCategory> {
        match self {
            EffectCategory::CrowdControl { cc, .. } => Some(*cc),
            _ => None,
        }
    }
}

/// Template for a buff, debuff, DoT, HoT or crowd-control effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub id: EffectId,
    pub name: String,
    /// Base duration in seconds
    pub duration: f64,
    #[serde(default = "default_max_stacks")]
    pub max_stacks: u32,
    pub category: EffectCategory,
    /// Whether dispel payloads may strip this effect
    #[serde(default = "default_true")]
    pub dispellable: bool,
}

fn default_max_stacks() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl EffectDefinition {
    pub fn new(
        id: impl Into<EffectId>,
        name: impl Into<String>,
        duration: f64,
        category: EffectCategory,
    ) -> Self {
        EffectDefinition {
            id: id.into(),
            name: name.into(),
            duration,
            max_stacks: 1,
            category,
            dispellable: true,
        }
    }

    /// Plain beneficial effect
    pub fn buff(id: impl Into<EffectId>, name: impl Into<String>, duration: f64) -> Self {
        Self::new(id, name, duration, EffectCategory::Buff)
    }

    /// Plain harmful effect
    pub fn debuff(id: impl Into<EffectId>, name: impl Into<String>, duration: f64) -> Self {
        Self::new(id, name, duration, EffectCategory::Debuff)
    }

    /// Debuff dealing `damage_per_tick` every `tick_interval` seconds
    pub fn damage_over_time(
        id: impl Into<EffectId>,
        name: impl Into<String>,
        duration: f64,
        damage_type: DamageType,
        tick_damage: f64,
        tick_interval: f64,
    ) -> Self {
        Self::new(
            id,
            name,
            duration,
            EffectCategory::DamageOverTime { damage_type, tick_damage, tick_interval },
        )
    }

    pub fn heal_over_time(
        id: impl Into<EffectId>,
        name: impl Into<String>,
        duration: f64,
        tick_healing: f64,
        tick_interval: f64,
    ) -> Self {
        Self::new(
            id,
            name,
            duration,
            EffectCategory::HealOverTime { tick_healing, tick_interval },
        )
    }

    pub fn crowd_control(
        id: impl Into<EffectId>,
        name: impl Into<String>,
        duration: f64,
        cc: CcCategory,
    ) -> Self {
        Self::new(id, name, duration, EffectCategory::CrowdControl { cc, magnitude: 0.0 })
    }

    pub fn slow(id: impl Into<EffectId>, name: impl Into<String>, duration: f64, magnitude: f64) -> Self {
        Self::new(
            id,
            name,
            duration,
            EffectCategory::CrowdControl { cc: CcCategory::Slow, magnitude },
        )
    }

    /// Protect the effect from dispels
    pub fn undispellable(mut self) -> Self {
        self.dispellable = false;
        self
    }

    pub fn with_max_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks.max(1);
        self
    }

    pub fn polarity(&self) -> Polarity {
        self.category.polarity()
    }

    pub fn crowd_control_category(&self) -> Option<CcCategory> {
        self.category.crowd_control()
    }
}

// ============================================================================
// Abilities
// ============================================================================

/// Resource spent when an ability begins executing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceCost {
    pub kind: ResourceKind,
    pub amount: f64,
}

/// Strip dispellable effects of one polarity from the target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dispel {
    pub polarity: Polarity,
    /// Most effects removed per resolution
    #[serde(default = "default_dispel_count")]
    pub count: u32,
}

fn default_dispel_count() -> u32 {
    1
}

/// What an ability does when it resolves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityPayload {
    /// Damage dealt to the target (per tick for channels)
    #[serde(default)]
    pub damage: f64,
    #[serde(default)]
    pub damage_type: DamageType,
    /// Healing done (per tick for channels)
    #[serde(default)]
    pub healing: f64,
    /// Threat generated per point of damage dealt
    #[serde(default = "default_threat_multiplier")]
    pub threat_multiplier: f64,
    /// Effects applied on resolution (first tick only for channels)
    #[serde(default)]
    pub applies: Vec<EffectDefinition>,
    /// Combo points awarded to the caster on resolution
    #[serde(default)]
    pub combo_points_generated: u8,
    /// Finisher: consumes all combo points and scales damage by them
    #[serde(default)]
    pub consumes_combo_points: bool,
    #[serde(default)]
    pub dispel: Option<Dispel>,
    /// Interrupt the target's cast or channel and lock it out of spells for
    /// this many seconds
    #[serde(default)]
    pub interrupt_lockout: Option<f64>,
}

fn default_threat_multiplier() -> f64 {
    1.0
}

impl Default for AbilityPayload {
    fn default() -> Self {
        AbilityPayload {
            damage: 0.0,
            damage_type: DamageType::Physical,
            healing: 0.0,
            threat_multiplier: 1.0,
            applies: Vec::new(),
            combo_points_generated: 0,
            consumes_combo_points: false,
            dispel: None,
            interrupt_lockout: None,
        }
    }
}

/// Immutable ability template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub id: AbilityId,
    pub name: String,
    /// Cast time in seconds (0 = instant)
    #[serde(default)]
    pub cast_time: f64,
    /// Number of channel ticks (0 = not channeled)
    #[serde(default)]
    pub channel_ticks: u32,
    #[serde(default = "default_channel_tick_interval")]
    pub channel_tick_interval: f64,
    /// Cooldown in seconds, started when execution begins
    #[serde(default)]
    pub cooldown: f64,
    /// Maximum range to the target (None = unlimited)
    #[serde(default)]
    pub range: Option<f64>,
    #[serde(default)]
    pub requires_target: bool,
    #[serde(default)]
    pub cost: Option<ResourceCost>,
    #[serde(default = "default_true")]
    pub triggers_gcd: bool,
    /// Spells are blocked by silence and interrupt lockouts
    #[serde(default)]
    pub is_spell: bool,
    #[serde(default)]
    pub castable_while_moving: bool,
    #[serde(default)]
    pub payload: AbilityPayload,
}

fn default_channel_tick_interval() -> f64 {
    1.0
}

impl AbilityDefinition {
    /// Create an instant, GCD-affected ability with no payload
    pub fn new(id: impl Into<AbilityId>, name: impl Into<String>) -> Self {
        AbilityDefinition {
            id: id.into(),
            name: name.into(),
            cast_time: 0.0,
            channel_ticks: 0,
            channel_tick_interval: 1.0,
            cooldown: 0.0,
            range: None,
            requires_target: false,
            cost: None,
            triggers_gcd: true,
            is_spell: false,
            castable_while_moving: false,
            payload: AbilityPayload::default(),
        }
    }

    pub fn with_cast_time(mut self, seconds: f64) -> Self {
        self.cast_time = seconds.max(0.0);
        self
    }

    /// Channel for `ticks` resolutions, one every `tick_interval` seconds
    pub fn with_channel(mut self, ticks: u32, tick_interval: f64) -> Self {
        self.channel_ticks = ticks;
        self.channel_tick_interval = tick_interval;
        self
    }

    pub fn with_cooldown(mut self, seconds: f64) -> Self {
        self.cooldown = seconds.max(0.0);
        self
    }

    /// Require a live target within `range`
    pub fn with_range(mut self, range: f64) -> Self {
        self.range = Some(range);
        self.requires_target = true;
        self
    }

    pub fn with_target(mut self) -> Self {
        self.requires_target = true;
        self
    }

    pub fn with_cost(mut self, kind: ResourceKind, amount: f64) -> Self {
        self.cost = Some(ResourceCost { kind, amount });
        self
    }

    /// Neither triggers nor waits on the global cooldown
    pub fn off_gcd(mut self) -> Self {
        self.triggers_gcd = false;
        self
    }

    /// Subject to silence and interrupt lockouts
    pub fn spell(mut self) -> Self {
        self.is_spell = true;
        self
    }

    pub fn castable_while_moving(mut self) -> Self {
        self.castable_while_moving = true;
        self
    }

    pub fn with_damage(mut self, damage_type: DamageType, amount: f64) -> Self {
        self.payload.damage_type = damage_type;
        self.payload.damage = amount;
        self
    }

    pub fn with_healing(mut self, amount: f64) -> Self {
        self.payload.healing = amount;
        self
    }

    pub fn with_threat_multiplier(mut self, multiplier: f64) -> Self {
        self.payload.threat_multiplier = multiplier;
        self
    }

    pub fn applying(mut self, effect: EffectDefinition) -> Self {
        self.payload.applies.push(effect);
        self
    }

    pub fn generating_combo_points(mut self, points: u8) -> Self {
        self.payload.combo_points_generated = points;
        self
    }

    /// Consume all combo points on resolution, scaling damage by the count
    pub fn finisher(mut self) -> Self {
        self.payload.consumes_combo_points = true;
        self
    }

    /// Strip up to `count` dispellable effects of `polarity` from the target
    pub fn dispelling(mut self, polarity: Polarity, count: u32) -> Self {
        self.payload.dispel = Some(Dispel { polarity, count });
        self
    }

    /// Interrupt the target on resolution, locking it out of spells
    pub fn interrupting(mut self, lockout: f64) -> Self {
        self.payload.interrupt_lockout = Some(lockout.max(0.0));
        self
    }

    pub fn is_channeled(&self) -> bool {
        self.channel_ticks > 0
    }

    /// No cast bar and no channel: resolves the moment it is executed
    pub fn is_instant(&self) -> bool {
        self.cast_time <= 0.0 && !self.is_channeled()
    }

    pub fn channel_duration(&self) -> f64 {
        self.channel_ticks as f64 * self.channel_tick_interval
    }
}
