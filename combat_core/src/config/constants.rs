//! Combat constants configuration

use combat_types::ResourceKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ConfigError;

/// Tunable combat constants
///
/// Every section and field has a default, so a partial file only needs to
/// name the values it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    #[serde(default)]
    pub abilities: AbilityConstants,
    #[serde(default)]
    pub effects: EffectConstants,
    #[serde(default)]
    pub diminishing_returns: DiminishingReturnsConstants,
    #[serde(default)]
    pub threat: ThreatConstants,
    #[serde(default)]
    pub resources: ResourceConstants,
}

impl CombatConfig {
    /// Load constants from a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let config: CombatConfig = super::load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse constants from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: CombatConfig = super::parse_toml(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engines cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

        if self.abilities.global_cooldown < 0.0 {
            return fail("abilities.global_cooldown must not be negative");
        }
        if self.abilities.slot_count == 0 {
            return fail("abilities.slot_count must be at least 1");
        }
        if self.effects.max_buffs == 0 || self.effects.max_debuffs == 0 {
            return fail("effects.max_buffs and effects.max_debuffs must be at least 1");
        }
        if self.effects.min_duration > self.effects.max_duration {
            return fail("effects.min_duration must not exceed effects.max_duration");
        }
        let dr = &self.diminishing_returns;
        if dr.multipliers.is_empty() {
            return fail("diminishing_returns.multipliers must not be empty");
        }
        if dr.multipliers.iter().any(|m| !(0.0..=1.0).contains(m)) {
            return fail("diminishing_returns.multipliers must be within [0, 1]");
        }
        if dr.reset_window <= 0.0 || dr.immunity_duration < 0.0 {
            return fail("diminishing_returns windows must be positive");
        }
        if self.threat.melee_pull_threshold < 1.0 || self.threat.ranged_pull_threshold < 1.0 {
            return fail("threat pull thresholds must be at least 1.0");
        }
        Ok(())
    }
}

// ============================================================================
// Abilities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityConstants {
    /// Shared cooldown started by GCD-affected abilities (seconds)
    #[serde(default = "default_global_cooldown")]
    pub global_cooldown: f64,
    /// Action bar size per entity
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,
    /// Distance a caster may drift before a cast is interrupted
    #[serde(default = "default_movement_threshold")]
    pub movement_interrupt_threshold: f64,
    /// Default spell lockout applied by interrupt abilities (seconds)
    #[serde(default = "default_interrupt_lockout")]
    pub interrupt_lockout: f64,
}

impl Default for AbilityConstants {
    fn default() -> Self {
        AbilityConstants {
            global_cooldown: 1.5,
            slot_count: 12,
            movement_interrupt_threshold: 0.1,
            interrupt_lockout: 4.0,
        }
    }
}

fn default_global_cooldown() -> f64 {
    1.5
}
fn default_slot_count() -> usize {
    12
}
fn default_movement_threshold() -> f64 {
    0.1
}
fn default_interrupt_lockout() -> f64 {
    4.0
}

// ============================================================================
// Effects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConstants {
    #[serde(default = "default_max_effects")]
    pub max_buffs: usize,
    #[serde(default = "default_max_effects")]
    pub max_debuffs: usize,
    /// Definition durations are clamped into [min_duration, max_duration]
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,
    #[serde(default = "default_max_duration")]
    pub max_duration: f64,
    /// Cap on summed slow magnitudes (1.0 = fully immobile)
    #[serde(default = "default_max_slow")]
    pub max_slow: f64,
}

impl Default for EffectConstants {
    fn default() -> Self {
        EffectConstants {
            max_buffs: 20,
            max_debuffs: 20,
            min_duration: 1.0,
            max_duration: 300.0,
            max_slow: 1.0,
        }
    }
}

fn default_max_effects() -> usize {
    20
}
fn default_min_duration() -> f64 {
    1.0
}
fn default_max_duration() -> f64 {
    300.0
}
fn default_max_slow() -> f64 {
    1.0
}

// ============================================================================
// Diminishing returns
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiminishingReturnsConstants {
    /// Idle time after which a category's level resets to 0
    #[serde(default = "default_dr_window")]
    pub reset_window: f64,
    /// Length of the immunity window once the multipliers are exhausted
    #[serde(default = "default_dr_window")]
    pub immunity_duration: f64,
    /// Duration multiplier per level; the level after the last one is immune
    #[serde(default = "default_dr_multipliers")]
    pub multipliers: Vec<f64>,
}

impl Default for DiminishingReturnsConstants {
    fn default() -> Self {
        DiminishingReturnsConstants {
            reset_window: 15.0,
            immunity_duration: 15.0,
            multipliers: default_dr_multipliers(),
        }
    }
}

fn default_dr_window() -> f64 {
    15.0
}
fn default_dr_multipliers() -> Vec<f64> {
    vec![1.0, 0.5, 0.25]
}

// ============================================================================
// Threat
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatConstants {
    /// Margin over the current target needed to pull aggro in melee range
    #[serde(default = "default_melee_threshold")]
    pub melee_pull_threshold: f64,
    /// Margin over the current target needed to pull aggro at range
    #[serde(default = "default_ranged_threshold")]
    pub ranged_pull_threshold: f64,
    #[serde(default = "default_healing_threat")]
    pub healing_threat_multiplier: f64,
    /// Taunt sets the taunter to this multiple of the highest entry
    #[serde(default = "default_taunt_multiplier")]
    pub taunt_multiplier: f64,
    /// Threat assigned by a taunt against an empty table
    #[serde(default = "default_taunt_baseline")]
    pub taunt_baseline: f64,
}

impl Default for ThreatConstants {
    fn default() -> Self {
        ThreatConstants {
            melee_pull_threshold: 1.1,
            ranged_pull_threshold: 1.3,
            healing_threat_multiplier: 0.5,
            taunt_multiplier: 1.1,
            taunt_baseline: 1.0,
        }
    }
}

fn default_melee_threshold() -> f64 {
    1.1
}
fn default_ranged_threshold() -> f64 {
    1.3
}
fn default_healing_threat() -> f64 {
    0.5
}
fn default_taunt_multiplier() -> f64 {
    1.1
}
fn default_taunt_baseline() -> f64 {
    1.0
}

// ============================================================================
// Secondary resources
// ============================================================================

/// Regeneration/decay behaviour of a numeric resource pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceBehavior {
    pub max: f64,
    /// Change per second; negative values decay
    #[serde(default)]
    pub regen_per_second: f64,
    /// Whether the rate applies while in combat
    #[serde(default)]
    pub in_combat: bool,
    /// Whether the rate applies while out of combat
    #[serde(default)]
    pub out_of_combat: bool,
    /// Whether a freshly registered pool starts at max
    #[serde(default)]
    pub starts_full: bool,
}

impl ResourceBehavior {
    fn regenerating(max: f64, regen_per_second: f64) -> Self {
        ResourceBehavior {
            max,
            regen_per_second,
            in_combat: true,
            out_of_combat: true,
            starts_full: true,
        }
    }

    fn decaying_out_of_combat(max: f64, decay_per_second: f64) -> Self {
        ResourceBehavior {
            max,
            regen_per_second: -decay_per_second,
            in_combat: false,
            out_of_combat: true,
            starts_full: false,
        }
    }

    /// Rate to apply for the given combat state
    pub fn rate(&self, in_combat: bool) -> f64 {
        let active = if in_combat { self.in_combat } else { self.out_of_combat };
        if active {
            self.regen_per_second
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConstants {
    #[serde(default = "default_mana")]
    pub mana: ResourceBehavior,
    #[serde(default = "default_rage")]
    pub rage: ResourceBehavior,
    #[serde(default = "default_energy")]
    pub energy: ResourceBehavior,
    #[serde(default = "default_focus")]
    pub focus: ResourceBehavior,
    #[serde(default = "default_holy_power")]
    pub holy_power: ResourceBehavior,
    /// Finisher damage bonus per consumed combo point
    #[serde(default = "default_combo_point_bonus")]
    pub combo_point_damage_bonus: f64,
    /// Flat rage gained per damaging hit dealt
    #[serde(default = "default_rage_dealt")]
    pub rage_per_damage_dealt: f64,
    /// Flat rage gained per damaging hit taken
    #[serde(default = "default_rage_taken")]
    pub rage_per_damage_taken: f64,
}

impl ResourceConstants {
    /// Behaviour for a numeric resource; combo points have none
    pub fn behavior(&self, kind: ResourceKind) -> Option<&ResourceBehavior> {
        match kind {
            ResourceKind::Mana => Some(&self.mana),
            ResourceKind::Rage => Some(&self.rage),
            ResourceKind::Energy => Some(&self.energy),
            ResourceKind::Focus => Some(&self.focus),
            ResourceKind::HolyPower => Some(&self.holy_power),
            ResourceKind::ComboPoints => None,
        }
    }
}

impl Default for ResourceConstants {
    fn default() -> Self {
        ResourceConstants {
            mana: default_mana(),
            rage: default_rage(),
            energy: default_energy(),
            focus: default_focus(),
            holy_power: default_holy_power(),
            combo_point_damage_bonus: 0.2,
            rage_per_damage_dealt: 5.0,
            rage_per_damage_taken: 3.0,
        }
    }
}

fn default_mana() -> ResourceBehavior {
    ResourceBehavior::regenerating(100.0, 2.0)
}
fn default_rage() -> ResourceBehavior {
    ResourceBehavior::decaying_out_of_combat(100.0, 2.0)
}
fn default_energy() -> ResourceBehavior {
    ResourceBehavior::regenerating(100.0, 10.0)
}
fn default_focus() -> ResourceBehavior {
    ResourceBehavior::regenerating(100.0, 5.0)
}
fn default_holy_power() -> ResourceBehavior {
    ResourceBehavior::decaying_out_of_combat(5.0, 1.0)
}
fn default_combo_point_bonus() -> f64 {
    0.2
}
fn default_rage_dealt() -> f64 {
    5.0
}
fn default_rage_taken() -> f64 {
    3.0
}
