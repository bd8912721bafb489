use combat_types::{DamageType, Dispel, EffectDefinition, ResourceCost};
use serde::Deserialize;

/// TOML configuration for a content file
///
/// A file may hold any mix of effects and abilities. Abilities reference
/// effects by id; the reference may point into another file.
#[derive(Debug, Default, Deserialize)]
pub struct ContentFileConfig {
    #[serde(default)]
    pub effects: Vec<EffectDefinition>,
    #[serde(default)]
    pub abilities: Vec<AbilityConfig>,
}

/// Configuration for a single ability
#[derive(Debug, Clone, Deserialize)]
pub struct AbilityConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cast_time: f64,
    #[serde(default)]
    pub channel_ticks: u32,
    #[serde(default = "default_tick_interval")]
    pub channel_tick_interval: f64,
    #[serde(default)]
    pub cooldown: f64,
    #[serde(default)]
    pub range: Option<f64>,
    #[serde(default)]
    pub requires_target: bool,
    #[serde(default)]
    pub cost: Option<ResourceCost>,
    #[serde(default = "default_true")]
    pub triggers_gcd: bool,
    #[serde(default)]
    pub is_spell: bool,
    #[serde(default)]
    pub castable_while_moving: bool,

    // Payload
    #[serde(default)]
    pub damage: f64,
    #[serde(default)]
    pub damage_type: DamageType,
    #[serde(default)]
    pub healing: f64,
    #[serde(default = "default_threat_multiplier")]
    pub threat_multiplier: f64,
    /// Effect ids applied on resolution
    #[serde(default)]
    pub applies: Vec<String>,
    #[serde(default)]
    pub combo_points_generated: u8,
    #[serde(default)]
    pub consumes_combo_points: bool,
    #[serde(default)]
    pub dispel: Option<Dispel>,
    /// Spell lockout applied to the target when this interrupts it
    #[serde(default)]
    pub interrupt_lockout: Option<f64>,
}

fn default_tick_interval() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_threat_multiplier() -> f64 {
    1.0
}
