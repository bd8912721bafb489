use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a combat participant
///
/// Owned by the host; engines only ever reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatEntityId(pub u64);

impl From<u64> for CombatEntityId {
    fn from(raw: u64) -> Self {
        CombatEntityId(raw)
    }
}

impl fmt::Display for CombatEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an ability template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(pub String);

impl AbilityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AbilityId {
    fn from(s: &str) -> Self {
        AbilityId(s.to_string())
    }
}

impl From<String> for AbilityId {
    fn from(s: String) -> Self {
        AbilityId(s)
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a buff/debuff template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectId(pub String);

impl EffectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EffectId {
    fn from(s: &str) -> Self {
        EffectId(s.to_string())
    }
}

impl From<String> for EffectId {
    fn from(s: String) -> Self {
        EffectId(s)
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Damage schools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    #[default]
    Physical,
    Fire,
    Frost,
    Holy,
    Shadow,
    Nature,
    Arcane,
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageType::Physical => write!(f, "Physical"),
            DamageType::Fire => write!(f, "Fire"),
            DamageType::Frost => write!(f, "Frost"),
            DamageType::Holy => write!(f, "Holy"),
            DamageType::Shadow => write!(f, "Shadow"),
            DamageType::Nature => write!(f, "Nature"),
            DamageType::Arcane => write!(f, "Arcane"),
        }
    }
}

/// Crowd-control categories, each with its own diminishing-returns ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CcCategory {
    Stun,
    Fear,
    Root,
    Slow,
    Silence,
}

impl CcCategory {
    /// Whether this category stops the target from using any ability
    pub fn prevents_actions(&self) -> bool {
        matches!(self, CcCategory::Stun | CcCategory::Fear)
    }
}

impl fmt::Display for CcCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CcCategory::Stun => write!(f, "Stun"),
            CcCategory::Fear => write!(f, "Fear"),
            CcCategory::Root => write!(f, "Root"),
            CcCategory::Slow => write!(f, "Slow"),
            CcCategory::Silence => write!(f, "Silence"),
        }
    }
}

/// Playable archetypes, used only to pick a default secondary resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Warrior,
    Paladin,
    Rogue,
    Hunter,
    Mage,
    Priest,
    Warlock,
    Monk,
}

/// Class-specific secondary resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Mana,
    Rage,
    Energy,
    Focus,
    HolyPower,
    ComboPoints,
}

impl ResourceKind {
    /// Default resource for a class
    pub fn for_class(class: CharacterClass) -> ResourceKind {
        match class {
            CharacterClass::Warrior => ResourceKind::Rage,
            CharacterClass::Paladin => ResourceKind::HolyPower,
            CharacterClass::Rogue => ResourceKind::ComboPoints,
            CharacterClass::Hunter => ResourceKind::Focus,
            CharacterClass::Monk => ResourceKind::Energy,
            CharacterClass::Mage | CharacterClass::Priest | CharacterClass::Warlock => {
                ResourceKind::Mana
            }
        }
    }

    /// Whether this resource is a continuous numeric pool (as opposed to combo points)
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ResourceKind::ComboPoints)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Mana => write!(f, "Mana"),
            ResourceKind::Rage => write!(f, "Rage"),
            ResourceKind::Energy => write!(f, "Energy"),
            ResourceKind::Focus => write!(f, "Focus"),
            ResourceKind::HolyPower => write!(f, "Holy Power"),
            ResourceKind::ComboPoints => write!(f, "Combo Points"),
        }
    }
}

/// World-space position supplied by the host
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_resources() {
        assert_eq!(ResourceKind::for_class(CharacterClass::Warrior), ResourceKind::Rage);
        assert_eq!(ResourceKind::for_class(CharacterClass::Rogue), ResourceKind::ComboPoints);
        assert_eq!(ResourceKind::for_class(CharacterClass::Paladin), ResourceKind::HolyPower);
        assert!(!ResourceKind::ComboPoints.is_numeric());
        assert!(ResourceKind::Energy.is_numeric());
    }

    #[test]
    fn test_cc_gating() {
        assert!(CcCategory::Stun.prevents_actions());
        assert!(CcCategory::Fear.prevents_actions());
        assert!(!CcCategory::Silence.prevents_actions());
        assert!(!CcCategory::Root.prevents_actions());
    }

    #[test]
    fn test_position_distance() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < f64::EPSILON);
    }
}
