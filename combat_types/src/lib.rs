//! combat_types - identifiers and content templates shared by the combat crates

pub mod definition;
pub mod types;

pub use definition::{
    AbilityDefinition, AbilityPayload, Dispel, EffectCategory, EffectDefinition, Polarity,
    ResourceCost,
};
pub use types::{
    AbilityId, CcCategory, CharacterClass, CombatEntityId, DamageType, EffectId, Position,
    ResourceKind,
};
