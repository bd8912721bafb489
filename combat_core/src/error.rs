//! Ability rejection taxonomy

use combat_types::{CcCategory, CombatEntityId, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse rejection class, stable for UI and network consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputRejected,
    ResourceInsufficient,
    OnCooldown,
    OnGcd,
    TargetInvalid,
    StateConflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InputRejected => write!(f, "Input rejected"),
            ErrorKind::ResourceInsufficient => write!(f, "Resource insufficient"),
            ErrorKind::OnCooldown => write!(f, "On cooldown"),
            ErrorKind::OnGcd => write!(f, "On global cooldown"),
            ErrorKind::TargetInvalid => write!(f, "Target invalid"),
            ErrorKind::StateConflict => write!(f, "State conflict"),
        }
    }
}

/// Why `try_execute_ability` refused to run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbilityError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(CombatEntityId),
    #[error("Invalid slot {slot} (action bar has {slots} slots)")]
    InvalidSlot { slot: usize, slots: usize },
    #[error("No ability assigned to slot {0}")]
    EmptySlot(usize),
    #[error("Ability requires a target")]
    NoTarget,
    #[error("Not enough {kind}: need {required}, have {available}")]
    InsufficientResource {
        kind: ResourceKind,
        required: f64,
        available: f64,
    },
    #[error("Ability is on cooldown ({remaining:.1}s remaining)")]
    OnCooldown { remaining: f64 },
    #[error("Global cooldown active ({remaining:.1}s remaining)")]
    OnGcd { remaining: f64 },
    #[error("Target is dead")]
    TargetDead,
    #[error("Target out of range ({distance:.1} > {range:.1})")]
    OutOfRange { distance: f64, range: f64 },
    #[error("Target not in line of sight")]
    NoLineOfSight,
    #[error("Target is immune to {0}")]
    TargetImmune(CcCategory),
    #[error("Already casting")]
    AlreadyCasting,
    #[error("Already channeling")]
    AlreadyChanneling,
    #[error("Cannot act while affected by {0}")]
    Incapacitated(CcCategory),
    #[error("Cannot cast spells while silenced")]
    Silenced,
    #[error("Spellcasting locked out ({remaining:.1}s remaining)")]
    LockedOut { remaining: f64 },
    #[error("Caster is dead")]
    CasterDead,
}

impl AbilityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AbilityError::UnknownEntity(_)
            | AbilityError::InvalidSlot { .. }
            | AbilityError::EmptySlot(_)
            | AbilityError::NoTarget => ErrorKind::InputRejected,
            AbilityError::InsufficientResource { .. } => ErrorKind::ResourceInsufficient,
            AbilityError::OnCooldown { .. } => ErrorKind::OnCooldown,
            AbilityError::OnGcd { .. } => ErrorKind::OnGcd,
            AbilityError::TargetDead
            | AbilityError::OutOfRange { .. }
            | AbilityError::NoLineOfSight
            | AbilityError::TargetImmune(_) => ErrorKind::TargetInvalid,
            AbilityError::AlreadyCasting
            | AbilityError::AlreadyChanneling
            | AbilityError::Incapacitated(_)
            | AbilityError::Silenced
            | AbilityError::LockedOut { .. }
            | AbilityError::CasterDead => ErrorKind::StateConflict,
        }
    }
}
