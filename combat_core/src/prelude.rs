//! Prelude module for convenient imports
//!
//! ```rust
//! use combat_core::prelude::*;
//! ```

pub use std::sync::Arc;

// Facade
pub use crate::engine::CombatCore;
pub use crate::events::{CombatEvent, InterruptReason};
pub use crate::error::{AbilityError, ErrorKind};

// Engines
pub use crate::ability::{AbilityEngine, CastState, ExecutionOutcome};
pub use crate::diminishing::DrTracker;
pub use crate::effects::{EffectApplication, EffectEngine};
pub use crate::resource::ResourceEngine;
pub use crate::threat::ThreatEngine;

// Host contracts and the in-memory host
pub use crate::sandbox::SandboxWorld;
pub use crate::world::{CombatHost, CombatResolver, Spatial, Targeting};

// Config
pub use crate::config::{CombatConfig, ConfigError};

// Shared types
pub use combat_types::{
    AbilityDefinition, AbilityId, CcCategory, CharacterClass, CombatEntityId, DamageType,
    EffectCategory, EffectDefinition, EffectId, Polarity, Position, ResourceCost, ResourceKind,
};
