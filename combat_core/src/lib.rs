//! combat_core - Deterministic tab-target combat engines
//!
//! This library provides:
//! - AbilityEngine: action bars, GCD, cooldowns, casts, channels and interrupts
//! - EffectEngine: buffs, debuffs, periodic ticks and crowd control
//! - DrTracker: diminishing returns and immunity per crowd-control category
//! - ThreatEngine: per-enemy threat tables and aggro selection
//! - ResourceEngine: mana, rage, energy, focus, holy power and combo points
//! - CombatCore: the facade that owns all five and routes events between them
//!
//! The host owns health, positions and targeting, and exposes them through the
//! traits in [`world`]. Nothing here reads a clock or a random source, so the
//! same inputs always produce the same event stream.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use combat_core::prelude::*;
//!
//! let mut world = SandboxWorld::new();
//! world.spawn(CombatEntityId(1), Position::default(), 100.0, 0);
//! world.spawn(CombatEntityId(2), Position::new(3.0, 0.0, 0.0), 100.0, 1);
//! world.set_target(CombatEntityId(1), Some(CombatEntityId(2)));
//!
//! let mut core = CombatCore::default();
//! core.register_class(CombatEntityId(1), CharacterClass::Rogue);
//! let strike = AbilityDefinition::new("strike", "Strike")
//!     .with_range(5.0)
//!     .with_damage(DamageType::Physical, 25.0);
//! core.set_ability(CombatEntityId(1), 0, Arc::new(strike))?;
//!
//! core.try_execute_ability(CombatEntityId(1), 0, &mut world)?;
//! core.tick(0.1, &mut world);
//! for event in core.drain_events() {
//!     println!("{event:?}");
//! }
//! ```

pub mod ability;
pub mod arena;
pub mod config;
pub mod diminishing;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod prelude;
pub mod resource;
pub mod sandbox;
pub mod threat;
pub mod world;

/// Slack for float comparisons against cast and tick boundaries
pub(crate) const TIME_EPSILON: f64 = 1e-9;

// Core API - what most users need
pub use engine::CombatCore;
pub use error::{AbilityError, ErrorKind};
pub use events::{CombatEvent, InterruptReason};
pub use world::{CombatHost, CombatResolver, Spatial, Targeting};

// Engines
pub use ability::{AbilityContext, AbilityEngine, CastState, ExecutionOutcome};
pub use diminishing::{DiminishedDuration, DrTracker};
pub use effects::{EffectApplication, EffectEngine, EffectInstance};
pub use resource::{ResourceEngine, SecondaryResource};
pub use threat::{ThreatEngine, ThreatEntry, ThreatTable};

// Configuration
pub use config::{CombatConfig, ConfigError};

// Re-export the shared vocabulary
pub use combat_types::{
    AbilityDefinition, AbilityId, CcCategory, CharacterClass, CombatEntityId, DamageType,
    EffectDefinition, EffectId, Position, ResourceKind,
};
