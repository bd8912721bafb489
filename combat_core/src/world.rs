//! Contracts the host world provides to the engines
//!
//! The core never owns health, positions or targeting. It asks the host
//! through these traits and resolves damage and healing through them.

use combat_types::{CombatEntityId, DamageType, Position};

/// Applies damage and healing on the core's behalf
pub trait CombatResolver {
    /// Apply damage and return the amount actually dealt
    fn apply_damage(
        &mut self,
        target: CombatEntityId,
        amount: f64,
        damage_type: DamageType,
        source: CombatEntityId,
    ) -> f64;

    /// Apply healing and return the amount actually restored
    fn apply_healing(&mut self, target: CombatEntityId, amount: f64, source: CombatEntityId) -> f64;

    fn health(&self, entity: CombatEntityId) -> Option<f64>;

    fn is_dead(&self, entity: CombatEntityId) -> bool;
}

/// Target selection, range and line of sight
pub trait Targeting {
    fn current_target(&self, entity: CombatEntityId) -> Option<CombatEntityId>;

    /// Distance between two entities, if both exist
    fn distance(&self, from: CombatEntityId, to: CombatEntityId) -> Option<f64>;

    fn has_line_of_sight(&self, from: CombatEntityId, to: CombatEntityId) -> bool;
}

/// Positions and liveness
pub trait Spatial {
    fn position(&self, entity: CombatEntityId) -> Option<Position>;

    fn is_alive(&self, entity: CombatEntityId) -> bool;

    fn is_in_combat(&self, entity: CombatEntityId) -> bool;

    /// Enemies currently engaged with `entity`, used to spread healing threat
    fn engaged_enemies(&self, entity: CombatEntityId) -> Vec<CombatEntityId>;
}

/// Everything the engines need from the host
pub trait CombatHost: CombatResolver + Targeting + Spatial {}

impl<T: CombatResolver + Targeting + Spatial + ?Sized> CombatHost for T {}
