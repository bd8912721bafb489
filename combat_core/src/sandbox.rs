//! In-memory host for tests and the headless harness

use crate::world::{CombatResolver, Spatial, Targeting};
use combat_types::{CombatEntityId, DamageType, Position};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// A sandbox entity: position, health, team and current target
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxEntity {
    pub position: Position,
    pub health: f64,
    pub max_health: f64,
    /// Entities on different teams are enemies
    pub team: u8,
    pub target: Option<CombatEntityId>,
    pub in_combat: bool,
}

/// Deterministic host world with no physics
///
/// Entities are kept in id order so every query that returns a list is stable.
#[derive(Debug, Clone, Default)]
pub struct SandboxWorld {
    entities: BTreeMap<CombatEntityId, SandboxEntity>,
    blocked_sight: HashSet<(CombatEntityId, CombatEntityId)>,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, id: CombatEntityId, position: Position, health: f64, team: u8) {
        self.entities.insert(
            id,
            SandboxEntity {
                position,
                health,
                max_health: health,
                team,
                target: None,
                in_combat: false,
            },
        );
    }

    pub fn despawn(&mut self, id: CombatEntityId) {
        self.entities.remove(&id);
        self.blocked_sight.retain(|(a, b)| *a != id && *b != id);
    }

    pub fn entity(&self, id: CombatEntityId) -> Option<&SandboxEntity> {
        self.entities.get(&id)
    }

    pub fn set_target(&mut self, id: CombatEntityId, target: Option<CombatEntityId>) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.target = target;
        }
    }

    pub fn move_to(&mut self, id: CombatEntityId, position: Position) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position = position;
        }
    }

    pub fn set_health(&mut self, id: CombatEntityId, health: f64) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.health = health.clamp(0.0, entity.max_health);
        }
    }

    pub fn kill(&mut self, id: CombatEntityId) {
        self.set_health(id, 0.0);
    }

    pub fn set_in_combat(&mut self, id: CombatEntityId, in_combat: bool) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.in_combat = in_combat;
        }
    }

    /// Block or restore line of sight in both directions
    pub fn set_line_of_sight(&mut self, a: CombatEntityId, b: CombatEntityId, visible: bool) {
        if visible {
            self.blocked_sight.remove(&(a, b));
            self.blocked_sight.remove(&(b, a));
        } else {
            self.blocked_sight.insert((a, b));
            self.blocked_sight.insert((b, a));
        }
    }

    fn enter_combat(&mut self, a: CombatEntityId, b: CombatEntityId) {
        for id in [a, b] {
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.in_combat = true;
            }
        }
    }
}

impl CombatResolver for SandboxWorld {
    fn apply_damage(
        &mut self,
        target: CombatEntityId,
        amount: f64,
        _damage_type: DamageType,
        source: CombatEntityId,
    ) -> f64 {
        let Some(entity) = self.entities.get_mut(&target) else {
            warn!(%target, "Damage against unknown entity");
            return 0.0;
        };
        if entity.health <= 0.0 || amount <= 0.0 {
            return 0.0;
        }
        let dealt = amount.min(entity.health);
        entity.health -= dealt;
        if source != target {
            self.enter_combat(source, target);
        }
        dealt
    }

    fn apply_healing(&mut self, target: CombatEntityId, amount: f64, _source: CombatEntityId) -> f64 {
        let Some(entity) = self.entities.get_mut(&target) else {
            warn!(%target, "Healing on unknown entity");
            return 0.0;
        };
        if entity.health <= 0.0 || amount <= 0.0 {
            return 0.0;
        }
        let healed = amount.min(entity.max_health - entity.health);
        entity.health += healed;
        healed
    }

    fn health(&self, entity: CombatEntityId) -> Option<f64> {
        self.entities.get(&entity).map(|e| e.health)
    }

    fn is_dead(&self, entity: CombatEntityId) -> bool {
        self.entities.get(&entity).map_or(true, |e| e.health <= 0.0)
    }
}

impl Targeting for SandboxWorld {
    fn current_target(&self, entity: CombatEntityId) -> Option<CombatEntityId> {
        self.entities.get(&entity).and_then(|e| e.target)
    }

    fn distance(&self, from: CombatEntityId, to: CombatEntityId) -> Option<f64> {
        let a = self.entities.get(&from)?;
        let b = self.entities.get(&to)?;
        Some(a.position.distance(&b.position))
    }

    fn has_line_of_sight(&self, from: CombatEntityId, to: CombatEntityId) -> bool {
        !self.blocked_sight.contains(&(from, to))
    }
}

impl Spatial for SandboxWorld {
    fn position(&self, entity: CombatEntityId) -> Option<Position> {
        self.entities.get(&entity).map(|e| e.position)
    }

    fn is_alive(&self, entity: CombatEntityId) -> bool {
        !self.is_dead(entity)
    }

    fn is_in_combat(&self, entity: CombatEntityId) -> bool {
        self.entities.get(&entity).is_some_and(|e| e.in_combat)
    }

    fn engaged_enemies(&self, entity: CombatEntityId) -> Vec<CombatEntityId> {
        let Some(me) = self.entities.get(&entity) else {
            return Vec::new();
        };
        self.entities
            .iter()
            .filter(|(_, other)| other.team != me.team && other.in_combat && other.health > 0.0)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_and_healing() {
        let mut world = SandboxWorld::new();
        world.spawn(CombatEntityId(1), Position::default(), 100.0, 0);
        world.spawn(CombatEntityId(2), Position::default(), 50.0, 1);

        let dealt = world.apply_damage(CombatEntityId(2), 80.0, DamageType::Fire, CombatEntityId(1));
        assert!((dealt - 50.0).abs() < f64::EPSILON);
        assert!(world.is_dead(CombatEntityId(2)));
        assert!(world.is_in_combat(CombatEntityId(1)));

        world.set_health(CombatEntityId(1), 70.0);
        let healed = world.apply_healing(CombatEntityId(1), 50.0, CombatEntityId(1));
        assert!((healed - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_engaged_enemies() {
        let mut world = SandboxWorld::new();
        world.spawn(CombatEntityId(1), Position::default(), 100.0, 0);
        world.spawn(CombatEntityId(2), Position::default(), 100.0, 1);
        world.spawn(CombatEntityId(3), Position::default(), 100.0, 1);
        world.set_in_combat(CombatEntityId(3), true);

        assert_eq!(world.engaged_enemies(CombatEntityId(1)), vec![CombatEntityId(3)]);
    }

    #[test]
    fn test_line_of_sight() {
        let mut world = SandboxWorld::new();
        world.spawn(CombatEntityId(1), Position::default(), 100.0, 0);
        world.spawn(CombatEntityId(2), Position::new(3.0, 4.0, 0.0), 100.0, 1);
        assert_eq!(world.distance(CombatEntityId(1), CombatEntityId(2)), Some(5.0));

        world.set_line_of_sight(CombatEntityId(1), CombatEntityId(2), false);
        assert!(!world.has_line_of_sight(CombatEntityId(2), CombatEntityId(1)));
    }
}
