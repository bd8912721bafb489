//! Threat/aggro engine
//!
//! One [`ThreatTable`] per enemy. Entries keep insertion order, so ties on
//! threat always resolve to the contributor that engaged first. The engine also
//! tracks each enemy's current aggro target: the first contributor takes it
//! immediately, taunts take it immediately, and everyone else takes it on the
//! next tick once they overtake the holder by the melee margin.

use crate::arena::EntityArena;
use crate::config::ThreatConstants;
use crate::events::{CombatEvent, EventQueue};
use crate::world::Spatial;
use combat_types::CombatEntityId;
use tracing::{debug, info};

/// Tolerance for threshold comparisons (100 × 1.1 is not exactly 110)
const PULL_EPSILON: f64 = 1e-9;

/// Accumulated threat of one contributor against one enemy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreatEntry {
    pub contributor: CombatEntityId,
    pub threat: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreatTable {
    entries: Vec<ThreatEntry>,
    current_target: Option<CombatEntityId>,
}

impl ThreatTable {
    /// Entries in insertion order
    pub fn entries(&self) -> &[ThreatEntry] {
        &self.entries
    }

    /// Who holds aggro on this enemy
    pub fn current_target(&self) -> Option<CombatEntityId> {
        self.current_target
    }

    pub fn threat(&self, contributor: CombatEntityId) -> f64 {
        self.entries
            .iter()
            .find(|e| e.contributor == contributor)
            .map_or(0.0, |e| e.threat)
    }

    /// Highest entry; the first-inserted contributor wins ties
    pub fn highest(&self) -> Option<&ThreatEntry> {
        self.entries.iter().fold(None, |best: Option<&ThreatEntry>, entry| match best {
            Some(b) if b.threat >= entry.threat => Some(b),
            _ => Some(entry),
        })
    }

    fn entry_mut(&mut self, contributor: CombatEntityId) -> &mut ThreatEntry {
        let index = match self.entries.iter().position(|e| e.contributor == contributor) {
            Some(i) => i,
            None => {
                self.entries.push(ThreatEntry {
                    contributor,
                    threat: 0.0,
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }
}

#[derive(Debug, Clone, Default)]
pub struct ThreatEngine {
    tables: EntityArena<ThreatTable>,
    config: ThreatConstants,
    events: EventQueue,
}

impl ThreatEngine {
    /// Create an engine with no threat tables
    pub fn new(config: ThreatConstants) -> Self {
        ThreatEngine {
            tables: EntityArena::new(),
            config,
            events: EventQueue::new(),
        }
    }

    /// Add (or with a negative amount, reduce) threat; entries floor at zero
    pub fn add_threat(&mut self, contributor: CombatEntityId, enemy: CombatEntityId, amount: f64) {
        if amount == 0.0 || !amount.is_finite() {
            return;
        }
        let table = self.tables.get_or_insert_with(enemy, ThreatTable::default);
        let entry = table.entry_mut(contributor);
        entry.threat = (entry.threat + amount).max(0.0);
        let total = entry.threat;
        debug_assert!(total >= 0.0);
        debug!(%contributor, %enemy, amount, total, "Threat added");

        if table.current_target.is_none() && total > 0.0 {
            table.current_target = Some(contributor);
            info!(%enemy, to = %contributor, "Aggro acquired");
            self.events.push(CombatEvent::AggroChanged {
                enemy,
                previous: None,
                current: Some(contributor),
            });
        }
    }

    /// Jump to a multiple of the highest entry and take aggro immediately
    pub fn taunt(&mut self, contributor: CombatEntityId, enemy: CombatEntityId) {
        let table = self.tables.get_or_insert_with(enemy, ThreatTable::default);
        let top = table.highest().map_or(0.0, |e| e.threat);
        let taunted = if top > 0.0 {
            top * self.config.taunt_multiplier
        } else {
            self.config.taunt_baseline
        };

        let entry = table.entry_mut(contributor);
        entry.threat = entry.threat.max(taunted);
        info!(%contributor, %enemy, threat = entry.threat, "Taunted");

        let previous = table.current_target.replace(contributor);
        if previous != Some(contributor) {
            self.events.push(CombatEvent::AggroChanged {
                enemy,
                previous,
                current: Some(contributor),
            });
        }
    }

    /// Spread `heal_amount × healing multiplier` evenly across the engaged enemies
    pub fn add_healing_threat(
        &mut self,
        healer: CombatEntityId,
        heal_amount: f64,
        engaged_enemies: &[CombatEntityId],
    ) {
        if engaged_enemies.is_empty() || heal_amount <= 0.0 {
            return;
        }
        let share =
            heal_amount * self.config.healing_threat_multiplier / engaged_enemies.len() as f64;
        for &enemy in engaged_enemies {
            self.add_threat(healer, enemy, share);
        }
    }

    /// Whether `contributor` has enough threat to take aggro from the holder
    ///
    /// The holder is the enemy's current target, or the highest other entry
    /// when the enemy has none.
    pub fn should_pull_aggro(
        &self,
        contributor: CombatEntityId,
        enemy: CombatEntityId,
        is_melee: bool,
    ) -> bool {
        let Some(table) = self.tables.get(enemy) else {
            return false;
        };
        if table.current_target == Some(contributor) {
            return false;
        }

        let own = table.threat(contributor);
        let reference = match table.current_target {
            Some(holder) => table.threat(holder),
            None => table
                .entries
                .iter()
                .filter(|e| e.contributor != contributor)
                .map(|e| e.threat)
                .fold(0.0, f64::max),
        };
        if reference <= 0.0 {
            return own > 0.0;
        }

        let margin = if is_melee {
            self.config.melee_pull_threshold
        } else {
            self.config.ranged_pull_threshold
        };
        own + PULL_EPSILON >= reference * margin
    }

    /// Re-evaluate every enemy's aggro target
    ///
    /// The highest contributor takes aggro once it beats the holder by the
    /// melee margin, or whenever the holder has no threat left.
    pub fn update_aggro_targets(&mut self) {
        let Self {
            tables,
            config,
            events,
        } = self;
        for (enemy, table) in tables.iter_mut() {
            let Some(top) = table.highest().copied() else {
                continue;
            };
            let switch = match table.current_target {
                None => top.threat > 0.0,
                Some(holder) if holder == top.contributor => false,
                Some(holder) => {
                    let held = table.threat(holder);
                    held <= 0.0
                        || top.threat + PULL_EPSILON >= held * config.melee_pull_threshold
                }
            };
            if switch {
                let previous = table.current_target.replace(top.contributor);
                info!(%enemy, from = ?previous, to = %top.contributor, "Aggro changed");
                events.push(CombatEvent::AggroChanged {
                    enemy,
                    previous,
                    current: Some(top.contributor),
                });
            }
        }
    }

    /// Contributor with the most threat on `enemy`, regardless of who holds aggro
    pub fn get_highest_threat_player(&self, enemy: CombatEntityId) -> Option<CombatEntityId> {
        self.tables
            .get(enemy)?
            .highest()
            .map(|e| e.contributor)
    }

    /// Threat `contributor` has on `enemy`; 0 when absent
    pub fn threat(&self, contributor: CombatEntityId, enemy: CombatEntityId) -> f64 {
        self.tables
            .get(enemy)
            .map_or(0.0, |t| t.threat(contributor))
    }

    pub fn current_target(&self, enemy: CombatEntityId) -> Option<CombatEntityId> {
        self.tables.get(enemy).and_then(|t| t.current_target)
    }

    /// Raw table for an enemy, if anyone has threat on it
    pub fn table(&self, enemy: CombatEntityId) -> Option<&ThreatTable> {
        self.tables.get(enemy)
    }

    /// Entries sorted by descending threat, ties in insertion order
    pub fn threat_table(&self, enemy: CombatEntityId) -> Vec<ThreatEntry> {
        let mut entries = self
            .tables
            .get(enemy)
            .map(|t| t.entries.clone())
            .unwrap_or_default();
        entries.sort_by(|a, b| b.threat.total_cmp(&a.threat));
        entries
    }

    /// Wipe an enemy's table (combat end or death)
    pub fn reset_threat(&mut self, enemy: CombatEntityId) {
        let Some(table) = self.tables.remove(enemy) else {
            return;
        };
        info!(%enemy, "Threat reset");
        self.events.push(CombatEvent::ThreatReset { enemy });
        if table.current_target.is_some() {
            self.events.push(CombatEvent::AggroChanged {
                enemy,
                previous: table.current_target,
                current: None,
            });
        }
    }

    /// Drop a contributor from every table, re-picking aggro where it was held
    pub fn remove_contributor(&mut self, contributor: CombatEntityId) {
        let Self { tables, events, .. } = self;
        for (enemy, table) in tables.iter_mut() {
            let before = table.entries.len();
            table.entries.retain(|e| e.contributor != contributor);
            if table.entries.len() == before || table.current_target != Some(contributor) {
                continue;
            }
            let next = table.highest().map(|e| e.contributor);
            table.current_target = next;
            events.push(CombatEvent::AggroChanged {
                enemy,
                previous: Some(contributor),
                current: next,
            });
        }
    }

    /// Reset tables of enemies that died or left combat, then re-evaluate aggro
    pub fn tick<S: Spatial + ?Sized>(&mut self, world: &S) {
        let stale: Vec<CombatEntityId> = self
            .tables
            .ids()
            .filter(|&enemy| !world.is_alive(enemy) || !world.is_in_combat(enemy))
            .collect();
        for enemy in stale {
            self.reset_threat(enemy);
        }
        self.update_aggro_targets();
    }

    /// Drop every table without emitting reset events
    pub fn clear_all(&mut self) {
        self.tables.clear();
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.events.drain()
    }
}
