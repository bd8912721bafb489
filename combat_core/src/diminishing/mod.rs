//! Diminishing-returns tracker
//!
//! Keeps one ledger per (target, crowd-control category). Each application
//! inside the reset window moves the category one level down the multiplier
//! table. Once the table is exhausted the target becomes immune to that
//! category for the immunity window, after which the ledger starts over.

use crate::arena::EntityArena;
use crate::config::DiminishingReturnsConstants;
use crate::events::{CombatEvent, EventQueue};
use combat_types::{CcCategory, CombatEntityId};
use tracing::{debug, info};

/// Outcome of passing a crowd-control duration through the tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiminishedDuration {
    /// Scaled duration and the level the ledger advanced to
    Applied { duration: f64, level: u8 },
    /// Target is immune; the effect must not be stored
    Immune,
}

impl DiminishedDuration {
    /// Effective duration, zero when immune
    pub fn duration(&self) -> f64 {
        match self {
            DiminishedDuration::Applied { duration, .. } => *duration,
            DiminishedDuration::Immune => 0.0,
        }
    }

    pub fn is_immune(&self) -> bool {
        matches!(self, DiminishedDuration::Immune)
    }
}

/// Ledger for one crowd-control category on one target
#[derive(Debug, Clone, PartialEq)]
pub struct DrRecord {
    pub category: CcCategory,
    pub level: u8,
    pub since_last_application: f64,
    pub immunity_remaining: f64,
}

impl DrRecord {
    fn new(category: CcCategory) -> Self {
        DrRecord {
            category,
            level: 0,
            since_last_application: 0.0,
            immunity_remaining: 0.0,
        }
    }

    fn is_immune(&self) -> bool {
        self.immunity_remaining > 0.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct DrTracker {
    /// Per target, records in first-application order
    ledgers: EntityArena<Vec<DrRecord>>,
    config: DiminishingReturnsConstants,
    events: EventQueue,
}

impl DrTracker {
    /// Create a tracker with empty ledgers
    pub fn new(config: DiminishingReturnsConstants) -> Self {
        DrTracker {
            ledgers: EntityArena::new(),
            config,
            events: EventQueue::new(),
        }
    }

    /// Scale `duration` by the current level and advance the ledger
    ///
    /// This is not a pure query: every non-immune call counts as an application.
    pub fn apply_diminishing_returns(
        &mut self,
        target: CombatEntityId,
        category: CcCategory,
        duration: f64,
    ) -> DiminishedDuration {
        let ledger = self.ledgers.get_or_insert_with(target, Vec::new);
        let index = match ledger.iter().position(|r| r.category == category) {
            Some(i) => i,
            None => {
                ledger.push(DrRecord::new(category));
                ledger.len() - 1
            }
        };
        let record = &mut ledger[index];

        if record.is_immune() {
            debug!(%target, %category, "Crowd control rejected: immune");
            return DiminishedDuration::Immune;
        }

        let multipliers = &self.config.multipliers;
        let multiplier = multipliers
            .get(record.level as usize)
            .copied()
            .unwrap_or(0.0);
        record.level = record.level.saturating_add(1);
        record.since_last_application = 0.0;
        let level = record.level;

        debug!(%target, %category, level, multiplier, "Diminishing returns applied");
        self.events.push(CombatEvent::DrApplied {
            target,
            category,
            level,
            multiplier,
        });

        if level as usize >= multipliers.len() {
            record.immunity_remaining = self.config.immunity_duration;
            info!(%target, %category, "Immunity started");
            self.events.push(CombatEvent::ImmunityStarted {
                target,
                category,
                duration: self.config.immunity_duration,
            });
        }

        DiminishedDuration::Applied {
            duration: duration * multiplier,
            level,
        }
    }

    /// Advance reset windows and immunity timers
    pub fn tick(&mut self, delta: f64) {
        let Self {
            ledgers,
            config,
            events,
        } = self;

        for (target, ledger) in ledgers.iter_mut() {
            for record in ledger.iter_mut() {
                if record.is_immune() {
                    record.immunity_remaining -= delta;
                    if record.immunity_remaining <= 0.0 {
                        record.immunity_remaining = 0.0;
                        record.level = 0;
                        record.since_last_application = 0.0;
                        info!(%target, category = %record.category, "Immunity expired");
                        events.push(CombatEvent::ImmunityExpired {
                            target,
                            category: record.category,
                        });
                        events.push(CombatEvent::DrReset {
                            target,
                            category: record.category,
                        });
                    }
                } else if record.level > 0 {
                    record.since_last_application += delta;
                    if record.since_last_application >= config.reset_window {
                        record.level = 0;
                        record.since_last_application = 0.0;
                        debug!(%target, category = %record.category, "Diminishing returns reset");
                        events.push(CombatEvent::DrReset {
                            target,
                            category: record.category,
                        });
                    }
                }
            }
        }
    }

    fn record(&self, target: CombatEntityId, category: CcCategory) -> Option<&DrRecord> {
        self.ledgers
            .get(target)?
            .iter()
            .find(|r| r.category == category)
    }

    /// Applications counted in the current window (0 to 3)
    pub fn get_dr_level(&self, target: CombatEntityId, category: CcCategory) -> u8 {
        self.record(target, category).map_or(0, |r| r.level)
    }

    /// Multiplier the next application would receive
    pub fn get_duration_multiplier(&self, target: CombatEntityId, category: CcCategory) -> f64 {
        match self.record(target, category) {
            Some(record) if record.is_immune() => 0.0,
            Some(record) => self
                .config
                .multipliers
                .get(record.level as usize)
                .copied()
                .unwrap_or(0.0),
            None => self.config.multipliers.first().copied().unwrap_or(1.0),
        }
    }

    pub fn is_immune(&self, target: CombatEntityId, category: CcCategory) -> bool {
        self.record(target, category).is_some_and(DrRecord::is_immune)
    }

    /// Seconds until the category is applicable again; 0 when not immune
    pub fn immunity_remaining(&self, target: CombatEntityId, category: CcCategory) -> f64 {
        self.record(target, category)
            .map_or(0.0, |r| r.immunity_remaining)
    }

    /// Drop every ledger for a target
    pub fn clear(&mut self, target: CombatEntityId) {
        self.ledgers.remove(target);
    }

    pub fn clear_all(&mut self) {
        self.ledgers.clear();
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TARGET: CombatEntityId = CombatEntityId(1);

    fn tracker() -> DrTracker {
        DrTracker::new(DiminishingReturnsConstants::default())
    }

    #[test]
    fn test_dr_sequence() {
        let mut dr = tracker();
        let d1 = dr.apply_diminishing_returns(TARGET, CcCategory::Stun, 4.0);
        let d2 = dr.apply_diminishing_returns(TARGET, CcCategory::Stun, 4.0);
        let d3 = dr.apply_diminishing_returns(TARGET, CcCategory::Stun, 4.0);
        let d4 = dr.apply_diminishing_returns(TARGET, CcCategory::Stun, 4.0);

        assert!((d1.duration() - 4.0).abs() < f64::EPSILON);
        assert!((d2.duration() - 2.0).abs() < f64::EPSILON);
        assert!((d3.duration() - 1.0).abs() < f64::EPSILON);
        assert!(d4.is_immune());
        assert_eq!(d4.duration(), 0.0);
        assert!(dr.is_immune(TARGET, CcCategory::Stun));
        assert_eq!(dr.get_dr_level(TARGET, CcCategory::Stun), 3);
    }

    #[test]
    fn test_categories_are_independent() {
        let mut dr = tracker();
        dr.apply_diminishing_returns(TARGET, CcCategory::Stun, 4.0);
        dr.apply_diminishing_returns(TARGET, CcCategory::Stun, 4.0);

        let fear = dr.apply_diminishing_returns(TARGET, CcCategory::Fear, 8.0);
        assert!((fear.duration() - 8.0).abs() < f64::EPSILON);
        assert!((dr.get_duration_multiplier(TARGET, CcCategory::Stun) - 0.25).abs() < f64::EPSILON);
        assert!((dr.get_duration_multiplier(CombatEntityId(2), CcCategory::Stun) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset_after_idle_window() {
        let mut dr = tracker();
        dr.apply_diminishing_returns(TARGET, CcCategory::Root, 6.0);
        dr.tick(14.0);
        assert_eq!(dr.get_dr_level(TARGET, CcCategory::Root), 1);
        dr.tick(1.0);
        assert_eq!(dr.get_dr_level(TARGET, CcCategory::Root), 0);

        let events = dr.drain_events();
        assert!(events.contains(&CombatEvent::DrReset {
            target: TARGET,
            category: CcCategory::Root
        }));
    }

    #[test]
    fn test_application_restarts_window() {
        let mut dr = tracker();
        dr.apply_diminishing_returns(TARGET, CcCategory::Root, 6.0);
        dr.tick(10.0);
        dr.apply_diminishing_returns(TARGET, CcCategory::Root, 6.0);
        dr.tick(10.0);
        assert_eq!(dr.get_dr_level(TARGET, CcCategory::Root), 2);
    }

    #[test]
    fn test_immunity_expires() {
        let mut dr = tracker();
        for _ in 0..3 {
            dr.apply_diminishing_returns(TARGET, CcCategory::Silence, 4.0);
        }
        dr.tick(10.0);
        assert!(dr.is_immune(TARGET, CcCategory::Silence));
        assert!((dr.immunity_remaining(TARGET, CcCategory::Silence) - 5.0).abs() < 1e-9);

        dr.tick(5.0);
        assert!(!dr.is_immune(TARGET, CcCategory::Silence));
        assert_eq!(dr.get_dr_level(TARGET, CcCategory::Silence), 0);

        let full = dr.apply_diminishing_returns(TARGET, CcCategory::Silence, 4.0);
        assert!((full.duration() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_queries_do_not_advance() {
        let mut dr = tracker();
        dr.apply_diminishing_returns(TARGET, CcCategory::Fear, 8.0);
        for _ in 0..5 {
            dr.get_dr_level(TARGET, CcCategory::Fear);
            dr.get_duration_multiplier(TARGET, CcCategory::Fear);
            dr.is_immune(TARGET, CcCategory::Fear);
        }
        assert_eq!(dr.get_dr_level(TARGET, CcCategory::Fear), 1);
    }

    proptest! {
        #[test]
        fn dr_never_increases_inside_window(base in 0.5f64..30.0, gaps in prop::collection::vec(0.0f64..4.0, 1..6)) {
            let mut dr = tracker();
            let mut previous = f64::INFINITY;
            for gap in gaps {
                let applied = dr.apply_diminishing_returns(TARGET, CcCategory::Stun, base);
                prop_assert!(applied.duration() <= previous);
                previous = applied.duration();
                dr.tick(gap);
            }
        }
    }
}
