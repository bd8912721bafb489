use crate::config::ResourceBehavior;
use combat_types::ResourceKind;

/// Continuous pool: mana, rage, energy, focus or holy power
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePool {
    pub kind: ResourceKind,
    current: f64,
    behavior: ResourceBehavior,
}

impl ResourcePool {
    pub fn new(kind: ResourceKind, behavior: ResourceBehavior) -> Self {
        let current = if behavior.starts_full { behavior.max } else { 0.0 };
        ResourcePool {
            kind,
            current,
            behavior,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn max(&self) -> f64 {
        self.behavior.max
    }

    /// Add (or with a negative amount, remove) resource, clamped to [0, max]
    ///
    /// Returns the change actually applied.
    pub fn add(&mut self, amount: f64) -> f64 {
        let before = self.current;
        self.current = (self.current + amount).clamp(0.0, self.behavior.max);
        debug_assert!(self.current >= 0.0 && self.current <= self.behavior.max);
        self.current - before
    }

    /// Spend `amount` if available; never spends partially
    pub fn try_spend(&mut self, amount: f64) -> bool {
        if amount < 0.0 || self.current < amount {
            return false;
        }
        self.current = (self.current - amount).max(0.0);
        true
    }

    /// Regenerate or decay for `delta` seconds; returns the change applied
    pub fn apply_decay(&mut self, delta: f64, in_combat: bool) -> f64 {
        let rate = self.behavior.rate(in_combat);
        if rate == 0.0 {
            return 0.0;
        }
        self.add(rate * delta)
    }
}

/// Combo points a single entity can hold
pub const COMBO_POINT_CAP: u8 = 5;

/// Discrete combo-point counter, capped at [`COMBO_POINT_CAP`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComboPoints {
    points: u8,
}

impl ComboPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> u8 {
        self.points
    }

    pub fn cap(&self) -> u8 {
        COMBO_POINT_CAP
    }

    /// Add points, clamped at the cap; returns the number actually added
    pub fn add(&mut self, count: u8) -> u8 {
        let before = self.points;
        self.points = self.points.saturating_add(count).min(COMBO_POINT_CAP);
        self.points - before
    }

    /// Spend exactly `count` points if available
    pub fn try_spend(&mut self, count: u8) -> bool {
        if self.points < count {
            return false;
        }
        self.points -= count;
        true
    }

    /// Zero the counter, returning how many points were held
    pub fn consume_all(&mut self) -> u8 {
        std::mem::take(&mut self.points)
    }
}

/// Tagged resource state: one per registered entity
#[derive(Debug, Clone, PartialEq)]
pub enum SecondaryResource {
    Pool(ResourcePool),
    ComboPoints(ComboPoints),
}

impl SecondaryResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            SecondaryResource::Pool(pool) => pool.kind,
            SecondaryResource::ComboPoints(_) => ResourceKind::ComboPoints,
        }
    }

    /// Current amount, combo points as a whole number
    pub fn current(&self) -> f64 {
        match self {
            SecondaryResource::Pool(pool) => pool.current(),
            SecondaryResource::ComboPoints(combo) => combo.points() as f64,
        }
    }

    pub fn max(&self) -> f64 {
        match self {
            SecondaryResource::Pool(pool) => pool.max(),
            SecondaryResource::ComboPoints(combo) => combo.cap() as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy() -> ResourcePool {
        ResourcePool::new(
            ResourceKind::Energy,
            ResourceBehavior {
                max: 100.0,
                regen_per_second: 10.0,
                in_combat: true,
                out_of_combat: true,
                starts_full: true,
            },
        )
    }

    #[test]
    fn test_pool_clamps() {
        let mut pool = energy();
        assert!((pool.add(50.0)).abs() < f64::EPSILON);
        assert!((pool.add(-130.0) + 100.0).abs() < f64::EPSILON);
        assert_eq!(pool.current(), 0.0);
    }

    #[test]
    fn test_try_spend_is_atomic() {
        let mut pool = energy();
        pool.add(-70.0);
        assert!(!pool.try_spend(40.0));
        assert!((pool.current() - 30.0).abs() < f64::EPSILON);
        assert!(pool.try_spend(30.0));
        assert_eq!(pool.current(), 0.0);
    }

    #[test]
    fn test_regen() {
        let mut pool = energy();
        pool.add(-100.0);
        pool.apply_decay(0.5, true);
        assert!((pool.current() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_combo_points_cap() {
        let mut combo = ComboPoints::new();
        for _ in 0..6 {
            combo.add(1);
        }
        assert_eq!(combo.points(), 5);
        assert_eq!(combo.add(1), 0);
        assert_eq!(combo.consume_all(), 5);
        assert_eq!(combo.points(), 0);
    }
}
