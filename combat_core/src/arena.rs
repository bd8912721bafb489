//! Dense per-entity storage
//!
//! Records live in a contiguous `Vec` for cache-friendly iteration during
//! `tick`, with an id -> index table for lookups. Removal swaps the last
//! record into the hole, so iteration order is stable only between removals.

use combat_types::CombatEntityId;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct EntityArena<T> {
    entries: Vec<(CombatEntityId, T)>,
    index: HashMap<CombatEntityId, usize>,
}

impl<T> Default for EntityArena<T> {
    fn default() -> Self {
        EntityArena {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> EntityArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: CombatEntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: CombatEntityId) -> Option<&T> {
        self.index.get(&id).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, id: CombatEntityId) -> Option<&mut T> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// Insert or replace a record, returning the previous one
    pub fn insert(&mut self, id: CombatEntityId, value: T) -> Option<T> {
        if let Some(&i) = self.index.get(&id) {
            return Some(std::mem::replace(&mut self.entries[i].1, value));
        }
        self.index.insert(id, self.entries.len());
        self.entries.push((id, value));
        None
    }

    /// Get a record, creating it on first use
    pub fn get_or_insert_with(&mut self, id: CombatEntityId, create: impl FnOnce() -> T) -> &mut T {
        let i = match self.index.get(&id) {
            Some(&i) => i,
            None => {
                let i = self.entries.len();
                self.index.insert(id, i);
                self.entries.push((id, create()));
                i
            }
        };
        &mut self.entries[i].1
    }

    pub fn remove(&mut self, id: CombatEntityId) -> Option<T> {
        let i = self.index.remove(&id)?;
        let (_, value) = self.entries.swap_remove(i);
        if let Some((moved, _)) = self.entries.get(i) {
            self.index.insert(*moved, i);
        }
        debug_assert_eq!(self.entries.len(), self.index.len());
        Some(value)
    }

    /// Positional access for loops that must release the borrow between records
    pub fn get_index_mut(&mut self, index: usize) -> Option<(CombatEntityId, &mut T)> {
        self.entries.get_mut(index).map(|(id, value)| (*id, value))
    }

    pub fn ids(&self) -> impl Iterator<Item = CombatEntityId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CombatEntityId, &T)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CombatEntityId, &mut T)> {
        self.entries.iter_mut().map(|(id, value)| (*id, value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}
