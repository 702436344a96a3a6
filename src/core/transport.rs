use crate::domain::model::ItemId;
use crate::domain::ports::StorageUnit;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedEntry {
    pub item_id: ItemId,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RollbackAction {
    TemporarilyRemoved(ItemId),
    Removed(ItemId),
    Reloaded(ItemId),
}

impl RollbackAction {
    pub fn item_id(&self) -> &ItemId {
        match self {
            Self::TemporarilyRemoved(id) | Self::Removed(id) | Self::Reloaded(id) => id,
        }
    }
}

impl fmt::Display for RollbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemporarilyRemoved(id) => write!(f, "Temporarily Unloaded: {}", id),
            Self::Removed(id) => write!(f, "TARGET REMOVED: {}", id),
            Self::Reloaded(id) => write!(f, "Reloaded: {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotOnTransport(pub ItemId);

impl fmt::Display for NotOnTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item {} not found on truck.", self.0)
    }
}

/// 貨車：容量有限的 LIFO 堆疊
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportUnit {
    capacity: u32,
    used_space: u32,
    stack: Vec<LoadedEntry>,
}

impl TransportUnit {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            used_space: 0,
            stack: Vec::new(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn used_space(&self) -> u32 {
        self.used_space
    }

    pub fn remaining(&self) -> u32 {
        self.capacity - self.used_space
    }

    /// Bottom of the stack first.
    pub fn entries(&self) -> &[LoadedEntry] {
        &self.stack
    }

    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.stack.iter().any(|entry| &entry.item_id == item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn load(&mut self, item_id: ItemId, size: u32) -> bool {
        if !self.try_reserve(size) {
            return false;
        }
        self.stack.push(LoadedEntry { item_id, size });
        true
    }

    pub fn pop(&mut self) -> Option<LoadedEntry> {
        let entry = self.stack.pop()?;
        self.used_space -= entry.size;
        Some(entry)
    }

    /// Empties the unit and returns what was on it, bottom first.
    pub fn reset(&mut self) -> Vec<LoadedEntry> {
        self.used_space = 0;
        std::mem::take(&mut self.stack)
    }

    /// Unloads everything above `target`, drops `target`, then puts the rest
    /// back in their original order.
    pub fn rollback_to(
        &mut self,
        target: &ItemId,
    ) -> std::result::Result<Vec<RollbackAction>, NotOnTransport> {
        if !self.contains(target) {
            return Err(NotOnTransport(target.clone()));
        }

        let mut held = Vec::new();
        let mut actions = Vec::new();

        while let Some(entry) = self.pop() {
            if &entry.item_id == target {
                actions.push(RollbackAction::Removed(entry.item_id));
                break;
            }
            actions.push(RollbackAction::TemporarilyRemoved(entry.item_id.clone()));
            held.push(entry);
        }

        while let Some(entry) = held.pop() {
            actions.push(RollbackAction::Reloaded(entry.item_id.clone()));
            // 剛卸下的空間一定放得回去
            let reloaded = self.load(entry.item_id, entry.size);
            debug_assert!(reloaded);
        }

        Ok(actions)
    }
}

impl StorageUnit for TransportUnit {
    fn try_reserve(&mut self, amount: u32) -> bool {
        match self.used_space.checked_add(amount) {
            Some(total) if total <= self.capacity => {
                self.used_space = total;
                true
            }
            _ => false,
        }
    }

    fn release(&mut self) {
        self.reset();
    }
}
