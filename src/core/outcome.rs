use crate::core::transport::{LoadedEntry, RollbackAction};
use crate::domain::model::{Item, ItemId, Slot};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProcessOutcome {
    Empty,
    Stored { item: Item, slot: Slot },
    /// 沒有夠大的格位，已移到隊尾
    Unfulfillable {
        item_id: ItemId,
        size: u32,
        misses: u32,
    },
    /// 重試次數用完，移出輸送帶
    DeadLettered { item: Item, misses: u32 },
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Conveyor is empty."),
            Self::Stored { item, slot } => write!(f, "Stored {} in {}", item.id, slot.location),
            Self::Unfulfillable { size, misses, .. } => {
                write!(f, "No suitable bin found for size {} (attempt {})", size, misses)
            }
            Self::DeadLettered { item, misses } => write!(
                f,
                "Package {} set aside after {} failed attempts",
                item.id, misses
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationReport {
    pub capacity: u32,
    pub total_size: u64,
    pub selection: Vec<Item>,
    pub execution_logs: Vec<String>,
}

impl ConsolidationReport {
    /// 裝載率（百分比）
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.total_size as f64 / f64::from(self.capacity) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConsolidateOutcome {
    Loaded(ConsolidationReport),
    Empty,
    TruckFull { required: u64, remaining: u32 },
}

impl fmt::Display for ConsolidateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(report) => write!(
                f,
                "Loaded {} packages, {} of {} ({:.1}%)",
                report.selection.len(),
                report.total_size,
                report.capacity,
                report.utilization()
            ),
            Self::Empty => write!(f, "Warehouse is empty or no packages found in bins."),
            Self::TruckFull {
                required,
                remaining,
            } => write!(
                f,
                "Error: Truck is full. Plan needs {} but only {} is left.",
                required, remaining
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoadOutcome {
    Loaded { item_id: ItemId, size: u32 },
    NotFound(ItemId),
    AlreadyLoaded(ItemId),
    TruckFull { item_id: ItemId, size: u32, remaining: u32 },
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded { item_id, size } => write!(f, "Loaded {} (Size: {})", item_id, size),
            Self::NotFound(id) => write!(f, "Error: Package {} does not exist.", id),
            Self::AlreadyLoaded(id) => write!(f, "Error: Package {} is already on the truck.", id),
            Self::TruckFull { .. } => write!(f, "Error: Truck is full."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RollbackOutcome {
    RolledBack(Vec<RollbackAction>),
    NotOnTransport(ItemId),
}

impl RollbackOutcome {
    pub fn action_log(&self) -> Vec<String> {
        match self {
            Self::RolledBack(actions) => actions.iter().map(ToString::to_string).collect(),
            Self::NotOnTransport(id) => vec![format!("Error: Item {} not found on truck.", id)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TowerStatus {
    pub queued: Vec<ItemId>,
    pub dead_letters: Vec<ItemId>,
    pub free_slots: Vec<Slot>,
    pub transport: Vec<LoadedEntry>,
    pub used_space: u32,
    pub transport_capacity: u32,
}
