use crate::domain::ports::StorageUnit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 包裹追蹤編號，例如 `PKG-1A2B3C4D`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn generate() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("PKG-{}", raw[..8].to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type SlotId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub size: u32,
    pub destination: String,
    /// 易碎品：整組裝車或整組不裝
    pub constrained: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub size: u32,
    pub destination: String,
    pub constrained: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub capacity: u32,
    pub location: String,
    pub occupied: bool,
    pub item: Option<ItemId>,
}

impl Slot {
    pub fn new(id: SlotId, capacity: u32, location: impl Into<String>) -> Self {
        Self {
            id,
            capacity,
            location: location.into(),
            occupied: false,
            item: None,
        }
    }
}

impl StorageUnit for Slot {
    fn try_reserve(&mut self, amount: u32) -> bool {
        if self.occupied || amount > self.capacity {
            return false;
        }
        self.occupied = true;
        true
    }

    fn release(&mut self) {
        self.occupied = false;
        self.item = None;
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ID: {}, Cap: {})", self.location, self.id, self.capacity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Ingested,
    Stored,
    Loaded,
    Unloaded,
    Error,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingested => "INGESTED",
            Self::Stored => "STORED",
            Self::Loaded => "LOADED",
            Self::Unloaded => "UNLOADED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 稽核紀錄，只追加不修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub item_id: ItemId,
    pub slot_id: Option<SlotId>,
    pub timestamp: DateTime<Utc>,
    pub status: EventStatus,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub item_id: ItemId,
    pub slot_id: Option<SlotId>,
    pub status: EventStatus,
    pub detail: String,
}

impl NewEvent {
    pub fn new(item_id: ItemId, status: EventStatus, detail: impl Into<String>) -> Self {
        Self {
            item_id,
            slot_id: None,
            status,
            detail: detail.into(),
        }
    }

    pub fn with_slot(mut self, slot_id: SlotId) -> Self {
        self.slot_id = Some(slot_id);
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} - {}", self.timestamp.to_rfc3339(), self.item_id, self.status)
    }
}
