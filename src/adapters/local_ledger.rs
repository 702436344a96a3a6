use crate::domain::model::{
    Event, EventStatus, Item, ItemId, NewEvent, NewItem, Slot, SlotId,
};
use crate::domain::ports::{Ledger, StorageUnit};
use crate::utils::error::{Result, WarehouseError};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerData {
    items: BTreeMap<ItemId, Item>,
    slots: Vec<Slot>,
    events: Vec<Event>,
    next_slot_id: SlotId,
    next_event_id: u64,
}

impl LedgerData {
    fn push_event(&mut self, event: NewEvent) -> Event {
        self.next_event_id += 1;
        let event = Event {
            id: self.next_event_id,
            item_id: event.item_id,
            slot_id: event.slot_id,
            timestamp: Utc::now(),
            status: event.status,
            detail: event.detail,
        };
        self.events.push(event.clone());
        event
    }
}

/// Ledger kept in memory, optionally mirrored to a JSON snapshot file.
///
/// Each call works on a copy of the data under one lock and only swaps it in
/// after the snapshot (if any) has been written, so a failed call leaves no
/// trace.
#[derive(Debug)]
pub struct LocalLedger {
    data: Mutex<LedgerData>,
    path: Option<PathBuf>,
}

impl LocalLedger {
    pub fn in_memory() -> Self {
        Self {
            data: Mutex::new(LedgerData::default()),
            path: None,
        }
    }

    /// 開啟快照檔；檔案不存在時從空帳本開始
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let content = fs::read(&path)?;
            serde_json::from_slice(&content)?
        } else {
            LedgerData::default()
        };
        tracing::debug!("Opened ledger at {}", path.display());

        Ok(Self {
            data: Mutex::new(data),
            path: Some(path),
        })
    }

    async fn persist(&self, data: &LedgerData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(data)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn transact<T>(&self, f: impl FnOnce(&mut LedgerData) -> Result<T>) -> Result<T> {
        let mut guard = self.data.lock().await;
        let mut draft = guard.clone();
        let value = f(&mut draft)?;
        self.persist(&draft).await?;
        *guard = draft;
        Ok(value)
    }

    /// 新增格位（外部佈建）
    pub async fn provision_slot(&self, capacity: u32, location: &str) -> Result<Slot> {
        if capacity == 0 {
            return Err(WarehouseError::validation("slot capacity must be positive"));
        }
        self.transact(|data| {
            if data.slots.iter().any(|slot| slot.location == location) {
                return Err(WarehouseError::validation(format!(
                    "location {} already exists",
                    location
                )));
            }
            data.next_slot_id += 1;
            let slot = Slot::new(data.next_slot_id, capacity, location);
            data.slots.push(slot.clone());
            Ok(slot)
        })
        .await
    }

    /// Takes a free slot out of service.
    pub async fn retire_slot(&self, slot_id: SlotId) -> Result<Slot> {
        self.transact(|data| {
            let index = data
                .slots
                .iter()
                .position(|slot| slot.id == slot_id)
                .ok_or_else(|| WarehouseError::store(format!("slot {} does not exist", slot_id)))?;
            if data.slots[index].occupied {
                return Err(WarehouseError::SlotConflict {
                    slot_id,
                    reason: "cannot retire an occupied slot".to_string(),
                });
            }
            Ok(data.slots.remove(index))
        })
        .await
    }

    pub async fn slot_count(&self) -> usize {
        self.data.lock().await.slots.len()
    }
}

#[async_trait]
impl Ledger for LocalLedger {
    async fn create_item(&self, new_item: NewItem) -> Result<Item> {
        self.transact(|data| {
            let mut id = ItemId::generate();
            while data.items.contains_key(&id) {
                id = ItemId::generate();
            }
            let item = Item {
                id: id.clone(),
                size: new_item.size,
                destination: new_item.destination,
                constrained: new_item.constrained,
            };
            data.items.insert(id.clone(), item.clone());
            data.push_event(NewEvent::new(
                id,
                EventStatus::Ingested,
                format!("Size: {}, Fragile: {}", item.size, item.constrained),
            ));
            Ok(item)
        })
        .await
    }

    async fn item(&self, id: &ItemId) -> Result<Option<Item>> {
        Ok(self.data.lock().await.items.get(id).cloned())
    }

    async fn free_slots(&self) -> Result<Vec<Slot>> {
        let data = self.data.lock().await;
        let mut slots: Vec<Slot> = data.slots.iter().filter(|s| !s.occupied).cloned().collect();
        slots.sort_by_key(|slot| slot.capacity);
        Ok(slots)
    }

    async fn occupied_slots(&self) -> Result<Vec<Slot>> {
        let data = self.data.lock().await;
        Ok(data.slots.iter().filter(|s| s.occupied).cloned().collect())
    }

    async fn assign_slot(&self, slot_id: SlotId, item: &Item, detail: &str) -> Result<Slot> {
        self.transact(|data| {
            if !data.items.contains_key(&item.id) {
                return Err(WarehouseError::store(format!("unknown package {}", item.id)));
            }
            let slot = data
                .slots
                .iter_mut()
                .find(|slot| slot.id == slot_id)
                .ok_or_else(|| WarehouseError::SlotConflict {
                    slot_id,
                    reason: "slot no longer exists".to_string(),
                })?;
            if slot.occupied {
                return Err(WarehouseError::SlotConflict {
                    slot_id,
                    reason: "already occupied".to_string(),
                });
            }
            if !slot.try_reserve(item.size) {
                return Err(WarehouseError::SlotConflict {
                    slot_id,
                    reason: format!("capacity {} is smaller than {}", slot.capacity, item.size),
                });
            }
            slot.item = Some(item.id.clone());
            let stored = slot.clone();

            data.push_event(
                NewEvent::new(item.id.clone(), EventStatus::Stored, detail).with_slot(slot_id),
            );
            Ok(stored)
        })
        .await
    }

    async fn release_slots(&self, item_ids: &[ItemId], detail: &str) -> Result<Vec<Slot>> {
        self.transact(|data| {
            let mut released = Vec::with_capacity(item_ids.len());
            for item_id in item_ids {
                let slot = data
                    .slots
                    .iter_mut()
                    .find(|slot| slot.occupied && slot.item.as_ref() == Some(item_id))
                    .ok_or_else(|| WarehouseError::ItemMissing {
                        item_id: item_id.to_string(),
                    })?;
                slot.release();
                released.push(slot.clone());
            }
            for (item_id, slot) in item_ids.iter().zip(&released) {
                data.push_event(
                    NewEvent::new(item_id.clone(), EventStatus::Loaded, detail).with_slot(slot.id),
                );
            }
            Ok(released)
        })
        .await
    }

    async fn append_events(&self, events: Vec<NewEvent>) -> Result<Vec<Event>> {
        self.transact(|data| Ok(events.into_iter().map(|e| data.push_event(e)).collect()))
            .await
    }

    async fn events(&self) -> Result<Vec<Event>> {
        Ok(self.data.lock().await.events.clone())
    }
}
