use crate::domain::model::{Event, Item, ItemId, NewEvent, NewItem, Slot, SlotId};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 可預留空間的儲存單位（貨架格位與貨車）
pub trait StorageUnit {
    /// Reserves `amount` units of space. Returns `false` without mutating
    /// anything when the unit cannot take it.
    fn try_reserve(&mut self, amount: u32) -> bool;

    fn release(&mut self);
}

/// Durable record of items, slots and the append-only event log.
///
/// Every method is one atomic unit of work: either all of its writes become
/// visible or none do.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Creates the item with a fresh id and records its `INGESTED` event.
    async fn create_item(&self, new_item: NewItem) -> Result<Item>;

    async fn item(&self, id: &ItemId) -> Result<Option<Item>>;

    /// Free slots ordered by ascending capacity.
    async fn free_slots(&self) -> Result<Vec<Slot>>;

    async fn occupied_slots(&self) -> Result<Vec<Slot>>;

    /// Row-locks the slot, checks it is still free and large enough for the
    /// item, marks it occupied and records a `STORED` event.
    async fn assign_slot(&self, slot_id: SlotId, item: &Item, detail: &str) -> Result<Slot>;

    /// Frees the slot holding each item and records one `LOADED` event per
    /// item. Fails as a whole if any item is not currently held by a slot.
    async fn release_slots(&self, item_ids: &[ItemId], detail: &str) -> Result<Vec<Slot>>;

    async fn append_events(&self, events: Vec<NewEvent>) -> Result<Vec<Event>>;

    async fn events(&self) -> Result<Vec<Event>>;
}
