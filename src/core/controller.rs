use crate::core::inventory::SlotInventory;
use crate::core::intake::IntakeQueue;
use crate::core::optimizer::{check_table_size, optimize};
use crate::core::outcome::{
    ConsolidateOutcome, ConsolidationReport, LoadOutcome, ProcessOutcome, RollbackOutcome,
    TowerStatus,
};
use crate::core::transport::{NotOnTransport, RollbackAction, TransportUnit};
use crate::domain::model::{EventStatus, Item, ItemId, NewEvent, NewItem, SlotId};
use crate::domain::ports::Ledger;
use crate::utils::error::{Result, WarehouseError};
use crate::utils::validation::{validate_non_empty_string, validate_positive_number};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TowerSettings {
    pub transport_capacity: u32,
    /// 0 代表無限重排
    pub max_requeues: u32,
}

impl Default for TowerSettings {
    fn default() -> Self {
        Self {
            transport_capacity: 2000,
            max_requeues: 3,
        }
    }
}

struct TowerState {
    queue: IntakeQueue,
    inventory: SlotInventory,
    transport: TransportUnit,
    dead_letters: Vec<Item>,
}

/// The control tower.
///
/// Owns the conveyor queue, the mirror of free slots and the truck. Every
/// operation holds the state lock for its whole duration, including the
/// ledger calls, so in-memory state only ever changes after the ledger has
/// committed.
pub struct AllocationController<L: Ledger> {
    ledger: L,
    settings: TowerSettings,
    state: Mutex<TowerState>,
}

impl<L: Ledger> AllocationController<L> {
    pub async fn new(ledger: L, settings: TowerSettings) -> Result<Self> {
        tracing::info!("🗼 Initializing control tower...");
        let free = ledger.free_slots().await?;
        let inventory = SlotInventory::from_slots(free);
        tracing::info!(
            "📦 {} free bins loaded, truck capacity {}",
            inventory.len(),
            settings.transport_capacity
        );

        Ok(Self {
            ledger,
            settings,
            state: Mutex::new(TowerState {
                queue: IntakeQueue::new(),
                inventory,
                transport: TransportUnit::new(settings.transport_capacity),
                dead_letters: Vec::new(),
            }),
        })
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn settings(&self) -> TowerSettings {
        self.settings
    }

    pub async fn ingest(&self, size: u32, destination: &str, constrained: bool) -> Result<Item> {
        validate_positive_number("size", u64::from(size), 1)?;
        validate_non_empty_string("destination", destination)?;

        let mut state = self.state.lock().await;
        let item = self
            .ledger
            .create_item(NewItem {
                size,
                destination: destination.to_string(),
                constrained,
            })
            .await?;

        state.queue.push(item.clone());
        tracing::info!(
            "Package {} generated and added to conveyor (queue: {})",
            item.id,
            state.queue.len()
        );
        Ok(item)
    }

    pub async fn process_next(&self) -> Result<ProcessOutcome> {
        let mut state = self.state.lock().await;
        let Some(head) = state.queue.head() else {
            return Ok(ProcessOutcome::Empty);
        };
        let item = head.item.clone();
        let misses = head.misses;

        let Some(slot) = state.inventory.best_fit(item.size).cloned() else {
            return self.handle_unfulfillable(&mut state, item, misses).await;
        };

        tracing::debug!("Best fit for {} (size {}): {}", item.id, item.size, slot);
        let detail = format!("Stored in {}", slot.location);
        let stored = match self.ledger.assign_slot(slot.id, &item, &detail).await {
            Ok(stored) => stored,
            Err(e) => {
                self.record_failure(&item.id, Some(slot.id), &e).await;
                return Err(e);
            }
        };

        state.queue.pop();
        state.inventory.remove(slot.id);
        tracing::info!("✅ Stored {} in {}", item.id, stored.location);
        Ok(ProcessOutcome::Stored {
            item,
            slot: stored,
        })
    }

    async fn handle_unfulfillable(
        &self,
        state: &mut TowerState,
        item: Item,
        misses: u32,
    ) -> Result<ProcessOutcome> {
        let misses = misses + 1;
        let limit = self.settings.max_requeues;

        // max_requeues 次重排之後仍失敗才移出
        if limit > 0 && misses > limit {
            let detail = format!(
                "No suitable bin for size {} after {} attempts; removed from conveyor",
                item.size, misses
            );
            self.ledger
                .append_events(vec![NewEvent::new(
                    item.id.clone(),
                    EventStatus::Error,
                    detail,
                )])
                .await?;
            state.queue.pop();
            state.dead_letters.push(item.clone());
            tracing::warn!("⚠️ Package {} dead-lettered after {} attempts", item.id, misses);
            return Ok(ProcessOutcome::DeadLettered { item, misses });
        }

        state.queue.requeue_head();
        tracing::info!("No suitable bin found for size {}, requeued {}", item.size, item.id);
        Ok(ProcessOutcome::Unfulfillable {
            item_id: item.id,
            size: item.size,
            misses,
        })
    }

    /// Moves dead-lettered items back onto the conveyor with a fresh retry
    /// budget. Returns how many were moved.
    pub async fn requeue_dead_letters(&self) -> usize {
        let mut state = self.state.lock().await;
        let items = std::mem::take(&mut state.dead_letters);
        let count = items.len();
        for item in items {
            state.queue.push(item);
        }
        tracing::info!("Requeued {} dead-lettered packages", count);
        count
    }

    pub async fn consolidate(&self, capacity: u32) -> Result<ConsolidateOutcome> {
        validate_positive_number("capacity", u64::from(capacity), 1)?;

        let mut state = self.state.lock().await;
        let mut stored = Vec::new();
        for slot in self.ledger.occupied_slots().await? {
            let Some(item_id) = slot.item else {
                continue;
            };
            match self.ledger.item(&item_id).await? {
                Some(item) if state.transport.contains(&item.id) => {
                    tracing::debug!("Skipping {}: already on the truck", item.id);
                }
                Some(item) => stored.push(item),
                None => tracing::warn!("Bin {} references unknown package {}", slot.id, item_id),
            }
        }

        if stored.is_empty() {
            tracing::info!("Warehouse is empty or no packages found in bins.");
            return Ok(ConsolidateOutcome::Empty);
        }

        let (fragile, standard): (Vec<Item>, Vec<Item>) =
            stored.into_iter().partition(|item| item.constrained);
        check_table_size(capacity, &fragile, &standard)?;
        let selection = optimize(capacity, &fragile, &standard);
        tracing::debug!(
            "Optimizer picked {} of {} fragile / {} standard packages, total {}",
            selection.items.len(),
            fragile.len(),
            standard.len(),
            selection.total_size
        );

        let remaining = state.transport.remaining();
        if selection.total_size > u64::from(remaining) {
            tracing::warn!(
                "Truck cannot take plan of size {} (remaining {})",
                selection.total_size,
                remaining
            );
            return Ok(ConsolidateOutcome::TruckFull {
                required: selection.total_size,
                remaining,
            });
        }

        let mut execution_logs = Vec::new();
        if !selection.items.is_empty() {
            let ids: Vec<ItemId> = selection.items.iter().map(|item| item.id.clone()).collect();
            let released = match self
                .ledger
                .release_slots(&ids, "Moved from Bin to Truck (Optimization)")
                .await
            {
                Ok(released) => released,
                Err(e) => {
                    self.record_failure(&ids[0], None, &e).await;
                    return Err(e);
                }
            };

            for slot in released {
                if !state.inventory.contains(slot.id) {
                    state.inventory.insert(slot);
                }
            }
            for item in &selection.items {
                let loaded = state.transport.load(item.id.clone(), item.size);
                debug_assert!(loaded);
                execution_logs.push(format!("{}: Moved from Bin to Truck", item.id));
            }
        }

        let report = ConsolidationReport {
            capacity,
            total_size: selection.total_size,
            selection: selection.items,
            execution_logs,
        };
        tracing::info!(
            "🚚 Consolidated {} packages ({:.1}% of {})",
            report.selection.len(),
            report.utilization(),
            capacity
        );
        Ok(ConsolidateOutcome::Loaded(report))
    }

    pub async fn load(&self, item_id: &ItemId) -> Result<LoadOutcome> {
        let mut state = self.state.lock().await;
        let Some(item) = self.ledger.item(item_id).await? else {
            return Ok(LoadOutcome::NotFound(item_id.clone()));
        };
        if state.transport.contains(&item.id) {
            return Ok(LoadOutcome::AlreadyLoaded(item.id));
        }
        if !state.transport.load(item.id.clone(), item.size) {
            return Ok(LoadOutcome::TruckFull {
                item_id: item.id,
                size: item.size,
                remaining: state.transport.remaining(),
            });
        }

        let event = NewEvent::new(item.id.clone(), EventStatus::Loaded, "Loaded to Truck");
        if let Err(e) = self.ledger.append_events(vec![event]).await {
            state.transport.pop();
            self.record_failure(&item.id, None, &e).await;
            return Err(e);
        }

        tracing::info!("Loaded {} (Size: {})", item.id, item.size);
        Ok(LoadOutcome::Loaded {
            item_id: item.id,
            size: item.size,
        })
    }

    pub async fn rollback(&self, item_id: &ItemId) -> Result<RollbackOutcome> {
        let mut state = self.state.lock().await;
        let before = state.transport.clone();

        let actions = match state.transport.rollback_to(item_id) {
            Ok(actions) => actions,
            Err(NotOnTransport(id)) => return Ok(RollbackOutcome::NotOnTransport(id)),
        };

        let events = actions
            .iter()
            .map(|action| match action {
                RollbackAction::TemporarilyRemoved(id) => {
                    NewEvent::new(id.clone(), EventStatus::Unloaded, "Temporarily unloaded")
                }
                RollbackAction::Removed(id) => NewEvent::new(
                    id.clone(),
                    EventStatus::Unloaded,
                    "Target item removed via Rollback",
                ),
                RollbackAction::Reloaded(id) => {
                    NewEvent::new(id.clone(), EventStatus::Loaded, "Reloaded after rollback")
                }
            })
            .collect();

        if let Err(e) = self.ledger.append_events(events).await {
            state.transport = before;
            self.record_failure(item_id, None, &e).await;
            return Err(e);
        }

        tracing::info!("↩️ Rolled back {} ({} actions)", item_id, actions.len());
        Ok(RollbackOutcome::RolledBack(actions))
    }

    /// Empties the truck at its destination.
    pub async fn unload_all(&self) -> Result<Vec<ItemId>> {
        let mut state = self.state.lock().await;
        if state.transport.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ItemId> = state
            .transport
            .entries()
            .iter()
            .rev()
            .map(|entry| entry.item_id.clone())
            .collect();
        let events = ids
            .iter()
            .map(|id| NewEvent::new(id.clone(), EventStatus::Unloaded, "Unloaded from Truck"))
            .collect();
        self.ledger.append_events(events).await?;

        state.transport.reset();
        tracing::info!("Truck emptied, {} packages unloaded", ids.len());
        Ok(ids)
    }

    /// Rebuilds the free-slot mirror from the ledger.
    pub async fn reload(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        let free = self.ledger.free_slots().await?;
        state.inventory = SlotInventory::from_slots(free);
        tracing::info!("🔄 Inventory reloaded: {} free bins", state.inventory.len());
        Ok(state.inventory.len())
    }

    pub async fn status(&self) -> TowerStatus {
        let state = self.state.lock().await;
        TowerStatus {
            queued: state.queue.iter().map(|q| q.item.id.clone()).collect(),
            dead_letters: state.dead_letters.iter().map(|i| i.id.clone()).collect(),
            free_slots: state.inventory.slots().to_vec(),
            transport: state.transport.entries().to_vec(),
            used_space: state.transport.used_space(),
            transport_capacity: state.transport.capacity(),
        }
    }

    /// 盡力寫入錯誤事件；寫不進去只記錄日誌
    async fn record_failure(&self, item_id: &ItemId, slot_id: Option<SlotId>, error: &WarehouseError) {
        tracing::error!("❌ Ledger operation failed for {}: {}", item_id, error);
        let mut event = NewEvent::new(item_id.clone(), EventStatus::Error, error.to_string());
        if let Some(slot_id) = slot_id {
            event = event.with_slot(slot_id);
        }
        if let Err(e) = self.ledger.append_events(vec![event]).await {
            tracing::warn!("Could not record error event: {}", e);
        }
    }
}
