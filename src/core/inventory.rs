use crate::domain::model::{Slot, SlotId};

/// 空閒格位快照，依容量由小到大排序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotInventory {
    slots: Vec<Slot>,
}

impl SlotInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從頭重建快照
    pub fn from_slots(slots: impl IntoIterator<Item = Slot>) -> Self {
        let mut slots: Vec<Slot> = slots.into_iter().collect();
        slots.sort_by_key(|slot| slot.capacity);
        Self { slots }
    }

    /// Index of the first slot whose capacity is not less than `size`.
    fn lower_bound(&self, size: u32) -> usize {
        self.slots.partition_point(|slot| slot.capacity < size)
    }

    /// Smallest free slot that can still hold `size`.
    pub fn best_fit(&self, size: u32) -> Option<&Slot> {
        self.slots.get(self.lower_bound(size))
    }

    pub fn insert(&mut self, slot: Slot) {
        let index = self.lower_bound(slot.capacity);
        self.slots.insert(index, slot);
    }

    pub fn remove(&mut self, slot_id: SlotId) -> Option<Slot> {
        let index = self.slots.iter().position(|slot| slot.id == slot_id)?;
        Some(self.slots.remove(index))
    }

    pub fn contains(&self, slot_id: SlotId) -> bool {
        self.slots.iter().any(|slot| slot.id == slot_id)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
