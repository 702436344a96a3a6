pub mod controller;
pub mod intake;
pub mod inventory;
pub mod optimizer;
pub mod outcome;
pub mod transport;

pub use crate::domain::model::{Event, EventStatus, Item, ItemId, Slot, SlotId};
pub use crate::domain::ports::{Ledger, StorageUnit};
pub use crate::utils::error::Result;
