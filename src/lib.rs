pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::LocalLedger;
pub use crate::core::controller::{AllocationController, TowerSettings};
pub use utils::error::{Result, WarehouseError};
