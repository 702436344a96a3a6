// Adapters layer: concrete implementations of the domain ports.

pub mod local_ledger;

pub use local_ledger::LocalLedger;
