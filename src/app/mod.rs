pub mod audit;
pub mod bootstrap;
#[cfg(feature = "cli")]
pub mod console;
