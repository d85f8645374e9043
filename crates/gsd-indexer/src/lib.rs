//! gsd-indexer: turns relay notifications into indexed state.
//!
//! The [`Dispatcher`] routes each gsd-hub instruction of a notified
//! transaction to its domain processor, records contribution leaves carried
//! in noop inner instructions, and detects treasury inflows.

pub mod config;
pub mod context;
pub mod detection;
pub mod dispatcher;
mod processors;

pub use config::IndexerConfig;
pub use context::TxContext;
pub use detection::{detect_inflow, Inflow};
pub use dispatcher::{DispatchStats, Dispatcher, IndexerStats};
