//! randwalk - distributed random walk simulation
//!
//! randwalk runs many independent one-dimensional random walkers, one per
//! process, and a single controller process that collects one completion
//! report from each of them.
//!
//! # Architecture
//!
//! - **Group**: fixed topology decided at launch; rank 0 is the controller, ranks 1..N are walkers
//! - **Walkers**: run a bounded random walk, send exactly one report
//! - **Controller**: wildcard-source fan-in of exactly N reports, in any order
//! - **Transport**: length-prefixed MessagePack over TCP between processes,
//!   tokio channels in-process

pub mod config;
pub mod controller;
pub mod distributed;
pub mod error;
pub mod group;
pub mod logging;
pub mod walker;

// Re-export commonly used types
pub use config::SimulationConfig;
pub use group::{GroupContext, Rank, Role, WalkerIdentity};

/// Result type used throughout randwalk
pub type Result<T> = anyhow::Result<T>;
