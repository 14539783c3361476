//! Starbot Core - fleet task scheduling and execution engine
//!
//! Once per simulation tick the host hands control to the [`Controller`],
//! which decides what every owned ship should do, advances long-lived
//! tasks by one step and records whatever must survive until the next tick.
//!
//! # Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`host`] | Capability interface consumed from the simulation, plus value types |
//! | [`snapshot`] | Tick-scoped index of owned ships, structures and galaxies |
//! | [`memory`] | Per-ship, per-structure and per-galaxy records kept across ticks |
//! | [`persistence`] | Explicit load/save of [`Memory`](memory::Memory) around a tick |
//! | [`tasks`] | Task model, ship binding and the per-type step functions |
//! | [`strategy`] | Rules that enqueue new tasks from world state |
//! | [`scheduler`] | Per-galaxy driver: strategy, execution, compaction |
//! | [`engine`] | The per-tick [`Controller`] |
//! | [`config`] | Controller configuration |
//! | [`testing`] | Scripted host for tests and benchmarks |
//!
//! # Example
//!
//! ```rust,no_run
//! use starbot_core::prelude::*;
//! use starbot_core::testing::ScriptedHost;
//!
//! let mut host = ScriptedHost::new();
//! let mut store = InMemoryStore::new();
//! let mut controller = Controller::new(ControllerConfig::default());
//!
//! // One call per host tick
//! let summary = controller.tick_with_store(&mut host, &mut store).unwrap();
//! println!("{} tasks active", summary.tasks_active);
//! ```

pub mod config;
pub mod constants;
pub mod engine;
pub mod host;
pub mod memory;
pub mod persistence;
pub mod scheduler;
pub mod snapshot;
pub mod strategy;
pub mod tasks;
pub mod testing;

pub use engine::Controller;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::config::{BuildRule, ControllerConfig, StockpileRule, StrategyConfig};
    pub use crate::engine::Controller;
    pub use crate::host::*;
    pub use crate::memory::{GalaxyMemory, Memory, ShipMemory, StructureMemory};
    pub use crate::persistence::{InMemoryStore, JsonFileStore, MemoryStore, SaveError};
    pub use crate::scheduler::TickSummary;
    pub use crate::snapshot::EntitySnapshot;
    pub use crate::tasks::{BuildTask, HarvestTask, Task, TaskKind};
}
