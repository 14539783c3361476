//! Controller - main entry point, called once per host tick

use crate::config::ControllerConfig;
use crate::host::Host;
use crate::memory::Memory;
use crate::persistence::{MemoryStore, SaveError};
use crate::scheduler::{self, TickContext, TickSummary};
use crate::snapshot::EntitySnapshot;
use crate::tasks::IdGenerator;

/// Per-tick controller
pub struct Controller {
    config: ControllerConfig,
    /// Task id source; reseeded per host tick when a seed is configured
    ids: IdGenerator,
    ids_tick: Option<u64>,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        let ids = IdGenerator::new(config.seed);
        Self {
            config,
            ids,
            ids_tick: None,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run one tick: snapshot, memory init, scheduling pass, memory prune.
    ///
    /// Never fails. Missing targets, unsatisfiable needs and rejected actions
    /// are logged and handled inside the pass.
    pub fn tick<H: Host + ?Sized>(&mut self, host: &mut H, memory: &mut Memory) -> TickSummary {
        let snapshot = EntitySnapshot::capture(&*host);
        memory.init(&snapshot);

        if let Some(seed) = self.config.seed {
            if self.ids_tick != Some(snapshot.tick) {
                self.ids = IdGenerator::for_tick(seed, snapshot.tick);
                self.ids_tick = Some(snapshot.tick);
            }
        }

        let summary = {
            let mut ctx = TickContext {
                host,
                snapshot: &snapshot,
                memory: &mut *memory,
            };
            scheduler::run(&mut ctx, &self.config, &mut self.ids)
        };

        let pruned = memory.prune(&snapshot);
        if pruned.ships > 0 || pruned.structures > 0 {
            log::debug!(
                "Pruned {} ship and {} structure records",
                pruned.ships,
                pruned.structures
            );
        }

        log::debug!(
            "Tick {}: {} galaxies, {} tasks active (+{} -{})",
            snapshot.tick,
            summary.galaxies,
            summary.tasks_active,
            summary.tasks_created,
            summary.tasks_completed
        );
        summary
    }

    /// [`tick`](Self::tick) bracketed by an explicit load and save.
    pub fn tick_with_store<H, S>(
        &mut self,
        host: &mut H,
        store: &mut S,
    ) -> Result<TickSummary, SaveError>
    where
        H: Host + ?Sized,
        S: MemoryStore + ?Sized,
    {
        let mut memory = store.load()?;
        let summary = self.tick(host, &mut memory);
        store.save(&memory)?;
        Ok(summary)
    }
}
